//! Reads technology and unlockable data files and builds engine values.
//!
//! Provides format detection (RON/JSON/TOML), file discovery, and
//! deserialization helpers, plus the directory-level entry point
//! [`load_data_dir`].

use crate::schema::{TechnologyData, UnlockableData};
use civtech_core::tree::{GraphError, TechDeclaration, TechTree};
use civtech_unlock::registry::{RegistryError, UnlockRegistry};
use civtech_unlock::unlockable::{Unlockable, UnlockableDef};
use serde::de::DeserializeOwned;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Base name of the technology file inside a data directory.
pub const TECHNOLOGIES_FILE: &str = "technologies";

/// Base name of the optional unlockable file inside a data directory.
pub const UNLOCKABLES_FILE: &str = "unlockables";

// ===========================================================================
// Errors
// ===========================================================================

/// Errors that can occur during data loading.
#[derive(Debug, thiserror::Error)]
pub enum DataLoadError {
    /// A required data file was not found in the given directory.
    #[error("required file '{file}' not found in {dir}")]
    MissingRequired { file: String, dir: PathBuf },

    /// The file has an extension we don't support.
    #[error("unsupported format for file: {file}")]
    UnsupportedFormat { file: PathBuf },

    /// Two files with the same base name but different formats exist.
    #[error("conflicting formats: {a} and {b}")]
    ConflictingFormats { a: PathBuf, b: PathBuf },

    /// A deserialization error occurred.
    #[error("parse error in {file}: {detail}")]
    Parse { file: PathBuf, detail: String },

    /// A duplicate name was found.
    #[error("duplicate name '{name}' in {file}")]
    DuplicateName { file: PathBuf, name: String },

    /// The technology declarations do not form a valid tree.
    #[error(transparent)]
    Graph(#[from] GraphError),

    /// An unlockable could not be registered against the loaded tree.
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// An I/O error occurred.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

// ===========================================================================
// Format detection
// ===========================================================================

/// Supported data file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Ron,
    Toml,
    Json,
}

/// Detect the format of a file based on its extension.
pub fn detect_format(path: &Path) -> Result<Format, DataLoadError> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("ron") => Ok(Format::Ron),
        Some("toml") => Ok(Format::Toml),
        Some("json") => Ok(Format::Json),
        _ => Err(DataLoadError::UnsupportedFormat {
            file: path.to_path_buf(),
        }),
    }
}

// ===========================================================================
// File discovery
// ===========================================================================

/// Scan a directory for a data file with the given base name (without extension).
///
/// Looks for `{base_name}.ron`, `{base_name}.toml`, and `{base_name}.json`.
/// Returns `Ok(None)` if no file is found, or `Err(ConflictingFormats)` if
/// multiple formats exist for the same base name.
pub fn find_data_file(dir: &Path, base_name: &str) -> Result<Option<PathBuf>, DataLoadError> {
    let mut found: Option<PathBuf> = None;

    for ext in ["ron", "toml", "json"] {
        let candidate = dir.join(format!("{base_name}.{ext}"));
        if candidate.exists() {
            if let Some(existing) = found {
                return Err(DataLoadError::ConflictingFormats {
                    a: existing,
                    b: candidate,
                });
            }
            found = Some(candidate);
        }
    }

    Ok(found)
}

/// Like [`find_data_file`], but returns an error if no file is found.
pub fn require_data_file(dir: &Path, base_name: &str) -> Result<PathBuf, DataLoadError> {
    find_data_file(dir, base_name)?.ok_or_else(|| DataLoadError::MissingRequired {
        file: base_name.to_string(),
        dir: dir.to_path_buf(),
    })
}

// ===========================================================================
// Deserialization
// ===========================================================================

fn parse_error(path: &Path, detail: impl ToString) -> DataLoadError {
    DataLoadError::Parse {
        file: path.to_path_buf(),
        detail: detail.to_string(),
    }
}

/// Deserialize a list from a file. For TOML files, extracts the array at the
/// given `toml_key` from a top-level table. For RON and JSON, deserializes
/// directly as `Vec<T>`.
pub fn deserialize_list<T: DeserializeOwned>(
    path: &Path,
    toml_key: &str,
) -> Result<Vec<T>, DataLoadError> {
    let format = detect_format(path)?;
    let content = std::fs::read_to_string(path)?;

    match format {
        Format::Ron => ron::from_str(&content).map_err(|e| parse_error(path, e)),
        Format::Json => serde_json::from_str(&content).map_err(|e| parse_error(path, e)),
        Format::Toml => {
            let mut table: toml::Table =
                toml::from_str(&content).map_err(|e| parse_error(path, e))?;
            let array = table
                .remove(toml_key)
                .ok_or_else(|| parse_error(path, format!("missing key '{toml_key}' in TOML file")))?;
            array
                .try_into()
                .map_err(|e: toml::de::Error| parse_error(path, e))
        }
    }
}

/// Return a `DuplicateName` error for the first name seen twice.
fn check_unique<'a>(
    names: impl IntoIterator<Item = &'a str>,
    file: &Path,
) -> Result<(), DataLoadError> {
    let mut seen = HashSet::new();
    for name in names {
        if !seen.insert(name) {
            return Err(DataLoadError::DuplicateName {
                file: file.to_path_buf(),
                name: name.to_string(),
            });
        }
    }
    Ok(())
}

// ===========================================================================
// Loading
// ===========================================================================

/// Read technology declarations from one file, in file order.
pub fn load_technologies(path: &Path) -> Result<Vec<TechDeclaration>, DataLoadError> {
    let data: Vec<TechnologyData> = deserialize_list(path, "technologies")?;
    check_unique(data.iter().map(|t| t.name.as_str()), path)?;
    Ok(data.into_iter().map(TechDeclaration::from).collect())
}

/// Read unlockable definitions from one file, in file order. Names are
/// checked for uniqueness after namespacing.
pub fn load_unlockables(path: &Path) -> Result<Vec<UnlockableDef>, DataLoadError> {
    let data: Vec<UnlockableData> = deserialize_list(path, "unlockables")?;
    let defs: Vec<UnlockableDef> = data.into_iter().map(UnlockableDef::from).collect();
    check_unique(defs.iter().map(|d| d.name.as_str()), path)?;
    Ok(defs)
}

/// Everything loaded from one data directory.
#[derive(Debug, Clone)]
pub struct GameData {
    pub tree: Arc<TechTree>,
    /// In file order, which becomes registration order.
    pub unlockables: Vec<UnlockableDef>,
}

impl GameData {
    /// Build a registry over the loaded tree with every unlockable
    /// registered in file order.
    pub fn registry(&self) -> Result<UnlockRegistry, DataLoadError> {
        let mut registry = UnlockRegistry::new(Arc::clone(&self.tree));
        for def in &self.unlockables {
            registry.register(def.clone())?;
        }
        Ok(registry)
    }
}

/// Load `technologies.*` (required) and `unlockables.*` (optional) from
/// `dir` and build the tree. Every unlockable must name technologies the
/// tree knows.
pub fn load_data_dir(dir: &Path) -> Result<GameData, DataLoadError> {
    let tech_path = require_data_file(dir, TECHNOLOGIES_FILE)?;
    let tree = TechTree::build(load_technologies(&tech_path)?)?;

    let unlockables = match find_data_file(dir, UNLOCKABLES_FILE)? {
        Some(path) => {
            let defs = load_unlockables(&path)?;
            for def in &defs {
                if let Some(missing) = def.required_techs().iter().find(|t| tree.id_of(t).is_none()) {
                    return Err(RegistryError::UnknownTechnology {
                        unlockable: def.name.clone(),
                        technology: missing.clone(),
                    }
                    .into());
                }
            }
            defs
        }
        None => Vec::new(),
    };

    tracing::info!(
        dir = %dir.display(),
        technologies = tree.len(),
        unlockables = unlockables.len(),
        "loaded technology data"
    );
    Ok(GameData {
        tree: Arc::new(tree),
        unlockables,
    })
}

// ===========================================================================
// Tests
// ===========================================================================
