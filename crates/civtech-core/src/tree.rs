//! The technology tree: an immutable prerequisite graph built once from
//! declarations.
//!
//! [`TechTree::build`] resolves parent names, derives child lists and rejects
//! cycles, so a tree value is always fully valid. Share it as
//! `Arc<TechTree>`; reloading means building a new tree and swapping the
//! handle, never mutating one in place.

use crate::id::TechId;
use crate::packs::ResourceVector;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors raised while building a tree. A failed build produces no tree.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GraphError {
    #[error("technology `{technology}` is its own transitive prerequisite")]
    Cycle { technology: String },

    #[error("technology `{technology}` requires unknown technology `{parent}`")]
    DanglingReference { technology: String, parent: String },

    #[error("duplicate technology name `{0}`")]
    DuplicateName(String),

    #[error("technology `{technology}` requires {value} of pack {index}")]
    NegativeRequirement {
        technology: String,
        index: usize,
        value: i64,
    },
}

// ---------------------------------------------------------------------------
// Declarations and nodes
// ---------------------------------------------------------------------------

/// Display-only description of something a technology leads to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EffectDescription {
    /// A recipe becomes available.
    Recipe(String),

    /// A building becomes available.
    Building(String),

    /// Host-defined effect. The key is opaque to the engine.
    Custom(String),
}

/// One technology as written in a declaration source, before resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TechDeclaration {
    pub name: String,
    pub required: ResourceVector,
    pub parents: Vec<String>,
    pub effects: Vec<EffectDescription>,
}

impl TechDeclaration {
    pub fn new(name: impl Into<String>, required: impl Into<ResourceVector>) -> Self {
        Self {
            name: name.into(),
            required: required.into(),
            parents: Vec::new(),
            effects: Vec::new(),
        }
    }

    pub fn with_parents<I, S>(mut self, parents: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.parents.extend(parents.into_iter().map(Into::into));
        self
    }

    pub fn with_effect(mut self, effect: EffectDescription) -> Self {
        self.effects.push(effect);
        self
    }
}

/// A resolved node of the tree. Immutable once the tree is built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Technology {
    pub id: TechId,
    pub name: String,

    /// Packs needed before the technology counts as researched.
    pub required: ResourceVector,

    /// Prerequisites, in the order they were declared.
    pub parents: Vec<TechId>,

    /// Technologies listing this one as a parent, in declaration order.
    pub children: Vec<TechId>,

    pub effects: Vec<EffectDescription>,
}

// ---------------------------------------------------------------------------
// TechTree
// ---------------------------------------------------------------------------

/// Immutable directed acyclic graph of technologies, indexed by name.
///
/// Serializes as its declarations. Deserializing runs [`TechTree::build`],
/// so a stored tree is validated like a freshly declared one.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(try_from = "Vec<TechDeclaration>", into = "Vec<TechDeclaration>")]
pub struct TechTree {
    technologies: Vec<Technology>,
    by_name: HashMap<String, TechId>,
}

impl TechTree {
    /// Build a tree from declarations, in order. Either every declaration
    /// resolves and the graph is acyclic, or an error is returned.
    pub fn build<I>(declarations: I) -> Result<TechTree, GraphError>
    where
        I: IntoIterator<Item = TechDeclaration>,
    {
        let result = Self::build_inner(declarations.into_iter().collect());
        match &result {
            Ok(tree) => tracing::debug!(technologies = tree.len(), "tech tree built"),
            Err(err) => tracing::warn!(error = %err, "tech tree rejected"),
        }
        result
    }

    fn build_inner(declarations: Vec<TechDeclaration>) -> Result<TechTree, GraphError> {
        let mut by_name = HashMap::with_capacity(declarations.len());
        for (index, decl) in declarations.iter().enumerate() {
            if let Some((pack, value)) = decl.required.first_negative() {
                return Err(GraphError::NegativeRequirement {
                    technology: decl.name.clone(),
                    index: pack,
                    value,
                });
            }
            if by_name
                .insert(decl.name.clone(), TechId(index as u32))
                .is_some()
            {
                return Err(GraphError::DuplicateName(decl.name.clone()));
            }
        }

        let mut parents: Vec<Vec<TechId>> = Vec::with_capacity(declarations.len());
        for decl in &declarations {
            let mut resolved = Vec::with_capacity(decl.parents.len());
            for parent in &decl.parents {
                let id = by_name
                    .get(parent)
                    .copied()
                    .ok_or_else(|| GraphError::DanglingReference {
                        technology: decl.name.clone(),
                        parent: parent.clone(),
                    })?;
                // First mention wins.
                if !resolved.contains(&id) {
                    resolved.push(id);
                }
            }
            parents.push(resolved);
        }

        if let Some(index) = find_cycle(&parents) {
            return Err(GraphError::Cycle {
                technology: declarations[index].name.clone(),
            });
        }

        let mut children: Vec<Vec<TechId>> = vec![Vec::new(); declarations.len()];
        for (child, ps) in parents.iter().enumerate() {
            for parent in ps {
                children[parent.index()].push(TechId(child as u32));
            }
        }

        let technologies = declarations
            .into_iter()
            .zip(parents)
            .zip(children)
            .enumerate()
            .map(|(index, ((decl, parents), children))| Technology {
                id: TechId(index as u32),
                name: decl.name,
                required: decl.required,
                parents,
                children,
                effects: decl.effects,
            })
            .collect();

        Ok(TechTree {
            technologies,
            by_name,
        })
    }

    // -- Query API --

    /// Look up a technology by name. `None` means no such technology.
    pub fn get(&self, name: &str) -> Option<&Technology> {
        self.id_of(name).and_then(|id| self.technology(id))
    }

    pub fn technology(&self, id: TechId) -> Option<&Technology> {
        self.technologies.get(id.index())
    }

    pub fn id_of(&self, name: &str) -> Option<TechId> {
        self.by_name.get(name).copied()
    }

    /// All technologies in declaration order.
    pub fn technologies(&self) -> &[Technology] {
        &self.technologies
    }

    /// Direct prerequisites of `id`. Empty for unknown ids.
    pub fn parents_of(&self, id: TechId) -> Vec<&Technology> {
        self.related(id, |t| &t.parents)
    }

    /// Technologies that list `id` as a direct prerequisite.
    pub fn children_of(&self, id: TechId) -> Vec<&Technology> {
        self.related(id, |t| &t.children)
    }

    pub fn len(&self) -> usize {
        self.technologies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.technologies.is_empty()
    }

    fn related(&self, id: TechId, edges: impl Fn(&Technology) -> &Vec<TechId>) -> Vec<&Technology> {
        self.technology(id)
            .map(|t| edges(t).iter().filter_map(|&e| self.technology(e)).collect())
            .unwrap_or_default()
    }
}

impl TryFrom<Vec<TechDeclaration>> for TechTree {
    type Error = GraphError;

    fn try_from(declarations: Vec<TechDeclaration>) -> Result<Self, Self::Error> {
        TechTree::build(declarations)
    }
}

impl From<TechTree> for Vec<TechDeclaration> {
    fn from(tree: TechTree) -> Self {
        let names: Vec<String> = tree.technologies.iter().map(|t| t.name.clone()).collect();
        tree.technologies
            .into_iter()
            .map(|t| TechDeclaration {
                parents: t.parents.iter().map(|p| names[p.index()].clone()).collect(),
                name: t.name,
                required: t.required,
                effects: t.effects,
            })
            .collect()
    }
}

/// Depth-first search over parent edges. Returns the index of a node that
/// was reached again while still on the current path.
fn find_cycle(parents: &[Vec<TechId>]) -> Option<usize> {
    #[derive(Clone, Copy, PartialEq, Eq)]
    enum Mark {
        Unvisited,
        OnPath,
        Done,
    }

    let mut marks = vec![Mark::Unvisited; parents.len()];
    // (node, next parent to visit)
    let mut stack: Vec<(usize, usize)> = Vec::new();

    for root in 0..parents.len() {
        if marks[root] != Mark::Unvisited {
            continue;
        }
        marks[root] = Mark::OnPath;
        stack.push((root, 0));

        while let Some(frame) = stack.last_mut() {
            let (node, cursor) = *frame;
            match parents[node].get(cursor) {
                Some(next) => {
                    frame.1 += 1;
                    let next = next.index();
                    match marks[next] {
                        Mark::OnPath => return Some(next),
                        Mark::Unvisited => {
                            marks[next] = Mark::OnPath;
                            stack.push((next, 0));
                        }
                        Mark::Done => {}
                    }
                }
                None => {
                    marks[node] = Mark::Done;
                    stack.pop();
                }
            }
        }
    }

    None
}

// ===========================================================================
// Tests
// ===========================================================================
