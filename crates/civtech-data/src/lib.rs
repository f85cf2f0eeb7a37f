pub mod loader;
pub mod schema;

pub use loader::{DataLoadError, GameData, load_data_dir, load_technologies, load_unlockables};
