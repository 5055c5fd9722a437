pub mod builtin;
pub mod loader;
pub mod schema;

pub use builtin::{builtin_set, builtin_sets};
pub use loader::{load_dir, load_from_path, load_from_str, ConfigError};
pub use schema::{Metadata, PatchSet, TargetDefinition};
