pub mod loader;

pub use loader::{DefinitionLoader, DefinitionLoaderError, DefinitionRecord};
