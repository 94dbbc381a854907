pub mod arguments;
#[allow(clippy::module_inception)]
pub mod function;
pub mod loader;
pub mod metadata;
pub mod native;
pub mod plugin;
pub mod prompt;
pub mod registry;
pub mod result;
pub mod types;
