pub mod capability;
pub mod registry;
#[allow(clippy::module_inception)]
pub mod service;
pub mod simple;
pub mod types;
