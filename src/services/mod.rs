pub mod loader;
pub mod registry;
