pub mod config;
pub mod errors;
pub mod format;
pub mod kernel;
pub mod registry;
pub mod traits;
pub mod types;
