//! Small helpers shared by the binaries in this workspace.

pub mod config;
pub mod env;

pub use config::ConfigError;
