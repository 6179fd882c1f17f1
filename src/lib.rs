pub mod config;
pub mod core;
pub mod errors;

// Re-export commonly used items for convenience
pub use config::{ConfigError, ConfigResult, PluginSettings};
pub use crate::core::*;
pub use errors::{SpeakError, SpeakResult};
