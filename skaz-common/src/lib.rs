//! # Skaz Common Library
//!
//! Shared code for the skaz story service:
//! - Error type for configuration loading
//! - Supported story languages
//! - Service configuration and its resolution from TOML / ENV / defaults

pub mod config;
pub mod error;
pub mod language;

pub use config::StoryConfig;
pub use error::{Error, Result};
pub use language::Language;
