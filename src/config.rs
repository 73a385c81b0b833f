//! Engine configuration loaded from TOML
//!
//! ```toml
//! template_dirs = ["templates", "vendor/templates"]
//! autoescape = true
//! recursion_limit = 64
//! string_if_invalid = ""
//! ```

use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

/// Errors that can occur when loading an engine configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse config TOML: {0}")]
    ParseError(#[from] toml::de::Error),
}

/// Settings shared by every template of an [`Environment`](crate::Environment)
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Directories searched, in order, for templates not added inline
    pub template_dirs: Vec<PathBuf>,
    /// Escape HTML in variable output unless marked safe
    pub autoescape: bool,
    /// Maximum number of templates rendering inside each other
    pub recursion_limit: usize,
    /// Output for variables that resolve to nothing
    pub string_if_invalid: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            template_dirs: Vec::new(),
            autoescape: true,
            recursion_limit: 64,
            string_if_invalid: String::new(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from a TOML file
    ///
    /// Relative template directories are resolved against the file's
    /// directory.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config = Self::from_str(&content)?;
        if let Some(base) = path.parent() {
            for dir in &mut config.template_dirs {
                if dir.is_relative() {
                    *dir = base.join(&*dir);
                }
            }
        }
        Ok(config)
    }

    /// Load configuration from a TOML string
    pub fn from_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    pub fn with_template_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.template_dirs.push(dir.into());
        self
    }

    pub fn with_autoescape(mut self, autoescape: bool) -> Self {
        self.autoescape = autoescape;
        self
    }

    pub fn with_recursion_limit(mut self, limit: usize) -> Self {
        self.recursion_limit = limit;
        self
    }

    pub fn with_string_if_invalid(mut self, value: impl Into<String>) -> Self {
        self.string_if_invalid = value.into();
        self
    }
}
