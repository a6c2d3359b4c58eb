//! Parser configuration.
//!
//! Hosts hand the configuration over as JSON text; the library itself never reads files.

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_MAX_NESTING: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ParserConfig {
    /// Whitespace-only lines are not statements. When `false` they reach the grammar
    /// and fail as syntax errors.
    pub skip_blank_lines: bool,
    /// Deepest parenthesis nesting a statement may use. Call parentheses count. Each
    /// level costs the grammar a handful of stack frames, so the default stays well
    /// inside a 2 MiB thread stack.
    pub max_nesting: usize,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            skip_blank_lines: true,
            max_nesting: DEFAULT_MAX_NESTING,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("malformed parser configuration: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("max_nesting must be at least 1")]
    ZeroNesting,
}

impl ParserConfig {
    /// Reads a configuration from JSON. Missing fields take their defaults.
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_nesting == 0 {
            return Err(ConfigError::ZeroNesting);
        }
        Ok(())
    }
}
