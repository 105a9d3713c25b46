use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// How the listing is laid out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ListingConfig {
    /// Print the a.out header summary before the listing.
    pub show_header: bool,
    /// Print the raw instruction bytes between the offset and the mnemonic.
    pub show_bytes: bool,
    /// Width of the raw-bytes column in characters.
    pub hex_width: usize,
}

impl Default for ListingConfig {
    fn default() -> Self {
        Self {
            show_header: true,
            show_bytes: true,
            hex_width: 14,
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("reading config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("parsing config {path}: {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

impl ListingConfig {
    pub fn from_json_str(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&text).map_err(|source| ConfigError::Json {
            path: path.display().to_string(),
            source,
        })
    }
}
