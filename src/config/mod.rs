//! Configuration loading and validation.
//!
//! The config is a single JSON file parsed once at startup into an
//! immutable [`Config`](model::Config) snapshot; components receive
//! `Arc` handles at construction and there is no reload path.
//! Submodules provide the data model and validation logic.

pub mod model;
pub mod validation;

use std::path::Path;

use sha2::{Digest, Sha256};

use crate::error::JunctionError;
use model::Config;

/// Compute a lowercase hex-encoded SHA-256 digest.
#[must_use]
pub fn sha256_hex(data: &[u8]) -> String {
    format!("{:x}", Sha256::digest(data))
}

/// Load, parse, and validate a JSON config file.
///
/// Returns the config together with a SHA-256 fingerprint of the raw
/// file bytes, logged at startup so operators can correlate a running
/// instance with a config revision.
pub fn load(path: &Path) -> Result<(Config, String), JunctionError> {
    let raw = match std::fs::read(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(JunctionError::ConfigFileNotFound {
                path: path.to_path_buf(),
            });
        }
        Err(e) => return Err(e.into()),
    };

    let config = parse_and_validate(&raw, &path.display().to_string())?;
    Ok((config, sha256_hex(&raw)))
}

/// Deserialize JSON into [`Config`] and run structural validation.
pub fn parse_and_validate(raw: &[u8], source_label: &str) -> Result<Config, JunctionError> {
    let config: Config =
        serde_json::from_slice(raw).map_err(|e| JunctionError::ConfigParse {
            path: source_label.to_string(),
            source: Box::new(e),
        })?;

    if let Err(errors) = validation::validate(&config) {
        return Err(JunctionError::ConfigValidation { errors });
    }

    Ok(config)
}
