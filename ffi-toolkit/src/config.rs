//! Toolkit configuration, set once by the host through `ffi_toolkit_init`.

use once_cell::sync::Lazy;
use parking_lot::RwLock;
use serde::Deserialize;

use crate::error::ToolkitError;

/// Process-wide configuration.
///
/// Config JSON schema (every field optional):
/// ```json
/// {
///   "log_filter": "ffi_toolkit=debug",
///   "log_json": false,
///   "strict": false
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ToolkitConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is not set.
    pub log_filter: String,
    /// Emit JSON log lines instead of human-readable ones.
    pub log_json: bool,
    /// Abort the process on a detected contract violation instead of
    /// logging it and leaking the allocation.
    pub strict: bool,
}

impl Default for ToolkitConfig {
    fn default() -> Self {
        Self {
            log_filter: "ffi_toolkit=info".to_string(),
            log_json: false,
            strict: false,
        }
    }
}

impl ToolkitConfig {
    pub fn from_json(json: &str) -> Result<Self, ToolkitError> {
        Ok(serde_json::from_str(json)?)
    }
}

static CONFIG: Lazy<RwLock<ToolkitConfig>> = Lazy::new(|| RwLock::new(ToolkitConfig::default()));

/// Snapshot of the active configuration.
pub fn current() -> ToolkitConfig {
    CONFIG.read().clone()
}

/// Replace the active configuration.
pub fn install(config: ToolkitConfig) {
    tracing::debug!(?config, "installing toolkit configuration");
    *CONFIG.write() = config;
}

pub(crate) fn is_strict() -> bool {
    CONFIG.read().strict
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_object_uses_defaults() {
        let config = ToolkitConfig::from_json("{}").unwrap();
        assert_eq!(config, ToolkitConfig::default());
        assert_eq!(config.log_filter, "ffi_toolkit=info");
        assert!(!config.strict);
    }

    #[test]
    fn test_partial_override() {
        let config = ToolkitConfig::from_json(r#"{"log_json":true,"log_filter":"debug"}"#).unwrap();
        assert!(config.log_json);
        assert_eq!(config.log_filter, "debug");
        assert!(!config.strict);
    }

    #[test]
    fn test_invalid_json() {
        assert!(matches!(
            ToolkitConfig::from_json("not json"),
            Err(ToolkitError::Config(_))
        ));
        assert!(ToolkitConfig::from_json(r#"{"strict":"yes"}"#).is_err());
    }
}
