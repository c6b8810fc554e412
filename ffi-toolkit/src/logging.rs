//! tracing-subscriber setup for hosts that do not install their own.

use tracing_subscriber::EnvFilter;

use crate::config::ToolkitConfig;

/// Install a global fmt subscriber.
///
/// `RUST_LOG` wins over `config.log_filter`; `FFI_TOOLKIT_LOG_JSON=1` forces
/// JSON output. Returns false when a subscriber was already installed.
pub fn init(config: &ToolkitConfig) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_filter));
    let json_logs =
        config.log_json || std::env::var("FFI_TOOLKIT_LOG_JSON").unwrap_or_default() == "1";

    let installed = if json_logs {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .try_init()
            .is_ok()
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .try_init()
            .is_ok()
    };

    if installed {
        tracing::debug!(json_logs, "logging initialised");
    }
    installed
}
