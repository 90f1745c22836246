//! Log output for the provider process

use std::sync::Once;
use tracing::Level;

pub const LOG_LEVEL_ENV: &str = "TF_LOG";

/// Level named by `TF_LOG`, `INFO` when unset or unrecognised
pub fn level_from_env() -> Level {
    std::env::var(LOG_LEVEL_ENV)
        .ok()
        .and_then(|raw| parse_level(&raw))
        .unwrap_or(Level::INFO)
}

fn parse_level(raw: &str) -> Option<Level> {
    match raw.trim().to_ascii_uppercase().as_str() {
        "TRACE" => Some(Level::TRACE),
        "DEBUG" => Some(Level::DEBUG),
        "INFO" => Some(Level::INFO),
        "WARN" => Some(Level::WARN),
        "ERROR" => Some(Level::ERROR),
        _ => None,
    }
}

/// Install the fmt subscriber. Later calls are no-ops.
pub fn init() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let result = tracing_subscriber::fmt()
            .with_max_level(level_from_env())
            .with_target(false)
            .with_writer(std::io::stderr)
            .try_init();
        if result.is_err() {
            tracing::debug!("A global subscriber is already installed");
        }
    });
}
