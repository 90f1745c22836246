//! Fixtures shared by the acceptance suites

use opentelekomcloud::OtcProvider;
use tfplug::testing::{pre_check_required_env_vars, PreCheckFn};

pub const BASE_ENV: &[&str] = &["OS_AUTH_URL", "OS_REGION_NAME"];

pub fn provider() -> OtcProvider {
    opentelekomcloud::logging::init();
    OtcProvider::new()
}

/// Credentials plus the listed fixtures must be present in the environment
pub fn pre_check(fixtures: &'static [&'static str]) -> PreCheckFn {
    Box::new(move || {
        pre_check_required_env_vars(BASE_ENV)?;
        if std::env::var("OS_AUTH_TOKEN").is_err() {
            pre_check_required_env_vars(&["OS_USERNAME", "OS_PASSWORD"])?;
        }
        pre_check_required_env_vars(fixtures)
    })
}

pub fn env(name: &str) -> String {
    std::env::var(name).unwrap_or_default()
}
