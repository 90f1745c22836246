//! Provider data structure passed to resources and data sources

use crate::config::Config;
use std::sync::Arc;
use std::time::Duration;
use tfplug::retry::RETRY_MIN_WAIT;
use tfplug::wait::StateChangeConf;

/// Polling behaviour of state waits and retries. Production uses the
/// delays each operation asks for; tests pin a short fixed interval.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PollSettings {
    pub fixed_interval: Option<Duration>,
}

impl PollSettings {
    pub fn fixed(interval: Duration) -> Self {
        Self {
            fixed_interval: Some(interval),
        }
    }

    /// A state wait with the given delays, unless a fixed interval is set
    pub fn state_change(
        &self,
        pending: &[&str],
        target: &[&str],
        timeout: Duration,
        delay: Duration,
        min_timeout: Duration,
    ) -> StateChangeConf {
        let conf = StateChangeConf::new(pending, target, timeout);
        match self.fixed_interval {
            Some(interval) => conf.poll_interval(interval),
            None => conf.delay(delay).min_timeout(min_timeout),
        }
    }

    pub fn retry_min_wait(&self) -> Duration {
        self.fixed_interval.unwrap_or(RETRY_MIN_WAIT)
    }
}

#[derive(Clone)]
pub struct OtcProviderData {
    pub config: Arc<Config>,
    pub poll: PollSettings,
}

impl OtcProviderData {
    pub fn new(config: Config, poll: PollSettings) -> Self {
        Self {
            config: Arc::new(config),
            poll,
        }
    }
}

/// Provider data talking to mock endpoints, keyed like the `endpoints`
/// provider attribute
#[cfg(test)]
pub(crate) async fn test_provider_data(endpoints: &[(&str, String)]) -> OtcProviderData {
    let options = crate::config::ProviderOptions {
        region: Some("eu-de".to_string()),
        token: Some("test-token".to_string()),
        tenant_id: Some("proj-1".to_string()),
        access_key: Some("AKIDEXAMPLE".to_string()),
        secret_key: Some("wJalrXUtnFEMI/K7MDENG+bPxRfiCYEXAMPLEKEY".to_string()),
        max_retries: Some(0),
        endpoints: endpoints
            .iter()
            .map(|(service, url)| (service.to_string(), url.clone()))
            .collect(),
        ..Default::default()
    };
    let config = Config::new(options).await.unwrap();
    OtcProviderData::new(config, PollSettings::fixed(Duration::from_millis(1)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn production_waits_keep_requested_delays() {
        let conf = PollSettings::default().state_change(
            &["MODIFYING"],
            &["ACTIVE"],
            Duration::from_secs(60),
            Duration::from_secs(15),
            Duration::from_secs(3),
        );
        assert_eq!(conf.delay, Duration::from_secs(15));
        assert_eq!(conf.min_timeout, Duration::from_secs(3));
        assert_eq!(conf.poll_interval, None);
        assert_eq!(PollSettings::default().retry_min_wait(), RETRY_MIN_WAIT);
    }

    #[test]
    fn fixed_interval_skips_delays() {
        let poll = PollSettings::fixed(Duration::from_millis(5));
        let conf = poll.state_change(
            &["Running"],
            &["Completed"],
            Duration::from_secs(60),
            Duration::from_secs(15),
            Duration::from_secs(1),
        );
        assert_eq!(conf.delay, Duration::ZERO);
        assert_eq!(conf.poll_interval, Some(Duration::from_millis(5)));
        assert_eq!(poll.retry_min_wait(), Duration::from_millis(5));
    }
}
