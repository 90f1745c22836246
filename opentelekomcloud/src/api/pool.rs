//! HTTP connection settings and request accounting shared by every service
//! client derived from one provider configuration

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct ConnectionPoolConfig {
    pub max_idle_per_host: usize,
    pub idle_timeout: Duration,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub tcp_keepalive: Option<Duration>,
}

impl Default for ConnectionPoolConfig {
    fn default() -> Self {
        Self {
            max_idle_per_host: 10,
            idle_timeout: Duration::from_secs(90),
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(60),
            tcp_keepalive: Some(Duration::from_secs(30)),
        }
    }
}

/// Snapshot of the counters kept by [`ConnectionPoolManager`]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionStats {
    pub requests: u64,
    pub failures: u64,
    pub retries: u64,
}

#[derive(Default)]
struct Counters {
    requests: AtomicU64,
    failures: AtomicU64,
    retries: AtomicU64,
}

#[derive(Clone)]
pub struct ConnectionPoolManager {
    counters: Arc<Counters>,
    config: ConnectionPoolConfig,
}

impl ConnectionPoolManager {
    pub fn new(config: ConnectionPoolConfig) -> Self {
        Self {
            counters: Arc::new(Counters::default()),
            config,
        }
    }

    pub fn config(&self) -> &ConnectionPoolConfig {
        &self.config
    }

    /// One attempt sent; failures include statuses that end up retried
    pub fn record_request(&self, success: bool) {
        self.counters.requests.fetch_add(1, Ordering::Relaxed);
        if !success {
            self.counters.failures.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_retry(&self) {
        self.counters.retries.fetch_add(1, Ordering::Relaxed);
    }

    pub fn stats(&self) -> ConnectionStats {
        ConnectionStats {
            requests: self.counters.requests.load(Ordering::Relaxed),
            failures: self.counters.failures.load(Ordering::Relaxed),
            retries: self.counters.retries.load(Ordering::Relaxed),
        }
    }

    pub fn build_client(&self, insecure: bool) -> Result<reqwest::Client, reqwest::Error> {
        let mut builder = reqwest::Client::builder()
            .danger_accept_invalid_certs(insecure)
            .timeout(self.config.request_timeout)
            .connect_timeout(self.config.connect_timeout)
            .pool_idle_timeout(self.config.idle_timeout)
            .pool_max_idle_per_host(self.config.max_idle_per_host)
            .user_agent(concat!(
                "terraform-provider-opentelekomcloud/",
                env!("CARGO_PKG_VERSION")
            ));

        if let Some(keepalive) = self.config.tcp_keepalive {
            builder = builder.tcp_keepalive(keepalive);
        }

        builder.build()
    }
}
