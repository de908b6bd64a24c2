//! Runtime configuration for the controller front-end.
//!
//! Loaded from environment variables, matching how the controller is
//! deployed: the policy configuration itself lives at `config_path` and is
//! re-read on every reconfigure.

use std::env;
use std::path::PathBuf;
use std::time::Duration;
use tracing::warn;

/// Runtime configuration for [`run`](crate::run).
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// Path of the policy configuration source
    pub config_path: PathBuf,

    /// Driver-keyed connection string for the journal's backing store
    pub store_conn: String,

    /// Cadence of the gateway/ARP-resolution tick
    pub gateway_resolve_interval: Duration,

    /// Cadence of the learned-host aging tick
    pub host_expire_interval: Duration,

    /// Capacity of the event queue between producers and the dispatcher
    pub event_queue_capacity: usize,

    /// Log filter, passed through to the embedding binary's subscriber
    /// setup
    pub log_filter: String,
}

fn default_config_path() -> PathBuf {
    PathBuf::from("/etc/sluice/sluice.yaml")
}

fn default_store_conn() -> String {
    "driver=couchdb;server=localhost;uid=root;pwd=admin".to_string()
}

impl ControllerConfig {
    /// Load configuration from environment variables, falling back to
    /// defaults for anything unset or unparsable.
    pub fn load() -> Self {
        let mut config = Self::default();

        if let Ok(path) = env::var("SLUICE_CONFIG") {
            config.config_path = PathBuf::from(path);
        }

        if let Ok(conn) = env::var("SLUICE_STORE") {
            config.store_conn = conn;
        }

        if let Ok(ms) = env::var("SLUICE_GATEWAY_RESOLVE_INTERVAL_MS") {
            match ms.parse::<u64>() {
                Ok(ms) => config.gateway_resolve_interval = Duration::from_millis(ms),
                Err(_) => warn!("Invalid SLUICE_GATEWAY_RESOLVE_INTERVAL_MS value: {}", ms),
            }
        }

        if let Ok(ms) = env::var("SLUICE_HOST_EXPIRE_INTERVAL_MS") {
            match ms.parse::<u64>() {
                Ok(ms) => config.host_expire_interval = Duration::from_millis(ms),
                Err(_) => warn!("Invalid SLUICE_HOST_EXPIRE_INTERVAL_MS value: {}", ms),
            }
        }

        if let Ok(capacity) = env::var("SLUICE_EVENT_QUEUE_CAPACITY") {
            match capacity.parse::<usize>() {
                Ok(capacity) if capacity > 0 => config.event_queue_capacity = capacity,
                _ => warn!("Invalid SLUICE_EVENT_QUEUE_CAPACITY value: {}", capacity),
            }
        }

        if let Ok(filter) = env::var("SLUICE_LOG_FILTER") {
            config.log_filter = filter;
        }

        config
    }
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            config_path: default_config_path(),
            store_conn: default_store_conn(),
            gateway_resolve_interval: Duration::from_secs(2),
            host_expire_interval: Duration::from_secs(5),
            event_queue_capacity: 64,
            log_filter: "info".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_deployment_cadences() {
        let config = ControllerConfig::default();
        assert_eq!(config.config_path, PathBuf::from("/etc/sluice/sluice.yaml"));
        assert_eq!(config.gateway_resolve_interval, Duration::from_secs(2));
        assert_eq!(config.host_expire_interval, Duration::from_secs(5));
        assert_eq!(config.event_queue_capacity, 64);
        assert!(config.store_conn.starts_with("driver=couchdb"));
    }

    #[test]
    fn environment_overrides_are_applied() {
        env::set_var("SLUICE_CONFIG", "/tmp/sluice-test.yaml");
        env::set_var("SLUICE_STORE", "driver=memory");
        env::set_var("SLUICE_GATEWAY_RESOLVE_INTERVAL_MS", "250");
        env::set_var("SLUICE_HOST_EXPIRE_INTERVAL_MS", "garbage");

        let config = ControllerConfig::load();
        assert_eq!(config.config_path, PathBuf::from("/tmp/sluice-test.yaml"));
        assert_eq!(config.store_conn, "driver=memory");
        assert_eq!(config.gateway_resolve_interval, Duration::from_millis(250));
        // the unparsable value falls back to the default
        assert_eq!(config.host_expire_interval, Duration::from_secs(5));

        env::remove_var("SLUICE_CONFIG");
        env::remove_var("SLUICE_STORE");
        env::remove_var("SLUICE_GATEWAY_RESOLVE_INTERVAL_MS");
        env::remove_var("SLUICE_HOST_EXPIRE_INTERVAL_MS");
    }
}
