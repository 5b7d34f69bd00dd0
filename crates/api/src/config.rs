//! Environment-driven API configuration.

use std::time::Duration;

use tracing::warn;

/// Runtime configuration for the API process.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Listen address for the HTTP server.
    pub bind_addr: String,
    /// Number of worker threads consuming the queue.
    pub workers: usize,
    /// Simulated processing time of the sample task.
    pub sample_task_delay: Duration,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8080".to_string(),
            workers: 4,
            sample_task_delay: Duration::from_secs(5),
        }
    }
}

impl ApiConfig {
    /// Load configuration from the process environment.
    ///
    /// Unset or malformed variables fall back to defaults with a warning.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let bind_addr = lookup("JOBRELAY_BIND_ADDR").unwrap_or(defaults.bind_addr);

        let workers = match lookup("JOBRELAY_WORKERS").map(|v| v.parse::<usize>()) {
            Some(Ok(n)) if n > 0 => n,
            Some(_) => {
                warn!("JOBRELAY_WORKERS invalid; using default");
                defaults.workers
            }
            None => defaults.workers,
        };

        let sample_task_delay = match lookup("JOBRELAY_SAMPLE_DELAY_MS").map(|v| v.parse::<u64>())
        {
            Some(Ok(ms)) => Duration::from_millis(ms),
            Some(Err(_)) => {
                warn!("JOBRELAY_SAMPLE_DELAY_MS invalid; using default");
                defaults.sample_task_delay
            }
            None => defaults.sample_task_delay,
        };

        Self {
            bind_addr,
            workers,
            sample_task_delay,
        }
    }
}
