//! Engine configuration
//!
//! Token budgets, final-output shaping, progress polling and queue sizing.
//! Delegation depth and the sandbox timeout are constants, not configuration.

use std::time::Duration;

/// Engine configuration
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// `max_tokens` for every step except the last
    pub intermediate_max_tokens: u32,

    /// `max_tokens` for the last step
    pub final_max_tokens: u32,

    /// Word bound quoted in the last step's single-sentence constraint
    pub final_sentence_max_words: u32,

    /// How often the progress notifier re-reads an execution
    pub progress_poll_interval: Duration,

    /// Consecutive read failures before the notifier gives up
    pub progress_max_failures: u32,

    /// Pending runs the execution queue buffers before submissions wait
    pub queue_capacity: usize,
}

impl EngineConfig {
    /// Creates configuration from environment variables
    ///
    /// Expected environment variables (all optional):
    /// - INTERMEDIATE_MAX_TOKENS (default: 1024)
    /// - FINAL_MAX_TOKENS (default: 150)
    /// - FINAL_SENTENCE_MAX_WORDS (default: 30)
    /// - PROGRESS_POLL_INTERVAL_MS (default: 3000)
    /// - EXECUTION_QUEUE_CAPACITY (default: 256)
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            intermediate_max_tokens: env_parse("INTERMEDIATE_MAX_TOKENS")
                .unwrap_or(defaults.intermediate_max_tokens),
            final_max_tokens: env_parse("FINAL_MAX_TOKENS").unwrap_or(defaults.final_max_tokens),
            final_sentence_max_words: env_parse("FINAL_SENTENCE_MAX_WORDS")
                .unwrap_or(defaults.final_sentence_max_words),
            progress_poll_interval: env_parse("PROGRESS_POLL_INTERVAL_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.progress_poll_interval),
            progress_max_failures: defaults.progress_max_failures,
            queue_capacity: env_parse("EXECUTION_QUEUE_CAPACITY")
                .unwrap_or(defaults.queue_capacity),
        }
    }

    /// Validates the configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.intermediate_max_tokens == 0 || self.final_max_tokens == 0 {
            anyhow::bail!("max_tokens budgets must be greater than 0");
        }

        if self.final_max_tokens > self.intermediate_max_tokens {
            anyhow::bail!("final_max_tokens must not exceed intermediate_max_tokens");
        }

        if self.final_sentence_max_words == 0 {
            anyhow::bail!("final_sentence_max_words must be greater than 0");
        }

        if self.progress_poll_interval.is_zero() {
            anyhow::bail!("progress_poll_interval must be greater than 0");
        }

        if self.progress_max_failures == 0 {
            anyhow::bail!("progress_max_failures must be greater than 0");
        }

        if self.queue_capacity == 0 {
            anyhow::bail!("queue_capacity must be greater than 0");
        }

        Ok(())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            intermediate_max_tokens: 1024,
            final_max_tokens: 150,
            final_sentence_max_words: 30,
            progress_poll_interval: Duration::from_millis(3000),
            progress_max_failures: 5,
            queue_capacity: 256,
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|s| s.parse::<T>().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert_eq!(config.intermediate_max_tokens, 1024);
        assert_eq!(config.final_max_tokens, 150);
        assert_eq!(config.progress_poll_interval, Duration::from_secs(3));
        assert_eq!(config.progress_max_failures, 5);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = EngineConfig::default();

        config.final_max_tokens = 0;
        assert!(config.validate().is_err());

        config.final_max_tokens = 2048;
        assert!(config.validate().is_err());

        config.final_max_tokens = 150;
        config.progress_poll_interval = Duration::ZERO;
        assert!(config.validate().is_err());

        config.progress_poll_interval = Duration::from_millis(10);
        config.queue_capacity = 0;
        assert!(config.validate().is_err());

        config.queue_capacity = 1;
        assert!(config.validate().is_ok());
    }
}
