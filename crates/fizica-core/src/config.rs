use std::time::Duration;

use crate::error::AppError;
use crate::throttle::ThrottleConfig;

impl ThrottleConfig {
    /// Read configuration from environment variables, falling back to
    /// [`ThrottleConfig::default`] for anything unset.
    ///
    /// - `FIZICA_MIN_INTERVAL_MS` (defaults to 1500)
    /// - `FIZICA_MAX_RETRIES` (defaults to 5)
    /// - `FIZICA_BASE_DELAY_MS` (defaults to 800)
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let defaults = Self::default();

        let min_interval = match lookup("FIZICA_MIN_INTERVAL_MS") {
            None => defaults.min_interval,
            Some(raw) => Duration::from_millis(parse_number("FIZICA_MIN_INTERVAL_MS", &raw)?),
        };

        let max_retries = match lookup("FIZICA_MAX_RETRIES") {
            None => defaults.max_retries,
            Some(raw) => parse_number("FIZICA_MAX_RETRIES", &raw)?,
        };

        let base_delay = match lookup("FIZICA_BASE_DELAY_MS") {
            None => defaults.base_delay,
            Some(raw) => {
                let parsed: u64 = parse_number("FIZICA_BASE_DELAY_MS", &raw)?;
                if parsed == 0 {
                    return Err(AppError::ConfigError(
                        "FIZICA_BASE_DELAY_MS must be at least 1".into(),
                    ));
                }
                Duration::from_millis(parsed)
            }
        };

        Ok(Self {
            min_interval,
            max_retries,
            base_delay,
        })
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, raw: &str) -> Result<T, AppError> {
    raw.trim().parse().map_err(|_| {
        AppError::ConfigError(format!(
            "Invalid {key} '{raw}': must be a non-negative integer"
        ))
    })
}
