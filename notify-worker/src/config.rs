//! Configuration module for environment variable parsing.
//!
//! Every setting has a default so the service starts with an empty
//! environment (in dry-run mode, without Twilio credentials).

use std::env;
use std::str::FromStr;
use std::time::Duration;

use tracing::warn;

use crate::queue::{QueueConfig, RetrySchedule};

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Port for the HTTP server to listen on
    pub port: u16,

    /// Shared secret expected in the X-Api-Key header on write routes
    pub api_token: Option<String>,

    // =========================================================================
    // Twilio
    // =========================================================================

    pub twilio_account_sid: Option<String>,

    pub twilio_auth_token: Option<String>,

    /// Sender number in E.164 format
    pub twilio_from_number: Option<String>,

    /// Base URL of the Twilio REST API
    pub twilio_api_base: String,

    /// HTTP request timeout in milliseconds
    pub request_timeout_ms: u64,

    // =========================================================================
    // Delivery queue
    // =========================================================================

    /// Sends allowed per rate window
    pub sms_rate_limit: usize,

    /// Rate window in milliseconds
    pub sms_rate_window_ms: u64,

    /// Retries after the first failed send
    pub sms_max_retries: u32,

    /// Attempt-indexed retry delays in milliseconds
    pub sms_retry_delays_ms: Vec<u64>,

    /// Pause after each processed message in milliseconds
    pub sms_message_delay_ms: u64,

    /// Finalised items kept for status lookups
    pub queue_history_limit: usize,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        Config {
            port: parse_or("PORT", 8080),

            api_token: non_empty("NOTIFY_API_TOKEN"),

            twilio_account_sid: non_empty("TWILIO_ACCOUNT_SID"),

            twilio_auth_token: non_empty("TWILIO_AUTH_TOKEN"),

            twilio_from_number: non_empty("TWILIO_FROM_NUMBER"),

            twilio_api_base: env::var("TWILIO_API_BASE")
                .unwrap_or_else(|_| "https://api.twilio.com".to_string()),

            request_timeout_ms: parse_or("REQUEST_TIMEOUT_MS", 10_000),

            sms_rate_limit: parse_or("SMS_RATE_LIMIT", 1),

            sms_rate_window_ms: parse_or("SMS_RATE_WINDOW_MS", 1000),

            sms_max_retries: parse_or("SMS_MAX_RETRIES", 3),

            sms_retry_delays_ms: parse_millis_list("SMS_RETRY_DELAYS_MS", &[2000, 5000, 10000]),

            sms_message_delay_ms: parse_or("SMS_MESSAGE_DELAY_MS", 100),

            queue_history_limit: parse_or("QUEUE_HISTORY_LIMIT", 1000),
        }
    }

    /// Whether all three Twilio settings are present.
    pub fn twilio_configured(&self) -> bool {
        self.twilio_account_sid.is_some()
            && self.twilio_auth_token.is_some()
            && self.twilio_from_number.is_some()
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Delivery queue settings derived from this configuration.
    pub fn queue_config(&self) -> QueueConfig {
        QueueConfig {
            max_per_window: self.sms_rate_limit.max(1),
            window: Duration::from_millis(self.sms_rate_window_ms),
            max_retries: self.sms_max_retries,
            retry_schedule: RetrySchedule::from_millis(&self.sms_retry_delays_ms),
            message_delay: Duration::from_millis(self.sms_message_delay_ms),
            history_limit: self.queue_history_limit,
        }
    }
}

/// Parse a variable, falling back to `default` when unset or malformed.
fn parse_or<T: FromStr>(name: &str, default: T) -> T {
    match env::var(name) {
        Ok(raw) => match raw.trim().parse() {
            Ok(value) => value,
            Err(_) => {
                warn!(env_var = name, value = %raw, "Invalid value, using default");
                default
            }
        },
        Err(_) => default,
    }
}

/// Read a variable, treating blank values as unset.
fn non_empty(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Parse a comma-separated list of milliseconds like "2000,5000,10000".
fn parse_millis_list(name: &str, default: &[u64]) -> Vec<u64> {
    let raw = match env::var(name) {
        Ok(v) => v,
        Err(_) => return default.to_vec(),
    };

    let parsed: Result<Vec<u64>, _> = raw
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::parse::<u64>)
        .collect();

    match parsed {
        Ok(values) if !values.is_empty() => values,
        _ => {
            warn!(env_var = name, value = %raw, "Invalid delay list, using default");
            default.to_vec()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_millis_list_valid() {
        env::set_var("TEST_DELAYS_VALID", "100, 250,1000");
        let result = parse_millis_list("TEST_DELAYS_VALID", &[1]);
        assert_eq!(result, vec![100, 250, 1000]);
        env::remove_var("TEST_DELAYS_VALID");
    }

    #[test]
    fn test_parse_millis_list_invalid_falls_back() {
        env::set_var("TEST_DELAYS_INVALID", "100,soon");
        let result = parse_millis_list("TEST_DELAYS_INVALID", &[1, 2]);
        assert_eq!(result, vec![1, 2]);
        env::remove_var("TEST_DELAYS_INVALID");
    }

    #[test]
    fn test_parse_millis_list_default() {
        let result = parse_millis_list("NONEXISTENT_DELAYS", &[2000, 5000]);
        assert_eq!(result, vec![2000, 5000]);
    }

    #[test]
    fn test_parse_or() {
        env::set_var("TEST_PARSE_OR_PORT", "9090");
        assert_eq!(parse_or::<u16>("TEST_PARSE_OR_PORT", 1), 9090);
        env::set_var("TEST_PARSE_OR_PORT", "not-a-port");
        assert_eq!(parse_or::<u16>("TEST_PARSE_OR_PORT", 1), 1);
        env::remove_var("TEST_PARSE_OR_PORT");
    }

    #[test]
    fn test_non_empty() {
        env::set_var("TEST_NON_EMPTY_BLANK", "   ");
        assert_eq!(non_empty("TEST_NON_EMPTY_BLANK"), None);
        env::set_var("TEST_NON_EMPTY_SET", " AC123 ");
        assert_eq!(non_empty("TEST_NON_EMPTY_SET"), Some("AC123".to_string()));
        env::remove_var("TEST_NON_EMPTY_BLANK");
        env::remove_var("TEST_NON_EMPTY_SET");
    }

    #[test]
    fn test_queue_config_mapping() {
        let config = Config {
            port: 8080,
            api_token: None,
            twilio_account_sid: Some("AC1".into()),
            twilio_auth_token: None,
            twilio_from_number: Some("+1555".into()),
            twilio_api_base: "https://api.twilio.com".into(),
            request_timeout_ms: 5000,
            sms_rate_limit: 0,
            sms_rate_window_ms: 2000,
            sms_max_retries: 5,
            sms_retry_delays_ms: vec![10, 20],
            sms_message_delay_ms: 50,
            queue_history_limit: 10,
        };

        let queue = config.queue_config();
        assert_eq!(queue.max_per_window, 1);
        assert_eq!(queue.window, Duration::from_secs(2));
        assert_eq!(queue.max_retries, 5);
        assert_eq!(queue.retry_schedule.delay_for(3), Duration::from_millis(20));
        assert_eq!(queue.message_delay, Duration::from_millis(50));
        assert!(!config.twilio_configured());
    }
}
