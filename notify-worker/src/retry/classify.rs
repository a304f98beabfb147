//! Classify errors as transient (worth retrying) or permanent.
//!
//! Classification is text based: the error's display string is lowercased and
//! matched against a fixed catalogue of substrings. Upstream providers do not
//! share a structured error vocabulary, so the message is the common ground.

use std::fmt;

/// Timeout indicators.
const TIMEOUT_PATTERNS: &[&str] = &["timeout", "timed out", "etimedout", "esockettimedout"];

/// Connection-level network failures, including DNS lookups.
const NETWORK_PATTERNS: &[&str] = &[
    "econnreset",
    "econnrefused",
    "enotfound",
    "eai_again",
    "socket hang up",
    "connection reset",
    "connection refused",
    "dns error",
];

/// Upstream throttling phrasing.
const RATE_LIMIT_PATTERNS: &[&str] = &["rate limit", "too many requests"];

/// HTTP status codes treated as transient when they appear anywhere in the message.
const RETRYABLE_STATUS_CODES: &[u16] = &[429, 500, 502, 503, 504];

/// Returns true if the error looks transient.
///
/// Matching is a case-insensitive substring search, so "HTTP 503: Service
/// Unavailable" and "upstream returned 503" both classify as retryable while
/// "invalid api key" does not.
pub fn is_retryable(error: &dyn fmt::Display) -> bool {
    let message = error.to_string().to_lowercase();

    let matched = TIMEOUT_PATTERNS
        .iter()
        .chain(NETWORK_PATTERNS)
        .chain(RATE_LIMIT_PATTERNS)
        .any(|pattern| message.contains(pattern));

    matched
        || RETRYABLE_STATUS_CODES
            .iter()
            .any(|code| message.contains(&code.to_string()))
}

/// Structured counterpart of [`is_retryable`] for callers holding a status code.
///
/// Classifies exactly the codes the text catalogue matches.
pub fn is_retryable_status(status: u16) -> bool {
    RETRYABLE_STATUS_CODES.contains(&status)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn retryable(message: &str) -> bool {
        is_retryable(&message)
    }

    #[test]
    fn test_timeouts_are_retryable() {
        assert!(retryable("connect ETIMEDOUT 10.0.0.1:443"));
        assert!(retryable("Request Timeout"));
        assert!(retryable("operation timed out"));
    }

    #[test]
    fn test_network_codes_are_retryable() {
        assert!(retryable("read ECONNRESET"));
        assert!(retryable("connect ECONNREFUSED 127.0.0.1:80"));
        assert!(retryable("getaddrinfo ENOTFOUND api.twilio.com"));
        assert!(retryable("dns error: failed to lookup address information"));
    }

    #[test]
    fn test_rate_limit_phrasing_is_retryable() {
        assert!(retryable("Rate limit exceeded"));
        assert!(retryable("Too Many Requests"));
    }

    #[test]
    fn test_status_codes_anywhere_in_message() {
        assert!(retryable("HTTP 429"));
        assert!(retryable("upstream returned 502 bad gateway"));
        assert!(retryable("status=504"));
        assert!(retryable("500 Internal Server Error"));
    }

    #[test]
    fn test_permanent_errors_are_not_retryable() {
        assert!(!retryable("invalid api key"));
        assert!(!retryable("HTTP 401: Unauthorized"));
        assert!(!retryable("HTTP 400: The 'To' number is not a valid phone number"));
        assert!(!retryable(""));
    }

    #[test]
    fn test_is_retryable_status() {
        for code in [429, 500, 502, 503, 504] {
            assert!(is_retryable_status(code), "{code} should be retryable");
        }
        for code in [200, 400, 401, 403, 404, 501] {
            assert!(!is_retryable_status(code), "{code} should not be retryable");
        }
    }
}
