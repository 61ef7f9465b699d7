use std::sync::Arc;

use crate::RateLimiter;

const ENV_EXPECTED_STATUS: &str = "CHECKED_HTTP_EXPECTED_STATUS";
const ENV_RETRY_ATTEMPTS: &str = "CHECKED_HTTP_RETRY_ATTEMPTS";
const ENV_RETRY_STATUS: &str = "CHECKED_HTTP_RETRY_STATUS";

pub(crate) const DEFAULT_EXPECTED_STATUS: &[u16] = &[200];

/// Per-call behavior: accepted statuses, retries and rate limiting.
#[derive(Clone, Debug, Default)]
pub struct Options {
    /// Status codes treated as success. Empty means `[200]`.
    pub expected_status_codes: Vec<u16>,
    /// Status-based retry. `None` means a single try.
    pub retry: Option<RetryConfig>,
    /// Waited on before every try, retries included.
    pub rate_limiter: Option<Arc<RateLimiter>>,
}

/// Retries triggered by response status.
///
/// Transport, body read and decode failures are never retried.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct RetryConfig {
    /// Retries after the first try; total tries = 1 + attempts.
    /// Negative values count as 0.
    pub attempts: i32,
    /// Statuses that cause another try (except on the last one).
    /// Common picks: 429, 500, 502, 503, 504.
    pub retry_status_codes: Vec<u16>,
}

impl RetryConfig {
    pub fn new(attempts: i32, retry_status_codes: impl IntoIterator<Item = u16>) -> Self {
        Self {
            attempts,
            retry_status_codes: retry_status_codes.into_iter().collect(),
        }
    }

    /// Configured attempts with negatives clamped to 0.
    pub fn attempts(&self) -> u32 {
        u32::try_from(self.attempts).unwrap_or(0)
    }
}

impl Options {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn expect_status(mut self, codes: impl IntoIterator<Item = u16>) -> Self {
        self.expected_status_codes = codes.into_iter().collect();
        self
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = Some(retry);
        self
    }

    pub fn with_rate_limiter(mut self, rate_limiter: Arc<RateLimiter>) -> Self {
        self.rate_limiter = Some(rate_limiter);
        self
    }

    /// Reads options from the environment.
    ///
    /// Reads:
    /// - `CHECKED_HTTP_EXPECTED_STATUS` — comma-separated success codes
    /// - `CHECKED_HTTP_RETRY_ATTEMPTS` — retries after the first try
    /// - `CHECKED_HTTP_RETRY_STATUS` — comma-separated retry codes
    ///
    /// Unset variables keep their defaults; malformed ones are an error.
    pub fn from_env() -> std::result::Result<Self, String> {
        let mut options = Self::default();

        if let Some(raw) = read_env(ENV_EXPECTED_STATUS) {
            options.expected_status_codes = parse_status_list(ENV_EXPECTED_STATUS, &raw)?;
        }

        let attempts = read_env(ENV_RETRY_ATTEMPTS);
        let retry_codes = read_env(ENV_RETRY_STATUS);
        if attempts.is_some() || retry_codes.is_some() {
            let attempts = match attempts {
                Some(raw) => parse_attempts(ENV_RETRY_ATTEMPTS, &raw)?,
                None => 0,
            };
            let retry_status_codes = match retry_codes {
                Some(raw) => parse_status_list(ENV_RETRY_STATUS, &raw)?,
                None => Vec::new(),
            };
            options.retry = Some(RetryConfig {
                attempts,
                retry_status_codes,
            });
        }

        Ok(options)
    }

    pub(crate) fn expected(&self) -> &[u16] {
        if self.expected_status_codes.is_empty() {
            DEFAULT_EXPECTED_STATUS
        } else {
            &self.expected_status_codes
        }
    }

    pub(crate) fn retry_attempts(&self) -> u32 {
        self.retry.as_ref().map_or(0, RetryConfig::attempts)
    }

    pub(crate) fn retry_status_codes(&self) -> &[u16] {
        self.retry
            .as_ref()
            .map_or(&[][..], |retry| &retry.retry_status_codes)
    }
}

/// Configures the underlying `reqwest::Client`.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ClientOptions {
    /// Whole-request timeout in milliseconds.
    pub timeout_ms: Option<u64>,
    /// Connect timeout in milliseconds.
    pub connect_timeout_ms: Option<u64>,
    pub user_agent: Option<String>,
}

fn read_env(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .filter(|value| !value.trim().is_empty())
}

fn parse_status_list(name: &str, raw: &str) -> std::result::Result<Vec<u16>, String> {
    raw.split(',')
        .map(str::trim)
        .filter(|code| !code.is_empty())
        .map(|code| {
            code.parse::<u16>()
                .ok()
                .filter(|code| (100..=999).contains(code))
                .ok_or_else(|| format!("{name} contains invalid status code '{code}'"))
        })
        .collect()
}

fn parse_attempts(name: &str, raw: &str) -> std::result::Result<i32, String> {
    raw.trim()
        .parse::<i32>()
        .map_err(|err| format!("{name} must be an integer: {err}"))
}

#[cfg(test)]
mod tests {
    use super::{parse_attempts, parse_status_list, Options, RetryConfig};

    #[test]
    fn empty_expected_defaults_to_ok() {
        assert_eq!(Options::default().expected(), &[200]);
        assert_eq!(Options::new().expect_status([201, 204]).expected(), &[201, 204]);
    }

    #[test]
    fn negative_attempts_clamp_to_zero() {
        let options = Options::new().with_retry(RetryConfig::new(-3, [503]));
        assert_eq!(options.retry_attempts(), 0);
    }

    #[test]
    fn missing_retry_means_no_attempts_and_no_codes() {
        let options = Options::default();
        assert_eq!(options.retry_attempts(), 0);
        assert!(options.retry_status_codes().is_empty());
    }

    #[test]
    fn status_list_parses_and_trims() {
        let codes = parse_status_list("X", " 200, 201 ,,204").expect("must parse");
        assert_eq!(codes, vec![200, 201, 204]);
    }

    #[test]
    fn status_list_rejects_garbage() {
        let err = parse_status_list("X", "200,abc").expect_err("must fail");
        assert!(err.contains("X"));
        assert!(err.contains("abc"));

        assert!(parse_status_list("X", "42").is_err());
    }

    #[test]
    fn attempts_accept_negative_values() {
        assert_eq!(parse_attempts("X", " -1 "), Ok(-1));
        assert!(parse_attempts("X", "two").is_err());
    }
}
