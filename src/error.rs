use crate::{context::ContextError, rate_limit::WaitError};

/// Error type returned by this crate.
#[derive(Debug, thiserror::Error)]
pub enum CheckedHttpError {
    /// The call could not be carried out with the inputs it was given.
    #[error("invalid state: {0}")]
    InvalidState(String),
    /// The rate limiter wait was aborted before the request was sent.
    #[error("rate limiter wait failed: {0}")]
    RateLimitWait(#[source] WaitError),
    /// The request context was cancelled or expired while sending or reading.
    #[error("request aborted: {0}")]
    Cancelled(#[source] ContextError),
    /// Sending the request failed (DNS, connect, timeout, ...). Never retried.
    #[error("transport error: {0}")]
    Transport(#[source] reqwest::Error),
    /// The response body stream failed while being read.
    #[error("failed to read response body: {0}")]
    BodyRead(#[source] reqwest::Error),
    /// Response status was outside the expected set.
    #[error("expected status code(s) {expected:?} but got {status}. body: {body}")]
    UnexpectedStatus {
        status: u16,
        expected: Vec<u16>,
        /// Diagnostic body: pretty JSON when parseable, raw text otherwise.
        body: String,
    },
    /// Response body could not be decoded into the requested type.
    #[error("failed to decode response body: {source}. body: {body}")]
    Decode {
        #[source]
        source: serde_json::Error,
        body: String,
    },
    /// Every configured retry was used and the final try failed.
    #[error("retries exhausted after {attempts} attempt(s): {source}")]
    RetriesExhausted {
        /// Retries configured after the first try.
        attempts: u32,
        #[source]
        source: Box<CheckedHttpError>,
    },
}

impl CheckedHttpError {
    /// Returns the innermost error, looking through [`CheckedHttpError::RetriesExhausted`].
    pub fn root_cause(&self) -> &CheckedHttpError {
        match self {
            Self::RetriesExhausted { source, .. } => source.root_cause(),
            other => other,
        }
    }

    /// Status code of the final response, if the call failed on status.
    pub fn status(&self) -> Option<u16> {
        match self.root_cause() {
            Self::UnexpectedStatus { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Diagnostic body of the final response, if one was read.
    pub fn body(&self) -> Option<&str> {
        match self.root_cause() {
            Self::UnexpectedStatus { body, .. } | Self::Decode { body, .. } => Some(body),
            _ => None,
        }
    }
}
