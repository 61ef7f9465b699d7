use serde::de::DeserializeOwned;

use crate::{
    context::Context,
    decode::{decode_body, diagnostic_body},
    options::DEFAULT_EXPECTED_STATUS,
    CheckedHttpError, RateLimiter, Result,
};

/// Classification of one send/receive cycle.
#[derive(Debug)]
pub(crate) enum Outcome<T> {
    /// Status matched the retry set; nothing else was looked at.
    Retry,
    /// Status was expected; holds the decoded body when decoding was asked for.
    Done(Option<T>),
}

/// Sends `request` once and classifies the response.
///
/// `retry_codes` is checked before `expected_codes`; an empty
/// `expected_codes` means `[200]`.
pub(crate) async fn attempt<T: DeserializeOwned>(
    http: &reqwest::Client,
    rate_limiter: Option<&RateLimiter>,
    request: reqwest::Request,
    context: &Context,
    decode: bool,
    expected_codes: &[u16],
    retry_codes: &[u16],
) -> Result<Outcome<T>> {
    let expected_codes = if expected_codes.is_empty() {
        DEFAULT_EXPECTED_STATUS
    } else {
        expected_codes
    };

    if let Some(rate_limiter) = rate_limiter {
        rate_limiter
            .wait(context)
            .await
            .map_err(CheckedHttpError::RateLimitWait)?;
    }

    // A done context wins over a ready response, so a cancelled request is never sent.
    let response = tokio::select! {
        biased;
        reason = context.done() => return Err(CheckedHttpError::Cancelled(reason)),
        response = http.execute(request) => response.map_err(CheckedHttpError::Transport)?,
    };
    let status = response.status().as_u16();
    let body = tokio::select! {
        biased;
        reason = context.done() => return Err(CheckedHttpError::Cancelled(reason)),
        body = response.bytes() => body.map_err(CheckedHttpError::BodyRead)?,
    };

    if retry_codes.contains(&status) {
        #[cfg(feature = "tracing")]
        tracing::debug!("status {} is retryable", status);
        return Ok(Outcome::Retry);
    }

    let diagnostic = diagnostic_body(&body);

    if !expected_codes.contains(&status) {
        return Err(CheckedHttpError::UnexpectedStatus {
            status,
            expected: expected_codes.to_vec(),
            body: diagnostic,
        });
    }

    if !decode {
        return Ok(Outcome::Done(None));
    }

    decode_body(&body, diagnostic).map(|value| Outcome::Done(Some(value)))
}
