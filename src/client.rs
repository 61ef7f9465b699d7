use std::fmt;
use std::sync::OnceLock;
use std::time::Duration;

use serde::de::{DeserializeOwned, IgnoredAny};

use crate::{
    attempt::{attempt, Outcome},
    CheckedHttpError, ClientOptions, Options, Request, Result,
};

#[derive(Clone, Default)]
/// Runs caller-built requests with status validation, status-based retries,
/// optional rate limiting and optional JSON decoding.
///
/// Every call is independent; share one client (and one
/// [`RateLimiter`](crate::RateLimiter)) across tasks freely.
pub struct CheckedClient {
    http: reqwest::Client,
}

impl fmt::Debug for CheckedClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CheckedClient").finish_non_exhaustive()
    }
}

impl CheckedClient {
    /// Creates a client on a default `reqwest::Client`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses the given `reqwest::Client` for every request.
    ///
    /// Configure timeouts, proxies and TLS on the client before passing it.
    pub fn with_client(http: reqwest::Client) -> Self {
        Self { http }
    }

    /// Builds the underlying `reqwest::Client` from [`ClientOptions`].
    pub fn from_options(options: ClientOptions) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout_ms) = options.timeout_ms {
            builder = builder.timeout(Duration::from_millis(timeout_ms));
        }
        if let Some(connect_timeout_ms) = options.connect_timeout_ms {
            builder = builder.connect_timeout(Duration::from_millis(connect_timeout_ms));
        }
        if let Some(user_agent) = options.user_agent {
            builder = builder.user_agent(user_agent);
        }
        let http = builder.build().map_err(CheckedHttpError::Transport)?;
        Ok(Self { http })
    }

    /// The underlying `reqwest::Client`, e.g. for building requests.
    pub fn client(&self) -> &reqwest::Client {
        &self.http
    }

    /// Sends the request once and expects `200 OK`.
    pub async fn execute(&self, request: impl Into<Request>) -> Result<()> {
        self.execute_with_options(request, &Options::default()).await
    }

    /// Sends the request, validating and retrying per `options`.
    pub async fn execute_with_options(
        &self,
        request: impl Into<Request>,
        options: &Options,
    ) -> Result<()> {
        self.run::<IgnoredAny>(request.into(), false, options)
            .await
            .map(|_| ())
    }

    /// Sends the request once, expects `200 OK` and decodes the JSON body.
    pub async fn execute_and_decode<T: DeserializeOwned>(
        &self,
        request: impl Into<Request>,
    ) -> Result<T> {
        self.execute_and_decode_with_options(request, &Options::default())
            .await
    }

    /// Like [`CheckedClient::execute_with_options`], then decodes the JSON
    /// body of the successful response.
    pub async fn execute_and_decode_with_options<T: DeserializeOwned>(
        &self,
        request: impl Into<Request>,
        options: &Options,
    ) -> Result<T> {
        self.run(request.into(), true, options)
            .await?
            .ok_or_else(|| {
                CheckedHttpError::InvalidState("successful response was not decoded".to_owned())
            })
    }

    /// Decodes into a caller-owned destination. `dest` is only written on success.
    pub async fn execute_and_decode_into<T: DeserializeOwned>(
        &self,
        request: impl Into<Request>,
        dest: &mut T,
    ) -> Result<()> {
        self.execute_and_decode_into_with_options(request, dest, &Options::default())
            .await
    }

    pub async fn execute_and_decode_into_with_options<T: DeserializeOwned>(
        &self,
        request: impl Into<Request>,
        dest: &mut T,
        options: &Options,
    ) -> Result<()> {
        *dest = self
            .execute_and_decode_with_options(request, options)
            .await?;
        Ok(())
    }

    /// The attempt loop: `1 + attempts` tries at most, retry codes disabled
    /// on the last one so it ends in success or a body-bearing error.
    async fn run<T: DeserializeOwned>(
        &self,
        request: Request,
        decode: bool,
        options: &Options,
    ) -> Result<Option<T>> {
        let attempts = options.retry_attempts();
        let total_tries = attempts.saturating_add(1);
        let (request, context) = request.into_parts();
        let mut original = Some(request);

        for try_number in 1..=total_tries {
            let (request, last_try) = next_request(&mut original, try_number == total_tries)?;
            let retry_codes = if last_try {
                &[][..]
            } else {
                options.retry_status_codes()
            };

            let outcome = attempt::<T>(
                &self.http,
                options.rate_limiter.as_deref(),
                request,
                &context,
                decode,
                options.expected(),
                retry_codes,
            )
            .await;

            match outcome {
                Ok(Outcome::Done(value)) => return Ok(value),
                Ok(Outcome::Retry) => {
                    #[cfg(feature = "tracing")]
                    tracing::debug!("retrying request, try {} of {}", try_number + 1, total_tries);
                }
                Err(err) if attempts > 0 => {
                    #[cfg(feature = "tracing")]
                    tracing::debug!("request failed after {} retries: {}", attempts, err);
                    return Err(CheckedHttpError::RetriesExhausted {
                        attempts,
                        source: Box::new(err),
                    });
                }
                Err(err) => return Err(err),
            }
        }

        Err(CheckedHttpError::InvalidState(
            "attempt loop ended without a final outcome".to_owned(),
        ))
    }
}

/// Non-final tries send a clone; the last try consumes the original.
///
/// A request whose body cannot be cloned is sent as is, and that try becomes
/// the last one. The returned flag reports whether this is the last try.
fn next_request(
    original: &mut Option<reqwest::Request>,
    last_try: bool,
) -> Result<(reqwest::Request, bool)> {
    if !last_try {
        if let Some(clone) = original.as_ref().and_then(reqwest::Request::try_clone) {
            return Ok((clone, false));
        }
    }
    original
        .take()
        .map(|request| (request, true))
        .ok_or_else(|| CheckedHttpError::InvalidState("request was already sent".to_owned()))
}

fn shared_client() -> &'static CheckedClient {
    static SHARED: OnceLock<CheckedClient> = OnceLock::new();
    SHARED.get_or_init(CheckedClient::new)
}

/// [`CheckedClient::execute`] on a shared default client.
///
/// The shared client lives for the whole process and its connection pool is
/// bound to the tokio runtime that first used it. Code that runs several
/// runtimes (one per `#[tokio::test]`, for instance) can hit "dispatch task is
/// gone" when a pooled connection is reused; use a [`CheckedClient`] per
/// runtime there.
pub async fn execute(request: impl Into<Request>) -> Result<()> {
    shared_client().execute(request).await
}

/// [`CheckedClient::execute_with_options`] on a shared default client.
///
/// See [`execute`] for the shared client's runtime caveat.
pub async fn execute_with_options(request: impl Into<Request>, options: &Options) -> Result<()> {
    shared_client().execute_with_options(request, options).await
}

/// [`CheckedClient::execute_and_decode`] on a shared default client.
///
/// See [`execute`] for the shared client's runtime caveat.
pub async fn execute_and_decode<T: DeserializeOwned>(request: impl Into<Request>) -> Result<T> {
    shared_client().execute_and_decode(request).await
}

/// [`CheckedClient::execute_and_decode_with_options`] on a shared default client.
///
/// See [`execute`] for the shared client's runtime caveat.
pub async fn execute_and_decode_with_options<T: DeserializeOwned>(
    request: impl Into<Request>,
    options: &Options,
) -> Result<T> {
    shared_client()
        .execute_and_decode_with_options(request, options)
        .await
}
