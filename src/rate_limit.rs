//! Token bucket rate limiter shared across calls.
//!
//! One bucket per limiter; share it with `Arc` to cap outgoing request rate
//! across every call that carries it in its [`Options`](crate::Options).

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::time::Instant;

use crate::context::{Context, ContextError};

/// Why [`RateLimiter::wait`] gave up.
#[derive(Clone, Copy, Debug, Eq, PartialEq, thiserror::Error)]
pub enum WaitError {
    #[error(transparent)]
    Context(#[from] ContextError),
    #[error("waiting {0:?} for a token would exceed the context deadline")]
    WouldExceedDeadline(Duration),
    #[error("rate limiter burst is zero, no token can ever be granted")]
    BurstExceeded,
}

#[derive(Debug)]
struct Bucket {
    /// May go negative while waiters hold reservations.
    tokens: f64,
    last_update: Instant,
}

/// Token bucket limiter, safe for concurrent use.
///
/// The bucket starts full and refills at `tokens_per_second` up to `burst`.
#[derive(Debug)]
pub struct RateLimiter {
    bucket: Mutex<Bucket>,
    tokens_per_second: f64,
    burst: u32,
}

impl RateLimiter {
    pub fn new(tokens_per_second: f64, burst: u32) -> Self {
        Self {
            bucket: Mutex::new(Bucket {
                tokens: f64::from(burst),
                last_update: Instant::now(),
            }),
            tokens_per_second: tokens_per_second.max(0.0),
            burst,
        }
    }

    /// One token every `interval`.
    pub fn every(interval: Duration, burst: u32) -> Self {
        let tokens_per_second = if interval.is_zero() {
            f64::INFINITY
        } else {
            1.0 / interval.as_secs_f64()
        };
        Self::new(tokens_per_second, burst)
    }

    pub fn burst(&self) -> u32 {
        self.burst
    }

    /// Tokens currently in the bucket; negative while waiters are queued.
    pub fn available_tokens(&self) -> f64 {
        let mut bucket = self.lock_bucket();
        self.refill(&mut bucket, Instant::now());
        bucket.tokens
    }

    /// Takes a token if one is available right now.
    pub fn try_acquire(&self) -> bool {
        if self.tokens_per_second.is_infinite() {
            return true;
        }
        let mut bucket = self.lock_bucket();
        self.refill(&mut bucket, Instant::now());
        if bucket.tokens >= 1.0 {
            bucket.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    /// Waits until a token is available or `context` is done.
    ///
    /// An unlimited rate grants every wait, whatever the burst.
    /// A done context fails before a token is reserved. If the wait would
    /// outlast the context deadline it fails immediately instead of sleeping.
    pub async fn wait(&self, context: &Context) -> Result<(), WaitError> {
        if let Some(reason) = context.err() {
            return Err(reason.into());
        }
        if self.tokens_per_second.is_infinite() {
            return Ok(());
        }
        if self.burst == 0 {
            return Err(WaitError::BurstExceeded);
        }

        let delay = self.reserve(context.deadline())?;
        if delay.is_zero() {
            return Ok(());
        }

        #[cfg(feature = "tracing")]
        tracing::trace!("rate limiter waiting {:?} for a token", delay);

        tokio::select! {
            _ = tokio::time::sleep(delay) => Ok(()),
            reason = context.done() => {
                self.release();
                Err(reason.into())
            }
        }
    }

    /// Takes one token, returning how long the caller must wait for it.
    fn reserve(&self, deadline: Option<Instant>) -> Result<Duration, WaitError> {
        let now = Instant::now();
        let mut bucket = self.lock_bucket();
        self.refill(&mut bucket, now);

        let remaining = bucket.tokens - 1.0;
        let delay = if remaining >= 0.0 {
            Duration::ZERO
        } else {
            Duration::try_from_secs_f64(-remaining / self.tokens_per_second)
                .unwrap_or(Duration::MAX)
        };

        if let Some(deadline) = deadline {
            let ready = now.checked_add(delay);
            if ready.map_or(true, |ready| ready > deadline) {
                return Err(WaitError::WouldExceedDeadline(delay));
            }
        }

        bucket.tokens = remaining;
        Ok(delay)
    }

    fn release(&self) {
        let mut bucket = self.lock_bucket();
        bucket.tokens = (bucket.tokens + 1.0).min(f64::from(self.burst));
    }

    fn refill(&self, bucket: &mut Bucket, now: Instant) {
        let elapsed = now.saturating_duration_since(bucket.last_update).as_secs_f64();
        let refilled = bucket.tokens + elapsed * self.tokens_per_second;
        bucket.tokens = if refilled.is_nan() {
            bucket.tokens
        } else {
            refilled.min(f64::from(self.burst))
        };
        bucket.last_update = now;
    }

    // A poisoned bucket only means another waiter panicked mid-update.
    fn lock_bucket(&self) -> MutexGuard<'_, Bucket> {
        self.bucket.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
