//! `checked-http` runs caller-built `reqwest` requests and checks the outcome.
//!
//! Each call sends the request, validates the response status against an
//! expected set, optionally retries on specific statuses, optionally waits on
//! a shared [`RateLimiter`], and optionally decodes the JSON body:
//! - [`CheckedClient::execute`] / [`CheckedClient::execute_with_options`]
//! - [`CheckedClient::execute_and_decode`] / [`CheckedClient::execute_and_decode_with_options`]
//!
//! Errors carry the response body, pretty-printed when it is JSON, so a
//! failed call explains itself.

mod attempt;
mod client;
mod context;
mod decode;
mod error;
mod options;
mod rate_limit;
mod request;

pub use client::{
    execute, execute_and_decode, execute_and_decode_with_options, execute_with_options,
    CheckedClient,
};
pub use context::{CancelHandle, Context, ContextError};
pub use error::CheckedHttpError;
pub use options::{ClientOptions, Options, RetryConfig};
pub use rate_limit::{RateLimiter, WaitError};
pub use request::Request;

pub type Result<T> = std::result::Result<T, CheckedHttpError>;
