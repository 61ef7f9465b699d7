use crate::context::Context;

/// A caller-built [`reqwest::Request`] paired with the [`Context`] that can
/// cancel it while it waits on a rate limiter.
///
/// The request itself is never modified. Retries send clones of it, so a
/// request with a streaming body can only be sent once.
#[derive(Debug)]
pub struct Request {
    inner: reqwest::Request,
    context: Context,
}

impl Request {
    /// Wraps a request with the background context.
    pub fn new(inner: reqwest::Request) -> Self {
        Self {
            inner,
            context: Context::background(),
        }
    }

    pub fn with_context(mut self, context: Context) -> Self {
        self.context = context;
        self
    }

    pub fn inner(&self) -> &reqwest::Request {
        &self.inner
    }

    pub fn context(&self) -> &Context {
        &self.context
    }

    pub fn into_inner(self) -> reqwest::Request {
        self.inner
    }

    pub(crate) fn into_parts(self) -> (reqwest::Request, Context) {
        (self.inner, self.context)
    }
}

impl From<reqwest::Request> for Request {
    fn from(inner: reqwest::Request) -> Self {
        Self::new(inner)
    }
}
