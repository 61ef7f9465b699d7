use std::{sync::Arc, time::Duration};

use checked_http::{CheckedClient, Context, Options, RateLimiter, Request, RetryConfig};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct Ip {
    origin: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let url = std::env::var("CHECKED_HTTP_DEMO_URL")
        .unwrap_or_else(|_| "https://httpbin.org/ip".to_owned());

    let client = CheckedClient::new();
    let limiter = Arc::new(RateLimiter::every(Duration::from_millis(500), 1));
    let options = Options::new()
        .with_retry(RetryConfig::new(2, [429, 502, 503, 504]))
        .with_rate_limiter(limiter);

    let request = client.client().get(&url).build()?;
    let context = Context::background().with_timeout(Duration::from_secs(10));
    let request = Request::new(request).with_context(context);

    let ip: Ip = client
        .execute_and_decode_with_options(request, &options)
        .await?;
    println!("{}", ip.origin);

    Ok(())
}
