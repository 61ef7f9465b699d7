use serde::de::DeserializeOwned;

use crate::CheckedHttpError;

/// Renders a response body for error messages: pretty JSON when the body
/// parses as JSON, otherwise the raw bytes as (lossy) UTF-8 text.
pub(crate) fn diagnostic_body(body: &[u8]) -> String {
    serde_json::from_slice::<serde_json::Value>(body)
        .ok()
        .and_then(|value| serde_json::to_string_pretty(&value).ok())
        .unwrap_or_else(|| String::from_utf8_lossy(body).into_owned())
}

pub(crate) fn decode_body<T: DeserializeOwned>(
    body: &[u8],
    diagnostic: String,
) -> Result<T, CheckedHttpError> {
    serde_json::from_slice(body).map_err(|source| CheckedHttpError::Decode {
        source,
        body: diagnostic,
    })
}
