//! HTTP seam. The engine never talks to the network directly; hosts
//! provide a `Transport` (the browser bridge wraps `fetch`, tests use an
//! in-memory mock).

use iiif_core::error::{Result, ViewerError};
use serde_json::Value;

/// Status and body of a completed request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn ok(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Single-threaded async HTTP client.
///
/// `Err` means the request never produced a response (`ViewerError::Network`);
/// non-2xx statuses come back as `Ok` and are interpreted by the caller.
#[allow(async_fn_in_trait)]
pub trait Transport {
    async fn get(&self, url: &str) -> Result<HttpResponse>;

    /// POST a JSON body with `Accept: application/xml`.
    async fn post_json(&self, url: &str, body: &Value) -> Result<HttpResponse>;
}

/// GET and decode JSON; non-2xx becomes `RemoteRejection`.
pub async fn get_json<T: Transport>(transport: &T, url: &str) -> Result<Value> {
    let response = transport.get(url).await?;
    if !response.is_success() {
        return Err(ViewerError::RemoteRejection {
            status: response.status,
            body: response.body,
        });
    }
    Ok(serde_json::from_str(&response.body)?)
}
