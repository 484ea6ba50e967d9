//! `fetch`-backed transport for the browser.

use gloo_net::http::{Request, Response};
use iiif_core::error::{Result, ViewerError};
use iiif_editor::transport::{HttpResponse, Transport};
use serde_json::Value;

#[derive(Debug, Clone, Copy, Default)]
pub struct GlooTransport;

impl Transport for GlooTransport {
    async fn get(&self, url: &str) -> Result<HttpResponse> {
        let response = Request::get(url).send().await.map_err(network)?;
        read(response).await
    }

    async fn post_json(&self, url: &str, body: &Value) -> Result<HttpResponse> {
        let response = Request::post(url)
            .header("Accept", "application/xml")
            .json(body)
            .map_err(network)?
            .send()
            .await
            .map_err(network)?;
        read(response).await
    }
}

async fn read(response: Response) -> Result<HttpResponse> {
    let status = response.status();
    // Error bodies are informational only.
    let body = response.text().await.unwrap_or_default();
    Ok(HttpResponse { status, body })
}

fn network(e: gloo_net::Error) -> ViewerError {
    ViewerError::Network(e.to_string())
}
