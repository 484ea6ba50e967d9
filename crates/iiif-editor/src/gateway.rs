//! Persistence gateway: route a mutation to the remote store or keep it
//! in session-local state.

use crate::transport::Transport;
use iiif_core::origin::{endpoint, is_local_url};
use serde::Serialize;
use serde_json::{Value, json};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MutationKind {
    Create,
    Update,
    Delete,
}

impl MutationKind {
    /// Endpoint name under the persistence base.
    pub fn endpoint(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update => "edit",
            Self::Delete => "delete",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Route {
    /// Manifest (and list, when known) live on a local origin.
    Remote,
    /// Keep the change in session state only.
    LocalOnly,
}

/// Where the mutation applies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanvasRef {
    pub canvas_id: String,
    pub canvas_index: usize,
    pub manifest_id: String,
    pub list_id: Option<String>,
}

/// A fully formed POST, ready for a transport.
#[derive(Debug, Clone, PartialEq)]
pub struct PersistRequest {
    pub kind: MutationKind,
    pub url: String,
    pub body: Value,
}

#[derive(Debug, Clone)]
pub struct PersistenceGateway {
    base: String,
    local_hosts: Vec<String>,
}

impl PersistenceGateway {
    pub fn new(base: impl Into<String>, local_hosts: Vec<String>) -> Self {
        Self {
            base: base.into(),
            local_hosts,
        }
    }

    /// Remote only when the manifest location is local and the list
    /// location, if the canvas has one, is local too.
    pub fn route(&self, manifest_url: Option<&str>, list_url: Option<&str>) -> Route {
        let local = |url: &str| is_local_url(url, &self.local_hosts);
        match (manifest_url, list_url) {
            (Some(m), Some(l)) if local(m) && local(l) => Route::Remote,
            (Some(m), None) if local(m) => Route::Remote,
            _ => Route::LocalOnly,
        }
    }

    pub fn request(&self, kind: MutationKind, annotation: &Value, target: &CanvasRef) -> PersistRequest {
        PersistRequest {
            kind,
            url: endpoint(&self.base, kind.endpoint()),
            body: json!({
                "annotation": annotation,
                "canvasId": target.canvas_id,
                "canvasIndex": target.canvas_index,
                "manifestId": target.manifest_id,
                "listId": target.list_id,
            }),
        }
    }

    /// Send once. Network failures and non-2xx answers both come back as
    /// `false`; no retry.
    pub async fn send<T: Transport>(&self, transport: &T, request: &PersistRequest) -> bool {
        match transport.post_json(&request.url, &request.body).await {
            Ok(response) if response.is_success() => {
                log::info!("{:?} persisted via {}", request.kind, request.url);
                true
            }
            Ok(response) => {
                log::warn!(
                    "{:?} rejected by {} with status {}: {}",
                    request.kind,
                    request.url,
                    response.status,
                    response.body
                );
                false
            }
            Err(e) => {
                log::warn!("{:?} to {} failed: {e}", request.kind, request.url);
                false
            }
        }
    }
}
