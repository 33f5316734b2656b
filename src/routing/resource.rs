//! Renderable resources.
//!
//! A `Resource` is anything the server shell can hand a request to: the
//! router itself, or an access wrapper standing in front of it.

use async_trait::async_trait;
use axum::response::{IntoResponse, Response};

use crate::routing::request::RestRequest;
use crate::routing::router::ApiResource;

#[async_trait]
pub trait Resource: Send + Sync {
    /// Produce the response for `request`.
    ///
    /// `Err` is reserved for faults (handler errors, realm failures); the
    /// shell turns it into a 500. Not found and auth challenges are `Ok`.
    async fn render(&self, request: RestRequest) -> anyhow::Result<Response>;
}

#[async_trait]
impl Resource for ApiResource {
    async fn render(&self, mut request: RestRequest) -> anyhow::Result<Response> {
        let leaf = self.dispatch(&mut request)?;
        Ok(leaf.into_response())
    }
}
