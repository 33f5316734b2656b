//! Response rendering.
//!
//! # Responsibilities
//! - Render router leaves as JSON bodies
//! - Build error responses (404, 401 with challenges, 500)
//!
//! # Design Decisions
//! - Every body is JSON, errors use `{"error": {"code", "message"}}`
//! - A 401 carries one `WWW-Authenticate` header per offered scheme

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::routing::Leaf;

impl IntoResponse for Leaf {
    fn into_response(self) -> Response {
        match self {
            Leaf::Body(value) => (StatusCode::OK, Json(value)).into_response(),
            Leaf::NotFound(message) => json_error(StatusCode::NOT_FOUND, "not_found", &message),
        }
    }
}

/// JSON error body with the given status.
pub fn json_error(status: StatusCode, code: &str, message: &str) -> Response {
    let body = json!({
        "error": {
            "code": code,
            "message": message,
        }
    });
    (status, Json(body)).into_response()
}

/// 401 asking the client to authenticate with one of `challenges`.
pub fn unauthorized<I, S>(challenges: I) -> Response
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut response = json_error(
        StatusCode::UNAUTHORIZED,
        "unauthorized",
        "Authentication required",
    );

    for challenge in challenges {
        match HeaderValue::from_str(challenge.as_ref()) {
            Ok(value) => {
                response.headers_mut().append(header::WWW_AUTHENTICATE, value);
            }
            Err(_) => tracing::warn!(challenge = challenge.as_ref(), "Unencodable auth challenge"),
        }
    }

    response
}

/// Generic fault response; details stay in the logs.
pub fn internal_error() -> Response {
    json_error(
        StatusCode::INTERNAL_SERVER_ERROR,
        "internal_error",
        "Internal server error",
    )
}
