//! Demo API served by the `rest-server` binary.
//!
//! ```text
//! GET /version          → "0.1.0"
//! GET /examples         → ["abc", "xyz"]
//! GET /example/<key>/   → entry, or 404
//! GET /everything       → every entry keyed by name
//! ```

use std::sync::Arc;

use serde_json::{json, Value};

use crate::error::ConfigError;
use crate::routing::{ApiResource, Reply};

pub const API_VERSION: &str = "0.1.0";

pub const VERSION_PATH: &str = "^/version$";
pub const EXAMPLE_LIST_PATH: &str = "^/examples$";
pub const EXAMPLE_PATH: &str = "^/example/(?P<key>[^/]*)/?$";
pub const EVERYTHING_PATH: &str = "^/everything$";

/// Example entries keyed by name.
pub fn example_entries() -> Value {
    json!({
        "abc": {
            "entry_1": 123,
            "entry_2": "This is a test",
        },
        "xyz": {
            "entry_1": 456,
            "entry_2": "Another test",
            "entry_3": [1, 2, 3, 4, 5, 6],
        },
    })
}

/// Build the demo API.
pub fn demo_api() -> Result<Arc<ApiResource>, ConfigError> {
    ApiResource::builder()
        .get(VERSION_PATH, |_, _| Ok(Reply::from(API_VERSION)))
        .get(EXAMPLE_LIST_PATH, |_, _| {
            let keys: Vec<String> = example_entries()
                .as_object()
                .map(|entries| entries.keys().cloned().collect())
                .unwrap_or_default();
            Reply::json(&keys)
        })
        .get(EXAMPLE_PATH, |_, params| {
            let key = params.get("key").unwrap_or_default();
            Ok(match example_entries().get(key) {
                Some(entry) => Reply::Value(entry.clone()),
                None => Reply::not_found(format!("Example with key '{key}' not found")),
            })
        })
        .get(EVERYTHING_PATH, |_, _| Ok(Reply::Value(example_entries())))
        .build_shared()
}
