//! Resource documentation handler

use axum::Json;
use hoard_common::resource::{documentation, Treasure, User};
use serde_json::{json, Value};

/// Describe every exposed resource: fields, groups, filters, operations
pub async fn docs() -> Json<Value> {
    Json(json!({
        "version": hoard_common::VERSION,
        "resources": [
            documentation::<Treasure>(),
            documentation::<User>(),
        ],
    }))
}
