//!
//! src/routes.rs  Andrew Belles  Oct 12th, 2026
//!
//! Handlers for the redirect target and a liveness probe
//!

use std::collections::HashMap;

use axum::{Json, Router, extract::Query, routing::get};
use serde_json::{Value, json};
use tracing::info;

pub fn router() -> Router {
    Router::new()
        .route("/callback", get(callback))
        .route("/health", get(health))
}

/// Echoes the authorization code back to the browser. The code is never logged
pub async fn callback(Query(params): Query<HashMap<String, String>>) -> String {
    match params.get("code").filter(|c| !c.is_empty()) {
        Some(code) => {
            info!(received = true, "callback.code");
            format!("Authorization code received: {code}")
        }
        None => {
            info!(received = false, "callback.code");
            "No authorization code received".to_string()
        }
    }
}

pub async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION")
    }))
}
