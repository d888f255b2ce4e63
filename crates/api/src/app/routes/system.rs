use axum::{http::StatusCode, response::Response};
use serde_json::json;

use crate::app::errors;

pub async fn health() -> Response {
    errors::json_ok(StatusCode::OK, json!({ "status": "ok" }))
}
