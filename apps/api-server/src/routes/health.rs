use crate::ctx::Ctx;
use axum::{routing::get, Json, Router};
use serde_json::{json, Value};

pub fn get_routes() -> Router<Ctx> {
    Router::new().route("/health", get(health))
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
