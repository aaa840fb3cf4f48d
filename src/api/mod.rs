use axum::Json;
use serde::Serialize;
use serde_json::{json, Value};

pub mod admin;
pub mod badges;
pub mod health;
pub mod profile;
pub mod referrals;
pub mod supporters;
pub mod trials;
pub mod votes;
pub mod wishes;

/// Success envelope shared by every endpoint.
pub fn ok<T: Serialize>(data: T) -> Json<Value> {
    Json(json!({ "success": true, "data": data }))
}
