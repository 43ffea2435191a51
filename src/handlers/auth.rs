use axum::response::Json;
use axum::Extension;
use serde_json::{json, Value};

use crate::middleware::CurrentUser;

/// GET /api/v1/auth - echo the authorization context attached by the access
/// gate, so clients can confirm who the credential resolved to.
pub async fn current(Extension(current_user): Extension<CurrentUser>) -> Json<Value> {
    Json(json!({ "currentUser": current_user }))
}
