//! User endpoints. Thin pass-throughs: the access gate has already attached
//! the authorization context, and the pagination/projection layer bounds
//! every store call.

use axum::extract::{OriginalUri, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Extension;
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::error::ApiError;
use crate::extract::{Json, Path};
use crate::middleware::{require_admin, require_self_or_admin, CurrentUser};
use crate::query::{build_query_args, page_headers, page_info, page_links, project, PageQuery};
use crate::routes::AppState;
use crate::store::messages::MessageFilter;
use crate::store::users::UserPatch;
use crate::store::{self, MESSAGE_FIELDS, USER_FIELDS};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserBody {
    /// Provider token of the account to create, verified before any write
    pub token: String,
}

/// GET /api/v1/users
pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
    OriginalUri(uri): OriginalUri,
) -> Result<Response, ApiError> {
    let (args, page) = build_query_args(&query, USER_FIELDS);

    let users = store::users::find_many(&state.db, &args).await?;
    let total = store::users::count(&state.db).await?;

    let info = page_info(total, args.take, page);
    let links = page_links(page, info.total_page_count, &uri.to_string());
    let headers = page_headers(&info, &links);

    Ok((StatusCode::OK, headers, Json(json!({ "users": users }))).into_response())
}

/// GET /api/v1/users/:userId
pub async fn detail(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    Query(query): Query<PageQuery>,
) -> Result<Json<Value>, ApiError> {
    let select = project(query.fields.as_deref(), USER_FIELDS);

    let user = store::users::find_unique(&state.db, user_id, select)
        .await?
        .ok_or_else(|| ApiError::not_found("The user is not found."))?;

    Ok(Json(json!({ "user": user })))
}

/// GET /api/v1/users/:userId/messages
pub async fn messages(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    Query(query): Query<PageQuery>,
    OriginalUri(uri): OriginalUri,
) -> Result<Response, ApiError> {
    let (args, page) = build_query_args(&query, MESSAGE_FIELDS);
    let filter = MessageFilter {
        user_id: Some(user_id),
        village_id: None,
    };

    let messages = store::messages::find_many(&state.db, &args, filter).await?;
    let total = store::messages::count(&state.db, filter).await?;

    let info = page_info(total, args.take, page);
    let links = page_links(page, info.total_page_count, &uri.to_string());
    let headers = page_headers(&info, &links);

    Ok((StatusCode::OK, headers, Json(json!({ "messages": messages }))).into_response())
}

/// POST /api/v1/users/create - administrators register a new local account
/// for a provider-verified identity. The subject comes from verifying the
/// submitted token, never from a client-asserted identifier.
pub async fn create(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
    Json(body): Json<CreateUserBody>,
) -> Result<Json<Value>, ApiError> {
    require_admin(&current_user)?;

    let claim = state.identity.verify(&body.token).await?;

    let user = store::users::create(&state.db, &claim.subject_id, &claim.display_name).await?;
    Ok(Json(json!({ "user": user })))
}

/// PUT /api/v1/users/edit/:userId
pub async fn edit(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
    Path(user_id): Path<Uuid>,
    Query(query): Query<PageQuery>,
    Json(patch): Json<UserPatch>,
) -> Result<Json<Value>, ApiError> {
    require_self_or_admin(&current_user, user_id)?;

    let select = project(query.fields.as_deref(), USER_FIELDS);

    let user = store::users::update(&state.db, user_id, &patch, select)
        .await?
        .ok_or_else(|| ApiError::not_found("The user is not found."))?;

    Ok(Json(json!({ "user": user })))
}

/// DELETE /api/v1/users/delete/:userId
pub async fn remove(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
    Path(user_id): Path<Uuid>,
    Query(query): Query<PageQuery>,
) -> Result<Json<Value>, ApiError> {
    require_self_or_admin(&current_user, user_id)?;

    let select = project(query.fields.as_deref(), USER_FIELDS);

    let user = store::users::delete(&state.db, user_id, select)
        .await?
        .ok_or_else(|| ApiError::not_found("The user is not found."))?;

    Ok(Json(json!({ "user": user })))
}
