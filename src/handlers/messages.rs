use axum::extract::{OriginalUri, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Extension;
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::error::ApiError;
use crate::extract::{Json, Path};
use crate::middleware::{require_self_or_admin, CurrentUser};
use crate::query::{build_query_args, page_headers, page_info, page_links, project, PageQuery};
use crate::routes::AppState;
use crate::store::messages::MessageFilter;
use crate::store::{self, MESSAGE_FIELDS};

/// Optional scope filters. A value that is not a UUID is dropped rather
/// than failing extraction, like the pagination parameters.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageListQuery {
    #[serde(default, deserialize_with = "lenient_uuid")]
    pub user_id: Option<Uuid>,
    #[serde(default, deserialize_with = "lenient_uuid")]
    pub village_id: Option<Uuid>,
}

fn lenient_uuid<'de, D>(deserializer: D) -> Result<Option<Uuid>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.and_then(|value| value.trim().parse().ok()))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateMessageBody {
    pub content: String,
    pub village_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct EditMessageBody {
    pub content: String,
}

/// GET /api/v1/messages
pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
    Query(scope): Query<MessageListQuery>,
    OriginalUri(uri): OriginalUri,
) -> Result<Response, ApiError> {
    let (args, page) = build_query_args(&query, MESSAGE_FIELDS);
    let filter = MessageFilter {
        user_id: scope.user_id,
        village_id: scope.village_id,
    };

    let messages = store::messages::find_many(&state.db, &args, filter).await?;
    let total = store::messages::count(&state.db, filter).await?;

    let info = page_info(total, args.take, page);
    let links = page_links(page, info.total_page_count, &uri.to_string());
    let headers = page_headers(&info, &links);

    Ok((StatusCode::OK, headers, Json(json!({ "messages": messages }))).into_response())
}

/// GET /api/v1/messages/:messageId
pub async fn detail(
    State(state): State<AppState>,
    Path(message_id): Path<Uuid>,
    Query(query): Query<PageQuery>,
) -> Result<Json<Value>, ApiError> {
    let select = project(query.fields.as_deref(), MESSAGE_FIELDS);

    let message = store::messages::find_unique(&state.db, message_id, select)
        .await?
        .ok_or_else(|| ApiError::not_found("The message is not found."))?;

    Ok(Json(json!({ "message": message })))
}

/// POST /api/v1/messages/create - the author is always the caller
pub async fn create(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
    Json(body): Json<CreateMessageBody>,
) -> Result<Json<Value>, ApiError> {
    if body.content.trim().is_empty() {
        return Err(ApiError::validation("The message content is required."));
    }

    let message =
        store::messages::create(&state.db, current_user.id, body.village_id, &body.content)
            .await?;

    Ok(Json(json!({ "message": message })))
}

/// PUT /api/v1/messages/edit/:messageId - author or administrator
pub async fn edit(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
    Path(message_id): Path<Uuid>,
    Query(query): Query<PageQuery>,
    Json(body): Json<EditMessageBody>,
) -> Result<Json<Value>, ApiError> {
    let owner = store::messages::owner(&state.db, message_id)
        .await?
        .ok_or_else(|| ApiError::not_found("The message is not found."))?;
    require_self_or_admin(&current_user, owner)?;

    if body.content.trim().is_empty() {
        return Err(ApiError::validation("The message content is required."));
    }

    let select = project(query.fields.as_deref(), MESSAGE_FIELDS);

    let message = store::messages::update(&state.db, message_id, &body.content, select)
        .await?
        .ok_or_else(|| ApiError::not_found("The message is not found."))?;

    Ok(Json(json!({ "message": message })))
}

/// DELETE /api/v1/messages/delete/:messageId - author or administrator
pub async fn remove(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
    Path(message_id): Path<Uuid>,
    Query(query): Query<PageQuery>,
) -> Result<Json<Value>, ApiError> {
    let owner = store::messages::owner(&state.db, message_id)
        .await?
        .ok_or_else(|| ApiError::not_found("The message is not found."))?;
    require_self_or_admin(&current_user, owner)?;

    let select = project(query.fields.as_deref(), MESSAGE_FIELDS);

    let message = store::messages::delete(&state.db, message_id, select)
        .await?
        .ok_or_else(|| ApiError::not_found("The message is not found."))?;

    Ok(Json(json!({ "message": message })))
}
