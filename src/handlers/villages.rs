use axum::extract::{OriginalUri, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Extension;
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::error::ApiError;
use crate::extract::{Json, Path};
use crate::middleware::{require_admin, CurrentUser};
use crate::query::{build_query_args, page_headers, page_info, page_links, project, PageQuery};
use crate::routes::AppState;
use crate::store::villages::VillagePatch;
use crate::store::{self, VILLAGE_FIELDS};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateVillageBody {
    pub name: String,
    pub description: Option<String>,
    pub is_public: Option<bool>,
}

/// GET /api/v1/villages
pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
    OriginalUri(uri): OriginalUri,
) -> Result<Response, ApiError> {
    let (args, page) = build_query_args(&query, VILLAGE_FIELDS);

    let villages = store::villages::find_many(&state.db, &args).await?;
    let total = store::villages::count(&state.db).await?;

    let info = page_info(total, args.take, page);
    let links = page_links(page, info.total_page_count, &uri.to_string());
    let headers = page_headers(&info, &links);

    Ok((StatusCode::OK, headers, Json(json!({ "villages": villages }))).into_response())
}

/// GET /api/v1/villages/:villageId
pub async fn detail(
    State(state): State<AppState>,
    Path(village_id): Path<Uuid>,
    Query(query): Query<PageQuery>,
) -> Result<Json<Value>, ApiError> {
    let select = project(query.fields.as_deref(), VILLAGE_FIELDS);

    let village = store::villages::find_unique(&state.db, village_id, select)
        .await?
        .ok_or_else(|| ApiError::not_found("The village is not found."))?;

    Ok(Json(json!({ "village": village })))
}

/// POST /api/v1/villages/create - any member may found a village and joins
/// it in the same transaction
pub async fn create(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
    Json(body): Json<CreateVillageBody>,
) -> Result<Json<Value>, ApiError> {
    if body.name.trim().is_empty() {
        return Err(ApiError::validation("The village name is required."));
    }

    let village = store::villages::create(
        &state.db,
        current_user.id,
        body.name.trim(),
        body.description.as_deref(),
        body.is_public.unwrap_or(true),
    )
    .await?;

    Ok(Json(json!({ "village": village })))
}

/// PUT /api/v1/villages/edit/:villageId - members and administrators only
pub async fn edit(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
    Path(village_id): Path<Uuid>,
    Query(query): Query<PageQuery>,
    Json(patch): Json<VillagePatch>,
) -> Result<Json<Value>, ApiError> {
    if !current_user.is_admin
        && !store::villages::is_member(&state.db, village_id, current_user.id).await?
    {
        return Err(ApiError::forbidden("Not allowed to edit the village."));
    }

    let select = project(query.fields.as_deref(), VILLAGE_FIELDS);

    let village = store::villages::update(&state.db, village_id, &patch, select)
        .await?
        .ok_or_else(|| ApiError::not_found("The village is not found."))?;

    Ok(Json(json!({ "village": village })))
}

/// PUT /api/v1/villages/leave/:villageId - removes the caller's membership
pub async fn leave(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
    Path(village_id): Path<Uuid>,
) -> Result<Json<Value>, ApiError> {
    let removed = store::villages::leave(&state.db, village_id, current_user.id).await?;
    if removed == 0 {
        return Err(ApiError::not_found("The membership is not found."));
    }

    let village = store::villages::find_unique(&state.db, village_id, None)
        .await?
        .ok_or_else(|| ApiError::not_found("The village is not found."))?;

    Ok(Json(json!({ "village": village })))
}

/// DELETE /api/v1/villages/delete/:villageId - administrators only
pub async fn remove(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
    Path(village_id): Path<Uuid>,
    Query(query): Query<PageQuery>,
) -> Result<Json<Value>, ApiError> {
    require_admin(&current_user)?;

    let select = project(query.fields.as_deref(), VILLAGE_FIELDS);

    let village = store::villages::delete(&state.db, village_id, select)
        .await?
        .ok_or_else(|| ApiError::not_found("The village is not found."))?;

    Ok(Json(json!({ "village": village })))
}
