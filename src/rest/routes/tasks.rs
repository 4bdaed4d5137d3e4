// rest/routes/tasks.rs — Task CRUD endpoints.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;

use crate::rest::error::ApiError;
use crate::tasks::{schema, TaskCreate, TaskPatch, TaskPublic};
use crate::AppContext;

const DEFAULT_PAGE_LIMIT: u32 = 20;

fn default_limit() -> u32 {
    DEFAULT_PAGE_LIMIT
}

#[derive(Debug, Deserialize)]
pub struct ListTasksQuery {
    /// Rows to skip before the page starts.
    #[serde(default)]
    pub offset: u32,
    /// Page size (default: 20).
    #[serde(default = "default_limit")]
    pub limit: u32,
    /// Case-insensitive substring filter on the title. Empty matches all.
    #[serde(default)]
    pub title: String,
}

pub async fn list_tasks(
    State(ctx): State<Arc<AppContext>>,
    Query(query): Query<ListTasksQuery>,
) -> Result<Json<Vec<TaskPublic>>, ApiError> {
    schema::ensure_title(&query.title)?;
    let rows = ctx
        .tasks
        .list(query.offset as i64, query.limit as i64, &query.title)
        .await?;
    if rows.is_empty() {
        return Err(ApiError::empty_list());
    }
    Ok(Json(rows.into_iter().map(TaskPublic::from).collect()))
}

pub async fn get_task(
    State(ctx): State<Arc<AppContext>>,
    Path(task_id): Path<i64>,
) -> Result<Json<TaskPublic>, ApiError> {
    match ctx.tasks.get(task_id).await? {
        Some(row) => Ok(Json(row.into())),
        None => Err(ApiError::task_not_found()),
    }
}

pub async fn create_task(
    State(ctx): State<Arc<AppContext>>,
    Json(body): Json<TaskCreate>,
) -> Result<(StatusCode, Json<TaskPublic>), ApiError> {
    body.validate()?;
    let row = ctx.tasks.create(&body).await?;
    info!(id = row.id, "task created");
    Ok((StatusCode::CREATED, Json(row.into())))
}

pub async fn update_task(
    State(ctx): State<Arc<AppContext>>,
    Path(task_id): Path<i64>,
    Json(body): Json<TaskCreate>,
) -> Result<Json<TaskPublic>, ApiError> {
    body.validate()?;
    match ctx.tasks.replace(task_id, &body).await? {
        Some(row) => Ok(Json(row.into())),
        None => Err(ApiError::task_not_found()),
    }
}

pub async fn patch_task(
    State(ctx): State<Arc<AppContext>>,
    Path(task_id): Path<i64>,
    Json(body): Json<TaskPatch>,
) -> Result<Json<TaskPublic>, ApiError> {
    body.validate()?;
    match ctx.tasks.patch(task_id, &body).await? {
        Some(row) => Ok(Json(row.into())),
        None => Err(ApiError::task_not_found()),
    }
}

pub async fn delete_task(
    State(ctx): State<Arc<AppContext>>,
    Path(task_id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    if ctx.tasks.delete(task_id).await? {
        info!(id = task_id, "task deleted");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::task_not_found())
    }
}
