use axum::{
    Json, Router,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{delete, get, post},
};

use crate::AppState;
use crate::error::ApiError;
use crate::models::CreateCommentRequest;
use crate::routes::auth::extract_current_user;

pub fn comments_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(create_comment))
        .route("/article/{article_id}", get(list_article_comments))
        .route("/{id}", delete(delete_comment))
}

async fn create_comment(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(input): Json<CreateCommentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let current_user = extract_current_user(&state.pool, &headers).await?;
    let comment = state.comments.create_comment(current_user.id, input).await?;
    Ok((StatusCode::CREATED, Json(comment)))
}

/// The whole thread of an article as a nested forest; no auth required.
async fn list_article_comments(
    State(state): State<AppState>,
    Path(article_id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let tree = state.comments.comment_tree(article_id).await?;
    Ok(Json(tree))
}

async fn delete_comment(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let current_user = extract_current_user(&state.pool, &headers).await?;
    state.comments.delete_comment(id, current_user.id).await?;
    Ok(StatusCode::NO_CONTENT)
}
