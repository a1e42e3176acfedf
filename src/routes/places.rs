use axum::{
    Json, Router,
    extract::{Query, State},
    response::IntoResponse,
    routing::get,
};

use crate::AppState;
use crate::error::ApiError;
use crate::models::{Place, PlaceListQuery};

pub fn places_routes() -> Router<AppState> {
    Router::new().route("/", get(list_places))
}

/// Curated spots, newest first. The landing page shows a grid of nine.
async fn list_places(
    State(state): State<AppState>,
    Query(query): Query<PlaceListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    if let Some(size) = query.size {
        if size <= 0 {
            return Err(ApiError::BadRequest("size must be at least 1".into()));
        }
    }
    let limit = query.size.unwrap_or(9).min(50);

    let places = sqlx::query_as::<_, Place>(
        "SELECT * FROM places ORDER BY created_at DESC LIMIT ?",
    )
    .bind(limit)
    .fetch_all(&state.pool)
    .await?;

    Ok(Json(places))
}
