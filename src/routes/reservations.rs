use axum::{
    Json, Router,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, patch, post},
};
use chrono::Utc;

use crate::AppState;
use crate::error::ApiError;
use crate::models::{CreateReservationRequest, Reservation, UpdateReservationStatusRequest};
use crate::routes::auth::extract_optional_user;

pub fn reservations_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(create_reservation))
        .route("/{id}", get(get_reservation).delete(delete_reservation))
        .route("/{id}/status", patch(update_reservation_status))
        .route("/event/{event_id}", get(list_by_event))
        .route("/user/{user_id}", get(list_by_user))
        .route("/email/{email}", get(list_by_email))
}

/// Books a seat. Capacity is checked and the row inserted in one
/// transaction so two racing requests cannot both take the last seat.
async fn create_reservation(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(input): Json<CreateReservationRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if input.participant_name.trim().is_empty() || input.participant_email.trim().is_empty() {
        return Err(ApiError::BadRequest(
            "Participant name and email are required".into(),
        ));
    }

    let user = extract_optional_user(&state.pool, &headers).await?;

    let mut tx = state.pool.begin().await?;

    let capacity: Option<(i32,)> = sqlx::query_as("SELECT capacity FROM events WHERE id = ?")
        .bind(input.event_id)
        .fetch_optional(&mut *tx)
        .await?;
    let (capacity,) = capacity.ok_or_else(|| ApiError::NotFound("Event not found".into()))?;

    let (confirmed,): (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM reservations WHERE event_id = ? AND status = 'confirmed'",
    )
    .bind(input.event_id)
    .fetch_one(&mut *tx)
    .await?;
    if confirmed >= capacity as i64 {
        return Err(ApiError::BadRequest("Event is full".into()));
    }

    let notes = if input.notes.trim().is_empty() {
        None
    } else {
        Some(input.notes.as_str())
    };
    let result = sqlx::query(
        r#"
        INSERT INTO reservations (event_id, user_id, participant_name, participant_email, participant_phone, notes)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(input.event_id)
    .bind(user.map(|u| u.id))
    .bind(&input.participant_name)
    .bind(&input.participant_email)
    .bind(&input.participant_phone)
    .bind(notes)
    .execute(&mut *tx)
    .await?;

    let reservation = sqlx::query_as::<_, Reservation>("SELECT * FROM reservations WHERE id = ?")
        .bind(result.last_insert_id() as i64)
        .fetch_one(&mut *tx)
        .await?;

    tx.commit().await?;

    Ok((StatusCode::CREATED, Json(reservation)))
}

async fn get_reservation(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let reservation = sqlx::query_as::<_, Reservation>("SELECT * FROM reservations WHERE id = ?")
        .bind(id)
        .fetch_optional(&state.pool)
        .await?
        .ok_or_else(|| ApiError::NotFound("Reservation not found".into()))?;
    Ok(Json(reservation))
}

async fn list_by_event(
    State(state): State<AppState>,
    Path(event_id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let reservations = sqlx::query_as::<_, Reservation>(
        "SELECT * FROM reservations WHERE event_id = ? ORDER BY created_at DESC",
    )
    .bind(event_id)
    .fetch_all(&state.pool)
    .await?;
    Ok(Json(reservations))
}

async fn list_by_user(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let reservations = sqlx::query_as::<_, Reservation>(
        "SELECT * FROM reservations WHERE user_id = ? ORDER BY created_at DESC",
    )
    .bind(user_id)
    .fetch_all(&state.pool)
    .await?;
    Ok(Json(reservations))
}

async fn list_by_email(
    State(state): State<AppState>,
    Path(email): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let reservations = sqlx::query_as::<_, Reservation>(
        "SELECT * FROM reservations WHERE participant_email = ? ORDER BY created_at DESC",
    )
    .bind(&email)
    .fetch_all(&state.pool)
    .await?;
    Ok(Json(reservations))
}

async fn update_reservation_status(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(input): Json<UpdateReservationStatusRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if !matches!(input.status.as_str(), "confirmed" | "cancelled") {
        return Err(ApiError::BadRequest("Invalid status".into()));
    }

    let existing: Option<(i64,)> = sqlx::query_as("SELECT id FROM reservations WHERE id = ?")
        .bind(id)
        .fetch_optional(&state.pool)
        .await?;
    if existing.is_none() {
        return Err(ApiError::NotFound("Reservation not found".into()));
    }

    sqlx::query("UPDATE reservations SET status = ?, updated_at = ? WHERE id = ?")
        .bind(&input.status)
        .bind(Utc::now())
        .bind(id)
        .execute(&state.pool)
        .await?;

    Ok(Json(serde_json::json!({ "success": true })))
}

async fn delete_reservation(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let deleted = sqlx::query("DELETE FROM reservations WHERE id = ?")
        .bind(id)
        .execute(&state.pool)
        .await?;
    if deleted.rows_affected() == 0 {
        return Err(ApiError::NotFound("Reservation not found".into()));
    }
    Ok(Json(serde_json::json!({ "success": true })))
}
