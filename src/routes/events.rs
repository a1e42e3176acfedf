use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};
use chrono::{Duration, Local, NaiveDate, NaiveDateTime};
use sqlx::MySqlPool;

use crate::AppState;
use crate::error::ApiError;
use crate::models::{CreateEventRequest, Event, EventListQuery, UpdateEventRequest};

const SELECT_EVENT: &str = "SELECT * FROM events";

pub fn events_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_events).post(create_event))
        .route("/weekly", get(weekly_events))
        .route(
            "/{id}",
            get(get_event).put(update_event).delete(delete_event),
        )
        .route("/calendar/month/{year}/{month}", get(events_by_month))
        .route("/calendar/day/{year}/{month}/{day}", get(events_by_day))
}

/// Events starting within the next seven days, soonest first.
async fn weekly_events(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let now = Local::now().naive_local();
    let until = now + Duration::days(7);

    let events = sqlx::query_as::<_, Event>(&format!(
        "{SELECT_EVENT} WHERE start_at >= ? AND start_at <= ? ORDER BY start_at ASC LIMIT 20"
    ))
    .bind(now)
    .bind(until)
    .fetch_all(&state.pool)
    .await?;

    let events = with_participants(&state.pool, events).await?;
    Ok(Json(events))
}

async fn list_events(
    State(state): State<AppState>,
    Query(query): Query<EventListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let limit = query.limit.unwrap_or(50).clamp(1, 100);

    let events =
        sqlx::query_as::<_, Event>(&format!("{SELECT_EVENT} ORDER BY start_at DESC LIMIT ?"))
            .bind(limit)
            .fetch_all(&state.pool)
            .await?;

    let events = with_participants(&state.pool, events).await?;
    Ok(Json(events))
}

async fn get_event(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let event = sqlx::query_as::<_, Event>(&format!("{SELECT_EVENT} WHERE id = ?"))
        .bind(id)
        .fetch_optional(&state.pool)
        .await?
        .ok_or_else(|| ApiError::NotFound("Event not found".into()))?;

    let mut events = with_participants(&state.pool, vec![event]).await?;
    Ok(Json(events.remove(0)))
}

async fn create_event(
    State(state): State<AppState>,
    Json(input): Json<CreateEventRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if input.title.trim().is_empty() {
        return Err(ApiError::BadRequest("Title is required".into()));
    }
    let start_at = parse_event_time(&input.start_at)?;
    let end_at = input
        .end_at
        .as_deref()
        .map(parse_event_time)
        .transpose()?;
    let description = if input.description.trim().is_empty() {
        None
    } else {
        Some(input.description.as_str())
    };

    let result = sqlx::query(
        r#"
        INSERT INTO events (title, place_id, place_name, location, start_at, end_at, category, capacity, spot_info, description)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&input.title)
    .bind(input.place_id)
    .bind(&input.place_name)
    .bind(&input.location)
    .bind(start_at)
    .bind(end_at)
    .bind(&input.category)
    .bind(input.capacity)
    .bind(&input.spot_info)
    .bind(description)
    .execute(&state.pool)
    .await?;

    let event = sqlx::query_as::<_, Event>(&format!("{SELECT_EVENT} WHERE id = ?"))
        .bind(result.last_insert_id() as i64)
        .fetch_one(&state.pool)
        .await?;

    Ok((StatusCode::CREATED, Json(event)))
}

async fn update_event(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(input): Json<UpdateEventRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let existing: Option<(i64,)> = sqlx::query_as("SELECT id FROM events WHERE id = ?")
        .bind(id)
        .fetch_optional(&state.pool)
        .await?;
    if existing.is_none() {
        return Err(ApiError::NotFound("Event not found".into()));
    }

    let start_at = input
        .start_at
        .as_deref()
        .map(parse_event_time)
        .transpose()?;
    let end_at = input.end_at.as_deref().map(parse_event_time).transpose()?;

    sqlx::query(
        r#"
        UPDATE events SET
            title = COALESCE(?, title),
            place_name = COALESCE(?, place_name),
            location = COALESCE(?, location),
            start_at = COALESCE(?, start_at),
            end_at = COALESCE(?, end_at),
            category = COALESCE(?, category),
            capacity = COALESCE(?, capacity),
            spot_info = COALESCE(?, spot_info),
            description = COALESCE(?, description)
        WHERE id = ?
        "#,
    )
    .bind(&input.title)
    .bind(&input.place_name)
    .bind(&input.location)
    .bind(start_at)
    .bind(end_at)
    .bind(&input.category)
    .bind(input.capacity)
    .bind(&input.spot_info)
    .bind(&input.description)
    .bind(id)
    .execute(&state.pool)
    .await?;

    Ok(Json(serde_json::json!({ "success": true })))
}

async fn delete_event(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let deleted = sqlx::query("DELETE FROM events WHERE id = ?")
        .bind(id)
        .execute(&state.pool)
        .await?;
    if deleted.rows_affected() == 0 {
        return Err(ApiError::NotFound("Event not found".into()));
    }
    Ok(Json(serde_json::json!({ "success": true })))
}

async fn events_by_month(
    State(state): State<AppState>,
    Path((year, month)): Path<(i32, u32)>,
) -> Result<impl IntoResponse, ApiError> {
    let (start, end) =
        month_range(year, month).ok_or_else(|| ApiError::BadRequest("Invalid year or month".into()))?;
    let events = events_in_range(&state.pool, start, end).await?;
    Ok(Json(events))
}

async fn events_by_day(
    State(state): State<AppState>,
    Path((year, month, day)): Path<(i32, u32, u32)>,
) -> Result<impl IntoResponse, ApiError> {
    let (start, end) =
        day_range(year, month, day).ok_or_else(|| ApiError::BadRequest("Invalid date".into()))?;
    let events = events_in_range(&state.pool, start, end).await?;
    Ok(Json(events))
}

async fn events_in_range(
    pool: &MySqlPool,
    start: NaiveDateTime,
    end: NaiveDateTime,
) -> Result<Vec<Event>, ApiError> {
    let events = sqlx::query_as::<_, Event>(&format!(
        "{SELECT_EVENT} WHERE start_at >= ? AND start_at <= ? ORDER BY start_at ASC"
    ))
    .bind(start)
    .bind(end)
    .fetch_all(pool)
    .await?;

    with_participants(pool, events).await
}

/// Attaches the confirmed reservation count to each event.
async fn with_participants(pool: &MySqlPool, events: Vec<Event>) -> Result<Vec<Event>, ApiError> {
    let mut enriched = Vec::with_capacity(events.len());
    for mut event in events {
        let (count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM reservations WHERE event_id = ? AND status = 'confirmed'",
        )
        .bind(event.id)
        .fetch_one(pool)
        .await?;
        event.current_participants = count;
        enriched.push(event);
    }
    Ok(enriched)
}

/// Accepts ISO local timestamps with or without seconds, the two shapes the
/// scheduling UI produces.
fn parse_event_time(value: &str) -> Result<NaiveDateTime, ApiError> {
    NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M"))
        .map_err(|_| ApiError::BadRequest(format!("Invalid datetime: {value}")))
}

fn month_range(year: i32, month: u32) -> Option<(NaiveDateTime, NaiveDateTime)> {
    let start = NaiveDate::from_ymd_opt(year, month, 1)?.and_hms_opt(0, 0, 0)?;
    let next_month = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)?
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)?
    };
    let end = next_month.and_hms_opt(0, 0, 0)? - Duration::seconds(1);
    Some((start, end))
}

fn day_range(year: i32, month: u32, day: u32) -> Option<(NaiveDateTime, NaiveDateTime)> {
    let start = NaiveDate::from_ymd_opt(year, month, day)?.and_hms_opt(0, 0, 0)?;
    let end = start + Duration::days(1) - Duration::seconds(1);
    Some((start, end))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_timestamps_with_and_without_seconds() {
        assert!(parse_event_time("2026-08-08T19:30:00").is_ok());
        assert!(parse_event_time("2026-08-08T19:30").is_ok());
        assert!(parse_event_time("August 8th").is_err());
    }

    #[test]
    fn month_range_covers_the_whole_month() {
        let (start, end) = month_range(2026, 12).unwrap();
        assert_eq!(start.to_string(), "2026-12-01 00:00:00");
        assert_eq!(end.to_string(), "2026-12-31 23:59:59");
    }

    #[test]
    fn invalid_dates_are_rejected() {
        assert!(month_range(2026, 13).is_none());
        assert!(day_range(2026, 2, 30).is_none());
        assert!(day_range(2026, 2, 28).is_some());
    }
}
