use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Scheduled gathering at a place. Start/end times are wall-clock local
/// times (no zone), matching what the scheduling UI sends and displays.
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: i64,
    pub title: String,
    pub place_id: Option<i64>,
    pub place_name: String,
    pub location: String,
    pub start_at: NaiveDateTime,
    pub end_at: Option<NaiveDateTime>,
    pub category: String,
    pub capacity: i32,
    pub spot_info: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    #[sqlx(default)]
    pub current_participants: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateEventRequest {
    pub title: String,
    pub place_id: Option<i64>,
    pub place_name: String,
    pub location: String,
    pub start_at: String,
    pub end_at: Option<String>,
    pub category: String,
    pub capacity: i32,
    pub spot_info: String,
    pub description: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateEventRequest {
    pub title: Option<String>,
    pub place_name: Option<String>,
    pub location: Option<String>,
    pub start_at: Option<String>,
    pub end_at: Option<String>,
    pub category: Option<String>,
    pub capacity: Option<i32>,
    pub spot_info: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct EventListQuery {
    pub limit: Option<i32>,
}
