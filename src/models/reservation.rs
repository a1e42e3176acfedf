use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Reservation {
    pub id: i64,
    pub event_id: i64,
    pub user_id: Option<i64>,
    pub status: String,
    pub participant_name: String,
    pub participant_email: String,
    pub participant_phone: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateReservationRequest {
    pub event_id: i64,
    pub participant_name: String,
    pub participant_email: String,
    pub participant_phone: Option<String>,
    #[serde(default)]
    pub notes: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateReservationStatusRequest {
    pub status: String,
}
