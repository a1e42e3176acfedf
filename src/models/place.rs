use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Place {
    pub id: i64,
    pub name: String,
    pub tag: String,
    pub meta: String,
    pub location: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct PlaceListQuery {
    pub size: Option<i32>,
}
