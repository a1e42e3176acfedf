use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A comment row as stored, with the author nickname joined in.
///
/// `path` encodes the chain of strict ancestors as slash-joined ids and is
/// fixed at creation time; `depth` always equals the number of path segments.
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: i64,
    pub content: String,
    pub author_id: i64,
    pub author_nickname: String,
    pub article_id: i64,
    pub parent_id: Option<i64>,
    pub path: String,
    pub depth: i32,
    pub is_deleted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One node of the nested comment tree returned to clients. The article id
/// and materialized path are storage concerns and are not re-exposed.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentNode {
    pub id: i64,
    pub content: String,
    pub author_id: i64,
    pub author_nickname: String,
    pub parent_id: Option<i64>,
    pub depth: i32,
    pub is_deleted: bool,
    pub created_at: DateTime<Utc>,
    pub children: Vec<CommentNode>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCommentRequest {
    pub content: String,
    pub article_id: i64,
    pub parent_id: Option<i64>,
}
