pub mod comments;
pub mod db;
pub mod error;
pub mod models;
pub mod routes;

use sqlx::MySqlPool;

use comments::CommentService;

#[derive(Clone)]
pub struct AppState {
    pub pool: MySqlPool,
    pub comments: CommentService,
}
