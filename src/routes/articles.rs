use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::get,
};
use chrono::Utc;

use crate::AppState;
use crate::comments::store as comment_store;
use crate::error::ApiError;
use crate::models::{
    Article, ArticleListItem, ArticleListQuery, ArticleListResponse, CreateArticleRequest,
    UpdateArticleRequest,
};
use crate::routes::auth::extract_current_user;

const MAX_TITLE_LENGTH: usize = 120;
const MAX_CONTENT_LENGTH: usize = 5000;

const SELECT_ARTICLE: &str = r#"
    SELECT a.id, a.title, a.content, a.author_id, u.nickname AS author_nickname,
           a.view_count, a.created_at, a.updated_at
    FROM articles a
    JOIN users u ON u.id = a.author_id
"#;

const SELECT_LIST_ITEM: &str = r#"
    SELECT a.id, a.title, u.nickname AS author_nickname, a.view_count,
           COUNT(c.id) AS comment_count, a.created_at
    FROM articles a
    JOIN users u ON u.id = a.author_id
    LEFT JOIN comments c ON c.article_id = a.id
"#;

pub fn articles_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_articles).post(create_article))
        .route(
            "/{id}",
            get(get_article).put(update_article).delete(delete_article),
        )
}

/// Cursor-based listing for infinite scroll: newest first, keyed on id.
async fn list_articles(
    State(state): State<AppState>,
    Query(query): Query<ArticleListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    if let Some(last_id) = query.last_id {
        if last_id <= 0 {
            return Err(ApiError::BadRequest("lastId must be positive".into()));
        }
    }
    let size = query.size.unwrap_or(20);
    if !(1..=50).contains(&size) {
        return Err(ApiError::BadRequest(
            "size must be between 1 and 50".into(),
        ));
    }

    // Fetch one extra row to know whether another page exists.
    let mut articles: Vec<ArticleListItem> = if let Some(last_id) = query.last_id {
        sqlx::query_as(&format!(
            "{SELECT_LIST_ITEM} WHERE a.id < ? GROUP BY a.id, a.title, u.nickname, a.view_count, a.created_at ORDER BY a.id DESC LIMIT ?"
        ))
        .bind(last_id)
        .bind(size + 1)
        .fetch_all(&state.pool)
        .await?
    } else {
        sqlx::query_as(&format!(
            "{SELECT_LIST_ITEM} GROUP BY a.id, a.title, u.nickname, a.view_count, a.created_at ORDER BY a.id DESC LIMIT ?"
        ))
        .bind(size + 1)
        .fetch_all(&state.pool)
        .await?
    };

    let has_next = articles.len() as i32 > size;
    if has_next {
        articles.truncate(size as usize);
    }
    let next_cursor = if has_next {
        articles.last().map(|a| a.id)
    } else {
        None
    };

    Ok(Json(ArticleListResponse {
        articles,
        has_next,
        next_cursor,
    }))
}

async fn get_article(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let updated = sqlx::query("UPDATE articles SET view_count = view_count + 1 WHERE id = ?")
        .bind(id)
        .execute(&state.pool)
        .await?;
    if updated.rows_affected() == 0 {
        return Err(ApiError::NotFound("Article not found".into()));
    }

    let article = sqlx::query_as::<_, Article>(&format!("{SELECT_ARTICLE} WHERE a.id = ?"))
        .bind(id)
        .fetch_one(&state.pool)
        .await?;

    Ok(Json(article))
}

async fn create_article(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(input): Json<CreateArticleRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let current_user = extract_current_user(&state.pool, &headers).await?;
    validate_article(&input.title, &input.content)?;

    let now = Utc::now();
    let result = sqlx::query(
        "INSERT INTO articles (title, content, author_id, created_at, updated_at) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(&input.title)
    .bind(&input.content)
    .bind(current_user.id)
    .bind(now)
    .bind(now)
    .execute(&state.pool)
    .await?;

    let article = sqlx::query_as::<_, Article>(&format!("{SELECT_ARTICLE} WHERE a.id = ?"))
        .bind(result.last_insert_id() as i64)
        .fetch_one(&state.pool)
        .await?;

    Ok((StatusCode::CREATED, Json(article)))
}

async fn update_article(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Json(input): Json<UpdateArticleRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let current_user = extract_current_user(&state.pool, &headers).await?;
    validate_article(&input.title, &input.content)?;

    let author_id: Option<(i64,)> = sqlx::query_as("SELECT author_id FROM articles WHERE id = ?")
        .bind(id)
        .fetch_optional(&state.pool)
        .await?;
    let (author_id,) = author_id.ok_or_else(|| ApiError::NotFound("Article not found".into()))?;
    if author_id != current_user.id {
        return Err(ApiError::Forbidden(
            "Not authorized to update this article".into(),
        ));
    }

    sqlx::query("UPDATE articles SET title = ?, content = ?, updated_at = ? WHERE id = ?")
        .bind(&input.title)
        .bind(&input.content)
        .bind(Utc::now())
        .bind(id)
        .execute(&state.pool)
        .await?;

    let article = sqlx::query_as::<_, Article>(&format!("{SELECT_ARTICLE} WHERE a.id = ?"))
        .bind(id)
        .fetch_one(&state.pool)
        .await?;

    Ok(Json(article))
}

/// Removes the article and its entire comment thread in one transaction;
/// comments go first so no row ever points at a missing article.
async fn delete_article(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let current_user = extract_current_user(&state.pool, &headers).await?;

    let author_id: Option<(i64,)> = sqlx::query_as("SELECT author_id FROM articles WHERE id = ?")
        .bind(id)
        .fetch_optional(&state.pool)
        .await?;
    let (author_id,) = author_id.ok_or_else(|| ApiError::NotFound("Article not found".into()))?;
    if author_id != current_user.id {
        return Err(ApiError::Forbidden(
            "Not authorized to delete this article".into(),
        ));
    }

    let mut tx = state.pool.begin().await?;
    comment_store::delete_by_article(&mut tx, id).await?;
    sqlx::query("DELETE FROM articles WHERE id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;

    Ok(StatusCode::NO_CONTENT)
}

fn validate_article(title: &str, content: &str) -> Result<(), ApiError> {
    if title.trim().is_empty() || content.trim().is_empty() {
        return Err(ApiError::BadRequest("Title and content are required".into()));
    }
    if title.chars().count() > MAX_TITLE_LENGTH {
        return Err(ApiError::BadRequest(format!(
            "Title must be between 1 and {} characters",
            MAX_TITLE_LENGTH
        )));
    }
    if content.chars().count() > MAX_CONTENT_LENGTH {
        return Err(ApiError::BadRequest(format!(
            "Content must be between 1 and {} characters",
            MAX_CONTENT_LENGTH
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_blank_title_or_content() {
        assert!(validate_article("", "body").is_err());
        assert!(validate_article("title", "   ").is_err());
        assert!(validate_article("title", "body").is_ok());
    }

    #[test]
    fn enforces_length_bounds() {
        let long_title = "t".repeat(MAX_TITLE_LENGTH + 1);
        let long_content = "c".repeat(MAX_CONTENT_LENGTH + 1);
        assert!(validate_article(&long_title, "body").is_err());
        assert!(validate_article("title", &long_content).is_err());
        assert!(validate_article(&"t".repeat(MAX_TITLE_LENGTH), "body").is_ok());
    }
}
