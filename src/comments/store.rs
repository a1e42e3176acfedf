//! Row-level comment persistence: CRUD plus the path-prefix queries the
//! deletion policy and tree reads are built on.
//!
//! Every function takes a `MySqlConnection` so the caller decides the
//! transaction scope; the service runs each operation inside one.

use chrono::Utc;
use sqlx::MySqlConnection;

use super::DELETED_CONTENT_PLACEHOLDER;
use crate::comments::policy::{AncestorNode, PolicyStore};
use crate::error::ApiError;
use crate::models::Comment;

const SELECT_COMMENT: &str = r#"
    SELECT
        c.id, c.content, c.author_id, u.nickname AS author_nickname,
        c.article_id, c.parent_id, c.path, c.depth, c.is_deleted,
        c.created_at, c.updated_at
    FROM comments c
    JOIN users u ON u.id = c.author_id
"#;

/// Prefix under which every descendant of the given comment lives. A root's
/// own path is empty, so its subtree prefix is just its id.
pub fn descendant_prefix(path: &str, id: i64) -> String {
    if path.is_empty() {
        id.to_string()
    } else {
        format!("{}/{}", path, id)
    }
}

/// Segment-exact prefix test: a direct child's path equals the prefix,
/// deeper descendants continue with a slash. A plain starts-with would
/// conflate id 1 with id 12.
pub fn is_descendant_path(path: &str, prefix: &str) -> bool {
    path == prefix
        || (path.len() > prefix.len()
            && path.starts_with(prefix)
            && path.as_bytes()[prefix.len()] == b'/')
}

pub async fn article_exists(conn: &mut MySqlConnection, article_id: i64) -> Result<bool, ApiError> {
    let row: Option<(i64,)> = sqlx::query_as("SELECT id FROM articles WHERE id = ?")
        .bind(article_id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(row.is_some())
}

/// Inserts a comment, deriving `path` and `depth` from the (caller-resolved)
/// parent, and returns the freshly read-back row.
pub async fn create(
    conn: &mut MySqlConnection,
    content: &str,
    author_id: i64,
    article_id: i64,
    parent: Option<&Comment>,
) -> Result<Comment, ApiError> {
    let (path, depth) = match parent {
        Some(parent) => (descendant_prefix(&parent.path, parent.id), parent.depth + 1),
        None => (String::new(), 0),
    };

    let now = Utc::now();
    let result = sqlx::query(
        r#"
        INSERT INTO comments (content, author_id, article_id, parent_id, path, depth, is_deleted, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, FALSE, ?, ?)
        "#,
    )
    .bind(content)
    .bind(author_id)
    .bind(article_id)
    .bind(parent.map(|p| p.id))
    .bind(&path)
    .bind(depth)
    .bind(now)
    .bind(now)
    .execute(&mut *conn)
    .await?;

    let id = result.last_insert_id() as i64;
    find_by_id(conn, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Created comment not found".into()))
}

pub async fn find_by_id(conn: &mut MySqlConnection, id: i64) -> Result<Option<Comment>, ApiError> {
    let comment = sqlx::query_as::<_, Comment>(&format!("{SELECT_COMMENT} WHERE c.id = ?"))
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(comment)
}

/// All comments of one article in `(path ASC, id ASC)` order, which puts
/// every parent before its children and keeps siblings in creation order.
/// The tree builder relies on both properties.
pub async fn list_by_article(
    conn: &mut MySqlConnection,
    article_id: i64,
) -> Result<Vec<Comment>, ApiError> {
    let comments = sqlx::query_as::<_, Comment>(&format!(
        "{SELECT_COMMENT} WHERE c.article_id = ? ORDER BY c.path ASC, c.id ASC"
    ))
    .bind(article_id)
    .fetch_all(&mut *conn)
    .await?;
    Ok(comments)
}

/// Every stored row below the given comment, however deep.
pub async fn list_descendants(
    conn: &mut MySqlConnection,
    comment: &Comment,
) -> Result<Vec<Comment>, ApiError> {
    let prefix = descendant_prefix(&comment.path, comment.id);
    let comments = sqlx::query_as::<_, Comment>(&format!(
        "{SELECT_COMMENT} WHERE (c.path = ? OR c.path LIKE CONCAT(?, '/%')) ORDER BY c.path ASC, c.id ASC"
    ))
    .bind(&prefix)
    .bind(&prefix)
    .fetch_all(&mut *conn)
    .await?;
    Ok(comments)
}

/// Live descendants below the subtree prefix. Hard-deleted rows are gone
/// from the table, so this is exactly the count the deletion policy needs.
pub async fn count_non_deleted_descendants(
    conn: &mut MySqlConnection,
    path: &str,
    id: i64,
) -> Result<i64, ApiError> {
    let prefix = descendant_prefix(path, id);
    let (count,): (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM comments WHERE (path = ? OR path LIKE CONCAT(?, '/%')) AND is_deleted = FALSE",
    )
    .bind(&prefix)
    .bind(&prefix)
    .fetch_one(&mut *conn)
    .await?;
    Ok(count)
}

/// Masks the row in place: the stored content is replaced by the placeholder
/// and the flag is set. The row, its path and its children stay intact.
pub async fn soft_delete(conn: &mut MySqlConnection, id: i64) -> Result<(), ApiError> {
    sqlx::query("UPDATE comments SET is_deleted = TRUE, content = ?, updated_at = ? WHERE id = ?")
        .bind(DELETED_CONTENT_PLACEHOLDER)
        .bind(Utc::now())
        .bind(id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

/// Physically removes the row. No cascade: the deletion policy is
/// responsible for never leaving live children behind.
pub async fn hard_delete(conn: &mut MySqlConnection, id: i64) -> Result<(), ApiError> {
    sqlx::query("DELETE FROM comments WHERE id = ?")
        .bind(id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

/// Removes every comment of an article; used when the article itself goes.
pub async fn delete_by_article(
    conn: &mut MySqlConnection,
    article_id: i64,
) -> Result<(), ApiError> {
    sqlx::query("DELETE FROM comments WHERE article_id = ?")
        .bind(article_id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

/// The deletion policy's view of the store, bound to one open transaction.
pub struct SqlPolicyStore<'c> {
    conn: &'c mut MySqlConnection,
}

impl<'c> SqlPolicyStore<'c> {
    pub fn new(conn: &'c mut MySqlConnection) -> Self {
        Self { conn }
    }
}

impl PolicyStore for SqlPolicyStore<'_> {
    async fn ancestor(&mut self, id: i64) -> Result<Option<AncestorNode>, ApiError> {
        let row: Option<(Option<i64>, bool)> =
            sqlx::query_as("SELECT parent_id, is_deleted FROM comments WHERE id = ?")
                .bind(id)
                .fetch_optional(&mut *self.conn)
                .await?;
        Ok(row.map(|(parent_id, is_deleted)| AncestorNode {
            parent_id,
            is_deleted,
        }))
    }

    async fn live_descendant_count(&mut self, id: i64) -> Result<i64, ApiError> {
        let row: Option<(String,)> = sqlx::query_as("SELECT path FROM comments WHERE id = ?")
            .bind(id)
            .fetch_optional(&mut *self.conn)
            .await?;
        match row {
            Some((path,)) => count_non_deleted_descendants(&mut *self.conn, &path, id).await,
            None => Ok(0),
        }
    }

    async fn soft_delete(&mut self, id: i64) -> Result<(), ApiError> {
        soft_delete(&mut *self.conn, id).await
    }

    async fn hard_delete(&mut self, id: i64) -> Result<(), ApiError> {
        hard_delete(&mut *self.conn, id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_prefix_is_its_own_id() {
        assert_eq!(descendant_prefix("", 1), "1");
    }

    #[test]
    fn nested_prefix_extends_the_parent_chain() {
        assert_eq!(descendant_prefix("1", 2), "1/2");
        assert_eq!(descendant_prefix("1/2", 5), "1/2/5");
    }

    #[test]
    fn depth_always_equals_segment_count() {
        // Simulate the chain the store builds at insert time.
        let mut path = String::new();
        let mut depth = 0;
        for id in [1i64, 2, 5, 9] {
            if depth > 0 {
                assert_eq!(path.split('/').count() as i32, depth);
            } else {
                assert!(path.is_empty());
            }
            path = descendant_prefix(&path, id);
            depth += 1;
        }
    }

    #[test]
    fn descendant_test_is_segment_exact() {
        assert!(is_descendant_path("1", "1")); // direct child of root 1
        assert!(is_descendant_path("1/2", "1"));
        assert!(is_descendant_path("1/2/5", "1/2"));
        assert!(!is_descendant_path("12", "1")); // id 12 is not under id 1
        assert!(!is_descendant_path("12/5", "1"));
        assert!(!is_descendant_path("", "1")); // the root itself is not its own descendant
        assert!(!is_descendant_path("2", "1"));
    }
}
