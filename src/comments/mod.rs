//! Threaded comments: materialized-path storage, tree assembly and the
//! soft/hard delete policy that prunes orphaned ancestor chains.

pub mod policy;
pub mod store;
pub mod tree;

use sqlx::MySqlPool;

use crate::error::ApiError;
use crate::models::{Comment, CommentNode, CreateCommentRequest};
use policy::DeleteOutcome;

/// What a deleted comment shows instead of its content. Also written into
/// the stored row on soft delete, so the original text is gone for good.
pub const DELETED_CONTENT_PLACEHOLDER: &str = "This comment has been deleted.";
pub const DELETED_AUTHOR_PLACEHOLDER: &str = "unknown";

pub const MAX_COMMENT_LENGTH: usize = 800;

/// Orchestrates validation, the store and the deletion policy. Constructed
/// once at startup and handed to the router as part of the shared state.
#[derive(Clone)]
pub struct CommentService {
    pool: MySqlPool,
}

impl CommentService {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    pub async fn create_comment(
        &self,
        author_id: i64,
        request: CreateCommentRequest,
    ) -> Result<Comment, ApiError> {
        let content = request.content.trim();
        if content.is_empty() {
            return Err(ApiError::BadRequest("Comment content is required".into()));
        }
        if content.chars().count() > MAX_COMMENT_LENGTH {
            return Err(ApiError::BadRequest(format!(
                "Comment must be at most {} characters",
                MAX_COMMENT_LENGTH
            )));
        }

        let mut tx = self.pool.begin().await?;

        if !store::article_exists(&mut tx, request.article_id).await? {
            return Err(ApiError::NotFound("Article not found".into()));
        }

        let parent = match request.parent_id {
            Some(parent_id) => {
                let parent = store::find_by_id(&mut tx, parent_id)
                    .await?
                    .ok_or_else(|| ApiError::NotFound("Parent comment not found".into()))?;
                if parent.article_id != request.article_id {
                    return Err(ApiError::BadRequest(
                        "Parent comment does not belong to this article".into(),
                    ));
                }
                Some(parent)
            }
            None => None,
        };

        let comment =
            store::create(&mut tx, content, author_id, request.article_id, parent.as_ref()).await?;
        tx.commit().await?;

        Ok(comment)
    }

    /// One flat fetch in path order, then a pure in-memory tree build. No
    /// per-node queries and no caching; every read sees fresh store state.
    pub async fn comment_tree(&self, article_id: i64) -> Result<Vec<CommentNode>, ApiError> {
        let mut conn = self.pool.acquire().await?;
        let comments = store::list_by_article(&mut conn, article_id).await?;
        Ok(tree::build_comment_tree(comments))
    }

    /// Deletes a comment under the count-then-act policy. The lookup, the
    /// authorization check, the descendant counts and every delete along the
    /// ancestor walk share one transaction, so a failure anywhere rolls the
    /// whole chain back.
    pub async fn delete_comment(
        &self,
        comment_id: i64,
        user_id: i64,
    ) -> Result<DeleteOutcome, ApiError> {
        let mut tx = self.pool.begin().await?;

        let comment = store::find_by_id(&mut tx, comment_id)
            .await?
            .ok_or_else(|| ApiError::NotFound("Comment not found".into()))?;

        if comment.author_id != user_id {
            return Err(ApiError::Forbidden(
                "Not authorized to delete this comment".into(),
            ));
        }

        let mut policy_store = store::SqlPolicyStore::new(&mut tx);
        let outcome =
            policy::apply_delete_policy(&mut policy_store, comment.id, comment.parent_id).await?;
        tx.commit().await?;

        tracing::debug!(comment_id, mode = outcome.as_str(), "comment deleted");
        Ok(outcome)
    }
}
