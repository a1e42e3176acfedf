//! Decides soft vs hard delete and prunes orphaned ancestor chains.
//!
//! A comment row may only outlive its content while something below it is
//! still visible. Deleting a comment therefore either masks it (live
//! descendants remain) or removes it, and a removal walks upward freeing
//! every already-masked ancestor whose subtree just went silent.

use crate::error::ApiError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Soft,
    Hard,
}

impl DeleteOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Soft => "soft",
            Self::Hard => "hard",
        }
    }
}

/// The slice of a comment row the ancestor walk needs.
pub struct AncestorNode {
    pub parent_id: Option<i64>,
    pub is_deleted: bool,
}

/// Store operations the policy runs against. The production impl wraps an
/// open SQL transaction; tests drive the same walk over an in-memory map.
pub(crate) trait PolicyStore {
    async fn ancestor(&mut self, id: i64) -> Result<Option<AncestorNode>, ApiError>;
    /// Strict descendants (any depth) with `is_deleted == false`. Hard-deleted
    /// rows no longer exist, so at delete time this is exactly the number of
    /// comments still keeping the subtree visible.
    async fn live_descendant_count(&mut self, id: i64) -> Result<i64, ApiError>;
    async fn soft_delete(&mut self, id: i64) -> Result<(), ApiError>;
    async fn hard_delete(&mut self, id: i64) -> Result<(), ApiError>;
}

/// Count-then-act deletion. If live descendants remain the target is only
/// soft-deleted. Otherwise it is hard-deleted and the walk moves up the
/// parent chain, hard-deleting each ancestor that is already soft-deleted
/// and has just lost its last live descendant. The walk stops at the first
/// ancestor that is still visible content, or at the root.
///
/// Each iteration either stops or removes one ancestor, so the walk is
/// bounded by the chain to the root.
pub(crate) async fn apply_delete_policy<S: PolicyStore>(
    store: &mut S,
    target_id: i64,
    parent_id: Option<i64>,
) -> Result<DeleteOutcome, ApiError> {
    if store.live_descendant_count(target_id).await? > 0 {
        store.soft_delete(target_id).await?;
        return Ok(DeleteOutcome::Soft);
    }

    store.hard_delete(target_id).await?;

    let mut current = parent_id;
    while let Some(id) = current {
        let Some(node) = store.ancestor(id).await? else {
            break;
        };
        if !node.is_deleted {
            break;
        }
        if store.live_descendant_count(id).await? > 0 {
            break;
        }
        store.hard_delete(id).await?;
        current = node.parent_id;
    }

    Ok(DeleteOutcome::Hard)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::comments::store::{descendant_prefix, is_descendant_path};

    #[derive(Clone)]
    struct Row {
        parent_id: Option<i64>,
        path: String,
        is_deleted: bool,
    }

    #[derive(Default)]
    struct MemoryStore {
        rows: HashMap<i64, Row>,
    }

    impl MemoryStore {
        fn insert(&mut self, id: i64, parent_id: Option<i64>, path: &str, is_deleted: bool) {
            self.rows.insert(
                id,
                Row {
                    parent_id,
                    path: path.to_string(),
                    is_deleted,
                },
            );
        }

        fn contains(&self, id: i64) -> bool {
            self.rows.contains_key(&id)
        }

        fn is_soft_deleted(&self, id: i64) -> bool {
            self.rows.get(&id).is_some_and(|row| row.is_deleted)
        }
    }

    impl PolicyStore for MemoryStore {
        async fn ancestor(&mut self, id: i64) -> Result<Option<AncestorNode>, ApiError> {
            Ok(self.rows.get(&id).map(|row| AncestorNode {
                parent_id: row.parent_id,
                is_deleted: row.is_deleted,
            }))
        }

        async fn live_descendant_count(&mut self, id: i64) -> Result<i64, ApiError> {
            let Some(row) = self.rows.get(&id) else {
                return Ok(0);
            };
            let prefix = descendant_prefix(&row.path, id);
            Ok(self
                .rows
                .values()
                .filter(|row| !row.is_deleted && is_descendant_path(&row.path, &prefix))
                .count() as i64)
        }

        async fn soft_delete(&mut self, id: i64) -> Result<(), ApiError> {
            if let Some(row) = self.rows.get_mut(&id) {
                row.is_deleted = true;
            }
            Ok(())
        }

        async fn hard_delete(&mut self, id: i64) -> Result<(), ApiError> {
            self.rows.remove(&id);
            Ok(())
        }
    }

    #[tokio::test]
    async fn childless_root_is_hard_deleted() {
        let mut store = MemoryStore::default();
        store.insert(1, None, "", false);

        let outcome = apply_delete_policy(&mut store, 1, None).await.unwrap();

        assert_eq!(outcome, DeleteOutcome::Hard);
        assert!(!store.contains(1));
    }

    #[tokio::test]
    async fn target_with_live_descendants_is_soft_deleted() {
        let mut store = MemoryStore::default();
        store.insert(1, None, "", false);
        store.insert(2, Some(1), "1", false);

        let outcome = apply_delete_policy(&mut store, 1, None).await.unwrap();

        assert_eq!(outcome, DeleteOutcome::Soft);
        assert!(store.is_soft_deleted(1));
        assert!(store.contains(2));
    }

    #[tokio::test]
    async fn removing_last_live_child_prunes_soft_deleted_parent() {
        let mut store = MemoryStore::default();
        store.insert(1, None, "", true); // root, already masked
        store.insert(2, Some(1), "1", false); // its only live child

        let outcome = apply_delete_policy(&mut store, 2, Some(1)).await.unwrap();

        assert_eq!(outcome, DeleteOutcome::Hard);
        assert!(!store.contains(2));
        assert!(!store.contains(1));
    }

    #[tokio::test]
    async fn soft_deleted_parent_survives_while_a_live_sibling_remains() {
        let mut store = MemoryStore::default();
        store.insert(1, None, "", true);
        store.insert(2, Some(1), "1", false);
        store.insert(3, Some(1), "1", false);

        let outcome = apply_delete_policy(&mut store, 2, Some(1)).await.unwrap();

        assert_eq!(outcome, DeleteOutcome::Hard);
        assert!(!store.contains(2));
        assert!(store.contains(1));
        assert!(store.is_soft_deleted(1));
        assert!(store.contains(3));
    }

    #[tokio::test]
    async fn prune_walks_a_contiguous_soft_deleted_chain_to_the_root() {
        let mut store = MemoryStore::default();
        store.insert(1, None, "", true);
        store.insert(2, Some(1), "1", true);
        store.insert(3, Some(2), "1/2", false);

        let outcome = apply_delete_policy(&mut store, 3, Some(2)).await.unwrap();

        assert_eq!(outcome, DeleteOutcome::Hard);
        assert!(!store.contains(3));
        assert!(!store.contains(2));
        assert!(!store.contains(1));
    }

    #[tokio::test]
    async fn prune_stops_at_the_first_live_ancestor() {
        let mut store = MemoryStore::default();
        store.insert(1, None, "", false); // still visible content
        store.insert(2, Some(1), "1", true);
        store.insert(3, Some(2), "1/2", false);

        let outcome = apply_delete_policy(&mut store, 3, Some(2)).await.unwrap();

        assert_eq!(outcome, DeleteOutcome::Hard);
        assert!(!store.contains(3));
        assert!(!store.contains(2));
        assert!(store.contains(1));
        assert!(!store.is_soft_deleted(1));
    }

    #[tokio::test]
    async fn deep_live_grandchild_keeps_the_whole_chain_alive() {
        let mut store = MemoryStore::default();
        store.insert(1, None, "", true);
        store.insert(2, Some(1), "1", true);
        store.insert(3, Some(2), "1/2", false);
        store.insert(4, Some(2), "1/2", false);

        // Removing one grandchild leaves the other; nothing above may go.
        let outcome = apply_delete_policy(&mut store, 3, Some(2)).await.unwrap();

        assert_eq!(outcome, DeleteOutcome::Hard);
        assert!(!store.contains(3));
        assert!(store.contains(1));
        assert!(store.contains(2));
        assert!(store.contains(4));
    }
}
