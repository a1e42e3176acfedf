//! Pure transform from a flat, path-ordered comment list into the nested
//! tree the API returns.

use std::collections::HashMap;

use crate::models::{Comment, CommentNode};

use super::{DELETED_AUTHOR_PLACEHOLDER, DELETED_CONTENT_PLACEHOLDER};

/// Builds the comment forest for one article.
///
/// The input is expected in `(path ASC, id ASC)` order, so parents arrive
/// before children and siblings keep creation order; both orders are
/// preserved in the output. Rows whose parent is missing from the input are
/// dropped rather than surfaced: the deletion policy never produces them,
/// but a stray row must not take the whole thread down.
pub fn build_comment_tree(comments: Vec<Comment>) -> Vec<CommentNode> {
    let mut roots = Vec::new();
    let mut children_of: HashMap<i64, Vec<Comment>> = HashMap::new();

    for comment in comments {
        match comment.parent_id {
            None => roots.push(comment),
            Some(parent_id) => children_of.entry(parent_id).or_default().push(comment),
        }
    }

    roots
        .into_iter()
        .map(|root| attach_children(root, &mut children_of))
        .collect()
}

fn attach_children(comment: Comment, children_of: &mut HashMap<i64, Vec<Comment>>) -> CommentNode {
    let children = children_of
        .remove(&comment.id)
        .unwrap_or_default()
        .into_iter()
        .map(|child| attach_children(child, children_of))
        .collect();
    into_node(comment, children)
}

/// Converts a row into a response node, masking deleted content exactly once.
/// The stored row already carries the placeholder content after a soft
/// delete; masking here as well keeps reads idempotent and hides the author.
fn into_node(comment: Comment, children: Vec<CommentNode>) -> CommentNode {
    let (content, author_nickname) = if comment.is_deleted {
        (
            DELETED_CONTENT_PLACEHOLDER.to_string(),
            DELETED_AUTHOR_PLACEHOLDER.to_string(),
        )
    } else {
        (comment.content, comment.author_nickname)
    };

    CommentNode {
        id: comment.id,
        content,
        author_id: comment.author_id,
        author_nickname,
        parent_id: comment.parent_id,
        depth: comment.depth,
        is_deleted: comment.is_deleted,
        created_at: comment.created_at,
        children,
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    fn comment(id: i64, parent_id: Option<i64>, path: &str, depth: i32) -> Comment {
        Comment {
            id,
            content: format!("comment {id}"),
            author_id: 10,
            author_nickname: "alice".to_string(),
            article_id: 1,
            parent_id,
            path: path.to_string(),
            depth,
            is_deleted: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn flatten(nodes: &[CommentNode]) -> Vec<i64> {
        let mut ids = Vec::new();
        for node in nodes {
            ids.push(node.id);
            ids.extend(flatten(&node.children));
        }
        ids
    }

    #[test]
    fn chain_of_replies_nests_in_path_order() {
        let flat = vec![
            comment(1, None, "", 0),
            comment(2, Some(1), "1", 1),
            comment(3, Some(2), "1/2", 2),
        ];

        let tree = build_comment_tree(flat);

        assert_eq!(tree.len(), 1);
        assert_eq!(tree[0].id, 1);
        assert_eq!(tree[0].children.len(), 1);
        assert_eq!(tree[0].children[0].id, 2);
        assert_eq!(tree[0].children[0].children.len(), 1);
        assert_eq!(tree[0].children[0].children[0].id, 3);
        assert!(tree[0].children[0].children[0].children.is_empty());
    }

    #[test]
    fn round_trip_preserves_every_row_and_the_parent_partition() {
        let flat = vec![
            comment(1, None, "", 0),
            comment(3, Some(1), "1", 1),
            comment(4, Some(1), "1", 1),
            comment(5, Some(3), "1/3", 2),
            comment(2, None, "", 0),
            comment(6, Some(2), "2", 1),
        ];
        let expected_children: Vec<(i64, Option<i64>)> =
            flat.iter().map(|c| (c.id, c.parent_id)).collect();

        let tree = build_comment_tree(flat);

        assert_eq!(flatten(&tree).len(), expected_children.len());

        fn check(nodes: &[CommentNode], expected: &[(i64, Option<i64>)]) {
            for node in nodes {
                for child in &node.children {
                    assert_eq!(child.parent_id, Some(node.id));
                }
                assert!(expected.contains(&(node.id, node.parent_id)));
                check(&node.children, expected);
            }
        }
        check(&tree, &expected_children);
    }

    #[test]
    fn sibling_order_follows_the_input() {
        let flat = vec![
            comment(1, None, "", 0),
            comment(2, Some(1), "1", 1),
            comment(5, Some(1), "1", 1),
            comment(9, Some(1), "1", 1),
        ];

        let tree = build_comment_tree(flat);

        let child_ids: Vec<i64> = tree[0].children.iter().map(|c| c.id).collect();
        assert_eq!(child_ids, vec![2, 5, 9]);
    }

    #[test]
    fn deleted_comments_are_masked_and_reads_are_idempotent() {
        let mut masked = comment(1, None, "", 0);
        masked.is_deleted = true;
        masked.content = DELETED_CONTENT_PLACEHOLDER.to_string();
        let flat = vec![masked, comment(2, Some(1), "1", 1)];

        let first = build_comment_tree(flat.clone());
        let second = build_comment_tree(flat);

        assert_eq!(first, second);
        assert_eq!(first[0].content, DELETED_CONTENT_PLACEHOLDER);
        assert_eq!(first[0].author_nickname, DELETED_AUTHOR_PLACEHOLDER);
        assert!(first[0].is_deleted);
        // The live reply underneath is untouched.
        assert_eq!(first[0].children[0].content, "comment 2");
        assert_eq!(first[0].children[0].author_nickname, "alice");
    }

    #[test]
    fn orphan_rows_are_dropped_silently() {
        let flat = vec![
            comment(1, None, "", 0),
            comment(2, Some(99), "99", 1), // parent not in this article's rows
        ];

        let tree = build_comment_tree(flat);

        assert_eq!(flatten(&tree), vec![1]);
    }
}
