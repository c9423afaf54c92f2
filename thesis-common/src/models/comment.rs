//! Threaded comments on progress reports

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::user::UserType;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub id: Uuid,
    pub progress_id: Uuid,
    pub user_id: Uuid,
    pub user_type: UserType,
    /// Parent comment for a reply (one level of nesting)
    pub parent_id: Option<Uuid>,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Comment {
    pub fn new(
        progress_id: Uuid,
        user_id: Uuid,
        user_type: UserType,
        parent_id: Option<Uuid>,
        content: String,
    ) -> Self {
        let now = crate::time::now();
        Self {
            id: crate::uuid_utils::generate(),
            progress_id,
            user_id,
            user_type,
            parent_id,
            content,
            created_at: now,
            updated_at: now,
        }
    }
}

/// A top-level comment with its replies
#[derive(Debug, Clone, Serialize)]
pub struct CommentThread {
    #[serde(flatten)]
    pub comment: Comment,
    pub replies: Vec<Comment>,
}

impl CommentThread {
    /// Group a flat, creation-ordered comment list into threads
    ///
    /// Replies whose parent is missing from the list are promoted to top level.
    pub fn build(comments: Vec<Comment>) -> Vec<CommentThread> {
        let known: std::collections::HashSet<Uuid> = comments.iter().map(|c| c.id).collect();
        let (replies, roots): (Vec<Comment>, Vec<Comment>) = comments
            .into_iter()
            .partition(|c| c.parent_id.is_some_and(|p| known.contains(&p)));

        let mut threads: Vec<CommentThread> = roots
            .into_iter()
            .map(|comment| CommentThread {
                comment,
                replies: Vec::new(),
            })
            .collect();

        for reply in replies {
            // Replies to replies attach to the thread that owns their parent
            let owner = threads.iter_mut().find(|t| {
                Some(t.comment.id) == reply.parent_id
                    || t.replies.iter().any(|r| Some(r.id) == reply.parent_id)
            });
            match owner {
                Some(thread) => thread.replies.push(reply),
                None => threads.push(CommentThread {
                    comment: reply,
                    replies: Vec::new(),
                }),
            }
        }

        threads
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_groups_replies_under_parent() {
        let progress = Uuid::new_v4();
        let lecture = Uuid::new_v4();
        let student = Uuid::new_v4();

        let root = Comment::new(progress, lecture, UserType::Lecture, None, "Add a baseline".into());
        let reply = Comment::new(progress, student, UserType::Student, Some(root.id), "Done".into());
        let other = Comment::new(progress, student, UserType::Student, None, "New chapter".into());

        let threads = CommentThread::build(vec![root.clone(), reply.clone(), other.clone()]);

        assert_eq!(threads.len(), 2);
        assert_eq!(threads[0].comment.id, root.id);
        assert_eq!(threads[0].replies, vec![reply]);
        assert!(threads[1].replies.is_empty());
    }

    #[test]
    fn test_build_flattens_nested_replies() {
        let progress = Uuid::new_v4();
        let user = Uuid::new_v4();
        let root = Comment::new(progress, user, UserType::Lecture, None, "a".into());
        let r1 = Comment::new(progress, user, UserType::Student, Some(root.id), "b".into());
        let r2 = Comment::new(progress, user, UserType::Lecture, Some(r1.id), "c".into());

        let threads = CommentThread::build(vec![root, r1, r2]);
        assert_eq!(threads.len(), 1);
        assert_eq!(threads[0].replies.len(), 2);
    }

    #[test]
    fn test_thread_json_has_replies_alongside_fields() {
        let c = Comment::new(Uuid::new_v4(), Uuid::new_v4(), UserType::Student, None, "hi".into());
        let json = serde_json::to_value(CommentThread::build(vec![c])).unwrap();
        assert_eq!(json[0]["user_type"], "Student");
        assert!(json[0]["replies"].is_array());
    }
}
