//! Thread aggregation engine.
//!
//! Threads carry two derived fields, `comment_count` and `vote_score`. They
//! are materialized views over the comment and vote ledgers and are written
//! in exactly one place, [`refresh_aggregates`], which every comment or vote
//! mutation calls inside its own write transaction. Because all writers share
//! one connection and run as immediate transactions, two concurrent
//! mutations of the same thread can never both compute from the same stale
//! ledger.

use bazaar_types::api::{CreateThreadRequest, ThreadFilter, UpdateThreadRequest};
use bazaar_types::models::Thread;
use bazaar_types::{BazaarError, Result, ThreadId};
use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, params, params_from_iter};
use tracing::debug;

use crate::models::{THREAD_COLUMNS, now, thread_from_row, to_sql_time};
use crate::{Database, storage_error};

impl Database {
    pub fn create_thread(&self, req: CreateThreadRequest) -> Result<Thread> {
        req.validate()?;

        let ts = now();
        let thread = Thread {
            id: ThreadId::new(),
            author_id: req.author_id,
            thread_type: req.thread_type,
            item_id: req.item_id,
            title: req.title,
            content: req.content,
            is_active: req.is_active,
            created_at: ts,
            updated_at: ts,
            comment_count: 0,
            vote_score: 0,
        };

        self.with_tx(|conn| {
            conn.execute(
                "INSERT INTO threads (id, author_id, thread_type, item_id, title, content,
                                      is_active, created_at, updated_at, comment_count, vote_score)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8, 0, 0)",
                params![
                    thread.id.to_string(),
                    thread.author_id.to_string(),
                    thread.thread_type.as_str(),
                    thread.item_id.map(|id| id.to_string()),
                    thread.title,
                    thread.content,
                    thread.is_active,
                    to_sql_time(ts),
                ],
            )
            .map_err(storage_error)?;
            Ok(())
        })?;

        debug!(thread_id = %thread.id, thread_type = %thread.thread_type, "thread created");
        Ok(thread)
    }

    pub fn get_thread(&self, id: ThreadId) -> Result<Thread> {
        self.with_conn(|conn| require_thread(conn, id))
    }

    pub fn list_threads(&self, filter: &ThreadFilter) -> Result<Vec<Thread>> {
        let mut clauses: Vec<&str> = Vec::new();
        let mut values: Vec<String> = Vec::new();

        if let Some(thread_type) = filter.thread_type {
            clauses.push("thread_type = ?");
            values.push(thread_type.as_str().to_string());
        }
        if let Some(item_id) = filter.item_id {
            clauses.push("item_id = ?");
            values.push(item_id.to_string());
        }
        if let Some(author_id) = filter.author_id {
            clauses.push("author_id = ?");
            values.push(author_id.to_string());
        }
        if let Some(is_active) = filter.is_active {
            clauses.push(if is_active { "is_active = 1" } else { "is_active = 0" });
        }

        let mut sql = format!("SELECT {THREAD_COLUMNS} FROM threads");
        if !clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }
        sql.push_str(" ORDER BY created_at, rowid");

        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&sql).map_err(storage_error)?;
            let rows = stmt
                .query_map(params_from_iter(values.iter()), thread_from_row)
                .map_err(storage_error)?
                .collect::<rusqlite::Result<Vec<_>>>()
                .map_err(storage_error)?;
            Ok(rows)
        })
    }

    /// Partial update of title, content and is_active. Author, type and item
    /// cannot change after creation.
    pub fn update_thread(&self, id: ThreadId, req: UpdateThreadRequest) -> Result<Thread> {
        req.validate()?;

        let thread = self.with_tx(|conn| {
            let mut thread = require_thread(conn, id)?;

            if let Some(title) = req.title {
                thread.title = title;
            }
            if let Some(content) = req.content {
                thread.content = content;
            }
            if let Some(is_active) = req.is_active {
                thread.is_active = is_active;
            }
            thread.updated_at = now();

            conn.execute(
                "UPDATE threads SET title = ?2, content = ?3, is_active = ?4, updated_at = ?5
                 WHERE id = ?1",
                params![
                    id.to_string(),
                    thread.title,
                    thread.content,
                    thread.is_active,
                    to_sql_time(thread.updated_at),
                ],
            )
            .map_err(storage_error)?;
            Ok(thread)
        })?;

        debug!(thread_id = %id, is_active = thread.is_active, "thread updated");
        Ok(thread)
    }

    /// Delete a thread together with its comments and votes in one transaction.
    pub fn delete_thread(&self, id: ThreadId) -> Result<()> {
        let (comments, votes) = self.with_tx(|conn| {
            require_thread(conn, id)?;
            let key = id.to_string();

            let votes = conn
                .execute("DELETE FROM votes WHERE thread_id = ?1", [&key])
                .map_err(storage_error)?;
            let comments = conn
                .execute("DELETE FROM comments WHERE thread_id = ?1", [&key])
                .map_err(storage_error)?;
            conn.execute("DELETE FROM threads WHERE id = ?1", [&key])
                .map_err(storage_error)?;
            Ok((comments, votes))
        })?;

        debug!(thread_id = %id, comments, votes, "thread deleted");
        Ok(())
    }
}

pub(crate) fn find_thread(conn: &Connection, id: ThreadId) -> Result<Option<Thread>> {
    conn.query_row(
        &format!("SELECT {THREAD_COLUMNS} FROM threads WHERE id = ?1"),
        [id.to_string()],
        thread_from_row,
    )
    .optional()
    .map_err(storage_error)
}

pub(crate) fn require_thread(conn: &Connection, id: ThreadId) -> Result<Thread> {
    find_thread(conn, id)?.ok_or_else(|| BazaarError::not_found("Thread", id))
}

/// Recompute `comment_count` and `vote_score` from the full ledgers and bump
/// `updated_at`. Must run inside the transaction that changed the ledger.
pub(crate) fn refresh_aggregates(
    conn: &Connection,
    id: ThreadId,
    at: DateTime<Utc>,
) -> Result<Thread> {
    let key = id.to_string();
    let updated = conn
        .execute(
            "UPDATE threads
             SET comment_count = (SELECT COUNT(*) FROM comments WHERE thread_id = ?1),
                 vote_score = (SELECT COALESCE(SUM(direction), 0) FROM votes
                               WHERE thread_id = ?1 AND direction != 0),
                 updated_at = ?2
             WHERE id = ?1",
            params![key, to_sql_time(at)],
        )
        .map_err(storage_error)?;
    if updated == 0 {
        return Err(BazaarError::not_found("Thread", id));
    }
    require_thread(conn, id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{general_chat, open_temp};
    use bazaar_types::api::CreateCommentRequest;
    use bazaar_types::models::{ThreadType, VoteDirection};
    use bazaar_types::{ItemId, UserId};

    #[test]
    fn new_thread_starts_with_zero_aggregates() {
        let (_dir, db) = open_temp();
        let thread = db.create_thread(general_chat()).unwrap();
        assert_eq!(thread.comment_count, 0);
        assert_eq!(thread.vote_score, 0);
        assert_eq!(thread.created_at, thread.updated_at);
        assert_eq!(db.get_thread(thread.id).unwrap(), thread);
    }

    #[test]
    fn item_discussion_without_item_is_rejected() {
        let (_dir, db) = open_temp();
        let mut req = general_chat();
        req.thread_type = ThreadType::ItemDiscussion;

        let err = db.create_thread(req).unwrap_err();
        assert!(matches!(err, BazaarError::Validation(_)));
        assert!(db.list_threads(&ThreadFilter::default()).unwrap().is_empty());
    }

    #[test]
    fn item_discussion_may_reference_unknown_item() {
        let (_dir, db) = open_temp();
        let item_id = ItemId::new();
        let mut req = general_chat();
        req.thread_type = ThreadType::ItemDiscussion;
        req.item_id = Some(item_id);

        let thread = db.create_thread(req).unwrap();
        assert_eq!(thread.item_id, Some(item_id));
    }

    #[test]
    fn update_is_partial_and_refreshes_updated_at() {
        let (_dir, db) = open_temp();
        let thread = db.create_thread(general_chat()).unwrap();

        let updated = db
            .update_thread(
                thread.id,
                UpdateThreadRequest {
                    is_active: Some(false),
                    ..Default::default()
                },
            )
            .unwrap();

        assert!(!updated.is_active);
        assert_eq!(updated.title, thread.title);
        assert_eq!(updated.content, thread.content);
        assert_eq!(updated.author_id, thread.author_id);
        assert_eq!(updated.created_at, thread.created_at);
        assert!(updated.updated_at >= thread.updated_at);
    }

    #[test]
    fn invalid_update_changes_nothing() {
        let (_dir, db) = open_temp();
        let thread = db.create_thread(general_chat()).unwrap();

        let err = db
            .update_thread(
                thread.id,
                UpdateThreadRequest {
                    title: Some("x".into()),
                    is_active: Some(false),
                    ..Default::default()
                },
            )
            .unwrap_err();
        assert!(matches!(err, BazaarError::Validation(_)));
        assert_eq!(db.get_thread(thread.id).unwrap(), thread);
    }

    #[test]
    fn list_filters_by_type_and_activity() {
        let (_dir, db) = open_temp();
        let chat = db.create_thread(general_chat()).unwrap();

        let mut about_item = general_chat();
        about_item.thread_type = ThreadType::ItemDiscussion;
        about_item.item_id = Some(ItemId::new());
        about_item.is_active = false;
        let about_item = db.create_thread(about_item).unwrap();

        let discussions = db
            .list_threads(&ThreadFilter {
                thread_type: Some(ThreadType::ItemDiscussion),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(discussions.len(), 1);
        assert_eq!(discussions[0].id, about_item.id);

        let active = db
            .list_threads(&ThreadFilter {
                is_active: Some(true),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, chat.id);

        let by_author = db
            .list_threads(&ThreadFilter {
                author_id: Some(chat.author_id),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(by_author.len(), 1);
    }

    #[test]
    fn delete_cascades_to_comments_and_votes() {
        let (_dir, db) = open_temp();
        let thread = db.create_thread(general_chat()).unwrap();
        let other = db.create_thread(general_chat()).unwrap();

        let author = UserId::new();
        for id in [thread.id, other.id] {
            db.create_comment(
                id,
                CreateCommentRequest {
                    author_id: author,
                    content: "first!".into(),
                    parent_comment_id: None,
                },
            )
            .unwrap();
            db.cast_or_update_vote(id, author, VoteDirection::Upvote).unwrap();
        }

        db.delete_thread(thread.id).unwrap();

        assert!(matches!(db.get_thread(thread.id), Err(BazaarError::NotFound { .. })));
        assert!(matches!(
            db.list_comments_for_thread(thread.id),
            Err(BazaarError::NotFound { .. })
        ));
        assert!(matches!(db.list_votes(thread.id), Err(BazaarError::NotFound { .. })));

        let orphans: i64 = db
            .with_conn(|conn| {
                conn.query_row(
                    "SELECT (SELECT COUNT(*) FROM comments WHERE thread_id = ?1)
                          + (SELECT COUNT(*) FROM votes WHERE thread_id = ?1)",
                    [thread.id.to_string()],
                    |r| r.get(0),
                )
                .map_err(storage_error)
            })
            .unwrap();
        assert_eq!(orphans, 0);

        let survivor = db.get_thread(other.id).unwrap();
        assert_eq!(survivor.comment_count, 1);
        assert_eq!(survivor.vote_score, 1);
    }

    #[test]
    fn deleting_missing_thread_is_not_found() {
        let (_dir, db) = open_temp();
        assert!(matches!(
            db.delete_thread(ThreadId::new()),
            Err(BazaarError::NotFound { .. })
        ));
    }

    #[test]
    fn refresh_on_missing_thread_is_not_found() {
        let (_dir, db) = open_temp();
        let result = db.with_tx(|conn| refresh_aggregates(conn, ThreadId::new(), now()));
        assert!(matches!(result, Err(BazaarError::NotFound { .. })));
    }
}
