//! Comment tree manager.
//!
//! Comments form a reply forest per thread. A reply's parent must already
//! exist under the same thread, so cycles cannot be built. Comments that
//! still have replies cannot be deleted.

use std::collections::VecDeque;

use bazaar_types::api::{CreateCommentRequest, UpdateCommentRequest};
use bazaar_types::models::{Comment, Thread};
use bazaar_types::{BazaarError, CommentId, Result, ThreadId};
use rusqlite::{Connection, OptionalExtension, params};
use tracing::{debug, warn};

use crate::models::{COMMENT_COLUMNS, comment_from_row, now, to_sql_time};
use crate::threads::{refresh_aggregates, require_thread};
use crate::{Database, storage_error};

impl Database {
    pub fn create_comment(&self, thread_id: ThreadId, req: CreateCommentRequest) -> Result<Comment> {
        req.validate()?;

        let comment = self.with_tx(|conn| {
            let thread = require_thread(conn, thread_id)?;
            if !thread.is_active {
                return Err(BazaarError::Conflict(format!(
                    "thread {thread_id} is not active"
                )));
            }

            if let Some(parent_id) = req.parent_comment_id {
                match find_comment(conn, parent_id)? {
                    Some(parent) if parent.thread_id == thread_id => {}
                    Some(parent) => {
                        warn!(%thread_id, %parent_id, parent_thread = %parent.thread_id,
                              "rejected cross-thread reply");
                        return Err(BazaarError::InvalidReference(format!(
                            "parent comment {parent_id} belongs to another thread"
                        )));
                    }
                    None => {
                        return Err(BazaarError::InvalidReference(format!(
                            "parent comment {parent_id} does not exist"
                        )));
                    }
                }
            }

            let ts = now();
            let comment = Comment {
                id: CommentId::new(),
                thread_id,
                author_id: req.author_id,
                content: req.content,
                parent_comment_id: req.parent_comment_id,
                created_at: ts,
                updated_at: ts,
            };

            conn.execute(
                "INSERT INTO comments (id, thread_id, author_id, content, parent_comment_id,
                                       created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)",
                params![
                    comment.id.to_string(),
                    thread_id.to_string(),
                    comment.author_id.to_string(),
                    comment.content,
                    comment.parent_comment_id.map(|id| id.to_string()),
                    to_sql_time(ts),
                ],
            )
            .map_err(storage_error)?;

            refresh_aggregates(conn, thread_id, ts)?;
            Ok(comment)
        })?;

        debug!(%thread_id, comment_id = %comment.id, "comment created");
        Ok(comment)
    }

    /// Edit a comment's content. Thread aggregates are not touched.
    pub fn update_comment(
        &self,
        thread_id: ThreadId,
        comment_id: CommentId,
        req: UpdateCommentRequest,
    ) -> Result<Comment> {
        req.validate()?;

        let comment = self.with_tx(|conn| {
            require_thread(conn, thread_id)?;
            let mut comment = require_scoped_comment(conn, thread_id, comment_id)?;

            comment.content = req.content;
            comment.updated_at = now();

            conn.execute(
                "UPDATE comments SET content = ?2, updated_at = ?3 WHERE id = ?1",
                params![
                    comment_id.to_string(),
                    comment.content,
                    to_sql_time(comment.updated_at),
                ],
            )
            .map_err(storage_error)?;
            Ok(comment)
        })?;

        debug!(%thread_id, %comment_id, "comment updated");
        Ok(comment)
    }

    /// Delete a leaf comment and return the thread with its new count.
    pub fn delete_comment(&self, thread_id: ThreadId, comment_id: CommentId) -> Result<Thread> {
        let thread = self.with_tx(|conn| {
            require_thread(conn, thread_id)?;
            require_scoped_comment(conn, thread_id, comment_id)?;

            let has_replies: bool = conn
                .query_row(
                    "SELECT EXISTS(SELECT 1 FROM comments WHERE parent_comment_id = ?1)",
                    [comment_id.to_string()],
                    |r| r.get(0),
                )
                .map_err(storage_error)?;
            if has_replies {
                return Err(BazaarError::Conflict(format!(
                    "comment {comment_id} has replies; delete them first"
                )));
            }

            conn.execute("DELETE FROM comments WHERE id = ?1", [comment_id.to_string()])
                .map_err(storage_error)?;

            refresh_aggregates(conn, thread_id, now())
        })?;

        debug!(%thread_id, %comment_id, comment_count = thread.comment_count, "comment deleted");
        Ok(thread)
    }

    /// All comments of a thread, oldest first.
    pub fn list_comments_for_thread(&self, thread_id: ThreadId) -> Result<Vec<Comment>> {
        self.comment_cursor(thread_id)?.collect()
    }

    /// Lazily page through a thread's comments, oldest first. Fails up front
    /// if the thread does not exist.
    pub fn comment_cursor(&self, thread_id: ThreadId) -> Result<CommentCursor<'_>> {
        self.with_conn(|conn| require_thread(conn, thread_id))?;
        Ok(CommentCursor::new(self, thread_id, self.comment_page_size))
    }
}

/// Keyset-paginated iterator over a thread's comments ordered by
/// `(created_at, insertion order)`. Each page is read in its own snapshot; if
/// the thread disappears between pages the cursor yields `NotFound` once and
/// stops. Call [`CommentCursor::restart`] to iterate again from the start.
pub struct CommentCursor<'a> {
    db: &'a Database,
    thread_id: ThreadId,
    page_size: usize,
    after: Option<(String, i64)>,
    buffer: VecDeque<Comment>,
    exhausted: bool,
}

impl<'a> CommentCursor<'a> {
    fn new(db: &'a Database, thread_id: ThreadId, page_size: usize) -> Self {
        Self {
            db,
            thread_id,
            page_size,
            after: None,
            buffer: VecDeque::new(),
            exhausted: false,
        }
    }

    pub fn thread_id(&self) -> ThreadId {
        self.thread_id
    }

    pub fn restart(&mut self) {
        self.after = None;
        self.buffer.clear();
        self.exhausted = false;
    }

    fn fetch_page(&mut self) -> Result<()> {
        let thread_id = self.thread_id;
        let limit = self.page_size as i64;
        let (after_time, after_row) = match &self.after {
            Some((time, row)) => (Some(time.clone()), *row),
            None => (None, 0),
        };

        let page = self.db.with_conn(|conn| {
            require_thread(conn, thread_id)?;

            let mut stmt = conn
                .prepare(&format!(
                    "SELECT {COMMENT_COLUMNS}, rowid FROM comments
                     WHERE thread_id = ?1
                       AND (?2 IS NULL OR created_at > ?2 OR (created_at = ?2 AND rowid > ?3))
                     ORDER BY created_at, rowid
                     LIMIT ?4"
                ))
                .map_err(storage_error)?;
            let rows = stmt
                .query_map(
                    params![thread_id.to_string(), after_time, after_row, limit],
                    |row| Ok((comment_from_row(row)?, row.get::<_, i64>(7)?)),
                )
                .map_err(storage_error)?
                .collect::<rusqlite::Result<Vec<_>>>()
                .map_err(storage_error)?;
            Ok(rows)
        })?;

        if page.len() < self.page_size {
            self.exhausted = true;
        }
        if let Some((last, rowid)) = page.last() {
            self.after = Some((to_sql_time(last.created_at), *rowid));
        }
        self.buffer.extend(page.into_iter().map(|(comment, _)| comment));
        Ok(())
    }
}

impl Iterator for CommentCursor<'_> {
    type Item = Result<Comment>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.buffer.is_empty() && !self.exhausted {
            if let Err(e) = self.fetch_page() {
                self.exhausted = true;
                return Some(Err(e));
            }
        }
        self.buffer.pop_front().map(Ok)
    }
}

fn find_comment(conn: &Connection, id: CommentId) -> Result<Option<Comment>> {
    conn.query_row(
        &format!("SELECT {COMMENT_COLUMNS} FROM comments WHERE id = ?1"),
        [id.to_string()],
        comment_from_row,
    )
    .optional()
    .map_err(storage_error)
}

/// A comment id only resolves under the thread it belongs to.
fn require_scoped_comment(
    conn: &Connection,
    thread_id: ThreadId,
    comment_id: CommentId,
) -> Result<Comment> {
    match find_comment(conn, comment_id)? {
        Some(comment) if comment.thread_id == thread_id => Ok(comment),
        _ => Err(BazaarError::not_found("Comment", comment_id)),
    }
}
