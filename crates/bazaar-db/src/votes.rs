//! Vote ledger: one upsert slot per (thread, user).

use bazaar_types::models::{Thread, Vote, VoteDirection};
use bazaar_types::{BazaarError, Result, ThreadId, UserId};
use rusqlite::params;
use tracing::debug;

use crate::models::{VOTE_COLUMNS, now, to_sql_time, vote_from_row};
use crate::threads::{refresh_aggregates, require_thread};
use crate::{Database, storage_error};

impl Database {
    /// Insert or overwrite the user's vote and return the re-scored thread.
    /// Repeating a vote with the same direction leaves the ledger untouched.
    /// Inactive threads are not votable and report `NotFound`.
    pub fn cast_or_update_vote(
        &self,
        thread_id: ThreadId,
        user_id: UserId,
        direction: VoteDirection,
    ) -> Result<Thread> {
        let thread = self.with_tx(|conn| {
            let thread = require_thread(conn, thread_id)?;
            if !thread.is_active {
                return Err(BazaarError::NotFound {
                    entity: "Votable thread",
                    id: thread_id.to_string(),
                });
            }

            let ts = now();
            conn.execute(
                "INSERT INTO votes (thread_id, user_id, direction, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?4)
                 ON CONFLICT (thread_id, user_id) DO UPDATE
                 SET direction = excluded.direction, updated_at = excluded.updated_at
                 WHERE votes.direction != excluded.direction",
                params![
                    thread_id.to_string(),
                    user_id.to_string(),
                    direction.value(),
                    to_sql_time(ts),
                ],
            )
            .map_err(storage_error)?;

            refresh_aggregates(conn, thread_id, ts)
        })?;

        debug!(%thread_id, %user_id, direction = direction.value(),
               vote_score = thread.vote_score, "vote cast");
        Ok(thread)
    }

    /// Remove the user's vote. Cancelling a vote that does not exist is an
    /// error, not a no-op.
    pub fn cancel_vote(&self, thread_id: ThreadId, user_id: UserId) -> Result<Thread> {
        let thread = self.with_tx(|conn| {
            require_thread(conn, thread_id)?;

            let removed = conn
                .execute(
                    "DELETE FROM votes WHERE thread_id = ?1 AND user_id = ?2",
                    params![thread_id.to_string(), user_id.to_string()],
                )
                .map_err(storage_error)?;
            if removed == 0 {
                return Err(BazaarError::NotFound {
                    entity: "Vote",
                    id: format!("{thread_id}/{user_id}"),
                });
            }

            refresh_aggregates(conn, thread_id, now())
        })?;

        debug!(%thread_id, %user_id, vote_score = thread.vote_score, "vote cancelled");
        Ok(thread)
    }

    pub fn list_votes(&self, thread_id: ThreadId) -> Result<Vec<Vote>> {
        self.with_conn(|conn| {
            require_thread(conn, thread_id)?;

            let mut stmt = conn
                .prepare(&format!(
                    "SELECT {VOTE_COLUMNS} FROM votes WHERE thread_id = ?1
                     ORDER BY created_at, rowid"
                ))
                .map_err(storage_error)?;
            let votes = stmt
                .query_map([thread_id.to_string()], vote_from_row)
                .map_err(storage_error)?
                .collect::<rusqlite::Result<Vec<_>>>()
                .map_err(storage_error)?;
            Ok(votes)
        })
    }
}
