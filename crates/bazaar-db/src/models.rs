//! Mapping between SQLite rows and `bazaar-types` models.
//!
//! Ids and enums are stored as text, vote directions as integers, timestamps
//! as RFC 3339 UTC strings with microsecond precision so that string order is
//! time order. A value that fails to parse back is reported as a conversion
//! failure rather than silently defaulted.

use std::str::FromStr;

use bazaar_types::models::{Comment, Item, Thread, Vote, VoteDirection};
use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use rusqlite::Row;
use rusqlite::types::Type;

/// Current time at the precision we store.
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

pub fn to_sql_time(t: DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn conversion_error<E>(idx: usize, err: E) -> rusqlite::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(err))
}

/// Read a text column and parse it with `FromStr`.
pub fn parsed<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let raw: String = row.get(idx)?;
    raw.parse().map_err(|e| conversion_error(idx, e))
}

pub fn parsed_opt<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let raw: Option<String> = row.get(idx)?;
    raw.map(|s| s.parse().map_err(|e| conversion_error(idx, e)))
        .transpose()
}

pub fn time(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| conversion_error(idx, e))
}

pub const ITEM_COLUMNS: &str = "id, owner_id, title, description, price_cents, category, \
     transaction_type, created_at, updated_at";

pub fn item_from_row(row: &Row<'_>) -> rusqlite::Result<Item> {
    Ok(Item {
        id: parsed(row, 0)?,
        owner_id: parsed(row, 1)?,
        title: row.get(2)?,
        description: row.get(3)?,
        price_cents: row.get(4)?,
        category: parsed(row, 5)?,
        transaction_type: parsed(row, 6)?,
        created_at: time(row, 7)?,
        updated_at: time(row, 8)?,
    })
}

pub const THREAD_COLUMNS: &str = "id, author_id, thread_type, item_id, title, content, \
     is_active, created_at, updated_at, comment_count, vote_score";

pub fn thread_from_row(row: &Row<'_>) -> rusqlite::Result<Thread> {
    Ok(Thread {
        id: parsed(row, 0)?,
        author_id: parsed(row, 1)?,
        thread_type: parsed(row, 2)?,
        item_id: parsed_opt(row, 3)?,
        title: row.get(4)?,
        content: row.get(5)?,
        is_active: row.get(6)?,
        created_at: time(row, 7)?,
        updated_at: time(row, 8)?,
        comment_count: row.get(9)?,
        vote_score: row.get(10)?,
    })
}

pub const COMMENT_COLUMNS: &str =
    "id, thread_id, author_id, content, parent_comment_id, created_at, updated_at";

pub fn comment_from_row(row: &Row<'_>) -> rusqlite::Result<Comment> {
    Ok(Comment {
        id: parsed(row, 0)?,
        thread_id: parsed(row, 1)?,
        author_id: parsed(row, 2)?,
        content: row.get(3)?,
        parent_comment_id: parsed_opt(row, 4)?,
        created_at: time(row, 5)?,
        updated_at: time(row, 6)?,
    })
}

pub const VOTE_COLUMNS: &str = "thread_id, user_id, direction, created_at, updated_at";

pub fn vote_from_row(row: &Row<'_>) -> rusqlite::Result<Vote> {
    let direction: i64 = row.get(2)?;
    Ok(Vote {
        thread_id: parsed(row, 0)?,
        user_id: parsed(row, 1)?,
        direction: VoteDirection::try_from(direction).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(2, Type::Integer, Box::new(e))
        })?,
        created_at: time(row, 3)?,
        updated_at: time(row, 4)?,
    })
}
