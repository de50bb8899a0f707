use anyhow::Result;
use rusqlite::Connection;
use tracing::{debug, info};

pub const LATEST_VERSION: i64 = 1;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 =
        conn.query_row("SELECT COALESCE(MAX(version), 0) FROM schema_version", [], |r| r.get(0))?;

    if version >= LATEST_VERSION {
        debug!("Schema is up to date at v{}", version);
        return Ok(());
    }

    if version < 1 {
        info!("Running migration v1 (items, threads, comments, votes)");
        conn.execute_batch(
            "
            BEGIN;

            CREATE TABLE items (
                id                  TEXT PRIMARY KEY,
                owner_id            TEXT NOT NULL,
                title               TEXT NOT NULL,
                description         TEXT,
                price_cents         INTEGER CHECK (price_cents IS NULL OR price_cents >= 0),
                category            TEXT NOT NULL,
                transaction_type    TEXT NOT NULL,
                created_at          TEXT NOT NULL,
                updated_at          TEXT NOT NULL
            );

            CREATE INDEX idx_items_category ON items(category);
            CREATE INDEX idx_items_transaction_type ON items(transaction_type);

            -- item_id is a weak reference: no foreign key, items may be deleted
            -- while threads about them live on.
            CREATE TABLE threads (
                id              TEXT PRIMARY KEY,
                author_id       TEXT NOT NULL,
                thread_type     TEXT NOT NULL
                                CHECK (thread_type IN ('item_discussion', 'general_chat')),
                item_id         TEXT,
                title           TEXT NOT NULL,
                content         TEXT NOT NULL,
                is_active       INTEGER NOT NULL DEFAULT 1,
                created_at      TEXT NOT NULL,
                updated_at      TEXT NOT NULL,
                comment_count   INTEGER NOT NULL DEFAULT 0 CHECK (comment_count >= 0),
                vote_score      INTEGER NOT NULL DEFAULT 0,
                CHECK ((thread_type = 'item_discussion') = (item_id IS NOT NULL))
            );

            CREATE INDEX idx_threads_item ON threads(item_id);
            CREATE INDEX idx_threads_author ON threads(author_id);

            CREATE TABLE comments (
                id                  TEXT PRIMARY KEY,
                thread_id           TEXT NOT NULL REFERENCES threads(id) ON DELETE CASCADE,
                author_id           TEXT NOT NULL,
                content             TEXT NOT NULL CHECK (length(content) >= 1),
                parent_comment_id   TEXT REFERENCES comments(id),
                created_at          TEXT NOT NULL,
                updated_at          TEXT NOT NULL
            );

            CREATE INDEX idx_comments_thread ON comments(thread_id, created_at);
            CREATE INDEX idx_comments_parent ON comments(parent_comment_id);

            CREATE TABLE votes (
                thread_id   TEXT NOT NULL REFERENCES threads(id) ON DELETE CASCADE,
                user_id     TEXT NOT NULL,
                direction   INTEGER NOT NULL CHECK (direction IN (-1, 0, 1)),
                created_at  TEXT NOT NULL,
                updated_at  TEXT NOT NULL,
                PRIMARY KEY (thread_id, user_id)
            );

            INSERT INTO schema_version (version) VALUES (1);

            COMMIT;
            ",
        )?;
    }

    info!("Database migrations complete");
    Ok(())
}
