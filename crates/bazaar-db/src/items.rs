//! Item catalog: plain CRUD over listed goods.

use bazaar_types::api::{CreateItemRequest, ItemFilter, UpdateItemRequest};
use bazaar_types::models::Item;
use bazaar_types::{BazaarError, ItemId, Result};
use rusqlite::{Connection, OptionalExtension, params, params_from_iter};
use tracing::debug;

use crate::models::{ITEM_COLUMNS, item_from_row, now, to_sql_time};
use crate::{Database, storage_error};

impl Database {
    pub fn create_item(&self, req: CreateItemRequest) -> Result<Item> {
        req.validate()?;

        let ts = now();
        let item = Item {
            id: ItemId::new(),
            owner_id: req.owner_id,
            title: req.title,
            description: req.description,
            price_cents: req.price_cents,
            category: req.category,
            transaction_type: req.transaction_type,
            created_at: ts,
            updated_at: ts,
        };

        self.with_tx(|conn| {
            conn.execute(
                "INSERT INTO items (id, owner_id, title, description, price_cents, category,
                                    transaction_type, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)",
                params![
                    item.id.to_string(),
                    item.owner_id.to_string(),
                    item.title,
                    item.description,
                    item.price_cents,
                    item.category.as_str(),
                    item.transaction_type.as_str(),
                    to_sql_time(ts),
                ],
            )
            .map_err(storage_error)?;
            Ok(())
        })?;

        debug!(item_id = %item.id, category = %item.category, "item created");
        Ok(item)
    }

    pub fn get_item(&self, id: ItemId) -> Result<Item> {
        self.with_conn(|conn| require_item(conn, id))
    }

    pub fn list_items(&self, filter: &ItemFilter) -> Result<Vec<Item>> {
        let mut clauses: Vec<&str> = Vec::new();
        let mut values: Vec<String> = Vec::new();

        if let Some(id) = filter.item_id {
            clauses.push("id = ?");
            values.push(id.to_string());
        }
        if let Some(category) = filter.category {
            clauses.push("category = ?");
            values.push(category.as_str().to_string());
        }
        if let Some(transaction_type) = filter.transaction_type {
            clauses.push("transaction_type = ?");
            values.push(transaction_type.as_str().to_string());
        }

        let mut sql = format!("SELECT {ITEM_COLUMNS} FROM items");
        if !clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }
        sql.push_str(" ORDER BY created_at, rowid");

        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&sql).map_err(storage_error)?;
            let rows = stmt
                .query_map(params_from_iter(values.iter()), item_from_row)
                .map_err(storage_error)?
                .collect::<rusqlite::Result<Vec<_>>>()
                .map_err(storage_error)?;
            Ok(rows)
        })
    }

    /// Apply the fields present in `req`; everything else is kept.
    pub fn update_item(&self, id: ItemId, req: UpdateItemRequest) -> Result<Item> {
        req.validate()?;

        let item = self.with_tx(|conn| {
            let mut item = require_item(conn, id)?;

            if let Some(title) = req.title {
                item.title = title;
            }
            if let Some(description) = req.description {
                item.description = description;
            }
            if let Some(price_cents) = req.price_cents {
                item.price_cents = price_cents;
            }
            if let Some(category) = req.category {
                item.category = category;
            }
            if let Some(transaction_type) = req.transaction_type {
                item.transaction_type = transaction_type;
            }
            item.updated_at = now();

            conn.execute(
                "UPDATE items
                 SET title = ?2, description = ?3, price_cents = ?4, category = ?5,
                     transaction_type = ?6, updated_at = ?7
                 WHERE id = ?1",
                params![
                    id.to_string(),
                    item.title,
                    item.description,
                    item.price_cents,
                    item.category.as_str(),
                    item.transaction_type.as_str(),
                    to_sql_time(item.updated_at),
                ],
            )
            .map_err(storage_error)?;
            Ok(item)
        })?;

        debug!(item_id = %id, "item updated");
        Ok(item)
    }

    /// Threads that reference the item are left alone.
    pub fn delete_item(&self, id: ItemId) -> Result<()> {
        self.with_tx(|conn| {
            let deleted = conn
                .execute("DELETE FROM items WHERE id = ?1", [id.to_string()])
                .map_err(storage_error)?;
            if deleted == 0 {
                return Err(BazaarError::not_found("Item", id));
            }
            Ok(())
        })?;

        debug!(item_id = %id, "item deleted");
        Ok(())
    }
}

fn require_item(conn: &Connection, id: ItemId) -> Result<Item> {
    conn.query_row(
        &format!("SELECT {ITEM_COLUMNS} FROM items WHERE id = ?1"),
        [id.to_string()],
        item_from_row,
    )
    .optional()
    .map_err(storage_error)?
    .ok_or_else(|| BazaarError::not_found("Item", id))
}
