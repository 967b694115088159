//! SQLite-backed category store
//!
//! The production adapter. Descendant queries use a single recursive
//! CTE bounded by the ancestor-walk safety limit. A partial unique
//! index on `(tenant_id, parent_id, name)` over non-deleted rows is
//! the last line of defense against validate-then-write races; a
//! constraint violation on insert or update surfaces as
//! [`Error::DuplicateName`].

use std::path::Path;

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};

use super::category::{Category, CategoryId, CategoryPatch, NewCategory, TenantId};
use super::CategoryStore;
use crate::error::{Error, Result};
use crate::validation::ANCESTOR_WALK_LIMIT;

const SCHEMA_SQL: &str = "\
CREATE TABLE IF NOT EXISTS categories (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    tenant_id   INTEGER NOT NULL,
    name        TEXT NOT NULL,
    description TEXT,
    parent_id   INTEGER REFERENCES categories(id),
    created_at  TEXT NOT NULL,
    updated_at  TEXT NOT NULL,
    deleted_at  TEXT
);

CREATE UNIQUE INDEX IF NOT EXISTS idx_categories_sibling_name
    ON categories(tenant_id, COALESCE(parent_id, 0), name)
    WHERE deleted_at IS NULL;

CREATE INDEX IF NOT EXISTS idx_categories_parent
    ON categories(tenant_id, parent_id);
";

const SELECT_COLUMNS: &str =
    "id, tenant_id, name, description, parent_id, created_at, updated_at, deleted_at";

/// Level-grouped descendant query. `UNION` deduplicates revisited rows
/// and the depth bound stops expansion even on corrupt (cyclic) data.
const DESCENDANTS_SQL: &str = "\
WITH RECURSIVE subtree(id, depth) AS (
    SELECT id, 0
      FROM categories
     WHERE id = ?1 AND tenant_id = ?2 AND deleted_at IS NULL

    UNION

    SELECT c.id, s.depth + 1
      FROM subtree s
      JOIN categories c ON c.parent_id = s.id
     WHERE c.tenant_id = ?2
       AND c.deleted_at IS NULL
       AND s.depth < ?3
)
SELECT c.id, c.tenant_id, c.name, c.description, c.parent_id,
       c.created_at, c.updated_at, c.deleted_at, MIN(s.depth) AS depth
  FROM subtree s
  JOIN categories c ON c.id = s.id
 WHERE s.depth > 0
 GROUP BY c.id
 ORDER BY depth ASC, c.name ASC, c.id ASC";

/// SQLite-backed implementation of [`CategoryStore`]
pub struct SqliteStore {
    conn: Connection,
    recursive: bool,
}

impl SqliteStore {
    /// Open (or create) a store at the given path
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_connection(Connection::open(path)?)
    }

    /// Open an in-memory store (used by tests and the CLI `--ephemeral` mode)
    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA_SQL)?;
        Ok(Self {
            conn,
            recursive: true,
        })
    }

    /// Disable the native recursive query, forcing the resolver onto
    /// its iterative fallback. Exists so the fallback can be exercised
    /// against the same data as the native path.
    pub fn with_recursive_disabled(mut self) -> Self {
        self.recursive = false;
        self
    }

    fn row_to_category(row: &Row<'_>) -> rusqlite::Result<Category> {
        Ok(Category {
            id: row.get(0)?,
            tenant_id: row.get(1)?,
            name: row.get(2)?,
            description: row.get(3)?,
            parent_id: row.get(4)?,
            created_at: row.get(5)?,
            updated_at: row.get(6)?,
            deleted_at: row.get(7)?,
        })
    }

    /// Map a unique-index violation to `DuplicateName`; everything else
    /// passes through as a store error.
    fn map_write_err(err: rusqlite::Error, name: &str) -> Error {
        if let rusqlite::Error::SqliteFailure(e, _) = &err {
            // Only unique-index violations; other constraint classes
            // (foreign key, check) are not name collisions.
            if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE {
                return Error::DuplicateName {
                    name: name.to_string(),
                };
            }
        }
        err.into()
    }
}

impl CategoryStore for SqliteStore {
    fn get(&self, tenant: TenantId, id: CategoryId) -> Result<Option<Category>> {
        let sql = format!(
            "SELECT {SELECT_COLUMNS} FROM categories \
             WHERE id = ?1 AND tenant_id = ?2 AND deleted_at IS NULL"
        );
        let row = self
            .conn
            .query_row(&sql, params![id, tenant], Self::row_to_category)
            .optional()?;
        Ok(row)
    }

    fn get_by_parent_and_name(
        &self,
        tenant: TenantId,
        parent_id: Option<CategoryId>,
        name: &str,
    ) -> Result<Option<Category>> {
        // COALESCE folds the root level (NULL parent) into a single key;
        // row ids start at 1, so 0 is free as the sentinel.
        let sql = format!(
            "SELECT {SELECT_COLUMNS} FROM categories \
             WHERE tenant_id = ?1 \
               AND COALESCE(parent_id, 0) = COALESCE(?2, 0) \
               AND name = ?3 \
               AND deleted_at IS NULL"
        );
        let row = self
            .conn
            .query_row(&sql, params![tenant, parent_id, name], Self::row_to_category)
            .optional()?;
        Ok(row)
    }

    fn list_children(&self, tenant: TenantId, parent_id: CategoryId) -> Result<Vec<Category>> {
        let sql = format!(
            "SELECT {SELECT_COLUMNS} FROM categories \
             WHERE tenant_id = ?1 AND parent_id = ?2 AND deleted_at IS NULL \
             ORDER BY name ASC, id ASC"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params![tenant, parent_id], Self::row_to_category)?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(Into::into)
    }

    fn list_roots(&self, tenant: TenantId) -> Result<Vec<Category>> {
        let sql = format!(
            "SELECT {SELECT_COLUMNS} FROM categories \
             WHERE tenant_id = ?1 AND parent_id IS NULL AND deleted_at IS NULL \
             ORDER BY name ASC, id ASC"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params![tenant], Self::row_to_category)?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(Into::into)
    }

    fn count_children(&self, tenant: TenantId, id: CategoryId) -> Result<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM categories \
             WHERE tenant_id = ?1 AND parent_id = ?2 AND deleted_at IS NULL",
            params![tenant, id],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    fn descendants_native(&self, tenant: TenantId, id: CategoryId) -> Result<Vec<Category>> {
        if !self.recursive {
            return Err(Error::RecursiveUnsupported);
        }
        let mut stmt = self.conn.prepare(DESCENDANTS_SQL)?;
        let rows = stmt.query_map(
            params![id, tenant, ANCESTOR_WALK_LIMIT],
            Self::row_to_category,
        )?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(Into::into)
    }

    fn insert(&self, tenant: TenantId, new: &NewCategory) -> Result<Category> {
        let now = Utc::now();
        self.conn
            .execute(
                "INSERT INTO categories \
                 (tenant_id, name, description, parent_id, created_at, updated_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![tenant, new.name, new.description, new.parent_id, now, now],
            )
            .map_err(|e| Self::map_write_err(e, &new.name))?;

        Ok(Category {
            id: self.conn.last_insert_rowid(),
            tenant_id: tenant,
            name: new.name.clone(),
            description: new.description.clone(),
            parent_id: new.parent_id,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        })
    }

    fn update(
        &self,
        tenant: TenantId,
        id: CategoryId,
        patch: &CategoryPatch,
    ) -> Result<Category> {
        let current = self.get(tenant, id)?.ok_or(Error::NotFound { id })?;

        let name = patch.name.clone().unwrap_or(current.name);
        let description = match &patch.description {
            Some(d) => d.clone(),
            None => current.description,
        };
        let parent_id = match patch.parent_id {
            Some(p) => p,
            None => current.parent_id,
        };
        let now = Utc::now();

        self.conn
            .execute(
                "UPDATE categories \
                 SET name = ?1, description = ?2, parent_id = ?3, updated_at = ?4 \
                 WHERE id = ?5 AND tenant_id = ?6 AND deleted_at IS NULL",
                params![name, description, parent_id, now, id, tenant],
            )
            .map_err(|e| Self::map_write_err(e, &name))?;

        Ok(Category {
            id,
            tenant_id: tenant,
            name,
            description,
            parent_id,
            created_at: current.created_at,
            updated_at: now,
            deleted_at: None,
        })
    }

    fn soft_delete(&self, tenant: TenantId, id: CategoryId) -> Result<()> {
        let now = Utc::now();
        let affected = self.conn.execute(
            "UPDATE categories SET deleted_at = ?1, updated_at = ?1 \
             WHERE id = ?2 AND tenant_id = ?3 AND deleted_at IS NULL",
            params![now, id, tenant],
        )?;
        if affected == 0 {
            return Err(Error::NotFound { id });
        }
        Ok(())
    }
}
