//! Storage layer for the category engine
//!
//! The [`CategoryStore`] trait is the only way the engine touches the
//! backing store. Every method takes an explicit tenant id so tenant
//! scoping cannot be bypassed at a call site, and every read excludes
//! soft-deleted rows.

pub mod category;
pub mod memory;
pub mod sqlite;

use crate::error::Result;
use self::category::{Category, CategoryId, CategoryPatch, NewCategory, TenantId};

/// Tenant-scoped adapter over the backing store.
///
/// Implementations must enforce two things regardless of the caller:
/// soft-deleted rows are invisible to every read, and no method may
/// observe or mutate a row outside the given tenant. Sibling-name
/// uniqueness among non-deleted rows must also be enforced at write
/// time, as the last line of defense against validate-then-write races.
pub trait CategoryStore {
    /// Point lookup; `Ok(None)` if missing, deleted, or another tenant's
    fn get(&self, tenant: TenantId, id: CategoryId) -> Result<Option<Category>>;

    /// Level-scoped name lookup; `parent_id = None` searches the roots
    fn get_by_parent_and_name(
        &self,
        tenant: TenantId,
        parent_id: Option<CategoryId>,
        name: &str,
    ) -> Result<Option<Category>>;

    /// Direct non-deleted children, ordered by name then id
    fn list_children(&self, tenant: TenantId, parent_id: CategoryId) -> Result<Vec<Category>>;

    /// Non-deleted roots, ordered by name then id
    fn list_roots(&self, tenant: TenantId) -> Result<Vec<Category>>;

    /// Number of direct non-deleted children
    fn count_children(&self, tenant: TenantId, id: CategoryId) -> Result<u64>;

    /// Full descendant set via a single recursive server-side query.
    ///
    /// Rows are grouped by level (all children before any grandchild)
    /// and ordered by name then id within a level. Stores without
    /// recursive query support return [`crate::Error::RecursiveUnsupported`];
    /// the resolver then falls back to iterative expansion.
    fn descendants_native(&self, tenant: TenantId, id: CategoryId) -> Result<Vec<Category>>;

    /// Insert a new row; a sibling-name collision maps to
    /// [`crate::Error::DuplicateName`]
    fn insert(&self, tenant: TenantId, new: &NewCategory) -> Result<Category>;

    /// Apply the supplied fields and bump `updated_at`
    fn update(&self, tenant: TenantId, id: CategoryId, patch: &CategoryPatch)
        -> Result<Category>;

    /// Set the soft-delete tombstone
    fn soft_delete(&self, tenant: TenantId, id: CategoryId) -> Result<()>;
}
