//! In-memory category store
//!
//! Models a backing store without recursive query support, so every
//! descendant lookup through it exercises the resolver's iterative
//! fallback. Also used as the fast store for unit tests.
//!
//! Sibling-name uniqueness is enforced on write exactly like the SQLite
//! unique index, so validate-then-write races fail the same way on
//! both stores.

use std::cell::RefCell;
use std::collections::BTreeMap;

use chrono::Utc;

use super::category::{Category, CategoryId, CategoryPatch, NewCategory, TenantId};
use super::CategoryStore;
use crate::error::{Error, Result};

#[derive(Default)]
struct Inner {
    next_id: CategoryId,
    rows: BTreeMap<CategoryId, Category>,
}

/// In-memory implementation of [`CategoryStore`]
#[derive(Default)]
pub struct MemoryStore {
    inner: RefCell<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn sibling_conflict(
        inner: &Inner,
        tenant: TenantId,
        parent_id: Option<CategoryId>,
        name: &str,
        exclude: Option<CategoryId>,
    ) -> bool {
        inner.rows.values().any(|c| {
            c.tenant_id == tenant
                && !c.is_deleted()
                && c.parent_id == parent_id
                && c.name == name
                && Some(c.id) != exclude
        })
    }

    /// Rewire a parent pointer without any validation. Only exists so
    /// tests can plant corrupt (cyclic) data and watch the defensive
    /// guards fire.
    #[cfg(test)]
    pub(crate) fn set_parent_unchecked(&self, id: CategoryId, parent_id: Option<CategoryId>) {
        let mut inner = self.inner.borrow_mut();
        if let Some(row) = inner.rows.get_mut(&id) {
            row.parent_id = parent_id;
        }
    }
}

impl CategoryStore for MemoryStore {
    fn get(&self, tenant: TenantId, id: CategoryId) -> Result<Option<Category>> {
        let inner = self.inner.borrow();
        Ok(inner
            .rows
            .get(&id)
            .filter(|c| c.tenant_id == tenant && !c.is_deleted())
            .cloned())
    }

    fn get_by_parent_and_name(
        &self,
        tenant: TenantId,
        parent_id: Option<CategoryId>,
        name: &str,
    ) -> Result<Option<Category>> {
        let inner = self.inner.borrow();
        Ok(inner
            .rows
            .values()
            .find(|c| {
                c.tenant_id == tenant
                    && !c.is_deleted()
                    && c.parent_id == parent_id
                    && c.name == name
            })
            .cloned())
    }

    fn list_children(&self, tenant: TenantId, parent_id: CategoryId) -> Result<Vec<Category>> {
        let inner = self.inner.borrow();
        let mut children: Vec<Category> = inner
            .rows
            .values()
            .filter(|c| {
                c.tenant_id == tenant && !c.is_deleted() && c.parent_id == Some(parent_id)
            })
            .cloned()
            .collect();
        children.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(children)
    }

    fn list_roots(&self, tenant: TenantId) -> Result<Vec<Category>> {
        let inner = self.inner.borrow();
        let mut roots: Vec<Category> = inner
            .rows
            .values()
            .filter(|c| c.tenant_id == tenant && !c.is_deleted() && c.is_root())
            .cloned()
            .collect();
        roots.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(roots)
    }

    fn count_children(&self, tenant: TenantId, id: CategoryId) -> Result<u64> {
        Ok(self.list_children(tenant, id)?.len() as u64)
    }

    fn descendants_native(&self, _tenant: TenantId, _id: CategoryId) -> Result<Vec<Category>> {
        // No recursive query facility; the resolver falls back.
        Err(Error::RecursiveUnsupported)
    }

    fn insert(&self, tenant: TenantId, new: &NewCategory) -> Result<Category> {
        let mut inner = self.inner.borrow_mut();
        if Self::sibling_conflict(&inner, tenant, new.parent_id, &new.name, None) {
            return Err(Error::DuplicateName {
                name: new.name.clone(),
            });
        }

        inner.next_id += 1;
        let now = Utc::now();
        let category = Category {
            id: inner.next_id,
            tenant_id: tenant,
            name: new.name.clone(),
            description: new.description.clone(),
            parent_id: new.parent_id,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };
        inner.rows.insert(category.id, category.clone());
        Ok(category)
    }

    fn update(
        &self,
        tenant: TenantId,
        id: CategoryId,
        patch: &CategoryPatch,
    ) -> Result<Category> {
        let mut inner = self.inner.borrow_mut();
        let current = inner
            .rows
            .get(&id)
            .filter(|c| c.tenant_id == tenant && !c.is_deleted())
            .cloned()
            .ok_or(Error::NotFound { id })?;

        let name = patch.name.clone().unwrap_or(current.name);
        let parent_id = patch.parent_id.unwrap_or(current.parent_id);
        if Self::sibling_conflict(&inner, tenant, parent_id, &name, Some(id)) {
            return Err(Error::DuplicateName { name });
        }

        let row = inner.rows.get_mut(&id).ok_or(Error::NotFound { id })?;
        row.name = name;
        row.parent_id = parent_id;
        if let Some(description) = &patch.description {
            row.description = description.clone();
        }
        row.updated_at = Utc::now();
        Ok(row.clone())
    }

    fn soft_delete(&self, tenant: TenantId, id: CategoryId) -> Result<()> {
        let mut inner = self.inner.borrow_mut();
        let row = inner
            .rows
            .get_mut(&id)
            .filter(|c| c.tenant_id == tenant && !c.is_deleted())
            .ok_or(Error::NotFound { id })?;
        row.deleted_at = Some(Utc::now());
        row.updated_at = Utc::now();
        Ok(())
    }
}
