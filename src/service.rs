//! Hierarchy service
//!
//! Orchestrates category CRUD: every mutation runs the invariant
//! validator first, then performs a single write through the store
//! adapter. Read-side tree, path, and statistics queries go through
//! the descendant resolver. No retries happen here; validation errors
//! surface before any write and store errors propagate unchanged.

use serde::Serialize;

use crate::error::{Error, Result};
use crate::ledger::{TransactionAggregate, TransactionLedger, TransactionSummary};
use crate::query::{self, CategoryStats};
use crate::storage::category::{Category, CategoryId, CategoryPatch, NewCategory, TenantId};
use crate::storage::CategoryStore;
use crate::validation::{self, ANCESTOR_WALK_LIMIT};

/// How many recent transactions `find_one` attaches
pub const RECENT_TRANSACTION_LIMIT: usize = 10;

/// How many child levels `find_all` eagerly loads under each root.
/// A display optimization only; deeper levels are reachable through
/// `find_one` and `category_path`.
pub const EAGER_TREE_DEPTH: u32 = 3;

/// A category with its immediate relations attached
#[derive(Debug, Clone, Serialize)]
pub struct CategoryDetail {
    pub category: Category,
    pub parent: Option<Category>,
    pub children: Vec<Category>,
    pub recent_transactions: Vec<TransactionSummary>,
}

/// A category with eagerly loaded nested children
#[derive(Debug, Clone, Serialize)]
pub struct CategoryNode {
    pub category: Category,
    pub children: Vec<CategoryNode>,
}

/// The public face of the category engine
pub struct CategoryService<S, L> {
    store: S,
    ledger: L,
}

impl<S: CategoryStore, L: TransactionLedger> CategoryService<S, L> {
    pub fn new(store: S, ledger: L) -> Self {
        Self { store, ledger }
    }

    /// Create a category after validating depth, uniqueness, and parent
    pub fn create(&self, tenant: TenantId, new: NewCategory) -> Result<CategoryDetail> {
        validation::validate_create(&self.store, tenant, &new.name, new.parent_id)?;
        let category = self.store.insert(tenant, &new)?;
        tracing::debug!(tenant, id = category.id, name = %category.name, "category created");

        let parent = match category.parent_id {
            Some(pid) => self.store.get(tenant, pid)?,
            None => None,
        };
        Ok(CategoryDetail {
            category,
            parent,
            children: Vec::new(),
            recent_transactions: Vec::new(),
        })
    }

    /// Fetch one category with parent, direct children, and recent
    /// transaction summaries attached
    pub fn find_one(&self, tenant: TenantId, id: CategoryId) -> Result<CategoryDetail> {
        let category = self.store.get(tenant, id)?.ok_or(Error::NotFound { id })?;
        let parent = match category.parent_id {
            Some(pid) => self.store.get(tenant, pid)?,
            None => None,
        };
        let children = self.store.list_children(tenant, id)?;
        let recent_transactions = self
            .ledger
            .recent_for_category(id, RECENT_TRANSACTION_LIMIT)?;

        Ok(CategoryDetail {
            category,
            parent,
            children,
            recent_transactions,
        })
    }

    /// All root categories, each with up to [`EAGER_TREE_DEPTH`] levels
    /// of nested children
    pub fn find_all(&self, tenant: TenantId) -> Result<Vec<CategoryNode>> {
        self.store
            .list_roots(tenant)?
            .into_iter()
            .map(|root| self.subtree(tenant, root, EAGER_TREE_DEPTH))
            .collect()
    }

    fn subtree(&self, tenant: TenantId, category: Category, levels: u32) -> Result<CategoryNode> {
        let children = if levels == 0 {
            Vec::new()
        } else {
            self.store
                .list_children(tenant, category.id)?
                .into_iter()
                .map(|child| self.subtree(tenant, child, levels - 1))
                .collect::<Result<Vec<_>>>()?
        };
        Ok(CategoryNode { category, children })
    }

    /// Apply a partial update. Omitted fields are untouched;
    /// `parent_id: Some(None)` makes the category a root.
    pub fn update(
        &self,
        tenant: TenantId,
        id: CategoryId,
        patch: CategoryPatch,
    ) -> Result<CategoryDetail> {
        let node = self.store.get(tenant, id)?.ok_or(Error::NotFound { id })?;
        if patch.is_empty() {
            return self.find_one(tenant, id);
        }

        let effective_name = patch.name.as_deref().unwrap_or(&node.name);
        if let Some(new_parent) = patch.parent_id {
            validation::validate_move(&self.store, tenant, &node, new_parent, effective_name)?;
        } else if patch.name.is_some() {
            validation::validate_rename(&self.store, tenant, id, effective_name, node.parent_id)?;
        }

        self.store.update(tenant, id, &patch)?;
        tracing::debug!(tenant, id, "category updated");
        self.find_one(tenant, id)
    }

    /// Soft-delete a category with no active children and no
    /// associated transactions
    pub fn remove(&self, tenant: TenantId, id: CategoryId) -> Result<()> {
        self.store.get(tenant, id)?.ok_or(Error::NotFound { id })?;

        let children = self.store.count_children(tenant, id)?;
        if children > 0 {
            return Err(Error::HasChildren { id, children });
        }
        let transactions = self.ledger.count_for_category(id)?;
        if transactions > 0 {
            return Err(Error::HasTransactions { id, transactions });
        }

        self.store.soft_delete(tenant, id)?;
        tracing::debug!(tenant, id, "category soft-deleted");
        Ok(())
    }

    /// Root-first ancestor chain ending at the category itself
    pub fn category_path(&self, tenant: TenantId, id: CategoryId) -> Result<Vec<Category>> {
        let node = self.store.get(tenant, id)?.ok_or(Error::NotFound { id })?;

        let mut path = vec![node];
        let mut steps = 0u32;
        while let Some(parent_id) = path[0].parent_id {
            steps += 1;
            if steps > ANCESTOR_WALK_LIMIT {
                return Err(Error::HierarchyCorrupt { start: id });
            }
            let parent = self
                .store
                .get(tenant, parent_id)?
                .ok_or(Error::HierarchyCorrupt { start: id })?;
            path.insert(0, parent);
        }
        Ok(path)
    }

    /// Direct, descendant, and total transaction figures for a subtree
    pub fn category_stats(&self, tenant: TenantId, id: CategoryId) -> Result<CategoryStats> {
        self.store.get(tenant, id)?.ok_or(Error::NotFound { id })?;

        let direct = self.ledger.aggregate_for_category(id)?;
        let descendants = query::descendants(&self.store, tenant, id)?;

        let mut descendant_total = TransactionAggregate::default();
        for category in &descendants {
            let agg = self.ledger.aggregate_for_category(category.id)?;
            descendant_total.count += agg.count;
            descendant_total.amount_cents += agg.amount_cents;
        }

        Ok(CategoryStats::from_parts(
            id,
            direct,
            descendant_total,
            descendants.len(),
        ))
    }
}
