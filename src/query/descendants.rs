//! Descendant resolution
//!
//! Computes the full descendant set of a category. The preferred path
//! is the store's single recursive query; if the store cannot run one
//! (or the query fails for any reason) the resolver expands the tree
//! iteratively, one store call per level, with a visited set so corrupt
//! data can never make it loop forever.
//!
//! Both paths return the same logical set, grouped by level (all
//! children before any grandchild) and ordered by name then id within
//! a level.

use std::collections::HashSet;

use crate::error::{Error, Result};
use crate::storage::category::{Category, CategoryId, TenantId};
use crate::storage::CategoryStore;

/// Resolve the descendant set of `id`, native query first.
pub fn descendants<S: CategoryStore>(
    store: &S,
    tenant: TenantId,
    id: CategoryId,
) -> Result<Vec<Category>> {
    match store.descendants_native(tenant, id) {
        Ok(set) => Ok(set),
        Err(Error::RecursiveUnsupported) => descendants_fallback(store, tenant, id),
        Err(err) => {
            tracing::warn!(
                category = id,
                error = %err,
                "native descendant query failed, using iterative fallback"
            );
            descendants_fallback(store, tenant, id)
        }
    }
}

/// Iterative level-order expansion of the subtree under `id`.
///
/// The visited set is a cycle guard only: well-formed trees never
/// revisit a node, but the walk must terminate even if the stored
/// parent pointers are corrupt.
pub fn descendants_fallback<S: CategoryStore>(
    store: &S,
    tenant: TenantId,
    id: CategoryId,
) -> Result<Vec<Category>> {
    let mut visited: HashSet<CategoryId> = HashSet::new();
    visited.insert(id);

    let mut result = Vec::new();
    let mut frontier = vec![id];

    while !frontier.is_empty() {
        let mut level: Vec<Category> = Vec::new();
        for node in frontier.drain(..) {
            for child in store.list_children(tenant, node)? {
                if visited.insert(child.id) {
                    level.push(child);
                }
            }
        }
        level.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        frontier.extend(level.iter().map(|c| c.id));
        result.extend(level);
    }

    Ok(result)
}
