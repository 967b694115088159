//! Invariant validation for tree mutations
//!
//! Pure decision functions that run before any write: depth bound,
//! acyclicity, and level-scoped name uniqueness. A failed validation
//! leaves no partial state because nothing has been written yet.

use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::query::descendants;
use crate::storage::category::{Category, CategoryId, TenantId};
use crate::storage::CategoryStore;

/// Maximum depth of the tree; roots are at depth 1
pub const MAX_DEPTH: u32 = 5;

/// Hard cap on upward parent walks. Normal operation terminates well
/// within `MAX_DEPTH`; exceeding this bound means the stored data
/// already contains a cycle.
pub const ANCESTOR_WALK_LIMIT: u32 = 10;

/// Check that a proposed create is legal
pub fn validate_create<S: CategoryStore>(
    store: &S,
    tenant: TenantId,
    name: &str,
    parent_id: Option<CategoryId>,
) -> Result<()> {
    ensure_name(name)?;

    if let Some(pid) = parent_id {
        let parent = store
            .get(tenant, pid)?
            .ok_or(Error::ParentNotFound { id: pid })?;
        if node_depth(store, tenant, parent.id)? >= MAX_DEPTH {
            return Err(Error::DepthExceeded { max: MAX_DEPTH });
        }
    }

    ensure_name_free(store, tenant, parent_id, name, None)
}

/// Check that moving `node` under `new_parent_id` is legal.
///
/// `name` is the node's effective name after the whole update (its
/// current name, or the new one if the caller renames in the same
/// operation), so the uniqueness check runs against what will actually
/// be written.
pub fn validate_move<S: CategoryStore>(
    store: &S,
    tenant: TenantId,
    node: &Category,
    new_parent_id: Option<CategoryId>,
    name: &str,
) -> Result<()> {
    ensure_name(name)?;

    if let Some(pid) = new_parent_id {
        if pid == node.id {
            return Err(Error::SelfParent { id: node.id });
        }

        // Reparenting under one's own descendant would detach the
        // subtree into a cycle.
        let subtree = descendants(store, tenant, node.id)?;
        if subtree.iter().any(|c| c.id == pid) {
            return Err(Error::CircularReference {
                id: node.id,
                new_parent: pid,
            });
        }

        let parent = store
            .get(tenant, pid)?
            .ok_or(Error::ParentNotFound { id: pid })?;

        // The whole subtree moves, so the node's deepest descendant
        // must stay within the cap, not just the node itself.
        let parent_depth = node_depth(store, tenant, parent.id)?;
        if parent_depth + subtree_height(node.id, &subtree) > MAX_DEPTH {
            return Err(Error::DepthExceeded { max: MAX_DEPTH });
        }
    }

    ensure_name_free(store, tenant, new_parent_id, name, Some(node.id))
}

/// Height in levels of the subtree rooted at `root`: 1 for a leaf.
///
/// `subtree` is the resolver's level-grouped descendant set, so every
/// node's parent appears before the node itself.
fn subtree_height(root: CategoryId, subtree: &[Category]) -> u32 {
    let mut levels: HashMap<CategoryId, u32> = HashMap::new();
    levels.insert(root, 1);

    let mut height = 1;
    for category in subtree {
        let level = category
            .parent_id
            .and_then(|p| levels.get(&p))
            .map_or(2, |parent_level| parent_level + 1);
        levels.insert(category.id, level);
        height = height.max(level);
    }
    height
}

/// Check that renaming a node keeps sibling names unique
pub fn validate_rename<S: CategoryStore>(
    store: &S,
    tenant: TenantId,
    node_id: CategoryId,
    new_name: &str,
    effective_parent_id: Option<CategoryId>,
) -> Result<()> {
    ensure_name(new_name)?;
    ensure_name_free(store, tenant, effective_parent_id, new_name, Some(node_id))
}

/// Depth of a node: 1 for a root, parent's depth + 1 otherwise.
///
/// Walks `parent_id` upward with an explicit step counter; blowing the
/// counter means the hierarchy is corrupt, which fails this operation
/// but nothing else.
pub fn node_depth<S: CategoryStore>(
    store: &S,
    tenant: TenantId,
    id: CategoryId,
) -> Result<u32> {
    let mut current = store.get(tenant, id)?.ok_or(Error::NotFound { id })?;
    let mut depth = 1u32;
    let mut steps = 0u32;

    while let Some(parent_id) = current.parent_id {
        steps += 1;
        if steps > ANCESTOR_WALK_LIMIT {
            return Err(Error::HierarchyCorrupt { start: id });
        }
        // A dangling parent pointer is corruption too: the deletion
        // guard never removes a node that still has children.
        current = store
            .get(tenant, parent_id)?
            .ok_or(Error::HierarchyCorrupt { start: id })?;
        depth += 1;
    }

    Ok(depth)
}

fn ensure_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(Error::InvalidName {
            reason: "name must not be empty",
        });
    }
    Ok(())
}

fn ensure_name_free<S: CategoryStore>(
    store: &S,
    tenant: TenantId,
    parent_id: Option<CategoryId>,
    name: &str,
    exclude: Option<CategoryId>,
) -> Result<()> {
    if let Some(existing) = store.get_by_parent_and_name(tenant, parent_id, name)? {
        if Some(existing.id) != exclude {
            return Err(Error::DuplicateName {
                name: name.to_string(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::category::NewCategory;
    use crate::storage::memory::MemoryStore;

    const TENANT: TenantId = 1;

    /// Chain of `len` categories, root first
    fn chain(store: &MemoryStore, prefix: &str, len: u32) -> Vec<CategoryId> {
        let mut ids = Vec::new();
        let mut parent = None;
        for i in 0..len {
            let new = match parent {
                None => NewCategory::root(format!("{prefix}-{i}")),
                Some(p) => NewCategory::child_of(p, format!("{prefix}-{i}")),
            };
            let cat = store.insert(TENANT, &new).unwrap();
            parent = Some(cat.id);
            ids.push(cat.id);
        }
        ids
    }

    #[test]
    fn test_depth_bound() {
        let store = MemoryStore::new();
        let ids = chain(&store, "level", MAX_DEPTH);

        assert_eq!(node_depth(&store, TENANT, ids[0]).unwrap(), 1);
        assert_eq!(node_depth(&store, TENANT, ids[4]).unwrap(), 5);

        // Under a depth-4 parent a new node lands exactly on the cap.
        assert!(validate_create(&store, TENANT, "ok", Some(ids[3])).is_ok());
        // Under a depth-5 parent it would exceed it.
        assert!(matches!(
            validate_create(&store, TENANT, "nope", Some(ids[4])).unwrap_err(),
            Error::DepthExceeded { max: 5 }
        ));
    }

    #[test]
    fn test_root_uniqueness_is_per_level() {
        let store = MemoryStore::new();
        let food = store.insert(TENANT, &NewCategory::root("Food")).unwrap();

        assert!(matches!(
            validate_create(&store, TENANT, "Food", None).unwrap_err(),
            Error::DuplicateName { .. }
        ));
        // Same name under another node is a different level.
        assert!(validate_create(&store, TENANT, "Food", Some(food.id)).is_ok());
    }

    #[test]
    fn test_parent_must_exist_in_tenant() {
        let store = MemoryStore::new();
        let other = store.insert(2, &NewCategory::root("Food")).unwrap();

        assert!(matches!(
            validate_create(&store, TENANT, "Fruit", Some(other.id)).unwrap_err(),
            Error::ParentNotFound { .. }
        ));
    }

    #[test]
    fn test_self_parent_rejected() {
        let store = MemoryStore::new();
        let a = store.insert(TENANT, &NewCategory::root("A")).unwrap();
        let b = store.insert(TENANT, &NewCategory::child_of(a.id, "B")).unwrap();

        assert!(matches!(
            validate_move(&store, TENANT, &b, Some(b.id), &b.name).unwrap_err(),
            Error::SelfParent { .. }
        ));
    }

    #[test]
    fn test_move_under_descendant_rejected() {
        let store = MemoryStore::new();
        let a = store.insert(TENANT, &NewCategory::root("A")).unwrap();
        let b = store.insert(TENANT, &NewCategory::child_of(a.id, "B")).unwrap();
        let c = store.insert(TENANT, &NewCategory::child_of(b.id, "C")).unwrap();

        assert!(matches!(
            validate_move(&store, TENANT, &a, Some(c.id), &a.name).unwrap_err(),
            Error::CircularReference { .. }
        ));
        // Sideways moves stay legal.
        assert!(validate_move(&store, TENANT, &c, Some(a.id), &c.name).is_ok());
    }

    #[test]
    fn test_move_counts_subtree_height() {
        let store = MemoryStore::new();
        let r = chain(&store, "r", 3);
        // Separate subtree of height 3: x -> y -> z.
        let x = store.insert(TENANT, &NewCategory::root("x")).unwrap();
        let y = store.insert(TENANT, &NewCategory::child_of(x.id, "y")).unwrap();
        let z = store.insert(TENANT, &NewCategory::child_of(y.id, "z")).unwrap();

        // Under the depth-3 parent, z would land at depth 6.
        assert!(matches!(
            validate_move(&store, TENANT, &x, Some(r[2]), &x.name).unwrap_err(),
            Error::DepthExceeded { max: 5 }
        ));
        // Under the depth-2 parent, z lands exactly on the cap.
        assert!(validate_move(&store, TENANT, &x, Some(r[1]), &x.name).is_ok());

        // A leaf keeps the old behavior: depth-4 parent fine, depth-5 not.
        let deep = chain(&store, "deep", 5);
        assert!(validate_move(&store, TENANT, &z, Some(deep[3]), "moved").is_ok());
        assert!(matches!(
            validate_move(&store, TENANT, &z, Some(deep[4]), "moved").unwrap_err(),
            Error::DepthExceeded { .. }
        ));
    }

    #[test]
    fn test_rename_ignores_self() {
        let store = MemoryStore::new();
        let a = store.insert(TENANT, &NewCategory::root("A")).unwrap();
        store.insert(TENANT, &NewCategory::root("B")).unwrap();

        // Keeping one's own name is not a collision.
        assert!(validate_rename(&store, TENANT, a.id, "A", None).is_ok());
        assert!(matches!(
            validate_rename(&store, TENANT, a.id, "B", None).unwrap_err(),
            Error::DuplicateName { .. }
        ));
    }

    #[test]
    fn test_blank_names_rejected() {
        let store = MemoryStore::new();
        assert!(matches!(
            validate_create(&store, TENANT, "", None).unwrap_err(),
            Error::InvalidName { .. }
        ));
        assert!(matches!(
            validate_create(&store, TENANT, "   ", None).unwrap_err(),
            Error::InvalidName { .. }
        ));
    }

    #[test]
    fn test_ancestor_walk_detects_corruption() {
        let store = MemoryStore::new();
        let a = store.insert(TENANT, &NewCategory::root("A")).unwrap();
        let b = store.insert(TENANT, &NewCategory::child_of(a.id, "B")).unwrap();
        store.set_parent_unchecked(a.id, Some(b.id));

        assert!(matches!(
            node_depth(&store, TENANT, a.id).unwrap_err(),
            Error::HierarchyCorrupt { .. }
        ));
        // The corruption fails creates under the cycle, nothing else.
        assert!(matches!(
            validate_create(&store, TENANT, "C", Some(a.id)).unwrap_err(),
            Error::HierarchyCorrupt { .. }
        ));
        assert!(validate_create(&store, TENANT, "Elsewhere", None).is_ok());
    }
}
