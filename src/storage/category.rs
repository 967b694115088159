//! Category model
//!
//! A Category is a node in a per-tenant tree used to classify ledger
//! transactions. Soft deletion is modeled as a tombstone timestamp:
//! a non-null `deleted_at` removes the node from every active-tree
//! operation without physically deleting the row.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifier of a category row
pub type CategoryId = i64;

/// Identifier of the owning household
pub type TenantId = i64;

/// A category in the tenant's tree
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    /// Unique identifier
    pub id: CategoryId,

    /// Owning household; no operation crosses this boundary
    pub tenant_id: TenantId,

    /// Display name, unique among non-deleted siblings
    pub name: String,

    /// Optional free-form description
    pub description: Option<String>,

    /// Parent category within the same tenant; `None` for roots
    pub parent_id: Option<CategoryId>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,

    /// Soft-delete tombstone
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Category {
    /// A root has no parent
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

/// Fields for creating a new category
#[derive(Debug, Clone)]
pub struct NewCategory {
    pub name: String,
    pub description: Option<String>,
    pub parent_id: Option<CategoryId>,
}

impl NewCategory {
    pub fn root(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            parent_id: None,
        }
    }

    pub fn child_of(parent_id: CategoryId, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            parent_id: Some(parent_id),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Partial update for a category.
///
/// Omitted (`None`) fields are left untouched. For `parent_id` and
/// `description` the inner option distinguishes "set to null" from
/// "leave alone": `Some(None)` makes the category a root / clears the
/// description.
#[derive(Debug, Clone, Default)]
pub struct CategoryPatch {
    pub name: Option<String>,
    pub description: Option<Option<String>>,
    pub parent_id: Option<Option<CategoryId>>,
}

impl CategoryPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.description.is_none() && self.parent_id.is_none()
    }

    pub fn rename(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    pub fn reparent(parent_id: Option<CategoryId>) -> Self {
        Self {
            parent_id: Some(parent_id),
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_patch_default_is_empty() {
        assert!(CategoryPatch::default().is_empty());
        assert!(!CategoryPatch::rename("Food").is_empty());
        assert!(!CategoryPatch::reparent(None).is_empty());
    }

    #[test]
    fn test_new_category_builders() {
        let root = NewCategory::root("Housing").with_description("Fixed costs");
        assert_eq!(root.name, "Housing");
        assert!(root.parent_id.is_none());
        assert_eq!(root.description.as_deref(), Some("Fixed costs"));

        let child = NewCategory::child_of(3, "Rent");
        assert_eq!(child.parent_id, Some(3));
    }
}
