//! Error types for the category engine
//!
//! Provides structured error types with context for better debugging
//! and user-friendly error messages. Validation errors are always
//! detected before any write; store errors propagate unchanged.

use crate::storage::category::CategoryId;
use thiserror::Error;

/// The main error type for category engine operations
#[derive(Debug, Error)]
pub enum Error {
    // ==========================================================================
    // Lookup Errors
    // ==========================================================================
    #[error("Category {id} not found")]
    NotFound { id: CategoryId },

    #[error("Parent category {id} not found")]
    ParentNotFound { id: CategoryId },

    // ==========================================================================
    // Validation Errors
    // ==========================================================================
    #[error("Invalid category name: {reason}")]
    InvalidName { reason: &'static str },

    #[error("A category named '{name}' already exists at this level")]
    DuplicateName { name: String },

    #[error("Maximum hierarchy depth of {max} exceeded")]
    DepthExceeded { max: u32 },

    #[error("Category {id} cannot be its own parent")]
    SelfParent { id: CategoryId },

    #[error("Cannot move category {id} under {new_parent}: it is a descendant")]
    CircularReference {
        id: CategoryId,
        new_parent: CategoryId,
    },

    // ==========================================================================
    // Deletion Guard Errors
    // ==========================================================================
    #[error("Category {id} has {children} active child categories")]
    HasChildren { id: CategoryId, children: u64 },

    #[error("Category {id} has {transactions} associated transactions")]
    HasTransactions {
        id: CategoryId,
        transactions: u64,
    },

    // ==========================================================================
    // Corruption Errors
    // ==========================================================================
    #[error("Hierarchy corrupt: ancestor walk from {start} did not terminate")]
    HierarchyCorrupt { start: CategoryId },

    // ==========================================================================
    // Store Errors
    // ==========================================================================
    #[error("Store does not support recursive descendant queries")]
    RecursiveUnsupported,

    #[error("Store error: {message}")]
    Store {
        message: String,
        #[source]
        source: Option<rusqlite::Error>,
    },
}

/// Result type alias for category engine operations
pub type Result<T> = std::result::Result<T, Error>;

// =============================================================================
// Conversions from external error types
// =============================================================================

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::Store {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

// =============================================================================
// Error Display Helpers
// =============================================================================

impl Error {
    /// Returns a user-friendly suggestion for fixing the error
    pub fn suggestion(&self) -> Option<&'static str> {
        match self {
            Error::NotFound { .. } => Some("Check the category id and tenant"),
            Error::ParentNotFound { .. } => {
                Some("The parent must exist in the same tenant and not be deleted")
            }
            Error::DuplicateName { .. } => {
                Some("Sibling categories must have distinct names; pick another name or parent")
            }
            Error::DepthExceeded { .. } => {
                Some("Flatten the tree or attach the category to a shallower parent")
            }
            Error::HasChildren { .. } => Some("Delete or move the child categories first"),
            Error::HasTransactions { .. } => {
                Some("Reassign the transactions to another category first")
            }
            _ => None,
        }
    }

    /// Returns true if this error is a validation failure the caller can fix
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Error::NotFound { .. }
                | Error::ParentNotFound { .. }
                | Error::InvalidName { .. }
                | Error::DuplicateName { .. }
                | Error::DepthExceeded { .. }
                | Error::SelfParent { .. }
                | Error::CircularReference { .. }
                | Error::HasChildren { .. }
                | Error::HasTransactions { .. }
        )
    }
}
