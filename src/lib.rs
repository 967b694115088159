//! fintree - Hierarchical Category Engine
//!
//! A tenant-scoped tree of categories for classifying household finance
//! transactions, with structural invariants enforced on every mutation.
//!
//! # Architecture Overview
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                      CategoryService                         │
//! │   create / find_one / find_all / update / remove             │
//! │   category_path / category_stats                             │
//! ├──────────────┬──────────────────────┬────────────────────────┤
//! │              ▼                      ▼                        │
//! │  ┌────────────────────┐  ┌─────────────────────────────────┐ │
//! │  │ Invariant          │  │ Descendant Resolver             │ │
//! │  │ Validator          │  │  native recursive query, or     │ │
//! │  │  depth / cycle /   │  │  level-order fallback with      │ │
//! │  │  sibling names     │  │  cycle guard                    │ │
//! │  └─────────┬──────────┘  └───────────────┬─────────────────┘ │
//! │            │                             │                   │
//! │            ▼                             ▼                   │
//! │  ┌──────────────────────────────────────────────────────────┐│
//! │  │            CategoryStore (tenant-scoped adapter)         ││
//! │  │     SqliteStore (recursive CTE)  │  MemoryStore          ││
//! │  └──────────────────────────────────────────────────────────┘│
//! │                                                              │
//! │  TransactionLedger (external collaborator)                   │
//! │   deletion guard · recent activity · subtree statistics      │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Invariants held after every successful mutation: parents stay within
//! the tenant, the tree is acyclic, depth never exceeds
//! [`validation::MAX_DEPTH`], sibling names are unique among non-deleted
//! rows, and nodes with active children or ledger transactions cannot be
//! deleted. Deletion is a soft tombstone; the adapter filters it from
//! every read.

pub mod error;
pub mod ledger;
pub mod query;
pub mod service;
pub mod storage;
pub mod validation;

pub use error::{Error, Result};

pub use ledger::{MemoryLedger, SqliteLedger, TransactionAggregate, TransactionLedger,
    TransactionSummary};
pub use query::CategoryStats;
pub use service::{CategoryDetail, CategoryNode, CategoryService};
pub use storage::category::{Category, CategoryId, CategoryPatch, NewCategory, TenantId};
pub use storage::memory::MemoryStore;
pub use storage::sqlite::SqliteStore;
pub use storage::CategoryStore;
