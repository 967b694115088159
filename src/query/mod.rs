//! Read-side queries over the category tree
//!
//! Descendant resolution and statistics aggregation.

pub mod descendants;
pub mod stats;

pub use descendants::{descendants, descendants_fallback};
pub use stats::CategoryStats;
