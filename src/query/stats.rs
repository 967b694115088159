//! Statistics aggregation
//!
//! Combines direct and descendant transaction figures into one report.
//! This is the only place the two components are summed, and the totals
//! are exact integer sums: amounts are carried in minor units end to
//! end, so no rounding can break additivity.

use serde::Serialize;

use crate::ledger::TransactionAggregate;
use crate::storage::category::CategoryId;

/// Aggregate transaction statistics for a category subtree
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryStats {
    pub category_id: CategoryId,

    /// Transactions booked on the category itself
    pub direct_transactions: u64,
    pub direct_amount_cents: i64,

    /// Transactions booked on any descendant
    pub descendant_transactions: u64,
    pub descendant_amount_cents: i64,

    /// Exact sums of the direct and descendant components
    pub total_transactions: u64,
    pub total_amount_cents: i64,

    /// Size of the descendant set (not just direct children)
    pub children_count: usize,
}

impl CategoryStats {
    /// Build the report from the two measured components.
    pub fn from_parts(
        category_id: CategoryId,
        direct: TransactionAggregate,
        descendant: TransactionAggregate,
        children_count: usize,
    ) -> Self {
        Self {
            category_id,
            direct_transactions: direct.count,
            direct_amount_cents: direct.amount_cents,
            descendant_transactions: descendant.count,
            descendant_amount_cents: descendant.amount_cents,
            total_transactions: direct.count + descendant.count,
            total_amount_cents: direct.amount_cents + descendant.amount_cents,
            children_count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_totals_are_exact_sums() {
        let direct = TransactionAggregate {
            count: 3,
            amount_cents: 12_50,
        };
        let descendant = TransactionAggregate {
            count: 7,
            amount_cents: -4_99,
        };

        let stats = CategoryStats::from_parts(1, direct, descendant, 4);
        assert_eq!(stats.total_transactions, 10);
        assert_eq!(stats.total_amount_cents, 12_50 - 4_99);
        assert_eq!(stats.children_count, 4);
    }

    #[test]
    fn test_empty_subtree() {
        let stats =
            CategoryStats::from_parts(1, TransactionAggregate::default(), Default::default(), 0);
        assert_eq!(stats.total_transactions, 0);
        assert_eq!(stats.total_amount_cents, 0);
    }
}
