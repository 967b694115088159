//! Integration tests for the category engine
//!
//! Exercises full flows through the service against both stores, and
//! checks the dual-path descendant resolver and statistics additivity
//! with property-based tests.

use proptest::prelude::*;
use tempfile::TempDir;

use fintree::query::{descendants, descendants_fallback};
use fintree::{
    CategoryService, CategoryStore, Error, MemoryLedger, MemoryStore, NewCategory, SqliteLedger,
    SqliteStore, TenantId, TransactionLedger,
};

const H1: TenantId = 1;

fn sqlite_service() -> CategoryService<SqliteStore, SqliteLedger> {
    CategoryService::new(
        SqliteStore::open_in_memory().unwrap(),
        SqliteLedger::open_in_memory().unwrap(),
    )
}

fn memory_service() -> CategoryService<MemoryStore, MemoryLedger> {
    CategoryService::new(MemoryStore::new(), MemoryLedger::new())
}

// =============================================================================
// End-to-end scenario (both stores)
// =============================================================================

/// Tenant H1 creates root "Housing", child "Rent"; the path reads
/// root-first and the parent cannot be deleted before the child.
fn housing_scenario<S: CategoryStore, L: TransactionLedger>(svc: &CategoryService<S, L>) {
    let housing = svc.create(H1, NewCategory::root("Housing")).unwrap().category;
    let rent = svc
        .create(H1, NewCategory::child_of(housing.id, "Rent"))
        .unwrap()
        .category;

    let path = svc.category_path(H1, rent.id).unwrap();
    let names: Vec<_> = path.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["Housing", "Rent"]);

    assert!(matches!(
        svc.remove(H1, housing.id).unwrap_err(),
        Error::HasChildren { .. }
    ));

    svc.remove(H1, rent.id).unwrap();
    svc.remove(H1, housing.id).unwrap();
    assert!(svc.find_all(H1).unwrap().is_empty());
}

#[test]
fn test_housing_scenario_sqlite() {
    housing_scenario(&sqlite_service());
}

#[test]
fn test_housing_scenario_memory() {
    housing_scenario(&memory_service());
}

// =============================================================================
// Uniqueness and depth through the service
// =============================================================================

#[test]
fn test_uniqueness_is_per_parent_not_global() {
    let svc = sqlite_service();
    let food = svc.create(H1, NewCategory::root("Food")).unwrap().category;

    assert!(matches!(
        svc.create(H1, NewCategory::root("Food")).unwrap_err(),
        Error::DuplicateName { .. }
    ));

    let other = svc.create(H1, NewCategory::root("Other")).unwrap().category;
    // "Food" as a child of another node is a different level.
    svc.create(H1, NewCategory::child_of(other.id, "Food")).unwrap();
    // And another tenant has its own namespace entirely.
    svc.create(2, NewCategory::root("Food")).unwrap();

    // After deleting the root, its name is free again.
    svc.remove(H1, food.id).unwrap();
    svc.create(H1, NewCategory::root("Food")).unwrap();
}

#[test]
fn test_depth_cap_through_service() {
    let svc = sqlite_service();
    let mut parent = None;
    for i in 1..=5 {
        let new = match parent {
            None => NewCategory::root(format!("d{i}")),
            Some(p) => NewCategory::child_of(p, format!("d{i}")),
        };
        let cat = svc.create(H1, new).unwrap().category;
        parent = Some(cat.id);
    }

    assert!(matches!(
        svc.create(H1, NewCategory::child_of(parent.unwrap(), "d6"))
            .unwrap_err(),
        Error::DepthExceeded { max: 5 }
    ));
}

// =============================================================================
// Dual-path descendant resolution
// =============================================================================

#[test]
fn test_native_and_fallback_paths_agree_on_shared_file() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("categories.db");

    let native_store = SqliteStore::open(&path).unwrap();
    let a = native_store.insert(H1, &NewCategory::root("A")).unwrap();
    let b = native_store
        .insert(H1, &NewCategory::child_of(a.id, "B"))
        .unwrap();
    let c = native_store
        .insert(H1, &NewCategory::child_of(a.id, "C"))
        .unwrap();
    let d = native_store
        .insert(H1, &NewCategory::child_of(b.id, "D"))
        .unwrap();

    let fallback_store = SqliteStore::open(&path).unwrap().with_recursive_disabled();

    let via_native: Vec<_> = descendants(&native_store, H1, a.id)
        .unwrap()
        .iter()
        .map(|cat| cat.id)
        .collect();
    let via_fallback: Vec<_> = descendants(&fallback_store, H1, a.id)
        .unwrap()
        .iter()
        .map(|cat| cat.id)
        .collect();

    assert_eq!(via_native, vec![b.id, c.id, d.id]);
    assert_eq!(via_native, via_fallback);
}

// =============================================================================
// Property tests
// =============================================================================

/// Model tree: for node `i`, `parents[i]` is `Some(index)` of an
/// earlier node or `None` for a root. Depth stays within the cap.
fn build_tree(choices: &[usize]) -> Vec<(usize, Option<usize>)> {
    let mut depths: Vec<u32> = Vec::new();
    let mut out = Vec::new();
    for (i, &choice) in choices.iter().enumerate() {
        let parent = if i == 0 || choice == 0 {
            None
        } else {
            let candidate = (choice - 1) % i;
            // Respect the depth bound the engine enforces.
            if depths[candidate] >= 5 {
                None
            } else {
                Some(candidate)
            }
        };
        let depth = match parent {
            None => 1,
            Some(p) => depths[p] + 1,
        };
        depths.push(depth);
        out.push((i, parent));
    }
    out
}

/// Transitive descendant indexes of `root` in the model tree
fn model_descendants(tree: &[(usize, Option<usize>)], root: usize) -> Vec<usize> {
    let mut result = Vec::new();
    let mut frontier = vec![root];
    while let Some(node) = frontier.pop() {
        for &(i, parent) in tree {
            if parent == Some(node) {
                result.push(i);
                frontier.push(i);
            }
        }
    }
    result.sort_unstable();
    result
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    /// The native recursive query and the iterative fallback return the
    /// same descendant sequence for every node of any valid tree.
    #[test]
    fn prop_native_and_fallback_agree(choices in prop::collection::vec(0usize..8, 1..32)) {
        let tree = build_tree(&choices);

        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("prop.db");
        let store = SqliteStore::open(&path).unwrap();

        let mut ids = Vec::new();
        for &(i, parent) in &tree {
            let new = match parent {
                None => NewCategory::root(format!("n{i}")),
                Some(p) => NewCategory::child_of(ids[p], format!("n{i}")),
            };
            ids.push(store.insert(H1, &new).unwrap().id);
        }

        for &(i, _) in &tree {
            let native: Vec<_> = store
                .descendants_native(H1, ids[i])
                .unwrap()
                .iter()
                .map(|c| c.id)
                .collect();
            let fallback: Vec<_> = descendants_fallback(&store, H1, ids[i])
                .unwrap()
                .iter()
                .map(|c| c.id)
                .collect();
            prop_assert_eq!(&native, &fallback);

            // Same logical set as the model.
            let mut got = native.clone();
            got.sort_unstable();
            let mut expected: Vec<_> = model_descendants(&tree, i)
                .into_iter()
                .map(|idx| ids[idx])
                .collect();
            expected.sort_unstable();
            prop_assert_eq!(got, expected);
        }
    }

    /// Statistics totals are exactly the sum of direct and descendant
    /// figures, and the descendant figures cover the whole subtree.
    #[test]
    fn prop_stats_additivity(choices in prop::collection::vec(0usize..8, 1..24)) {
        let tree = build_tree(&choices);

        let store = MemoryStore::new();
        let ledger = MemoryLedger::new();
        let mut ids = Vec::new();
        for &(i, parent) in &tree {
            let new = match parent {
                None => NewCategory::root(format!("n{i}")),
                Some(p) => NewCategory::child_of(ids[p], format!("n{i}")),
            };
            let id = store.insert(H1, &new).unwrap().id;
            // One transaction per node with a distinct amount.
            ledger.record(id, (i as i64 + 1) * 7, None);
            ids.push(id);
        }

        let svc = CategoryService::new(store, ledger);
        for &(i, _) in &tree {
            let stats = svc.category_stats(H1, ids[i]).unwrap();

            prop_assert_eq!(
                stats.total_transactions,
                stats.direct_transactions + stats.descendant_transactions
            );
            prop_assert_eq!(
                stats.total_amount_cents,
                stats.direct_amount_cents + stats.descendant_amount_cents
            );

            let subtree = model_descendants(&tree, i);
            prop_assert_eq!(stats.children_count, subtree.len());
            let expected_descendant: i64 =
                subtree.iter().map(|&idx| (idx as i64 + 1) * 7).sum();
            prop_assert_eq!(stats.descendant_amount_cents, expected_descendant);
            prop_assert_eq!(stats.direct_amount_cents, (i as i64 + 1) * 7);
        }
    }
}
