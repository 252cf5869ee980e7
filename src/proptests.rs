//! Property tests for the tree invariants under random operation sequences.

use proptest::prelude::*;

use super::AvlTree;

#[derive(Debug, Clone)]
enum Op {
    Insert(i16, u8),
    Remove(i16),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (any::<i16>(), any::<u8>()).prop_map(|(key, value)| Op::Insert(key, value)),
        any::<i16>().prop_map(Op::Remove),
    ]
}

fn tree_of(entries: &[(i16, u8)]) -> AvlTree<i16, u8> {
    entries.iter().copied().collect()
}

fn entries_of(tree: &AvlTree<i16, u8>) -> Vec<(i16, u8)> {
    tree.iter().map(|(k, v)| (*k, *v)).collect()
}

proptest! {
    /// Any sequence of inserts and removes keeps order, balance and heights intact.
    #[test]
    fn prop_operations_keep_invariants(ops in prop::collection::vec(op(), 0..200)) {
        let mut tree = AvlTree::new();
        let mut model = std::collections::BTreeMap::new();
        for op in ops {
            match op {
                Op::Insert(key, value) => {
                    let inserted = tree.insert(key, value);
                    prop_assert_eq!(inserted, !model.contains_key(&key));
                    model.entry(key).or_insert(value);
                }
                Op::Remove(key) => {
                    prop_assert_eq!(tree.remove(&key), model.remove(&key));
                }
            }
            tree.check_consistency();
        }
        prop_assert_eq!(entries_of(&tree), model.into_iter().collect::<Vec<_>>());
    }

    /// Inserting an existing key is rejected and changes nothing.
    #[test]
    fn prop_duplicate_insert_is_noop(
        entries in prop::collection::vec(any::<(i16, u8)>(), 1..100),
        index: prop::sample::Index,
        value: u8
    ) {
        let mut tree = tree_of(&entries);
        let before = entries_of(&tree);
        let key = entries[index.index(entries.len())].0;

        prop_assert!(!tree.insert(key, value));
        prop_assert_eq!(entries_of(&tree), before);
        tree.check_consistency();
    }

    /// Removing every inserted key, in any order, empties the tree.
    #[test]
    fn prop_remove_all_empties_tree(
        (keys, removal_order) in prop::collection::vec(any::<i16>(), 0..200)
            .prop_flat_map(|keys| (Just(keys.clone()), Just(keys).prop_shuffle()))
    ) {
        let mut tree: AvlTree<i16, ()> = keys.iter().map(|key| (*key, ())).collect();
        for key in &removal_order {
            tree.remove(key);
            tree.check_consistency();
        }
        prop_assert_eq!(tree.len(), 0);
        prop_assert!(tree.is_empty());
    }

    /// Merge yields the key union, keeps own values on collision, leaves the other tree alone.
    #[test]
    fn prop_merge_is_left_biased_union(
        lhs_entries in prop::collection::vec(any::<(i16, u8)>(), 0..100),
        rhs_entries in prop::collection::vec(any::<(i16, u8)>(), 0..100)
    ) {
        let mut lhs = tree_of(&lhs_entries);
        let rhs = tree_of(&rhs_entries);
        let lhs_before = entries_of(&lhs);
        let rhs_before = entries_of(&rhs);

        lhs.merge(&rhs);
        lhs.check_consistency();

        let mut expected: std::collections::BTreeMap<i16, u8> = rhs_before.iter().copied().collect();
        expected.extend(lhs_before.iter().copied());
        prop_assert_eq!(entries_of(&lhs), expected.into_iter().collect::<Vec<_>>());
        prop_assert_eq!(entries_of(&rhs), rhs_before);
    }

    /// A clone holds the same entries, possibly in a different shape.
    #[test]
    fn prop_clone_has_same_entries(entries in prop::collection::vec(any::<(i16, u8)>(), 0..200)) {
        let tree = tree_of(&entries);
        let copy = tree.clone();
        copy.check_consistency();
        prop_assert_eq!(entries_of(&copy), entries_of(&tree));
    }
}
