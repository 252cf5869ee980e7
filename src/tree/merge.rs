use std::cmp::Ordering;

use super::{AvlTree, Link, Node};
use crate::error::MergeError;

impl<K: Ord + Clone, V: Clone> AvlTree<K, V> {
    /// Merges the entries of `other` into this tree.
    ///
    /// Afterwards this tree holds the union of both key sets. For keys present
    /// in both trees the value of this tree is kept. `other` is not modified.
    ///
    /// All entries are copied into a sorted buffer first and the tree is then
    /// rebuilt as a perfectly balanced tree, so this runs in O(m + n).
    ///
    /// ```
    /// use avl_dict::AvlTree;
    /// let mut lhs: AvlTree<_, _> = [(1, "a"), (3, "c")].into_iter().collect();
    /// let rhs: AvlTree<_, _> = [(2, "b"), (3, "x")].into_iter().collect();
    /// lhs.merge(&rhs);
    /// assert_eq!(lhs.iter().collect::<Vec<_>>(), [(&1, &"a"), (&2, &"b"), (&3, &"c")]);
    /// assert_eq!(rhs.len(), 2);
    /// ```
    pub fn merge(&mut self, other: &Self) {
        let mut entries = Vec::with_capacity(self.len() + other.len());
        self.collect_union(other, &mut entries);
        self.rebuild(entries);
    }

    /// Like [`merge`](Self::merge), but reports a failed buffer allocation
    /// instead of aborting. On error both trees are unchanged.
    pub fn try_merge(&mut self, other: &Self) -> Result<(), MergeError> {
        self.try_merge_reserving(other, self.len() + other.len())
    }

    /// Merges with a buffer reserved for `requested` entries, which must be
    /// at least `self.len() + other.len()`.
    fn try_merge_reserving(&mut self, other: &Self, requested: usize) -> Result<(), MergeError> {
        let mut entries = Self::merge_buffer(requested)?;
        self.collect_union(other, &mut entries);
        self.rebuild(entries);
        Ok(())
    }

    fn merge_buffer(requested: usize) -> Result<Vec<(K, V)>, MergeError> {
        let mut entries = Vec::new();
        if let Err(source) = entries.try_reserve_exact(requested) {
            tracing::debug!(requested, "merge buffer allocation failed");
            return Err(MergeError::Allocation { requested, source });
        }
        Ok(entries)
    }

    /// Pushes copies of the entries of both trees in ascending key order,
    /// one per distinct key, preferring entries of `self`.
    fn collect_union(&self, other: &Self, entries: &mut Vec<(K, V)>) {
        let mut lhs_iter = self.iter();
        let mut rhs_iter = other.iter();
        let mut lhs_peek = lhs_iter.next();
        let mut rhs_peek = rhs_iter.next();
        loop {
            match (lhs_peek, rhs_peek) {
                (None, None) => break,
                (Some((key, value)), None) => {
                    entries.push((key.clone(), value.clone()));
                    lhs_peek = lhs_iter.next();
                }
                (None, Some((key, value))) => {
                    entries.push((key.clone(), value.clone()));
                    rhs_peek = rhs_iter.next();
                }
                (Some((lhs_key, lhs_value)), Some((rhs_key, rhs_value))) => {
                    match lhs_key.cmp(rhs_key) {
                        Ordering::Less => {
                            entries.push((lhs_key.clone(), lhs_value.clone()));
                            lhs_peek = lhs_iter.next();
                        }
                        Ordering::Equal => {
                            entries.push((lhs_key.clone(), lhs_value.clone()));
                            lhs_peek = lhs_iter.next();
                            rhs_peek = rhs_iter.next();
                        }
                        Ordering::Greater => {
                            entries.push((rhs_key.clone(), rhs_value.clone()));
                            rhs_peek = rhs_iter.next();
                        }
                    }
                }
            }
        }
        entries.shrink_to_fit();
        tracing::trace!(
            lhs = self.len(),
            rhs = other.len(),
            merged = entries.len(),
            "collected merge entries"
        );
    }
}

impl<K, V> AvlTree<K, V> {
    /// Replaces the contents of the tree by the sorted, deduplicated `entries`.
    fn rebuild(&mut self, entries: Vec<(K, V)>) {
        let count = entries.len();
        self.free_nodes();
        let mut entries = entries.into_iter();
        self.root = Self::build_balanced(&mut entries, 0, count, None);
        self.num_nodes = count;
    }

    /// Builds a subtree from the entries with index in `lo..hi`,
    /// taking them from `entries` in order. The entry at the midpoint becomes
    /// the subtree root.
    fn build_balanced<I>(entries: &mut I, lo: usize, hi: usize, parent: Link<K, V>) -> Link<K, V>
    where
        I: Iterator<Item = (K, V)>,
    {
        if lo >= hi {
            return None;
        }
        let mid = lo + (hi - lo) / 2;
        let left = Self::build_balanced(entries, lo, mid, None);
        let (key, value) = match entries.next() {
            Some(entry) => entry,
            None => unreachable!("fewer entries than announced"),
        };
        let mut node_ptr = Node::create(parent, key, value);
        let right = Self::build_balanced(entries, mid + 1, hi, Some(node_ptr));
        unsafe {
            if let Some(mut left_ptr) = left {
                left_ptr.as_mut().parent = Some(node_ptr);
            }
            node_ptr.as_mut().left = left;
            node_ptr.as_mut().right = right;
        }
        Self::adjust_height(node_ptr);
        Some(node_ptr)
    }
}

impl<K: Ord + Clone, V: Clone> Clone for AvlTree<K, V> {
    /// Returns a tree with the same entries.
    /// The copy is built by merging into an empty tree, so its shape is
    /// perfectly balanced and may differ from the shape of `self`.
    fn clone(&self) -> Self {
        let mut tree = Self::new();
        tree.merge(self);
        tree
    }

    fn clone_from(&mut self, source: &Self) {
        self.clear();
        self.merge(source);
    }
}
