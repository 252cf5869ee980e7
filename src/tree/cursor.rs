use std::fmt;
use std::iter::FusedIterator;
use std::marker::PhantomData;

use super::{Link, Node};

/// A position in an [`AvlTree`](super::AvlTree): either an entry or past-the-end.
///
/// Cursors compare equal if they refer to the same node, so a lookup result
/// can be tested against [`end`](super::AvlTree::end):
///
/// ```
/// use avl_dict::AvlTree;
/// let mut tree = AvlTree::new();
/// tree.insert(3, 'c');
/// tree.insert(1, 'a');
/// assert!(tree.find(&2) == tree.end());
///
/// let mut cursor = tree.begin();
/// assert_eq!(cursor.key(), Some(&1));
/// cursor.move_next();
/// assert_eq!(cursor, tree.find(&3));
/// cursor.move_next();
/// assert!(cursor.is_end());
/// ```
///
/// A cursor borrows the tree, so the tree cannot be changed while it is alive.
pub struct Cursor<'a, K, V> {
    node: Link<K, V>,
    marker: PhantomData<&'a Node<K, V>>,
}

/// An iterator over the entries of a tree, sorted by key.
pub struct Iter<'a, K, V> {
    front: Link<K, V>,
    remaining: usize,
    marker: PhantomData<&'a Node<K, V>>,
}

/// An iterator over the keys of a tree, in sorted order.
pub struct Keys<'a, K, V> {
    iter: Iter<'a, K, V>,
}

/// An iterator over the values of a tree, in order by key.
pub struct Values<'a, K, V> {
    iter: Iter<'a, K, V>,
}

// Cursors and iterators only hand out shared references, same as &AvlTree.
unsafe impl<K: Sync, V: Sync> Send for Cursor<'_, K, V> {}
unsafe impl<K: Sync, V: Sync> Sync for Cursor<'_, K, V> {}
unsafe impl<K: Sync, V: Sync> Send for Iter<'_, K, V> {}
unsafe impl<K: Sync, V: Sync> Sync for Iter<'_, K, V> {}

impl<'a, K, V> Cursor<'a, K, V> {
    pub(super) fn new(node: Link<K, V>) -> Self {
        Self {
            node,
            marker: PhantomData,
        }
    }

    /// Returns true if the cursor is past the last entry.
    pub fn is_end(&self) -> bool {
        self.node.is_none()
    }

    /// Returns the key at the cursor, or `None` at the end.
    pub fn key(&self) -> Option<&'a K> {
        self.node.map(|node_ptr| unsafe { &(*node_ptr.as_ptr()).key })
    }

    /// Returns the value at the cursor, or `None` at the end.
    pub fn value(&self) -> Option<&'a V> {
        self.node.map(|node_ptr| unsafe { &(*node_ptr.as_ptr()).value })
    }

    /// Returns key and value at the cursor, or `None` at the end.
    pub fn key_value(&self) -> Option<(&'a K, &'a V)> {
        self.node.map(|node_ptr| unsafe {
            let node = &*node_ptr.as_ptr();
            (&node.key, &node.value)
        })
    }

    /// Moves the cursor to the in-order successor.
    /// The end cursor stays at the end.
    pub fn move_next(&mut self) {
        if let Some(node_ptr) = self.node {
            self.node = Node::successor(node_ptr);
        }
    }
}

// Auto derived Clone and Copy would require K: Clone and V: Clone
impl<'a, K, V> Clone for Cursor<'a, K, V> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<'a, K, V> Copy for Cursor<'a, K, V> {}

impl<'a, K, V> PartialEq for Cursor<'a, K, V> {
    fn eq(&self, other: &Self) -> bool {
        self.node == other.node
    }
}

impl<'a, K, V> Eq for Cursor<'a, K, V> {}

impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for Cursor<'_, K, V> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.key_value() {
            Some(kv) => f.debug_tuple("Cursor").field(&kv).finish(),
            None => f.write_str("Cursor(end)"),
        }
    }
}

impl<'a, K, V> Iter<'a, K, V> {
    pub(super) fn new(front: Link<K, V>, remaining: usize) -> Self {
        Self {
            front,
            remaining,
            marker: PhantomData,
        }
    }
}

impl<'a, K, V> Clone for Iter<'a, K, V> {
    fn clone(&self) -> Self {
        Self::new(self.front, self.remaining)
    }
}

impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for Iter<'_, K, V> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_list().entries(self.clone()).finish()
    }
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        let mut cursor = Cursor::<'a, K, V>::new(self.front);
        let kv = cursor.key_value()?;
        cursor.move_next();
        self.front = cursor.node;
        self.remaining -= 1;
        Some(kv)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, V> ExactSizeIterator for Iter<'_, K, V> {}

impl<K, V> FusedIterator for Iter<'_, K, V> {}

impl<'a, K, V> Keys<'a, K, V> {
    pub(super) fn new(iter: Iter<'a, K, V>) -> Self {
        Self { iter }
    }
}

impl<'a, K, V> Clone for Keys<'a, K, V> {
    fn clone(&self) -> Self {
        Self::new(self.iter.clone())
    }
}

impl<K: fmt::Debug, V> fmt::Debug for Keys<'_, K, V> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_list().entries(self.clone()).finish()
    }
}

impl<'a, K, V> Iterator for Keys<'a, K, V> {
    type Item = &'a K;

    fn next(&mut self) -> Option<Self::Item> {
        self.iter.next().map(|(k, _)| k)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.iter.size_hint()
    }
}

impl<K, V> ExactSizeIterator for Keys<'_, K, V> {}

impl<K, V> FusedIterator for Keys<'_, K, V> {}

impl<'a, K, V> Values<'a, K, V> {
    pub(super) fn new(iter: Iter<'a, K, V>) -> Self {
        Self { iter }
    }
}

impl<'a, K, V> Clone for Values<'a, K, V> {
    fn clone(&self) -> Self {
        Self::new(self.iter.clone())
    }
}

impl<K, V: fmt::Debug> fmt::Debug for Values<'_, K, V> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_list().entries(self.clone()).finish()
    }
}

impl<'a, K, V> Iterator for Values<'a, K, V> {
    type Item = &'a V;

    fn next(&mut self) -> Option<Self::Item> {
        self.iter.next().map(|(_, v)| v)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.iter.size_hint()
    }
}

impl<K, V> ExactSizeIterator for Values<'_, K, V> {}

impl<K, V> FusedIterator for Values<'_, K, V> {}
