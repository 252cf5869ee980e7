use std::borrow::Borrow;
use std::cmp::{self, Ordering};
use std::fmt;
use std::marker::PhantomData;
use std::mem;
use std::ptr::NonNull;

mod cursor;
mod merge;

pub use cursor::{Cursor, Iter, Keys, Values};

/// An ordered map implemented with an AVL tree.
///
/// Keys are unique. Inserting a key that is already present is rejected
/// and leaves the stored value untouched.
///
/// ```
/// use avl_dict::AvlTree;
/// let mut tree = AvlTree::new();
/// assert!(tree.insert(2, "two"));
/// assert!(tree.insert(1, "one"));
/// assert!(!tree.insert(2, "deux"));
/// assert_eq!(tree.get(&2), Some(&"two"));
/// assert_eq!(tree.remove(&1), Some("one"));
/// assert!(tree.find(&1) == tree.end());
/// ```
pub struct AvlTree<K, V> {
    root: Link<K, V>,
    num_nodes: usize,
    marker: PhantomData<Box<Node<K, V>>>,
}

struct Node<K, V> {
    key: K,
    value: V,
    left: Link<K, V>,
    right: Link<K, V>,
    parent: Link<K, V>,
    height: i32,
}

type NodePtr<K, V> = NonNull<Node<K, V>>;
type Link<K, V> = Option<NodePtr<K, V>>;
type LinkPtr<K, V> = NonNull<Link<K, V>>;

#[allow(clippy::enum_variant_names)]
enum Direction {
    FromParent,
    FromLeft,
    FromRight,
}

// The tree uniquely owns its nodes, same reasoning as for std's BTreeMap.
unsafe impl<K: Send, V: Send> Send for AvlTree<K, V> {}
unsafe impl<K: Sync, V: Sync> Sync for AvlTree<K, V> {}

impl<K, V> AvlTree<K, V> {
    /// Creates an empty tree.
    /// No memory is allocated until the first entry is inserted.
    pub fn new() -> Self {
        Self {
            root: None,
            num_nodes: 0,
            marker: PhantomData,
        }
    }

    /// Creates a tree holding a single entry.
    pub fn with_entry(key: K, value: V) -> Self {
        let mut tree = Self::new();
        tree.root = Some(Node::create(None, key, value));
        tree.num_nodes = 1;
        tree
    }

    /// Returns true if the tree contains no entries.
    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    /// Returns the number of entries in the tree.
    pub fn len(&self) -> usize {
        self.num_nodes
    }

    /// Returns the height of the tree.
    /// A single leaf has height 0, the empty tree has height -1.
    pub fn height(&self) -> i32 {
        Self::link_height(self.root)
    }

    #[cfg(test)]
    pub(crate) fn root_key(&self) -> Option<&K> {
        self.root.map(|root_ptr| unsafe { &(*root_ptr.as_ptr()).key })
    }

    /// Clears the tree, deallocating all nodes.
    pub fn clear(&mut self) {
        tracing::trace!(freed = self.num_nodes, "clearing tree");
        self.free_nodes();
    }

    /// Returns a cursor at the entry with the smallest key,
    /// or the end cursor if the tree is empty.
    pub fn begin(&self) -> Cursor<'_, K, V> {
        Cursor::new(self.root.map(Node::leftmost))
    }

    /// Returns the past-the-end cursor.
    pub fn end(&self) -> Cursor<'_, K, V> {
        Cursor::new(None)
    }

    /// Gets an iterator over the entries of the tree, sorted by key.
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter::new(self.root.map(Node::leftmost), self.num_nodes)
    }

    /// Gets an iterator over the keys of the tree, in sorted order.
    pub fn keys(&self) -> Keys<'_, K, V> {
        Keys::new(self.iter())
    }

    /// Gets an iterator over the values of the tree, in order by key.
    pub fn values(&self) -> Values<'_, K, V> {
        Values::new(self.iter())
    }

    fn free_nodes(&mut self) {
        self.postorder(|node_ptr| unsafe { Node::destroy(node_ptr) });
        self.root = None;
        self.num_nodes = 0;
    }

    fn link_height(link: Link<K, V>) -> i32 {
        match link {
            None => -1,
            Some(node_ptr) => unsafe { node_ptr.as_ref().height },
        }
    }

    /// Height difference between left and right subtree.
    fn balance(node_ptr: NodePtr<K, V>) -> i32 {
        unsafe {
            Self::link_height(node_ptr.as_ref().left) - Self::link_height(node_ptr.as_ref().right)
        }
    }

    fn adjust_height(mut node_ptr: NodePtr<K, V>) {
        unsafe {
            node_ptr.as_mut().height = 1 + cmp::max(
                Self::link_height(node_ptr.as_ref().left),
                Self::link_height(node_ptr.as_ref().right),
            );
        }
    }

    /// Makes the slot of `parent` that currently holds `old` point to `new`.
    /// Without a parent the slot is the root link.
    fn replace_child(&mut self, parent: Link<K, V>, old: NodePtr<K, V>, new: Link<K, V>) {
        match parent {
            None => self.root = new,
            Some(mut parent_ptr) => unsafe {
                if parent_ptr.as_ref().left == Some(old) {
                    parent_ptr.as_mut().left = new;
                } else {
                    parent_ptr.as_mut().right = new;
                }
            },
        }
    }

    /// Rotates the subtree at `node_ptr` to the left.
    /// Returns the new subtree root.
    fn rotate_left(&mut self, mut node_ptr: NodePtr<K, V>) -> NodePtr<K, V> {
        unsafe {
            if let Some(mut right_ptr) = node_ptr.as_ref().right {
                node_ptr.as_mut().right = right_ptr.as_ref().left;
                if let Some(mut right_left_ptr) = right_ptr.as_ref().left {
                    right_left_ptr.as_mut().parent = Some(node_ptr);
                }

                right_ptr.as_mut().parent = node_ptr.as_ref().parent;
                self.replace_child(node_ptr.as_ref().parent, node_ptr, Some(right_ptr));

                right_ptr.as_mut().left = Some(node_ptr);
                node_ptr.as_mut().parent = Some(right_ptr);

                Self::adjust_height(node_ptr);
                Self::adjust_height(right_ptr);
                return right_ptr;
            }
        }
        node_ptr
    }

    /// Rotates the subtree at `node_ptr` to the right.
    /// Returns the new subtree root.
    fn rotate_right(&mut self, mut node_ptr: NodePtr<K, V>) -> NodePtr<K, V> {
        unsafe {
            if let Some(mut left_ptr) = node_ptr.as_ref().left {
                node_ptr.as_mut().left = left_ptr.as_ref().right;
                if let Some(mut left_right_ptr) = left_ptr.as_ref().right {
                    left_right_ptr.as_mut().parent = Some(node_ptr);
                }

                left_ptr.as_mut().parent = node_ptr.as_ref().parent;
                self.replace_child(node_ptr.as_ref().parent, node_ptr, Some(left_ptr));

                left_ptr.as_mut().right = Some(node_ptr);
                node_ptr.as_mut().parent = Some(left_ptr);

                Self::adjust_height(node_ptr);
                Self::adjust_height(left_ptr);
                return left_ptr;
            }
        }
        node_ptr
    }

    fn rotate_left_right(&mut self, node_ptr: NodePtr<K, V>) -> NodePtr<K, V> {
        if let Some(left_ptr) = unsafe { node_ptr.as_ref().left } {
            let pivot_ptr = self.rotate_left(left_ptr);
            debug_assert!(unsafe { node_ptr.as_ref().left } == Some(pivot_ptr));
        }
        self.rotate_right(node_ptr)
    }

    fn rotate_right_left(&mut self, node_ptr: NodePtr<K, V>) -> NodePtr<K, V> {
        if let Some(right_ptr) = unsafe { node_ptr.as_ref().right } {
            let pivot_ptr = self.rotate_right(right_ptr);
            debug_assert!(unsafe { node_ptr.as_ref().right } == Some(pivot_ptr));
        }
        self.rotate_left(node_ptr)
    }

    /// Rebalances nodes starting from given position up to the root node.
    fn rebalance(&mut self, start_from: Link<K, V>) {
        let mut current = start_from;
        while let Some(node_ptr) = current {
            let subtree_ptr = self.rebalance_node(node_ptr);
            current = unsafe { subtree_ptr.as_ref().parent };
        }
    }

    /// Rebalances nodes starting from given position up to the root node.
    /// Stops after first rotation.
    /// This is enough to restore balance after a single insert operation.
    fn rebalance_once(&mut self, start_from: Link<K, V>) {
        let mut current = start_from;
        while let Some(node_ptr) = current {
            let subtree_ptr = self.rebalance_node(node_ptr);
            if subtree_ptr != node_ptr {
                break;
            }
            current = unsafe { subtree_ptr.as_ref().parent };
        }
    }

    /// Restores AVL condition (balance) at given node if necessary and adjusts height.
    /// Initial balance must not exceed +2 or -2, which always holds after a single update.
    /// Returns the root of the subtree, which differs from `node_ptr` after a rotation.
    fn rebalance_node(&mut self, node_ptr: NodePtr<K, V>) -> NodePtr<K, V> {
        let balance = Self::balance(node_ptr);
        debug_assert!((-2..=2).contains(&balance));
        if balance > 1 {
            // Left heavy
            match unsafe { node_ptr.as_ref().left } {
                Some(left_ptr) if Self::balance(left_ptr) < 0 => self.rotate_left_right(node_ptr),
                _ => self.rotate_right(node_ptr),
            }
        } else if balance < -1 {
            // Right heavy
            match unsafe { node_ptr.as_ref().right } {
                Some(right_ptr) if Self::balance(right_ptr) > 0 => self.rotate_right_left(node_ptr),
                _ => self.rotate_left(node_ptr),
            }
        } else {
            Self::adjust_height(node_ptr);
            node_ptr
        }
    }

    /// Detaches `node_ptr` from the tree, or, if it has two children, the in-order
    /// successor after swapping entries with it.
    /// Returns the detached node, which holds the entry of the original `node_ptr`.
    fn unlink_node(&mut self, mut node_ptr: NodePtr<K, V>) -> NodePtr<K, V> {
        unsafe {
            let target_ptr = match (node_ptr.as_ref().left, node_ptr.as_ref().right) {
                (Some(_), Some(right_ptr)) => {
                    let mut successor_ptr = Node::leftmost(right_ptr);
                    mem::swap(&mut node_ptr.as_mut().key, &mut successor_ptr.as_mut().key);
                    mem::swap(&mut node_ptr.as_mut().value, &mut successor_ptr.as_mut().value);
                    successor_ptr
                }
                _ => node_ptr,
            };

            // Target is stem or leaf now
            let target = target_ptr.as_ref();
            debug_assert!(target.left.is_none() || target.right.is_none());
            let child = target.left.or(target.right);
            if let Some(mut child_ptr) = child {
                child_ptr.as_mut().parent = target.parent;
            }
            let parent = target.parent;
            self.replace_child(parent, target_ptr, child);

            // Parent node might be out of balance now
            self.rebalance(parent);
            target_ptr
        }
    }

    fn postorder<F: FnMut(NodePtr<K, V>)>(&self, f: F) {
        self.traverse(|_| {}, |_| {}, f);
    }

    fn traverse<Pre, In, Post>(&self, mut preorder: Pre, mut inorder: In, mut postorder: Post)
    where
        Pre: FnMut(NodePtr<K, V>),
        In: FnMut(NodePtr<K, V>),
        Post: FnMut(NodePtr<K, V>),
    {
        if let Some(mut node_ptr) = self.root {
            let mut dir = Direction::FromParent;
            loop {
                match dir {
                    Direction::FromParent => {
                        preorder(node_ptr);
                        if let Some(left_ptr) = unsafe { node_ptr.as_ref().left } {
                            node_ptr = left_ptr;
                        } else {
                            dir = Direction::FromLeft;
                        }
                    }
                    Direction::FromLeft => {
                        inorder(node_ptr);
                        if let Some(right_ptr) = unsafe { node_ptr.as_ref().right } {
                            node_ptr = right_ptr;
                            dir = Direction::FromParent;
                        } else {
                            dir = Direction::FromRight;
                        }
                    }
                    Direction::FromRight => {
                        // Post order traversal is used for node deletion,
                        // so make sure not to use node pointer after postorder call.
                        if let Some(parent_ptr) = unsafe { node_ptr.as_ref().parent } {
                            if Some(node_ptr) == unsafe { parent_ptr.as_ref().left } {
                                dir = Direction::FromLeft;
                            } else {
                                dir = Direction::FromRight;
                            }
                            postorder(node_ptr);
                            node_ptr = parent_ptr;
                        } else {
                            postorder(node_ptr);
                            break;
                        }
                    }
                }
            }
        }
    }
}

impl<K: Ord, V> AvlTree<K, V> {
    /// Returns a cursor at the entry with the given key,
    /// or the end cursor if there is no such entry.
    ///
    /// The key may be any borrowed form of the tree's key type, but the ordering
    /// on the borrowed form *must* match the ordering on the key type.
    pub fn find<Q>(&self, key: &Q) -> Cursor<'_, K, V>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        Cursor::new(self.find_node(key))
    }

    /// Returns a reference to the value corresponding to the key.
    pub fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.find(key).value()
    }

    /// Returns a mutable reference to the value corresponding to the key.
    pub fn get_mut<Q>(&mut self, key: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.find_node(key)
            .map(|node_ptr| unsafe { &mut (*node_ptr.as_ptr()).value })
    }

    /// Returns references to the key-value pair corresponding to the key.
    pub fn get_key_value<Q>(&self, key: &Q) -> Option<(&K, &V)>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.find(key).key_value()
    }

    /// Returns true if the tree contains an entry for the key.
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.find_node(key).is_some()
    }

    /// Inserts a key-value pair into the tree.
    /// Returns false and drops key and value if the key is already present;
    /// the stored value is not replaced.
    pub fn insert(&mut self, key: K, value: V) -> bool {
        if let Some((parent, mut link_ptr)) = self.find_insert_pos(&key) {
            unsafe {
                *link_ptr.as_mut() = Some(Node::create(parent, key, value));
            }
            self.num_nodes += 1;
            self.rebalance_once(parent);
            return true;
        }
        false
    }

    /// Removes a key from the tree.
    /// Returns the value at the key if the key was previously in the tree.
    ///
    /// A node with two children takes over the entry of its in-order successor,
    /// and the successor's node is freed instead.
    pub fn remove<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.remove_entry(key).map(|(_, value)| value)
    }

    /// Removes a key from the tree.
    /// Returns the stored key and value if the key was previously in the tree.
    pub fn remove_entry<Q>(&mut self, key: &Q) -> Option<(K, V)>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let node_ptr = self.find_node(key)?;
        debug_assert!(self.num_nodes >= 1);
        let unlinked_ptr = self.unlink_node(node_ptr);
        self.num_nodes -= 1;
        Some(unsafe { Node::into_entry(unlinked_ptr) })
    }

    /// Asserts that the internal tree structure is consistent.
    #[cfg(any(test, feature = "consistency_check"))]
    pub fn check_consistency(&self) {
        unsafe {
            // Check root link
            if let Some(root_ptr) = self.root {
                assert!(root_ptr.as_ref().parent.is_none());
            }

            // Check tree nodes
            let mut num_nodes = 0;
            let mut prev_key: Option<&K> = None;
            self.traverse(
                |node_ptr| {
                    let node = node_ptr.as_ref();
                    let mut left_height: i32 = -1;
                    let mut right_height: i32 = -1;

                    // Check link for left child node
                    if let Some(left_ptr) = node.left {
                        assert!(left_ptr.as_ref().parent == Some(node_ptr));
                        assert!(left_ptr.as_ref().key < node.key);
                        left_height = left_ptr.as_ref().height;
                    }

                    // Check link for right child node
                    if let Some(right_ptr) = node.right {
                        assert!(right_ptr.as_ref().parent == Some(node_ptr));
                        assert!(right_ptr.as_ref().key > node.key);
                        right_height = right_ptr.as_ref().height;
                    }

                    // Check height
                    assert_eq!(node.height, 1 + cmp::max(left_height, right_height));

                    // Check AVL condition (nearly balance)
                    assert!((left_height - right_height).abs() <= 1);

                    num_nodes += 1;
                },
                |node_ptr| {
                    // Check strictly increasing key order
                    let key = &(*node_ptr.as_ptr()).key;
                    if let Some(prev_key) = prev_key {
                        assert!(prev_key < key);
                    }
                    prev_key = Some(key);
                },
                |_| {},
            );

            // Check number of nodes
            assert_eq!(num_nodes, self.num_nodes);
        }
    }

    fn find_node<Q>(&self, key: &Q) -> Link<K, V>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let mut current = self.root;
        while let Some(node_ptr) = current {
            current = unsafe {
                match key.cmp(node_ptr.as_ref().key.borrow()) {
                    Ordering::Equal => break,
                    Ordering::Less => node_ptr.as_ref().left,
                    Ordering::Greater => node_ptr.as_ref().right,
                }
            }
        }
        current
    }

    fn find_insert_pos(&mut self, key: &K) -> Option<(Link<K, V>, LinkPtr<K, V>)> {
        let mut parent: Link<K, V> = None;
        let mut link_ptr: LinkPtr<K, V> = NonNull::from(&mut self.root);
        unsafe {
            while let Some(mut node_ptr) = *link_ptr.as_ref() {
                parent = Some(node_ptr);
                link_ptr = match key.cmp(&node_ptr.as_ref().key) {
                    Ordering::Equal => return None,
                    Ordering::Less => NonNull::from(&mut node_ptr.as_mut().left),
                    Ordering::Greater => NonNull::from(&mut node_ptr.as_mut().right),
                };
            }
        }
        Some((parent, link_ptr))
    }
}

impl<K, V> Drop for AvlTree<K, V> {
    fn drop(&mut self) {
        self.free_nodes();
    }
}

impl<K, V> Default for AvlTree<K, V> {
    /// Creates an empty tree.
    fn default() -> Self {
        Self::new()
    }
}

impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for AvlTree<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<K: Ord, V> FromIterator<(K, V)> for AvlTree<K, V> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut tree = Self::new();
        tree.extend(iter);
        tree
    }
}

impl<K: Ord, V> Extend<(K, V)> for AvlTree<K, V> {
    /// Inserts all entries; keys already present keep their value.
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        iter.into_iter().for_each(move |(key, value)| {
            self.insert(key, value);
        });
    }
}

impl<'a, K, V> IntoIterator for &'a AvlTree<K, V> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;
    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<K, V> Node<K, V> {
    fn create(parent: Link<K, V>, key: K, value: V) -> NodePtr<K, V> {
        let boxed = Box::new(Node {
            key,
            value,
            parent,
            left: None,
            right: None,
            height: 0,
        });
        NonNull::from(Box::leak(boxed))
    }

    unsafe fn destroy(node_ptr: NodePtr<K, V>) {
        drop(Box::from_raw(node_ptr.as_ptr()));
    }

    unsafe fn into_entry(node_ptr: NodePtr<K, V>) -> (K, V) {
        let node = *Box::from_raw(node_ptr.as_ptr());
        (node.key, node.value)
    }

    fn leftmost(mut node_ptr: NodePtr<K, V>) -> NodePtr<K, V> {
        while let Some(left_ptr) = unsafe { node_ptr.as_ref().left } {
            node_ptr = left_ptr;
        }
        node_ptr
    }

    /// Returns the in-order successor: the leftmost node of the right subtree,
    /// or else the first ancestor reached from its left subtree.
    fn successor(mut node_ptr: NodePtr<K, V>) -> Link<K, V> {
        unsafe {
            if let Some(right_ptr) = node_ptr.as_ref().right {
                return Some(Self::leftmost(right_ptr));
            }
            while let Some(parent_ptr) = node_ptr.as_ref().parent {
                if parent_ptr.as_ref().left == Some(node_ptr) {
                    return Some(parent_ptr);
                }
                node_ptr = parent_ptr;
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::AvlTree;

    #[test]
    fn test_remove_swaps_successor_entry() {
        //   2   ->   3
        //  / \      /
        // 1   3    1
        let mut tree = AvlTree::new();
        tree.insert(2, "two");
        tree.insert(1, "one");
        tree.insert(3, "three");
        let root = tree.root;

        assert_eq!(tree.remove(&2), Some("two"));
        tree.check_consistency();

        // The root node stays in place and now holds the successor's entry
        assert_eq!(tree.root, root);
        let root_node = unsafe { tree.root.map(|root_ptr| &*root_ptr.as_ptr()) };
        assert_eq!(root_node.map(|node| (node.key, node.value)), Some((3, "three")));
        assert_eq!(root_node.and_then(|node| node.right), None);
    }

    #[test]
    fn test_with_entry_unordered_key() {
        struct Unordered(&'static str);

        let tree = AvlTree::with_entry(Unordered("key"), 1);
        assert_eq!(tree.len(), 1);
        assert_eq!(tree.height(), 0);
        assert_eq!(tree.root_key().map(|key| key.0), Some("key"));
        assert_eq!(tree.values().copied().collect::<Vec<_>>(), [1]);
    }

    #[test]
    fn test_rebalance_node_returns_subtree_root() {
        //   2   ->     3 ->   2
        //  / \        /      / \
        // 1   3      2      1   3
        //           /
        //          1
        let mut tree = AvlTree::new();
        for key in [2, 1, 3] {
            tree.insert(key, ());
        }
        let old_root = tree.root.unwrap();
        let new_root = tree.rotate_left(old_root);
        assert_eq!(tree.root, Some(new_root));
        assert_eq!(tree.root_key(), Some(&3));
        assert_eq!(AvlTree::balance(new_root), 2);

        // Balanced nodes are only height-adjusted and stay subtree roots
        assert_eq!(tree.rebalance_node(old_root), old_root);

        let subtree_root = tree.rebalance_node(new_root);
        assert_eq!(subtree_root, old_root);
        assert_eq!(tree.root, Some(old_root));
        tree.check_consistency();
        assert_eq!(tree.height(), 1);
    }

    #[test]
    fn test_remove_rebalances_right_left() {
        //   20       ->   20    ->   25
        //  /  \             \       /  \
        // 10   30            30    20   30
        //     /             /
        //    25            25
        let mut tree = AvlTree::new();
        for key in [20, 10, 30, 25] {
            tree.insert(key, key);
        }
        tree.remove(&10);
        tree.check_consistency();
        let root_key = tree.root.map(|root_ptr| unsafe { root_ptr.as_ref().key });
        assert_eq!(root_key, Some(25));
        assert_eq!(tree.height(), 1);
    }
}
