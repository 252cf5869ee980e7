//! An ordered map implemented with an AVL tree.
//!
//! [`AvlTree`] maps unique keys to values and keeps them sorted by key.
//! Lookup, insertion and removal run in O(log n); two trees can be merged in
//! linear time with [`AvlTree::merge`].
//!
//! ```
//! use avl_dict::AvlTree;
//!
//! let mut tree = AvlTree::new();
//! for key in [13, 10, 15, 16, 11, 5, 8, 4, 3] {
//!     tree.insert(key, key * 10);
//! }
//! assert_eq!(
//!     tree.keys().copied().collect::<Vec<_>>(),
//!     [3, 4, 5, 8, 10, 11, 13, 15, 16]
//! );
//!
//! let mut cursor = tree.find(&10);
//! cursor.move_next();
//! assert_eq!(cursor.key_value(), Some((&11, &110)));
//! ```

mod error;
mod tree;

pub use error::MergeError;
pub use tree::{AvlTree, Cursor, Iter, Keys, Values};

#[cfg(test)]
mod proptests;
