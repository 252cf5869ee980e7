use std::collections::TryReserveError;

use thiserror::Error;

/// Error returned by [`AvlTree::try_merge`](crate::AvlTree::try_merge).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MergeError {
    /// The buffer holding the merged entries could not be allocated.
    /// Both trees are left unchanged.
    #[error("failed to allocate a merge buffer for {requested} entries")]
    Allocation {
        requested: usize,
        #[source]
        source: TryReserveError,
    },
}
