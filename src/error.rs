//! Error type shared by the table, its cursor and the node pool.

use thiserror::Error;

/// Errors reported by `HashTable`, `Cursor` and `NodePool`.
///
/// Lookup and removal misses are not errors; they return `None`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TableError {
    /// A table was constructed without a diagnostic label.
    #[error("hash table constructed without a name")]
    MissingName,

    /// The growth configuration was rejected.
    #[error("invalid table configuration: {0}")]
    InvalidConfig(String),

    /// The bucket array could not be allocated.
    #[error("could not allocate {capacity} buckets for table `{table}`")]
    AllocationFailed { table: String, capacity: usize },

    /// The node is already chained into a table.
    #[error("node is already linked into a table")]
    AlreadyLinked,

    /// The node is still chained and cannot be freed or re-keyed.
    #[error("node is still linked into a table")]
    NodeStillLinked,

    /// The handle does not resolve in the pool.
    #[error("node handle does not refer to a live node")]
    StaleNode,

    /// The table changed since the cursor was last reset.
    #[error("table `{0}` was modified since the cursor was reset")]
    InvalidCursor(String),

    /// `remove_current` was called while no node is positioned.
    #[error("cursor is not positioned on a node")]
    NoCurrentNode,
}

impl TableError {
    /// True for programmer errors, false for resource exhaustion.
    pub fn is_contract_violation(&self) -> bool {
        !matches!(self, TableError::AllocationFailed { .. })
    }
}

pub type TableResult<T> = Result<T, TableError>;
