//! chain-table: a separately-chained hash table that indexes records it
//! does not own.
//!
//! Internal Design:
//!
//! Summary
//! - Goal: an index over dynamically allocated records (memory blocks,
//!   segments, execution contexts) keyed by a bare `u64`, where the
//!   records stay under the caller's control the whole time.
//! - Layers:
//!   - NodePool<T>: caller-owned arena of `Node<T>` records. Each node
//!     carries its key, an intrusive `next` link and the caller's payload.
//!   - HashTable<T>: bucket array of chain heads plus size bookkeeping.
//!     Chains are threaded through the nodes' own links.
//!   - Cursor: external iteration state, separate from the table so that
//!     several walks can coexist and be invalidated deliberately.
//!
//! Constraints
//! - Single-threaded: one logical owner performs every operation.
//! - The table never allocates or frees a record. `remove` hands the
//!   handle back; `destruct` hands each node to a disposal routine.
//! - Bucket index is `key % capacity`. Insert prepends to the chain with
//!   no duplicate check, so the newest duplicate is found first.
//! - Capacities come from a fixed ascending sequence (`TableConfig`).
//!   Growth rehashes every node exactly; at the ceiling the table keeps
//!   working with longer chains.
//!
//! Error model
//! - Misses are `None`, never errors.
//! - Programmer errors (unnamed table, stale cursor, re-linking a linked
//!   node) are `TableError` variants; `is_contract_violation` separates
//!   them from bucket allocation failure.
//! - Using a table with a pool it was not built with panics.
//!
//! Handles and linkage
//! - `NodeRef` is a generational slotmap key; a freed node's handle never
//!   resolves to a later node.
//! - A node records whether it is linked. The pool refuses to free or
//!   re-key a linked node, so chains cannot dangle.
//!
//! Notes and non-goals
//! - No shrinking on removal.
//! - No hashing beyond `key % capacity`; identity richer than the key is
//!   expressed with a per-call comparator.
//! - Dropping a table without `destruct` leaves its nodes marked linked.

mod config;
mod cursor;
mod error;
mod hash_table;
mod hash_table_proptest;
mod node;
mod stats;

// Public surface
pub use config::{TableConfig, DEFAULT_CAPACITIES, DEFAULT_MAX_LOAD};
pub use cursor::Cursor;
pub use error::{TableError, TableResult};
pub use hash_table::{HashTable, Iter};
pub use node::{Node, NodePool, NodeRef};
pub use stats::{ChainStats, MAX_OCCUR};
