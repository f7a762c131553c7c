//! External iteration cursor.
//!
//! A `Cursor` walks a table bucket by bucket, then along each chain, while
//! leaving the table free to be borrowed mutably between steps. Any
//! structural change to the table (insert, remove, growth) invalidates
//! every outstanding cursor; `advance` then fails with
//! `TableError::InvalidCursor` until the cursor is reset. The one sanctioned
//! mutation mid-walk is `Cursor::remove_current`, which keeps the calling
//! cursor valid.

use crate::error::{TableError, TableResult};
use crate::hash_table::HashTable;
use crate::node::{NodePool, NodeRef};
use std::sync::Arc;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum State {
    Reset,
    /// `node` was the last node returned; `next_bucket` is where the bucket
    /// scan resumes once its chain runs out.
    Positioned {
        node: NodeRef,
        next_bucket: usize,
    },
    /// The positioned node was removed; `successor` was its chain successor.
    Detached {
        successor: Option<NodeRef>,
        next_bucket: usize,
    },
    Exhausted,
}

#[derive(Clone, Debug)]
pub struct Cursor {
    table_id: u64,
    table_name: Arc<str>,
    epoch: u64,
    state: State,
}

impl Cursor {
    pub(crate) fn new<T>(table: &HashTable<T>) -> Self {
        Self {
            table_id: table.id(),
            table_name: table.shared_name(),
            epoch: table.epoch(),
            state: State::Reset,
        }
    }

    /// Rewind to before the first bucket and resynchronise with `table`.
    pub fn reset<T>(&mut self, table: &HashTable<T>) {
        *self = Self::new(table);
    }

    /// True when no structural change happened since the last reset other
    /// than through this cursor.
    pub fn is_valid<T>(&self, table: &HashTable<T>) -> bool {
        self.table_id == table.id() && self.epoch == table.epoch()
    }

    /// Node most recently returned by `advance`, unless it was removed.
    pub fn current(&self) -> Option<NodeRef> {
        match self.state {
            State::Positioned { node, .. } => Some(node),
            _ => None,
        }
    }

    pub fn is_exhausted(&self) -> bool {
        self.state == State::Exhausted
    }

    fn check<T>(&self, table: &HashTable<T>) -> TableResult<()> {
        if self.is_valid(table) {
            Ok(())
        } else {
            Err(TableError::InvalidCursor(self.table_name.to_string()))
        }
    }

    /// Next node in bucket-then-chain order, or `None` once every bucket
    /// has been visited. Stays exhausted until `reset`.
    pub fn advance<T>(
        &mut self,
        table: &HashTable<T>,
        pool: &NodePool<T>,
    ) -> TableResult<Option<NodeRef>> {
        self.check(table)?;
        table.check_pool(pool);

        let (successor, from) = match self.state {
            State::Reset => (None, 0),
            State::Positioned { node, next_bucket } => (pool.node(node).next, next_bucket),
            State::Detached {
                successor,
                next_bucket,
            } => (successor, next_bucket),
            State::Exhausted => return Ok(None),
        };

        if let Some(node) = successor {
            self.state = State::Positioned {
                node,
                next_bucket: from,
            };
            return Ok(Some(node));
        }

        match table.first_chain_from(from) {
            Some((bucket, head)) => {
                self.state = State::Positioned {
                    node: head,
                    next_bucket: bucket + 1,
                };
                Ok(Some(head))
            }
            None => {
                self.state = State::Exhausted;
                Ok(None)
            }
        }
    }

    /// Unlink the positioned node and return it. The cursor stays valid and
    /// the next `advance` yields the removed node's successor.
    pub fn remove_current<T>(
        &mut self,
        table: &mut HashTable<T>,
        pool: &mut NodePool<T>,
    ) -> TableResult<NodeRef> {
        self.check(table)?;
        table.check_pool(pool);
        let State::Positioned { node, next_bucket } = self.state else {
            return Err(TableError::NoCurrentNode);
        };

        let successor = pool.node(node).next;
        table.unlink_node(pool, node);
        self.epoch = table.epoch();
        self.state = State::Detached {
            successor,
            next_bucket,
        };
        Ok(node)
    }
}
