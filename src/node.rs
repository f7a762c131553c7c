//! Caller-owned record storage.
//!
//! Records indexed by a `HashTable` live in a `NodePool` that belongs to
//! the caller. The table only stores `NodeRef` handles and threads its
//! chains through the `next` link embedded in each `Node`; it never
//! allocates or frees a record. Handles are generational (slotmap keys), so
//! a handle to a freed record never aliases a later one.

use crate::error::{TableError, TableResult};
use slotmap::{new_key_type, SlotMap};
use std::sync::atomic::{AtomicU64, Ordering};

new_key_type! {
    /// Non-owning handle to a node in a `NodePool`.
    pub struct NodeRef;
}

/// A record header plus the caller's payload.
#[derive(Debug, Clone)]
pub struct Node<T> {
    pub(crate) key: u64,
    pub(crate) next: Option<NodeRef>,
    pub(crate) linked: bool,
    payload: T,
}

impl<T> Node<T> {
    /// Detached node. Also serves as a standalone template for identity lookup.
    pub fn new(key: u64, payload: T) -> Self {
        Self {
            key,
            next: None,
            linked: false,
            payload,
        }
    }

    pub fn key(&self) -> u64 {
        self.key
    }

    pub fn payload(&self) -> &T {
        &self.payload
    }

    pub fn payload_mut(&mut self) -> &mut T {
        &mut self.payload
    }

    /// Whether the node is currently chained into a table.
    pub fn is_linked(&self) -> bool {
        self.linked
    }

    pub fn into_payload(self) -> T {
        self.payload
    }
}

static NEXT_INSTANCE_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique id for pools and tables.
pub(crate) fn next_instance_id() -> u64 {
    NEXT_INSTANCE_ID.fetch_add(1, Ordering::Relaxed)
}

/// Arena of records. Tables are bound to the pool they were built with.
#[derive(Debug)]
pub struct NodePool<T> {
    id: u64,
    slots: SlotMap<NodeRef, Node<T>>,
}

impl<T> Default for NodePool<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> NodePool<T> {
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            id: next_instance_id(),
            slots: SlotMap::with_capacity_and_key(capacity),
        }
    }

    pub(crate) fn id(&self) -> u64 {
        self.id
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Store a record. Whatever link state `node` carried is cleared.
    pub fn alloc(&mut self, mut node: Node<T>) -> NodeRef {
        node.next = None;
        node.linked = false;
        self.slots.insert(node)
    }

    /// Shorthand for `alloc(Node::new(key, payload))`.
    pub fn alloc_with(&mut self, key: u64, payload: T) -> NodeRef {
        self.alloc(Node::new(key, payload))
    }

    pub fn contains(&self, node: NodeRef) -> bool {
        self.slots.contains_key(node)
    }

    pub fn get(&self, node: NodeRef) -> Option<&Node<T>> {
        self.slots.get(node)
    }

    pub fn key(&self, node: NodeRef) -> Option<u64> {
        self.slots.get(node).map(|n| n.key)
    }

    pub fn payload(&self, node: NodeRef) -> Option<&T> {
        self.slots.get(node).map(|n| &n.payload)
    }

    pub fn payload_mut(&mut self, node: NodeRef) -> Option<&mut T> {
        self.slots.get_mut(node).map(|n| &mut n.payload)
    }

    /// Change a record's key. Refused while it is chained, since the chain
    /// it sits in was chosen from the old key.
    pub fn set_key(&mut self, node: NodeRef, key: u64) -> TableResult<()> {
        let n = self.slots.get_mut(node).ok_or(TableError::StaleNode)?;
        if n.linked {
            return Err(TableError::NodeStillLinked);
        }
        n.key = key;
        Ok(())
    }

    /// Release a record and hand it back. Linked records must be removed
    /// from their table first.
    pub fn free(&mut self, node: NodeRef) -> TableResult<Node<T>> {
        match self.slots.get(node) {
            None => Err(TableError::StaleNode),
            Some(n) if n.linked => Err(TableError::NodeStillLinked),
            Some(_) => self.slots.remove(node).ok_or(TableError::StaleNode),
        }
    }

    pub(crate) fn node(&self, node: NodeRef) -> &Node<T> {
        &self.slots[node]
    }

    pub(crate) fn node_mut(&mut self, node: NodeRef) -> &mut Node<T> {
        &mut self.slots[node]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alloc_get_free() {
        let mut pool = NodePool::new();
        let a = pool.alloc_with(7, "a");
        assert_eq!(pool.len(), 1);
        assert_eq!(pool.key(a), Some(7));
        assert_eq!(pool.payload(a), Some(&"a"));
        *pool.payload_mut(a).unwrap() = "b";

        let node = pool.free(a).unwrap();
        assert_eq!(node.into_payload(), "b");
        assert!(pool.is_empty());
        assert!(!pool.contains(a));
        assert_eq!(pool.free(a).unwrap_err(), TableError::StaleNode);
    }

    #[test]
    fn freed_handle_does_not_alias_new_node() {
        let mut pool = NodePool::new();
        let a = pool.alloc_with(1, 10);
        pool.free(a).unwrap();
        let b = pool.alloc_with(1, 20);
        assert_ne!(a, b);
        assert!(pool.get(a).is_none());
        assert_eq!(pool.payload(b), Some(&20));
    }

    #[test]
    fn linked_node_cannot_be_freed_or_rekeyed() {
        let mut pool = NodePool::new();
        let a = pool.alloc_with(1, ());
        pool.node_mut(a).linked = true;
        assert_eq!(pool.free(a).unwrap_err(), TableError::NodeStillLinked);
        assert_eq!(pool.set_key(a, 2).unwrap_err(), TableError::NodeStillLinked);

        pool.node_mut(a).linked = false;
        pool.set_key(a, 2).unwrap();
        assert_eq!(pool.key(a), Some(2));
        assert!(pool.free(a).is_ok());
    }

    #[test]
    fn alloc_clears_link_state() {
        let mut pool = NodePool::new();
        let mut n = Node::new(3, ());
        n.linked = true;
        let h = pool.alloc(n);
        assert!(!pool.get(h).unwrap().is_linked());
    }

    #[test]
    fn pools_have_distinct_ids() {
        let a: NodePool<()> = NodePool::new();
        let b: NodePool<()> = NodePool::new();
        assert_ne!(a.id(), b.id());
    }
}
