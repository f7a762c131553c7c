//! HashTable: separately-chained index over records in a `NodePool`.

use crate::config::TableConfig;
use crate::cursor::Cursor;
use crate::error::{TableError, TableResult};
use crate::node::{next_instance_id, Node, NodePool, NodeRef};
use crate::stats::ChainStats;
use core::marker::PhantomData;
use std::sync::Arc;
use tracing::debug;

/// Chained hash table keyed by `u64`. Buckets hold chain heads; each chain
/// is threaded through the `next` links of the nodes themselves.
///
/// The table never owns its records. Every operation takes the `NodePool`
/// the table was constructed with; passing any other pool panics.
///
/// Dropping a non-empty table without `destruct` leaves its nodes marked
/// as linked, so the pool will refuse to free them.
pub struct HashTable<T> {
    name: Arc<str>,
    config: TableConfig,
    buckets: Vec<Option<NodeRef>>,
    count: usize,
    // Bumped on every structural change; cursors compare against it.
    epoch: u64,
    id: u64,
    pool_id: u64,
    ceiling_reported: bool,
    _pd: PhantomData<fn() -> T>,
}

impl<T> core::fmt::Debug for HashTable<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("HashTable")
            .field("name", &self.name)
            .field("count", &self.count)
            .field("capacity", &self.buckets.len())
            .finish()
    }
}

fn alloc_buckets(table: &str, capacity: usize) -> TableResult<Vec<Option<NodeRef>>> {
    let mut buckets = Vec::new();
    buckets
        .try_reserve_exact(capacity)
        .map_err(|_| TableError::AllocationFailed {
            table: table.to_string(),
            capacity,
        })?;
    buckets.resize(capacity, None);
    Ok(buckets)
}

impl<T> HashTable<T> {
    /// Empty table at the smallest default capacity, bound to `pool`.
    pub fn construct(name: &str, pool: &NodePool<T>) -> TableResult<Self> {
        Self::with_config(name, pool, TableConfig::default())
    }

    pub fn with_config(name: &str, pool: &NodePool<T>, config: TableConfig) -> TableResult<Self> {
        if name.is_empty() {
            return Err(TableError::MissingName);
        }
        config.validate()?;
        let buckets = alloc_buckets(name, config.initial_capacity())?;
        Ok(Self {
            name: Arc::from(name),
            config,
            buckets,
            count: 0,
            epoch: 0,
            id: next_instance_id(),
            pool_id: pool.id(),
            ceiling_reported: false,
            _pd: PhantomData,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn shared_name(&self) -> Arc<str> {
        Arc::clone(&self.name)
    }

    pub fn config(&self) -> &TableConfig {
        &self.config
    }

    /// Number of indexed nodes.
    pub fn count(&self) -> usize {
        self.count
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Current number of buckets.
    pub fn capacity(&self) -> usize {
        self.buckets.len()
    }

    pub fn load_factor(&self) -> f64 {
        self.count as f64 / self.buckets.len() as f64
    }

    pub(crate) fn id(&self) -> u64 {
        self.id
    }

    pub(crate) fn epoch(&self) -> u64 {
        self.epoch
    }

    fn touch(&mut self) {
        self.epoch = self.epoch.wrapping_add(1);
    }

    #[inline]
    fn bucket_of(&self, key: u64) -> usize {
        (key % self.buckets.len() as u64) as usize
    }

    #[inline]
    pub(crate) fn check_pool(&self, pool: &NodePool<T>) {
        assert!(
            pool.id() == self.pool_id,
            "table `{}` used with a node pool it was not constructed with",
            self.name
        );
    }

    /// Link `node` at the head of its chain. Duplicate keys are allowed;
    /// the most recent insert shadows older ones on lookup.
    ///
    /// Grows the bucket array first when the insert would push the average
    /// chain length past the configured threshold. If that allocation
    /// fails, the table is left untouched and `node` stays unlinked.
    pub fn insert(&mut self, pool: &mut NodePool<T>, node: NodeRef) -> TableResult<()> {
        self.check_pool(pool);
        match pool.get(node) {
            None => return Err(TableError::StaleNode),
            Some(n) if n.linked => return Err(TableError::AlreadyLinked),
            Some(_) => {}
        }

        let limit = self
            .buckets
            .len()
            .saturating_mul(self.config.max_load());
        if self.count + 1 > limit {
            self.grow(pool)?;
        }

        let idx = self.bucket_of(pool.node(node).key);
        let n = pool.node_mut(node);
        n.next = self.buckets[idx];
        n.linked = true;
        self.buckets[idx] = Some(node);
        self.count += 1;
        self.touch();
        Ok(())
    }

    fn grow(&mut self, pool: &mut NodePool<T>) -> TableResult<()> {
        let old_capacity = self.buckets.len();
        let Some(new_capacity) = self.config.next_capacity(old_capacity) else {
            if !self.ceiling_reported {
                self.ceiling_reported = true;
                debug!(
                    target: "hashtable",
                    table = %self.name,
                    capacity = old_capacity,
                    elems = self.count,
                    "table at maximum capacity, chains will lengthen"
                );
            }
            return Ok(());
        };

        let mut chains = alloc_buckets(&self.name, new_capacity)?;
        debug!(
            target: "hashtable",
            table = %self.name,
            from = old_capacity,
            to = new_capacity,
            elems = self.count,
            "resizing table"
        );

        // Relink each old chain tail first so nodes that share a new chain
        // keep their relative order; same-key duplicates stay newest-first.
        let mut chain = Vec::new();
        for head in self.buckets.iter().copied() {
            chain.clear();
            let mut cur = head;
            while let Some(h) = cur {
                chain.push(h);
                cur = pool.node(h).next;
            }
            for &h in chain.iter().rev() {
                let n = pool.node_mut(h);
                let idx = (n.key % new_capacity as u64) as usize;
                n.next = chains[idx];
                chains[idx] = Some(h);
            }
        }

        self.buckets = chains;
        self.touch();
        Ok(())
    }

    /// Walk the chain for `key` and return the first node accepted by
    /// `accept`, along with its predecessor in the chain.
    fn find_in_chain<F>(
        &self,
        pool: &NodePool<T>,
        key: u64,
        mut accept: F,
    ) -> Option<(Option<NodeRef>, NodeRef)>
    where
        F: FnMut(&Node<T>) -> bool,
    {
        let mut prev = None;
        let mut cur = self.buckets[self.bucket_of(key)];
        while let Some(h) = cur {
            let n = pool.node(h);
            if n.key == key && accept(n) {
                return Some((prev, h));
            }
            prev = Some(h);
            cur = n.next;
        }
        None
    }

    fn unlink(&mut self, pool: &mut NodePool<T>, prev: Option<NodeRef>, node: NodeRef) {
        let idx = self.bucket_of(pool.node(node).key);
        let n = pool.node_mut(node);
        let next = n.next.take();
        n.linked = false;
        match prev {
            Some(p) => pool.node_mut(p).next = next,
            None => self.buckets[idx] = next,
        }
        self.count -= 1;
        self.touch();
    }

    /// Unlink a specific node, searching its chain for the predecessor.
    pub(crate) fn unlink_node(&mut self, pool: &mut NodePool<T>, node: NodeRef) {
        let mut prev = None;
        let mut cur = self.buckets[self.bucket_of(pool.node(node).key)];
        while let Some(h) = cur {
            if h == node {
                break;
            }
            prev = Some(h);
            cur = pool.node(h).next;
        }
        debug_assert_eq!(cur, Some(node), "node is not in its chain");
        self.unlink(pool, prev, node);
    }

    /// Most recently inserted node with `key`.
    pub fn lookup(&self, pool: &NodePool<T>, key: u64) -> Option<NodeRef> {
        self.check_pool(pool);
        self.find_in_chain(pool, key, |_| true).map(|(_, h)| h)
    }

    /// Like `lookup`, but a candidate must also satisfy
    /// `same(template, candidate)`. `template` need not be in the pool.
    pub fn lookup_by_identity<F>(
        &self,
        pool: &NodePool<T>,
        template: &Node<T>,
        same: F,
    ) -> Option<NodeRef>
    where
        F: Fn(&Node<T>, &Node<T>) -> bool,
    {
        self.check_pool(pool);
        self.find_in_chain(pool, template.key, |cand| same(template, cand))
            .map(|(_, h)| h)
    }

    /// Unlink the node `lookup(key)` would return and hand it back.
    /// Removes one node per call even when the key is duplicated.
    pub fn remove(&mut self, pool: &mut NodePool<T>, key: u64) -> Option<NodeRef> {
        self.check_pool(pool);
        let (prev, node) = self.find_in_chain(pool, key, |_| true)?;
        self.unlink(pool, prev, node);
        Some(node)
    }

    pub fn remove_by_identity<F>(
        &mut self,
        pool: &mut NodePool<T>,
        template: &Node<T>,
        same: F,
    ) -> Option<NodeRef>
    where
        F: Fn(&Node<T>, &Node<T>) -> bool,
    {
        self.check_pool(pool);
        let (prev, node) =
            self.find_in_chain(pool, template.key, |cand| same(template, cand))?;
        self.unlink(pool, prev, node);
        Some(node)
    }

    /// First non-empty bucket at or after `from`, with its head.
    pub(crate) fn first_chain_from(&self, from: usize) -> Option<(usize, NodeRef)> {
        self.buckets
            .iter()
            .enumerate()
            .skip(from)
            .find_map(|(i, head)| head.map(|h| (i, h)))
    }

    /// Every indexed node, in bucket order then chain order.
    pub fn snapshot(&self, pool: &NodePool<T>) -> Vec<NodeRef> {
        self.iter(pool).map(|(h, _)| h).collect()
    }

    pub fn iter<'a>(&'a self, pool: &'a NodePool<T>) -> Iter<'a, T> {
        self.check_pool(pool);
        Iter {
            table: self,
            pool,
            next_bucket: 0,
            cur: None,
            remaining: self.count,
        }
    }

    /// A fresh cursor in the reset state.
    pub fn cursor(&self) -> Cursor {
        Cursor::new(self)
    }

    pub fn stats(&self, pool: &NodePool<T>) -> ChainStats {
        self.check_pool(pool);
        ChainStats::collect(&self.buckets, pool, |_, _| true)
    }

    /// Chain statistics where two same-key nodes count as the same element
    /// only when `same` holds.
    pub fn stats_with<F>(&self, pool: &NodePool<T>, same: F) -> ChainStats
    where
        F: Fn(&Node<T>, &Node<T>) -> bool,
    {
        self.check_pool(pool);
        ChainStats::collect(&self.buckets, pool, same)
    }

    /// Tear the table down, handing each node to `dispose` in bucket then
    /// chain order. Nodes are unlinked before `dispose` sees them, so it
    /// may free them from the pool.
    pub fn destruct<F>(mut self, pool: &mut NodePool<T>, mut dispose: F)
    where
        F: FnMut(&mut NodePool<T>, NodeRef),
    {
        self.check_pool(pool);
        for i in 0..self.buckets.len() {
            let mut cur = self.buckets[i].take();
            while let Some(h) = cur {
                let n = pool.node_mut(h);
                cur = n.next.take();
                n.linked = false;
                dispose(pool, h);
            }
        }
    }
}

/// Borrowing iterator over `(handle, node)` pairs.
pub struct Iter<'a, T> {
    table: &'a HashTable<T>,
    pool: &'a NodePool<T>,
    next_bucket: usize,
    cur: Option<NodeRef>,
    remaining: usize,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = (NodeRef, &'a Node<T>);

    fn next(&mut self) -> Option<Self::Item> {
        let next = match self.cur.and_then(|h| self.pool.node(h).next) {
            Some(h) => h,
            None => {
                let (bucket, head) = self.table.first_chain_from(self.next_bucket)?;
                self.next_bucket = bucket + 1;
                head
            }
        };
        self.cur = Some(next);
        self.remaining -= 1;
        Some((next, self.pool.node(next)))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<T> ExactSizeIterator for Iter<'_, T> {}
