#![cfg(test)]

// Property tests for HashTable and Cursor kept inside the crate so they can
// check link state and pool internals directly.

use crate::config::TableConfig;
use crate::error::TableError;
use crate::hash_table::HashTable;
use crate::node::{Node, NodePool, NodeRef};
use proptest::prelude::*;
use std::collections::{BTreeSet, HashMap};

// Key-pool-indexed operations so shrinking moves toward earlier keys.
#[derive(Clone, Debug)]
enum OpI {
    Insert(usize),
    Remove(usize),
    RemoveById(usize, u32),
    Lookup(usize),
    Walk,
    // Walk with a cursor, removing every node whose id is divisible by
    // the given step.
    WalkRemoving(u32),
    // Insert mid-walk; the cursor must refuse to continue.
    InterruptedWalk(usize),
}

fn arb_scenario() -> impl Strategy<Value = (Vec<u64>, Vec<OpI>)> {
    // Small keys collide heavily against the small capacities below.
    proptest::collection::vec(0u64..64, 1..=10).prop_flat_map(|keys| {
        let idxs: Vec<usize> = (0..keys.len()).collect();
        let idx = proptest::sample::select(idxs);
        let op = prop_oneof![
            4 => idx.clone().prop_map(OpI::Insert),
            2 => idx.clone().prop_map(OpI::Remove),
            1 => (idx.clone(), 0u32..40).prop_map(|(i, id)| OpI::RemoveById(i, id)),
            2 => idx.clone().prop_map(OpI::Lookup),
            1 => Just(OpI::Walk),
            1 => (1u32..4).prop_map(OpI::WalkRemoving),
            1 => idx.clone().prop_map(OpI::InterruptedWalk),
        ];
        proptest::collection::vec(op, 1..80).prop_map(move |ops| (keys.clone(), ops))
    })
}

fn small_config() -> TableConfig {
    TableConfig::new().with_capacities(vec![3, 7, 17, 37])
}

struct Harness {
    pool: NodePool<u32>,
    table: HashTable<u32>,
    // key -> handles in insertion order; the last one is the newest.
    model: HashMap<u64, Vec<NodeRef>>,
    next_id: u32,
    inserted: usize,
    removed: usize,
}

impl Harness {
    fn new() -> Self {
        let pool = NodePool::new();
        let table = HashTable::with_config("prop", &pool, small_config()).unwrap();
        Self {
            pool,
            table,
            model: HashMap::new(),
            next_id: 0,
            inserted: 0,
            removed: 0,
        }
    }

    fn insert(&mut self, key: u64) {
        let n = self.pool.alloc_with(key, self.next_id);
        self.next_id += 1;
        self.table.insert(&mut self.pool, n).unwrap();
        self.model.entry(key).or_default().push(n);
        self.inserted += 1;
    }

    // Drop a removed handle from the model and free it from the pool.
    fn forget(&mut self, n: NodeRef) {
        let key = self.pool.key(n).unwrap();
        let chain = self.model.get_mut(&key).unwrap();
        let pos = chain.iter().position(|&h| h == n).unwrap();
        chain.remove(pos);
        self.pool.free(n).unwrap();
        self.removed += 1;
    }

    fn live(&self) -> BTreeSet<NodeRef> {
        self.model.values().flatten().copied().collect()
    }
}

// Property: State-machine equivalence against a per-key stack model.
// Invariants exercised across random operation sequences:
// - `lookup(k)` returns the newest live node with key `k`, or `None`.
// - `remove(k)` takes exactly that node; identity removal needs the
//   comparator to agree.
// - `count == inserts - successful removes`, across any number of growths.
// - A cursor walk with no mutation yields each live node once, in snapshot
//   order; `remove_current` never skips or revisits survivors.
// - A cursor refuses to advance after an insert it did not make.
proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_state_machine((keys, ops) in arb_scenario()) {
        let mut h = Harness::new();

        for op in ops {
            match op {
                OpI::Insert(i) => h.insert(keys[i]),
                OpI::Remove(i) => {
                    let k = keys[i];
                    let expected = h.model.get(&k).and_then(|v| v.last().copied());
                    let got = h.table.remove(&mut h.pool, k);
                    prop_assert_eq!(got, expected);
                    if let Some(n) = got {
                        prop_assert!(!h.pool.get(n).unwrap().is_linked());
                        h.forget(n);
                    }
                }
                OpI::RemoveById(i, id) => {
                    let k = keys[i];
                    let expected = h.model.get(&k).and_then(|v| {
                        v.iter().rev().copied().find(|&n| *h.pool.payload(n).unwrap() == id)
                    });
                    let template = Node::new(k, id);
                    let got = h.table.remove_by_identity(&mut h.pool, &template, |p, c| {
                        p.payload() == c.payload()
                    });
                    prop_assert_eq!(got, expected);
                    if let Some(n) = got {
                        h.forget(n);
                    }
                }
                OpI::Lookup(i) => {
                    let k = keys[i];
                    let expected = h.model.get(&k).and_then(|v| v.last().copied());
                    prop_assert_eq!(h.table.lookup(&h.pool, k), expected);
                }
                OpI::Walk => {
                    let mut c = h.table.cursor();
                    let mut walked = Vec::new();
                    while let Some(n) = c.advance(&h.table, &h.pool).unwrap() {
                        walked.push(n);
                    }
                    prop_assert_eq!(&walked, &h.table.snapshot(&h.pool));
                    let set: BTreeSet<_> = walked.iter().copied().collect();
                    prop_assert_eq!(set.len(), walked.len());
                    prop_assert_eq!(set, h.live());
                }
                OpI::WalkRemoving(step) => {
                    let before = h.table.snapshot(&h.pool);
                    let mut c = h.table.cursor();
                    let mut walked = Vec::new();
                    let mut dropped = Vec::new();
                    while let Some(n) = c.advance(&h.table, &h.pool).unwrap() {
                        walked.push(n);
                        if h.pool.payload(n).unwrap() % step == 0 {
                            prop_assert_eq!(c.remove_current(&mut h.table, &mut h.pool).unwrap(), n);
                            dropped.push(n);
                        }
                    }
                    prop_assert_eq!(walked, before);
                    for n in dropped {
                        h.forget(n);
                    }
                    let after: BTreeSet<_> = h.table.snapshot(&h.pool).into_iter().collect();
                    prop_assert_eq!(after, h.live());
                }
                OpI::InterruptedWalk(i) => {
                    let mut c = h.table.cursor();
                    let _ = c.advance(&h.table, &h.pool).unwrap();
                    h.insert(keys[i]);
                    prop_assert!(matches!(
                        c.advance(&h.table, &h.pool),
                        Err(TableError::InvalidCursor(_))
                    ));
                }
            }

            // Post-conditions after each op
            prop_assert_eq!(h.table.count(), h.inserted - h.removed);
            prop_assert_eq!(h.table.count(), h.live().len());
            prop_assert_eq!(h.pool.len(), h.table.count());
            prop_assert!(small_config().capacities().contains(&h.table.capacity()));
            for n in h.live() {
                prop_assert!(h.pool.get(n).unwrap().is_linked());
            }
        }

        // Teardown disposes each live node exactly once.
        let live = h.live();
        let mut disposed = Vec::new();
        h.table.destruct(&mut h.pool, |pool, n| {
            pool.free(n).unwrap();
            disposed.push(n);
        });
        prop_assert_eq!(disposed.len(), live.len());
        prop_assert_eq!(disposed.into_iter().collect::<BTreeSet<_>>(), live);
        prop_assert!(h.pool.is_empty());
    }
}

// Property: after any run of inserts, every key is still reachable and the
// capacity only ever moved up the configured sequence.
proptest! {
    #![proptest_config(ProptestConfig { cases: 32, .. ProptestConfig::default() })]
    #[test]
    fn prop_growth_preserves_membership(keys in proptest::collection::vec(any::<u64>(), 0..120)) {
        let mut h = Harness::new();
        let mut last_capacity = h.table.capacity();
        for &k in &keys {
            h.insert(k);
            prop_assert!(h.table.capacity() >= last_capacity);
            last_capacity = h.table.capacity();
        }
        for (&k, nodes) in &h.model {
            prop_assert_eq!(h.table.lookup(&h.pool, k), nodes.last().copied());
        }
        prop_assert_eq!(h.table.count(), keys.len());
        if keys.len() > 37 {
            prop_assert_eq!(h.table.capacity(), 37);
        }
    }
}
