// Cursor integration suite.
//
// Invariants exercised:
// - A walk with no intervening mutation yields exactly count distinct
//   nodes, matching snapshot().
// - insert / remove(key) invalidate every cursor; advance then fails with
//   InvalidCursor until reset.
// - Lookups and snapshots are read-only and leave cursors valid.
// - remove_current is the one sanctioned mutation: the walk continues and
//   neither revisits the removed node nor skips a survivor.
use chain_table::{Cursor, HashTable, Node, NodePool, NodeRef, TableConfig, TableError};
use std::collections::BTreeSet;

fn filled(keys: impl IntoIterator<Item = u64>) -> (NodePool<u64>, HashTable<u64>) {
    let mut pool = NodePool::new();
    let mut t = HashTable::construct("contexts", &pool).unwrap();
    for k in keys {
        let n = pool.alloc_with(k, k);
        t.insert(&mut pool, n).unwrap();
    }
    (pool, t)
}

fn walk(c: &mut Cursor, t: &HashTable<u64>, pool: &NodePool<u64>) -> Vec<NodeRef> {
    let mut out = Vec::new();
    while let Some(n) = c.advance(t, pool).expect("cursor valid") {
        out.push(n);
    }
    out
}

// Test: full walk.
// Verifies: count distinct nodes, same sequence as snapshot; further
// advances keep returning None.
#[test]
fn full_walk_yields_every_node_once() {
    let (pool, t) = filled((0..2000u64).map(|k| k * 13));
    let mut c = t.cursor();
    let seen = walk(&mut c, &t, &pool);
    assert_eq!(seen.len(), t.count());
    assert_eq!(seen.iter().copied().collect::<BTreeSet<_>>().len(), seen.len());
    assert_eq!(seen, t.snapshot(&pool));
    assert_eq!(c.advance(&t, &pool).unwrap(), None);
    assert_eq!(c.advance(&t, &pool).unwrap(), None);
}

// Test: advance after insert without reset.
// Verifies: rejected as a contract violation.
#[test]
fn advance_after_insert_is_rejected() {
    let (mut pool, mut t) = filled([1, 2, 3]);
    let mut c = t.cursor();
    assert!(c.advance(&t, &pool).unwrap().is_some());

    let n = pool.alloc_with(4, 4);
    t.insert(&mut pool, n).unwrap();

    let err = c.advance(&t, &pool).unwrap_err();
    assert!(matches!(err, TableError::InvalidCursor(ref name) if name == "contexts"));
    assert!(err.is_contract_violation());
}

// Test: advance after remove(key) without reset.
// Verifies: rejected; reset makes the cursor usable again.
#[test]
fn advance_after_remove_is_rejected_until_reset() {
    let (mut pool, mut t) = filled([1, 2, 3]);
    let mut c = t.cursor();
    c.advance(&t, &pool).unwrap();
    let removed = t.remove(&mut pool, 2).unwrap();
    pool.free(removed).unwrap();

    assert!(matches!(
        c.advance(&t, &pool),
        Err(TableError::InvalidCursor(_))
    ));
    assert!(matches!(
        c.remove_current(&mut t, &mut pool),
        Err(TableError::InvalidCursor(_))
    ));

    c.reset(&t);
    assert_eq!(walk(&mut c, &t, &pool).len(), 2);
}

// Test: read-only calls mid-walk.
// Assumes: the walk is positioned on its first node.
// Verifies: lookup, lookup_by_identity and snapshot leave the cursor valid;
// the walk then finishes in snapshot order, and remove_current still works.
#[test]
fn reads_between_advances_keep_cursor_valid() {
    let (mut pool, mut t) = filled((0..50u64).map(|k| k * 7));
    let expected = t.snapshot(&pool);

    let mut c = t.cursor();
    let first = c.advance(&t, &pool).unwrap().unwrap();

    assert!(t.lookup(&pool, 21).is_some());
    assert_eq!(t.lookup(&pool, 22), None);
    let same = |p: &Node<u64>, n: &Node<u64>| p.payload() == n.payload();
    assert!(t.lookup_by_identity(&pool, &Node::new(14, 14), same).is_some());
    assert_eq!(t.lookup_by_identity(&pool, &Node::new(14, 15), same), None);
    assert_eq!(t.snapshot(&pool), expected);
    assert_eq!(t.iter(&pool).count(), expected.len());
    assert!(c.is_valid(&t));

    let mut seen = vec![first];
    seen.extend(walk(&mut c, &t, &pool));
    assert_eq!(seen, expected);

    c.reset(&t);
    let head = c.advance(&t, &pool).unwrap().unwrap();
    assert!(t.lookup(&pool, pool.key(head).unwrap()).is_some());
    assert_eq!(c.remove_current(&mut t, &mut pool).unwrap(), head);
    assert_eq!(walk(&mut c, &t, &pool), expected[1..].to_vec());
    assert!(c.is_exhausted());
    assert_eq!(c.advance(&t, &pool).unwrap(), None);
}

// Test: growth mid-walk.
// Verifies: the rehash is a structural change and invalidates the cursor.
#[test]
fn growth_invalidates_cursor() {
    let mut pool = NodePool::new();
    let cfg = TableConfig::new().with_capacities(vec![2, 5]);
    let mut t = HashTable::with_config("tiny", &pool, cfg).unwrap();
    for k in 0..2u64 {
        let n = pool.alloc_with(k, k);
        t.insert(&mut pool, n).unwrap();
    }
    let mut c = t.cursor();
    c.advance(&t, &pool).unwrap();
    let n = pool.alloc_with(9, 9);
    t.insert(&mut pool, n).unwrap();
    assert_eq!(t.capacity(), 5);
    assert!(c.advance(&t, &pool).is_err());
}

// Test: remove_current while walking.
// Assumes: keys in several colliding chains.
// Verifies: the walk visits every original node once, the removed ones
// are gone afterwards, and survivors are all still indexed.
#[test]
fn remove_current_while_walking() {
    let cap = 769u64;
    let keys: Vec<u64> = (0..300u64).map(|i| (i % 40) + (i / 40) * cap).collect();
    let (mut pool, mut t) = filled(keys.iter().copied());
    let before = t.snapshot(&pool);

    let mut c = t.cursor();
    let mut visited = Vec::new();
    let mut removed = Vec::new();
    while let Some(n) = c.advance(&t, &pool).unwrap() {
        visited.push(n);
        if pool.payload(n).unwrap() % 3 == 0 {
            assert_eq!(c.remove_current(&mut t, &mut pool).unwrap(), n);
            removed.push(n);
        }
    }
    assert_eq!(visited, before);
    assert_eq!(t.count(), before.len() - removed.len());

    let survivors: BTreeSet<NodeRef> = t.snapshot(&pool).into_iter().collect();
    for n in &removed {
        assert!(!survivors.contains(n));
        pool.free(*n).unwrap();
    }
    for n in &before {
        if !removed.contains(n) {
            assert!(survivors.contains(n));
        }
    }
}

// Test: remove_current without a positioned node.
// Verifies: NoCurrentNode before the first advance and after exhaustion.
#[test]
fn remove_current_needs_a_position() {
    let (mut pool, mut t) = filled([7]);
    let mut c = t.cursor();
    assert_eq!(
        c.remove_current(&mut t, &mut pool),
        Err(TableError::NoCurrentNode)
    );
    walk(&mut c, &t, &pool);
    assert!(c.is_exhausted());
    assert_eq!(
        c.remove_current(&mut t, &mut pool),
        Err(TableError::NoCurrentNode)
    );
}
