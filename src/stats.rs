//! Chain statistics: how long the chains are and how often keys and
//! elements repeat. Used to judge whether the key distribution suits the
//! capacity sequence.

use crate::node::{Node, NodePool, NodeRef};
use hashbrown::HashMap;
use tracing::info;

/// Occurrence counts at or above this land in the last histogram slot.
pub const MAX_OCCUR: usize = 20;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChainStats {
    /// `chain_lengths[n]`: number of chains holding `n` nodes.
    pub chain_lengths: [usize; MAX_OCCUR + 1],
    /// `key_occurrences[n]`: number of keys present `n` times.
    pub key_occurrences: [usize; MAX_OCCUR + 1],
    /// `element_occurrences[n]`: number of elements present `n` times,
    /// where two nodes are the same element when their keys match and the
    /// comparator accepts them.
    pub element_occurrences: [usize; MAX_OCCUR + 1],
}

#[inline]
fn bump(hist: &mut [usize; MAX_OCCUR + 1], n: usize) {
    hist[n.min(MAX_OCCUR)] += 1;
}

impl ChainStats {
    pub(crate) fn collect<T, F>(buckets: &[Option<NodeRef>], pool: &NodePool<T>, same: F) -> Self
    where
        F: Fn(&Node<T>, &Node<T>) -> bool,
    {
        let mut stats = ChainStats {
            chain_lengths: [0; MAX_OCCUR + 1],
            key_occurrences: [0; MAX_OCCUR + 1],
            element_occurrences: [0; MAX_OCCUR + 1],
        };
        let mut chain: Vec<&Node<T>> = Vec::new();

        for head in buckets.iter().copied() {
            chain.clear();
            let mut cur = head;
            while let Some(h) = cur {
                let n = pool.node(h);
                chain.push(n);
                cur = n.next;
            }
            bump(&mut stats.chain_lengths, chain.len());

            // Equal keys always share a chain, so per-chain counts are global.
            let mut keys: HashMap<u64, usize> = HashMap::new();
            for n in &chain {
                *keys.entry(n.key).or_insert(0) += 1;
            }
            for &count in keys.values() {
                bump(&mut stats.key_occurrences, count);
            }

            // Quadratic in chain length; chains are short unless the table
            // is far past its ceiling.
            for (i, node) in chain.iter().enumerate() {
                let is_same = |other: &&Node<T>| other.key == node.key && same(other, node);
                if chain[..i].iter().any(is_same) {
                    continue;
                }
                let n = chain[i..].iter().filter(|o| is_same(o)).count();
                bump(&mut stats.element_occurrences, n);
            }
        }
        stats
    }

    /// Total number of chains, empty ones included.
    pub fn slots(&self) -> usize {
        self.chain_lengths.iter().sum()
    }

    pub fn empty_slots(&self) -> usize {
        self.chain_lengths[0]
    }

    pub fn distinct_keys(&self) -> usize {
        self.key_occurrences.iter().sum()
    }

    pub fn distinct_elements(&self) -> usize {
        self.element_occurrences.iter().sum()
    }

    /// Distinct elements per non-empty chain.
    pub fn avg_chain_len(&self) -> f64 {
        let used = self.slots() - self.empty_slots();
        self.distinct_elements() as f64 / used.max(1) as f64
    }

    /// Emit the report through `tracing` at info level.
    pub fn log(&self, table: &str) {
        info!(
            target: "hashtable",
            table,
            "nr occurrences of chains of len N, N-plicated keys, N-plicated elts"
        );
        for i in 0..=MAX_OCCUR {
            let (c, k, e) = (
                self.chain_lengths[i],
                self.key_occurrences[i],
                self.element_occurrences[i],
            );
            if c == 0 && k == 0 && e == 0 {
                continue;
            }
            let op = if i == MAX_OCCUR { ">" } else { "N" };
            info!(
                target: "hashtable",
                table,
                "{}={:2} : nr chain {:6}, nr keys {:6}, nr elts {:6}",
                op,
                i,
                c,
                k,
                e
            );
        }
        info!(
            target: "hashtable",
            table,
            "total nr of unique slots: {:6}, keys {:6}, elts {:6}. Avg chain len {:3.1}",
            self.slots(),
            self.distinct_keys(),
            self.distinct_elements(),
            self.avg_chain_len()
        );
    }
}
