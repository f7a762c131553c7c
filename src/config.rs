//! Growth policy: the capacity sequence and the load threshold.

use crate::error::{TableError, TableResult};
use std::borrow::Cow;

/// Default bucket counts. Primes roughly doubling each step; the last entry
/// is the growth ceiling.
pub static DEFAULT_CAPACITIES: [usize; 20] = [
    769, 1543, 3079, 6151, 12289, 24593, 49157, 98317, 196613, 393241, 786433, 1572869, 3145739,
    6291469, 12582917, 25165843, 50331653, 100663319, 201326611, 402653189,
];

/// Default average chain length above which the table grows.
pub const DEFAULT_MAX_LOAD: usize = 1;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TableConfig {
    capacities: Cow<'static, [usize]>,
    max_load: usize,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            capacities: Cow::Borrowed(&DEFAULT_CAPACITIES),
            max_load: DEFAULT_MAX_LOAD,
        }
    }
}

impl TableConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the capacity sequence. Checked by `validate`.
    pub fn with_capacities(mut self, capacities: impl Into<Cow<'static, [usize]>>) -> Self {
        self.capacities = capacities.into();
        self
    }

    pub fn with_max_load(mut self, max_load: usize) -> Self {
        self.max_load = max_load;
        self
    }

    pub fn capacities(&self) -> &[usize] {
        &self.capacities
    }

    pub fn max_load(&self) -> usize {
        self.max_load
    }

    /// Capacity a new table starts with.
    pub fn initial_capacity(&self) -> usize {
        self.capacities[0]
    }

    /// Largest capacity the table will ever adopt.
    pub fn ceiling(&self) -> usize {
        self.capacities[self.capacities.len() - 1]
    }

    /// Smallest sequence value strictly greater than `current`, or `None`
    /// once `current` is at or past the ceiling.
    pub fn next_capacity(&self, current: usize) -> Option<usize> {
        self.capacities.iter().copied().find(|&c| c > current)
    }

    pub fn validate(&self) -> TableResult<()> {
        if self.capacities.is_empty() {
            return Err(TableError::InvalidConfig(
                "capacity sequence is empty".to_string(),
            ));
        }
        if self.capacities[0] == 0 {
            return Err(TableError::InvalidConfig(
                "capacity sequence starts at zero".to_string(),
            ));
        }
        if let Some(w) = self.capacities.windows(2).find(|w| w[0] >= w[1]) {
            return Err(TableError::InvalidConfig(format!(
                "capacity sequence is not strictly ascending at {} -> {}",
                w[0], w[1]
            )));
        }
        if self.max_load == 0 {
            return Err(TableError::InvalidConfig(
                "max load must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
