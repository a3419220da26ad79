//! Dense slot assignment for the portrait/emoji pool.

use std::collections::BTreeSet;

/// Lowest slot not present in `committed`.
///
/// A contiguous `[0, m]` yields `m + 1`; otherwise the smallest gap below the
/// maximum is reused so deletions do not fragment the pool.
pub fn next_slot(committed: &BTreeSet<u32>) -> u32 {
    let Some(&max) = committed.last() else {
        return 0;
    };
    if committed.len() as u64 == u64::from(max) + 1 {
        return max + 1;
    }
    (0..=max)
        .find(|slot| !committed.contains(slot))
        .unwrap_or(max + 1)
}
