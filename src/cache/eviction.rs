//! Eviction Module
//!
//! Score-based victim selection for the bounded store.
//!
//! Each resident entry is scored as `hits - age_secs / 1_000_000`: reuse is
//! rewarded, age is penalized only slightly. The lowest score is evicted.

use tokio::time::Instant;

use crate::cache::CacheEntry;

/// Divisor applied to an entry's age in seconds when scoring.
pub const AGE_PENALTY_DIVISOR: f64 = 1_000_000.0;

// == Eviction Mode ==
/// How much a triggering `set` may evict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EvictionMode {
    /// Evict until both the count and memory limits hold for the new entry.
    #[default]
    UntilFits,
    /// Evict at most one entry per `set`, even if limits are still exceeded.
    SingleShot,
}

// == Score ==
/// Computes the retention score of an entry at `now`.
pub fn score<V>(entry: &CacheEntry<V>, now: Instant) -> f64 {
    let age_secs = now.saturating_duration_since(entry.created_at).as_secs_f64();
    entry.hits as f64 - age_secs / AGE_PENALTY_DIVISOR
}

// == Select Victim ==
/// Returns the key of the lowest-scoring entry, or None if there are none.
///
/// Equal scores fall back to the oldest entry, then to the smallest key,
/// so the choice does not depend on map iteration order.
pub fn select_victim<'a, V, I>(entries: I, now: Instant) -> Option<&'a str>
where
    V: 'a,
    I: IntoIterator<Item = &'a CacheEntry<V>>,
{
    let mut victim: Option<(&'a CacheEntry<V>, f64)> = None;

    for entry in entries {
        let candidate = score(entry, now);
        let replace = match victim {
            None => true,
            Some((current, best)) => {
                candidate < best
                    || (candidate == best
                        && (entry.created_at, entry.key.as_str())
                            < (current.created_at, current.key.as_str()))
            }
        };
        if replace {
            victim = Some((entry, candidate));
        }
    }

    victim.map(|(entry, _)| entry.key.as_str())
}
