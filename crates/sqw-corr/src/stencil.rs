//! Run-length deduplication of consecutive queries sharing a stencil.
//!
//! Only maximal runs of adjacent equal keys are merged, so the cost is linear
//! in the number of queries and no hashing of keys is needed.

use std::ops::Range;

/// Maximal run of consecutive items with equal keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Run<K> {
    /// Shared key.
    pub key: K,
    /// Item indices covered by the run.
    pub range: Range<usize>,
}

/// Splits `items` into maximal runs of equal keys.
pub fn group_runs<T, K, F>(items: &[T], mut key: F) -> Vec<Run<K>>
where
    K: PartialEq,
    F: FnMut(&T) -> K,
{
    let mut runs: Vec<Run<K>> = Vec::new();
    for (idx, item) in items.iter().enumerate() {
        let k = key(item);
        match runs.last_mut() {
            Some(run) if run.key == k => run.range.end = idx + 1,
            _ => runs.push(Run {
                key: k,
                range: idx..idx + 1,
            }),
        }
    }
    runs
}

/// Evaluates `compute` once per run and pairs the result with the run's range.
pub fn compute_runs<T, K, R, E, F, C>(
    items: &[T],
    key: F,
    mut compute: C,
) -> Result<Vec<(Range<usize>, R)>, E>
where
    K: PartialEq,
    F: FnMut(&T) -> K,
    C: FnMut(&K) -> Result<R, E>,
{
    group_runs(items, key)
        .into_iter()
        .map(|run| compute(&run.key).map(|value| (run.range, value)))
        .collect()
}

/// Broadcasts per-run results back to one value per original item.
pub fn expand<R: Clone>(runs: &[(Range<usize>, R)]) -> Vec<R> {
    runs.iter()
        .flat_map(|(range, value)| range.clone().map(move |_| value.clone()))
        .collect()
}
