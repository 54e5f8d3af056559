//! Parallel fan-out of per-subject work with progress reporting.
//!
//! Scoring phases run on the rayon global pool (work-stealing, one pool per
//! process). Workers take a shared view of the entity graph; the serial
//! commit that follows is the only writer, so a pass is two cleanly
//! separated phases.

use std::sync::atomic::{AtomicUsize, Ordering};

use rayon::prelude::*;

use crate::error::Result;

/// Progress sink: receives completion fractions in [0, 1].
pub type ProgressFn<'a> = &'a (dyn Fn(f64) + Sync);

/// Progress sink that discards every report.
pub fn ignore_progress(_: f64) {}

/// Run `worker` over every item in parallel, preserving input order.
///
/// Progress is reported at a stride of `max(1, len / 200)` completions. The
/// first worker failure aborts the pass and surfaces as the call's error;
/// an empty work set returns immediately.
pub fn run_in_parallel<T, R, F>(items: &[T], worker: F, progress: ProgressFn<'_>) -> Result<Vec<R>>
where
    T: Sync,
    R: Send,
    F: Fn(&T) -> Result<R> + Sync,
{
    if items.is_empty() {
        return Ok(Vec::new());
    }
    let total = items.len();
    let stride = (total / 200).max(1);
    let counter = AtomicUsize::new(0);

    items
        .par_iter()
        .map(|item| {
            let result = worker(item)?;
            let done = counter.fetch_add(1, Ordering::Relaxed) + 1;
            if done % stride == 0 {
                progress(done as f64 / total as f64);
            }
            Ok(result)
        })
        .collect()
}
