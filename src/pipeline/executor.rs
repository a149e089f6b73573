//! Fixed-size worker pool
//!
//! One dispatcher feeds item indices into a job queue, `workers` threads pull
//! from it, and the calling thread collects results into a buffer sized to the
//! input. Workers only ever borrow the items and the mapping function.

use std::sync::mpsc;
use std::sync::Mutex;
use std::thread;
use tracing::trace;

/// Maps `f` over `items` on at most `workers` threads.
///
/// Exactly one result is returned per item, in input order. Callers that need
/// a different order sort afterwards. A panicking worker propagates the panic
/// to the caller once the pool has shut down.
pub fn parallel_map<T, R, F>(items: &[T], workers: usize, f: F) -> Vec<R>
where
    T: Sync,
    R: Send,
    F: Fn(&T) -> R + Sync,
{
    let workers = workers.clamp(1, items.len().max(1));
    let (job_tx, job_rx) = mpsc::channel::<usize>();
    let (result_tx, result_rx) = mpsc::channel::<(usize, R)>();
    let job_rx = Mutex::new(job_rx);

    for index in 0..items.len() {
        // The receiver outlives this loop, so sending cannot fail.
        let _ = job_tx.send(index);
    }
    drop(job_tx);

    let mut slots: Vec<Option<R>> = Vec::with_capacity(items.len());
    slots.resize_with(items.len(), || None);

    thread::scope(|s| {
        let f = &f;
        let job_rx = &job_rx;
        for worker in 0..workers {
            let tx = result_tx.clone();
            s.spawn(move || loop {
                let next = match job_rx.lock() {
                    Ok(rx) => rx.recv(),
                    Err(_) => break,
                };
                let Ok(index) = next else {
                    break;
                };
                trace!(worker, index, "Processing work item");
                if tx.send((index, f(&items[index]))).is_err() {
                    break;
                }
            });
        }

        // Close our copy so the collector ends when the last worker exits.
        drop(result_tx);
        for (index, result) in result_rx.iter() {
            slots[index] = Some(result);
        }
    });

    slots.into_iter().flatten().collect()
}
