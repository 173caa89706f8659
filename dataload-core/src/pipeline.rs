//! Prefetch Pipeline
//!
//! One producer thread reads tasks in submission order and hands each result
//! to the consumer through a bounded channel of depth [`PREFETCH_DEPTH`].
//! When the channel is full the producer blocks, so at most two loaded
//! buffers wait ahead of consumption.
//!
//! ```text
//!  producer thread                       calling thread
//!  ───────────────                       ──────────────
//!  read task N+2 ──▶ [ slot N+1 | slot N ] ──▶ next() ─▶ record
//! ```
//!
//! End of stream is the channel disconnecting: the producer drops its sender
//! when it runs out of tasks, observes cancellation, or panics. A read
//! failure travels inside the slot and never stops the stream.

use crate::cancel::CancellationToken;
use crate::error::{CoreError, panic_message};
use crate::task::{LoadAttempt, LoadTask, Loader};
use crossbeam_channel::{Receiver, bounded};
use std::sync::Arc;
use std::thread::JoinHandle;

/// Channel capacity between producer and consumer
pub const PREFETCH_DEPTH: usize = 2;

/// A task together with the producer's read result
#[derive(Debug)]
pub struct PipelineSlot {
    /// Task that was read
    pub task: LoadTask,
    /// Bytes or failure, plus timing and producer identity
    pub attempt: LoadAttempt,
}

/// Starts prefetch pipelines
pub struct PrefetchPipeline;

impl PrefetchPipeline {
    /// Spawn the producer and return the consumer side
    pub fn start(
        tasks: Vec<LoadTask>,
        loader: Arc<dyn Loader>,
        cancel: CancellationToken,
    ) -> Result<PipelineHandle, CoreError> {
        let (tx, rx) = bounded::<PipelineSlot>(PREFETCH_DEPTH);
        let producer_cancel = cancel.clone();

        let producer = std::thread::Builder::new()
            .name("dataload-prefetch".to_string())
            .spawn(move || {
                for task in tasks {
                    // Checked between reads only
                    if producer_cancel.is_cancelled() {
                        tracing::debug!("prefetch producer observed cancellation");
                        break;
                    }
                    let attempt = task.perform(loader.as_ref());
                    if tx.send(PipelineSlot { task, attempt }).is_err() {
                        // Consumer hung up
                        break;
                    }
                }
            })?;

        Ok(PipelineHandle {
            receiver: Some(rx),
            producer: Some(producer),
            cancel,
        })
    }
}

/// Consumer side of a running pipeline
pub struct PipelineHandle {
    receiver: Option<Receiver<PipelineSlot>>,
    producer: Option<JoinHandle<()>>,
    cancel: CancellationToken,
}

impl PipelineHandle {
    /// Block until the next slot arrives; `None` once the producer is done
    pub fn next(&mut self) -> Option<PipelineSlot> {
        self.receiver.as_ref()?.recv().ok()
    }

    /// Slots currently queued and not yet consumed
    pub fn pending(&self) -> usize {
        self.receiver.as_ref().map(|rx| rx.len()).unwrap_or(0)
    }

    /// Ask the producer to stop before its next read
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Stop consuming and join the producer.
    ///
    /// Slots still queued are dropped. Returns `PipelineProducerPanic` if the
    /// producer died abnormally.
    pub fn finish(mut self) -> Result<(), CoreError> {
        self.shutdown()
    }

    fn shutdown(&mut self) -> Result<(), CoreError> {
        // Hang up first so a producer blocked on a full channel wakes up
        drop(self.receiver.take());
        match self.producer.take() {
            Some(handle) => handle
                .join()
                .map_err(|panic| CoreError::PipelineProducerPanic(panic_message(panic.as_ref()))),
            None => Ok(()),
        }
    }
}

impl Drop for PipelineHandle {
    fn drop(&mut self) {
        if self.producer.is_some() {
            self.cancel.cancel();
            let _ = self.shutdown();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TaskError;
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Loader returning the path bytes, optionally failing or panicking on a name
    struct ScriptedLoader {
        reads: AtomicUsize,
        fail_on: Option<&'static str>,
        panic_on: Option<&'static str>,
        delay: Duration,
    }

    impl ScriptedLoader {
        fn new() -> Self {
            Self {
                reads: AtomicUsize::new(0),
                fail_on: None,
                panic_on: None,
                delay: Duration::ZERO,
            }
        }
    }

    impl Loader for ScriptedLoader {
        fn load(&self, path: &Path) -> Result<Vec<u8>, TaskError> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            std::thread::sleep(self.delay);
            let name = path.to_string_lossy();
            if self.panic_on == Some(name.as_ref()) {
                panic!("producer blew up on {}", name);
            }
            if self.fail_on == Some(name.as_ref()) {
                return Err(TaskError::NotFound);
            }
            Ok(name.as_bytes().to_vec())
        }
    }

    fn tasks(n: usize) -> Vec<LoadTask> {
        LoadTask::from_paths((0..n).map(|i| format!("t{}", i)))
    }

    #[test]
    fn test_fifo_order_and_end_of_stream() {
        let loader = Arc::new(ScriptedLoader::new());
        let mut handle =
            PrefetchPipeline::start(tasks(6), loader, CancellationToken::new()).unwrap();

        let mut seen = Vec::new();
        while let Some(slot) = handle.next() {
            seen.push(slot.task.sequence_index());
        }
        assert_eq!(seen, vec![0, 1, 2, 3, 4, 5]);
        assert!(handle.next().is_none());
        handle.finish().unwrap();
    }

    #[test]
    fn test_backpressure_caps_queue_depth() {
        let loader = Arc::new(ScriptedLoader::new());
        let mut handle =
            PrefetchPipeline::start(tasks(10), loader.clone(), CancellationToken::new()).unwrap();

        let mut max_pending = 0;
        let mut consumed = 0;
        loop {
            // Slow consumer: let the producer run ahead as far as it can
            std::thread::sleep(Duration::from_millis(20));
            let pending = handle.pending();
            max_pending = max_pending.max(pending);
            assert!(pending <= PREFETCH_DEPTH, "pending {} slots", pending);

            // Queued slots plus the one read blocked on send
            let reads = loader.reads.load(Ordering::SeqCst);
            assert!(reads <= consumed + PREFETCH_DEPTH + 1, "producer ran {} ahead", reads - consumed);

            match handle.next() {
                Some(_) => consumed += 1,
                None => break,
            }
        }

        assert_eq!(consumed, 10);
        assert_eq!(max_pending, PREFETCH_DEPTH);
        handle.finish().unwrap();
    }

    #[test]
    fn test_read_failure_travels_in_slot() {
        let mut loader = ScriptedLoader::new();
        loader.fail_on = Some("t1");
        let mut handle =
            PrefetchPipeline::start(tasks(3), Arc::new(loader), CancellationToken::new()).unwrap();

        let outcomes: Vec<bool> = std::iter::from_fn(|| handle.next())
            .map(|slot| slot.attempt.outcome.is_ok())
            .collect();
        assert_eq!(outcomes, vec![true, false, true]);
        handle.finish().unwrap();
    }

    #[test]
    fn test_cancel_stops_between_reads() {
        let mut loader = ScriptedLoader::new();
        loader.delay = Duration::from_millis(5);
        let loader = Arc::new(loader);
        let mut handle =
            PrefetchPipeline::start(tasks(50), loader.clone(), CancellationToken::new()).unwrap();

        assert!(handle.next().is_some());
        handle.cancel();

        let drained = std::iter::from_fn(|| handle.next()).count();
        // Whatever was queued or in flight, never the whole remainder
        assert!(drained <= PREFETCH_DEPTH + 1);
        handle.finish().unwrap();
        assert!(loader.reads.load(Ordering::SeqCst) < 50);
    }

    #[test]
    fn test_producer_panic_ends_stream() {
        let mut loader = ScriptedLoader::new();
        loader.panic_on = Some("t2");
        let mut handle =
            PrefetchPipeline::start(tasks(5), Arc::new(loader), CancellationToken::new()).unwrap();

        let seen = std::iter::from_fn(|| handle.next()).count();
        assert_eq!(seen, 2);
        match handle.finish() {
            Err(CoreError::PipelineProducerPanic(msg)) => assert!(msg.contains("t2")),
            other => panic!("expected producer panic, got {:?}", other),
        }
    }

    #[test]
    fn test_drop_without_draining_does_not_hang() {
        let loader = Arc::new(ScriptedLoader::new());
        let handle =
            PrefetchPipeline::start(tasks(100), loader.clone(), CancellationToken::new()).unwrap();
        std::thread::sleep(Duration::from_millis(10));
        drop(handle);
        assert!(loader.reads.load(Ordering::SeqCst) < 100);
    }
}
