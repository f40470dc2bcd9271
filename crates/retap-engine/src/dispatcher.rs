//! The pipeline-owner task.
//!
//! Exactly one task drains and mutates the queue. Producer threads admit
//! entries through an [`InputHandle`] – an append plus a wake message, never
//! a direct mutation – and lazy-entry timers are expressed as a `select!`ed
//! sleep until the pipeline's next deadline. A timer firing does nothing but
//! wake the owner; if it fires after teardown there is no owner left and the
//! wake is dropped, so late timers are a no-op by construction.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use retap_core::{Entry, Queue};

use crate::clock::Clock;
use crate::pipeline::Pipeline;

/// Why the owner task woke up.
#[derive(Debug)]
enum Wake {
    /// A producer admitted a new entry.
    NewEntry,
    /// Tear the pipeline down, discarding everything still queued.
    Shutdown,
}

/// Producer-side handle: admits entries and can request teardown.
///
/// Clone one per device producer thread.
#[derive(Clone)]
pub struct InputHandle {
    queue: Arc<Queue>,
    wake: mpsc::UnboundedSender<Wake>,
}

impl InputHandle {
    /// Appends an entry to the queue and wakes the owner task.
    ///
    /// After teardown the wake send fails silently: the entry joins a queue
    /// nobody will drain, which is exactly the discard semantics teardown
    /// promises.
    pub fn admit(&self, entry: Entry) -> Arc<Entry> {
        let entry = self.queue.push(entry);
        let _ = self.wake.send(Wake::NewEntry);
        entry
    }

    /// Requests teardown: all pending entries are discarded, nothing is
    /// flushed to the sink.
    pub fn shutdown(&self) {
        let _ = self.wake.send(Wake::Shutdown);
    }
}

/// Spawns the single pipeline-owner task.
pub struct Dispatcher;

impl Dispatcher {
    /// Starts the owner task and returns the producer handle plus the task
    /// handle to await on shutdown.
    ///
    /// The task exits when [`InputHandle::shutdown`] is called or every
    /// handle has been dropped; either way the queue is cleared without a
    /// partial flush.
    pub fn spawn(mut pipeline: Pipeline, clock: Arc<dyn Clock>) -> (InputHandle, JoinHandle<()>) {
        let (wake_tx, mut wake_rx) = mpsc::unbounded_channel();
        let handle = InputHandle {
            queue: Arc::clone(pipeline.queue()),
            wake: wake_tx,
        };

        let join = tokio::spawn(async move {
            tracing::debug!("pipeline dispatcher started");
            loop {
                let wake = match pipeline.next_deadline() {
                    Some(deadline) => {
                        let until = deadline.saturating_since(clock.now());
                        tokio::select! {
                            wake = wake_rx.recv() => wake,
                            // Deadline elapsed: wake the pass exactly like a
                            // new admission would.
                            _ = tokio::time::sleep(Duration::from_nanos(until.as_nanos())) => {
                                Some(Wake::NewEntry)
                            }
                        }
                    }
                    None => wake_rx.recv().await,
                };

                match wake {
                    Some(Wake::NewEntry) => pipeline.run_pass(clock.now()),
                    Some(Wake::Shutdown) | None => break,
                }
            }
            pipeline.clear();
            tracing::debug!("pipeline dispatcher stopped");
        });

        (handle, join)
    }
}
