//! Posting to virtual devices, the final pipeline stage.
//!
//! This stage owns the output sink and performs the drain: entries are
//! removed from the queue front in admission order until a lazy entry is
//! reached (deferred entries must never be forwarded, and nothing may
//! overtake them). Valid entries are posted, invalid ones are dropped.

use std::sync::Arc;

use retap_core::{Queue, Validity};

use crate::sink::EventSink;

/// The drain-and-post stage.
pub struct PostManipulator {
    sink: Arc<dyn EventSink>,
}

impl PostManipulator {
    pub fn new(sink: Arc<dyn EventSink>) -> Self {
        Self { sink }
    }

    /// Drains the forwardable queue prefix into the sink.
    pub fn run(&mut self, queue: &Queue) {
        while let Some(front) = queue.front() {
            if front.lazy() {
                break;
            }
            let Some(entry) = queue.pop_front() else {
                break;
            };
            if entry.validity() == Validity::Valid {
                if let Err(error) = self.sink.post(&entry) {
                    tracing::warn!(%error, device_id = entry.device_id().0, "sink rejected entry");
                }
            }
        }
    }
}

impl std::fmt::Debug for PostManipulator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PostManipulator").finish_non_exhaustive()
    }
}
