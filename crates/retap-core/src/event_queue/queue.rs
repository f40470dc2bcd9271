//! The admission-ordered event queue.
//!
//! Storage order reflects *admission* order, not strict timestamp order:
//! producers for different devices may admit with a small temporal jitter,
//! and it is the manipulator stages – not the queue – that make merge
//! decisions when a rule requires them.
//!
//! # Ownership model
//!
//! Exactly one thread (the pipeline owner) removes, replaces, or splices
//! entries; producer threads only ever append, and diagnostics readers only
//! inspect already-pushed entries through their synchronized accessors.
//! The queue's own lock therefore guards nothing but the deque structure
//! and is held only for the duration of a single operation – the
//! fine-grained state lives in each entry's own lock.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use crate::event_queue::entry::Entry;

/// Append-ordered collection of entries from all devices.
#[derive(Debug, Default)]
pub struct Queue {
    entries: Mutex<VecDeque<Arc<Entry>>>,
}

impl Queue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an entry and returns its shared handle.
    ///
    /// Callable from any producer thread.
    pub fn push(&self, entry: Entry) -> Arc<Entry> {
        let entry = Arc::new(entry);
        self.push_arc(Arc::clone(&entry));
        entry
    }

    /// Appends an already-shared entry (synthesized by a manipulator).
    pub fn push_arc(&self, entry: Arc<Entry>) {
        let mut entries = self.lock();
        tracing::trace!(
            device_id = entry.device_id().0,
            queued = entries.len() + 1,
            "entry admitted"
        );
        entries.push_back(entry);
    }

    /// The oldest entry, without removing it.
    pub fn front(&self) -> Option<Arc<Entry>> {
        self.lock().front().map(Arc::clone)
    }

    /// Removes and returns the oldest entry.
    ///
    /// Pipeline-owner only. Popping an entry whose `lazy` flag is set is a
    /// contract violation – callers must check and hold instead.
    pub fn pop_front(&self) -> Option<Arc<Entry>> {
        let popped = self.lock().pop_front();
        if let Some(ref entry) = popped {
            debug_assert!(!entry.lazy(), "popped a lazy entry");
        }
        popped
    }

    /// Handles to all queued entries in admission order.
    ///
    /// Safe to call concurrently with producer pushes; the returned prefix
    /// stays stable because only the pipeline owner removes or reorders.
    pub fn snapshot(&self) -> Vec<Arc<Entry>> {
        self.lock().iter().map(Arc::clone).collect()
    }

    /// Replaces the entry at `index` with a manipulated copy.
    /// Pipeline-owner only.
    pub fn replace(&self, index: usize, entry: Entry) -> Arc<Entry> {
        let entry = Arc::new(entry);
        let mut entries = self.lock();
        entries[index] = Arc::clone(&entry);
        entry
    }

    /// Splices a synthesized entry in at `index` (existing entries from
    /// `index` onwards shift back). Pipeline-owner only.
    pub fn insert(&self, index: usize, entry: Entry) -> Arc<Entry> {
        let entry = Arc::new(entry);
        self.lock().insert(index, Arc::clone(&entry));
        entry
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Discards every queued entry without forwarding. Teardown only.
    pub fn clear(&self) {
        let mut entries = self.lock();
        if !entries.is_empty() {
            tracing::trace!(discarded = entries.len(), "queue cleared");
        }
        entries.clear();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, VecDeque<Arc<Entry>>> {
        self.entries.lock().expect("queue lock poisoned")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event_queue::event::Event;
    use crate::event_queue::event_time_stamp::{AbsoluteTime, EventTimeStamp};
    use crate::keymap::KeyCode;
    use crate::types::DeviceId;

    fn entry(device: u32, code: KeyCode, at: u64) -> Entry {
        Entry::builder()
            .device_id(DeviceId(device))
            .event_time_stamp(EventTimeStamp::new(AbsoluteTime(at)))
            .event(Event::Key { code })
            .original_event(Event::Key { code })
            .build()
    }

    #[test]
    fn test_push_and_drain_preserve_admission_order() {
        // Arrange – admission order deliberately differs from time order
        let queue = Queue::new();
        queue.push(entry(1, KeyCode::A, 300));
        queue.push(entry(2, KeyCode::B, 100));
        queue.push(entry(1, KeyCode::C, 200));

        // Act / Assert
        assert_eq!(queue.len(), 3);
        let drained: Vec<_> = std::iter::from_fn(|| queue.pop_front())
            .map(|e| e.event().key_code().unwrap())
            .collect();
        assert_eq!(drained, vec![KeyCode::A, KeyCode::B, KeyCode::C]);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_front_does_not_remove() {
        let queue = Queue::new();
        queue.push(entry(1, KeyCode::A, 1));

        assert!(queue.front().is_some());
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn test_replace_substitutes_in_place() {
        // Arrange
        let queue = Queue::new();
        queue.push(entry(1, KeyCode::A, 1));
        queue.push(entry(1, KeyCode::B, 2));

        // Act
        queue.replace(0, entry(1, KeyCode::Z, 1));

        // Assert – order unchanged, payload swapped
        let snapshot = queue.snapshot();
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot[0].event().key_code(), Some(KeyCode::Z));
        assert_eq!(snapshot[1].event().key_code(), Some(KeyCode::B));
    }

    #[test]
    fn test_insert_splices_between_entries() {
        // Arrange
        let queue = Queue::new();
        queue.push(entry(1, KeyCode::A, 1));
        queue.push(entry(1, KeyCode::C, 3));

        // Act
        queue.insert(1, entry(1, KeyCode::B, 2));

        // Assert
        let keys: Vec<_> = queue
            .snapshot()
            .iter()
            .map(|e| e.event().key_code().unwrap())
            .collect();
        assert_eq!(keys, vec![KeyCode::A, KeyCode::B, KeyCode::C]);
    }

    #[test]
    fn test_clear_discards_everything() {
        let queue = Queue::new();
        queue.push(entry(1, KeyCode::A, 1));
        queue.push(entry(2, KeyCode::B, 2));

        queue.clear();

        assert!(queue.is_empty());
        assert!(queue.front().is_none());
    }

    #[test]
    fn test_snapshot_is_stable_while_producers_append() {
        use std::sync::Arc as StdArc;
        use std::thread;

        // Arrange – two producer threads appending concurrently with reads
        let queue = StdArc::new(Queue::new());
        let producers: Vec<_> = (0..2)
            .map(|device| {
                let queue = StdArc::clone(&queue);
                thread::spawn(move || {
                    for i in 0..500u64 {
                        queue.push(entry(device, KeyCode::A, i));
                    }
                })
            })
            .collect();

        // Act – reader snapshots while pushes are in flight
        for _ in 0..100 {
            let snapshot = queue.snapshot();
            // Every observed entry is fully constructed
            for e in &snapshot {
                assert_eq!(e.event().key_code(), Some(KeyCode::A));
            }
        }
        for p in producers {
            p.join().expect("producer panicked");
        }

        // Assert
        assert_eq!(queue.len(), 1000);
    }

    #[test]
    fn test_push_returns_live_handle() {
        // Arrange
        let queue = Queue::new();

        // Act – mutate through the returned handle
        let handle = queue.push(entry(1, KeyCode::A, 1));
        handle.set_lazy(true);

        // Assert – the queued entry observes the mutation (same allocation)
        assert!(queue.front().expect("entry queued").lazy());
    }
}
