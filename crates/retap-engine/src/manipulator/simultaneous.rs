//! Simultaneous-key rules, the second (complex) pipeline stage.
//!
//! This is the only stage whose correctness depends on events that have not
//! arrived yet, and therefore the only source of `lazy = true` entries: a
//! key-down that *might* be the start of a configured combination cannot be
//! forwarded until the rest of the set shows up or the rule's timeout says
//! it never will.
//!
//! Per rule, the stage keeps a pending-match state over the prefix of the
//! key set observed so far:
//!
//! - a key-down extending a pending set is claimed and held lazy;
//! - observing the full set consumes every claimed entry and splices the
//!   rule's synthesized output after the completing entry;
//! - the deadline passing, a claimed key's release, or a key-down that
//!   extends nothing resolves pending entries *literally*: the claims are
//!   un-deferred untouched, with their held time accrued as input delay.
//!
//! Once a combination has fired it stays active until every source key is
//! released; source releases are consumed and the last one emits the
//! synthesized key-ups, keeping downstream key state balanced.

use std::sync::{Arc, Weak};

use retap_core::{
    AbsoluteTime, DeviceId, Entry, Event, EventOrigin, EventTimeStamp, EventType, KeyCode, Queue,
    State, Validity,
};

use crate::rules::SimultaneousRule;

/// One in-flight detection: the claimed prefix of a rule's key set.
#[derive(Debug)]
struct Pending {
    claimed: Vec<(KeyCode, Arc<Entry>)>,
    deadline: AbsoluteTime,
}

/// A fired combination whose source keys are still (partly) held.
#[derive(Debug)]
struct ActiveCombo {
    held: Vec<KeyCode>,
    output: Vec<KeyCode>,
}

/// The complex-rule stage.
#[derive(Debug)]
pub struct SimultaneousManipulator {
    rules: Vec<SimultaneousRule>,
    /// Per-rule pending detection, parallel to `rules`.
    pending: Vec<Option<Pending>>,
    active: Vec<ActiveCombo>,
    /// Entries this stage has already resolved or synthesized and must not
    /// reconsider while they are still queued behind a lazy entry. Weak so
    /// a drained entry's slot cannot alias a new allocation.
    finalized: Vec<Weak<Entry>>,
}

impl SimultaneousManipulator {
    pub fn new(rules: &[SimultaneousRule]) -> Self {
        Self {
            rules: rules.to_vec(),
            pending: rules.iter().map(|_| None).collect(),
            active: Vec::new(),
            finalized: Vec::new(),
        }
    }

    /// One scan over the queue at time `now`.
    pub fn run(&mut self, queue: &Queue, now: AbsoluteTime) {
        self.finalized.retain(|weak| weak.strong_count() > 0);
        self.expire_pending(now);

        for entry in queue.snapshot() {
            if entry.validity() == Validity::Invalid || self.is_tracked(&entry) {
                continue;
            }
            let Some(code) = entry.event().key_code() else {
                continue;
            };
            match entry.event_type() {
                EventType::KeyDown => self.on_key_down(queue, &entry, code, now),
                EventType::KeyUp => self.on_key_up(queue, &entry, code, now),
                EventType::Single => {}
            }
        }
    }

    /// Earliest pending detection deadline, if any.
    pub fn next_deadline(&self) -> Option<AbsoluteTime> {
        self.pending
            .iter()
            .flatten()
            .map(|pending| pending.deadline)
            .min()
    }

    /// Discards all detection and release-tracking state (teardown).
    pub fn reset(&mut self) {
        for slot in &mut self.pending {
            *slot = None;
        }
        self.active.clear();
        self.finalized.clear();
    }

    // ── Key-down handling ─────────────────────────────────────────────────────

    fn on_key_down(&mut self, queue: &Queue, entry: &Arc<Entry>, code: KeyCode, now: AbsoluteTime) {
        // Repeats of a consumed source key while its combo is active are
        // swallowed with it.
        if self.active.iter().any(|combo| combo.held.contains(&code)) {
            entry.invalidate();
            return;
        }

        // Extend a pending detection.
        if let Some(rule_index) = self.extendable_rule(code) {
            entry.set_lazy(true);
            let pending = self.pending[rule_index]
                .as_mut()
                .expect("extendable rule has pending state");
            pending.claimed.push((code, Arc::clone(entry)));
            if pending.claimed.len() == self.rules[rule_index].keys.len() {
                self.fire(queue, rule_index, entry);
            }
            return;
        }

        // Start a new detection.
        if let Some(rule_index) = self.startable_rule(code) {
            let deadline = entry.event_time_stamp().time_stamp() + self.rules[rule_index].timeout();
            tracing::debug!(key = %code, rule = rule_index, "simultaneous detection started");
            entry.set_lazy(true);
            self.pending[rule_index] = Some(Pending {
                claimed: vec![(code, Arc::clone(entry))],
                deadline,
            });
            return;
        }

        // A key-down that extends nothing resolves every pending detection
        // literally before it proceeds down the pipeline itself.
        self.finalize_all(now);
    }

    /// Rule with a pending detection that `code` extends.
    fn extendable_rule(&self, code: KeyCode) -> Option<usize> {
        self.rules.iter().enumerate().position(|(index, rule)| {
            match &self.pending[index] {
                Some(pending) => {
                    rule.keys.contains(&code)
                        && !pending.claimed.iter().any(|(claimed, _)| *claimed == code)
                }
                None => false,
            }
        })
    }

    /// Rule without a pending detection whose key set contains `code`.
    fn startable_rule(&self, code: KeyCode) -> Option<usize> {
        self.rules
            .iter()
            .enumerate()
            .position(|(index, rule)| self.pending[index].is_none() && rule.keys.contains(&code))
    }

    /// Completes a detection: consumes every claimed entry and splices the
    /// synthesized output after the completing entry.
    fn fire(&mut self, queue: &Queue, rule_index: usize, completing: &Arc<Entry>) {
        let Some(pending) = self.pending[rule_index].take() else {
            return;
        };
        let rule = &self.rules[rule_index];

        let first_time_stamp = pending
            .claimed
            .first()
            .map(|(_, entry)| entry.event_time_stamp().time_stamp())
            .unwrap_or_default();
        let completing_time_stamp = completing.event_time_stamp().time_stamp();
        // The synthesized event happens at completion time; the span the
        // first key spent waiting is surfaced as input delay.
        let delay = completing_time_stamp.saturating_since(first_time_stamp);

        for (_, claimed) in &pending.claimed {
            claimed.set_lazy(false);
            claimed.invalidate();
        }

        tracing::debug!(
            rule = rule_index,
            keys = rule.keys.len(),
            outputs = rule.to.len(),
            "simultaneous combination matched"
        );

        let insert_at = position_of(queue, completing)
            .map(|index| index + 1)
            .unwrap_or_else(|| queue.len());
        for (offset, output) in rule.to.iter().enumerate() {
            let synthesized = synthesized_key(
                completing.device_id(),
                EventTimeStamp::with_delay(completing_time_stamp, delay),
                *output,
                EventType::KeyDown,
                *completing.event(),
                completing.event_origin(),
            );
            let handle = queue.insert(insert_at + offset, synthesized);
            self.finalized.push(Arc::downgrade(&handle));
        }

        self.active.push(ActiveCombo {
            held: rule.keys.clone(),
            output: rule.to.clone(),
        });
    }

    // ── Key-up handling ───────────────────────────────────────────────────────

    fn on_key_up(&mut self, queue: &Queue, entry: &Arc<Entry>, code: KeyCode, now: AbsoluteTime) {
        // Releases of a fired combo's source keys are consumed; the last
        // one emits the synthesized key-ups.
        if let Some(index) = self.active.iter().position(|combo| combo.held.contains(&code)) {
            entry.invalidate();
            let combo = &mut self.active[index];
            combo.held.retain(|held| *held != code);
            if combo.held.is_empty() {
                let combo = self.active.swap_remove(index);
                let insert_at = position_of(queue, entry)
                    .map(|i| i + 1)
                    .unwrap_or_else(|| queue.len());
                for (offset, output) in combo.output.iter().enumerate() {
                    let synthesized = synthesized_key(
                        entry.device_id(),
                        EventTimeStamp::new(entry.event_time_stamp().time_stamp()),
                        *output,
                        EventType::KeyUp,
                        *entry.event(),
                        entry.event_origin(),
                    );
                    let handle = queue.insert(insert_at + offset, synthesized);
                    self.finalized.push(Arc::downgrade(&handle));
                }
                tracing::debug!("simultaneous combination released");
            }
            return;
        }

        // A release of a key still under detection means it was a tap:
        // the claims resolve literally and the key-up passes through.
        let cancelled: Vec<usize> = (0..self.rules.len())
            .filter(|&index| {
                self.pending[index]
                    .as_ref()
                    .is_some_and(|pending| {
                        pending.claimed.iter().any(|(claimed, _)| *claimed == code)
                    })
            })
            .collect();
        for index in cancelled {
            self.finalize_rule(index, now);
        }
    }

    // ── Literal finalization ──────────────────────────────────────────────────

    fn expire_pending(&mut self, now: AbsoluteTime) {
        let expired: Vec<usize> = (0..self.rules.len())
            .filter(|&index| {
                self.pending[index]
                    .as_ref()
                    .is_some_and(|pending| pending.deadline <= now)
            })
            .collect();
        for index in expired {
            tracing::debug!(rule = index, "simultaneous detection timed out");
            self.finalize_rule(index, now);
        }
    }

    fn finalize_all(&mut self, now: AbsoluteTime) {
        for index in 0..self.rules.len() {
            self.finalize_rule(index, now);
        }
    }

    /// Resolves one rule's pending detection literally: the claimed entries
    /// are released untouched, with their held time accrued as input delay.
    fn finalize_rule(&mut self, rule_index: usize, now: AbsoluteTime) {
        let Some(pending) = self.pending[rule_index].take() else {
            return;
        };
        for (_, claimed) in pending.claimed {
            claimed.add_input_delay(now.saturating_since(claimed.event_time_stamp().time_stamp()));
            claimed.set_lazy(false);
            self.finalized.push(Arc::downgrade(&claimed));
        }
    }

    /// Whether this stage already holds or resolved `entry`.
    fn is_tracked(&self, entry: &Arc<Entry>) -> bool {
        let claimed = self.pending.iter().flatten().any(|pending| {
            pending
                .claimed
                .iter()
                .any(|(_, held)| Arc::ptr_eq(held, entry))
        });
        claimed
            || self.finalized.iter().any(|weak| {
                weak.upgrade()
                    .is_some_and(|resolved| Arc::ptr_eq(&resolved, entry))
            })
    }
}

/// Builds a synthesized combo entry: `Manipulated` from birth, original
/// payload copied from the consumed entry it derives from.
fn synthesized_key(
    device_id: DeviceId,
    event_time_stamp: EventTimeStamp,
    code: KeyCode,
    event_type: EventType,
    original_event: Event,
    event_origin: EventOrigin,
) -> Entry {
    Entry::builder()
        .device_id(device_id)
        .event_time_stamp(event_time_stamp)
        .event(Event::Key { code })
        .event_type(event_type)
        .original_event(original_event)
        .event_origin(event_origin)
        .state(State::Manipulated)
        .build()
}

/// Index of `entry` in the queue's current admission order.
fn position_of(queue: &Queue, entry: &Arc<Entry>) -> Option<usize> {
    queue
        .snapshot()
        .iter()
        .position(|queued| Arc::ptr_eq(queued, entry))
}

#[cfg(test)]
mod tests {
    use super::*;
    use retap_core::AbsoluteDuration;

    fn rule_df_to_escape() -> SimultaneousRule {
        SimultaneousRule {
            keys: vec![KeyCode::D, KeyCode::F],
            to: vec![KeyCode::ESCAPE],
            timeout_ms: 50,
        }
    }

    fn stage() -> SimultaneousManipulator {
        SimultaneousManipulator::new(&[rule_df_to_escape()])
    }

    fn admit_key(queue: &Queue, code: KeyCode, event_type: EventType, at_ms: u64) -> Arc<Entry> {
        queue.push(
            Entry::builder()
                .device_id(DeviceId(1))
                .event_time_stamp(EventTimeStamp::new(AbsoluteTime::from_millis(at_ms)))
                .event(Event::Key { code })
                .event_type(event_type)
                .original_event(Event::Key { code })
                .event_origin(EventOrigin::GrabbedDevice)
                .build(),
        )
    }

    #[test]
    fn test_first_combo_key_is_held_lazy() {
        // Arrange
        let queue = Queue::new();
        let mut stage = stage();
        let d = admit_key(&queue, KeyCode::D, EventType::KeyDown, 0);

        // Act
        stage.run(&queue, AbsoluteTime::from_millis(1));

        // Assert
        assert!(d.lazy(), "first combo key must be deferred");
        assert_eq!(d.validity(), Validity::Valid);
        assert_eq!(
            stage.next_deadline(),
            Some(AbsoluteTime::from_millis(50)),
            "deadline is the first key's time stamp plus the rule timeout"
        );
    }

    #[test]
    fn test_full_set_within_window_fires_the_combo() {
        // Arrange
        let queue = Queue::new();
        let mut stage = stage();
        let d = admit_key(&queue, KeyCode::D, EventType::KeyDown, 0);
        let f = admit_key(&queue, KeyCode::F, EventType::KeyDown, 10);

        // Act
        stage.run(&queue, AbsoluteTime::from_millis(11));

        // Assert – both sources consumed, exactly one synthesized output
        assert_eq!(d.validity(), Validity::Invalid);
        assert_eq!(f.validity(), Validity::Invalid);
        assert!(!d.lazy() && !f.lazy(), "consumed entries must be poppable");

        let snapshot = queue.snapshot();
        assert_eq!(snapshot.len(), 3);
        let synthesized = &snapshot[2];
        assert_eq!(synthesized.event().key_code(), Some(KeyCode::ESCAPE));
        assert_eq!(synthesized.event_type(), EventType::KeyDown);
        assert_eq!(synthesized.state(), State::Manipulated);
        assert_eq!(synthesized.event_origin(), EventOrigin::GrabbedDevice);
        assert_eq!(
            synthesized.event_time_stamp().input_delay_duration(),
            AbsoluteDuration::from_millis(10),
            "delay spans first key to completion"
        );
        assert_eq!(stage.next_deadline(), None);
    }

    #[test]
    fn test_timeout_resolves_the_claim_literally() {
        // Arrange
        let queue = Queue::new();
        let mut stage = stage();
        let d = admit_key(&queue, KeyCode::D, EventType::KeyDown, 0);
        stage.run(&queue, AbsoluteTime::from_millis(1));
        assert!(d.lazy());

        // Act – pass the 50ms window with no second key
        stage.run(&queue, AbsoluteTime::from_millis(60));

        // Assert – untouched, un-deferred, delay accrued
        assert!(!d.lazy());
        assert_eq!(d.validity(), Validity::Valid);
        assert_eq!(d.state(), State::Original);
        assert!(
            d.event_time_stamp().input_delay_duration() >= AbsoluteDuration::from_millis(59),
            "held duration must be accounted as input delay"
        );
        assert_eq!(stage.next_deadline(), None);
    }

    #[test]
    fn test_resolved_claim_is_not_reclaimed_by_a_later_pass() {
        // Arrange – resolve a claim literally
        let queue = Queue::new();
        let mut stage = stage();
        let d = admit_key(&queue, KeyCode::D, EventType::KeyDown, 0);
        stage.run(&queue, AbsoluteTime::from_millis(1));
        stage.run(&queue, AbsoluteTime::from_millis(60));
        assert!(!d.lazy());

        // Act – the entry is still queued (e.g. behind another lazy entry)
        // and gets scanned again
        stage.run(&queue, AbsoluteTime::from_millis(61));

        // Assert
        assert!(!d.lazy(), "a literally-resolved entry must not be re-claimed");
    }

    #[test]
    fn test_release_before_completion_is_a_tap() {
        // Arrange
        let queue = Queue::new();
        let mut stage = stage();
        let down = admit_key(&queue, KeyCode::D, EventType::KeyDown, 0);
        stage.run(&queue, AbsoluteTime::from_millis(1));

        // Act – release d within the window
        let up = admit_key(&queue, KeyCode::D, EventType::KeyUp, 20);
        stage.run(&queue, AbsoluteTime::from_millis(21));

        // Assert – both pass through untouched
        assert!(!down.lazy());
        assert_eq!(down.validity(), Validity::Valid);
        assert_eq!(up.validity(), Validity::Valid);
        assert!(!up.lazy());
    }

    #[test]
    fn test_unrelated_key_down_cancels_detection() {
        // Arrange
        let queue = Queue::new();
        let mut stage = stage();
        let d = admit_key(&queue, KeyCode::D, EventType::KeyDown, 0);
        stage.run(&queue, AbsoluteTime::from_millis(1));

        // Act – x is in no rule
        let x = admit_key(&queue, KeyCode::X, EventType::KeyDown, 10);
        stage.run(&queue, AbsoluteTime::from_millis(11));

        // Assert – detection resolved literally, both forwardable
        assert!(!d.lazy());
        assert_eq!(d.validity(), Validity::Valid);
        assert_eq!(x.validity(), Validity::Valid);
    }

    #[test]
    fn test_source_releases_are_consumed_and_output_key_up_emitted() {
        // Arrange – fire the combo first
        let queue = Queue::new();
        let mut stage = stage();
        admit_key(&queue, KeyCode::D, EventType::KeyDown, 0);
        admit_key(&queue, KeyCode::F, EventType::KeyDown, 10);
        stage.run(&queue, AbsoluteTime::from_millis(11));

        // Act – release both source keys
        let f_up = admit_key(&queue, KeyCode::F, EventType::KeyUp, 100);
        let d_up = admit_key(&queue, KeyCode::D, EventType::KeyUp, 120);
        stage.run(&queue, AbsoluteTime::from_millis(121));

        // Assert – releases consumed; exactly one synthesized key_up after
        // the last release
        assert_eq!(f_up.validity(), Validity::Invalid);
        assert_eq!(d_up.validity(), Validity::Invalid);

        let key_ups: Vec<_> = queue
            .snapshot()
            .into_iter()
            .filter(|e| {
                e.event_type() == EventType::KeyUp
                    && e.validity() == Validity::Valid
                    && e.event().key_code() == Some(KeyCode::ESCAPE)
            })
            .collect();
        assert_eq!(key_ups.len(), 1);
        assert_eq!(key_ups[0].state(), State::Manipulated);
    }

    #[test]
    fn test_repeat_of_consumed_source_key_is_swallowed() {
        // Arrange – fire the combo
        let queue = Queue::new();
        let mut stage = stage();
        admit_key(&queue, KeyCode::D, EventType::KeyDown, 0);
        admit_key(&queue, KeyCode::F, EventType::KeyDown, 10);
        stage.run(&queue, AbsoluteTime::from_millis(11));

        // Act – auto-repeat of d while the combo is held
        let repeat = admit_key(&queue, KeyCode::D, EventType::KeyDown, 500);
        stage.run(&queue, AbsoluteTime::from_millis(501));

        // Assert
        assert_eq!(repeat.validity(), Validity::Invalid);
    }

    #[test]
    fn test_reset_discards_pending_state() {
        // Arrange
        let queue = Queue::new();
        let mut stage = stage();
        admit_key(&queue, KeyCode::D, EventType::KeyDown, 0);
        stage.run(&queue, AbsoluteTime::from_millis(1));
        assert!(stage.next_deadline().is_some());

        // Act
        stage.reset();

        // Assert
        assert_eq!(stage.next_deadline(), None);
    }
}
