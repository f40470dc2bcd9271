//! Line-delimited JSON replay plumbing.
//!
//! The daemon performs no device IO. Its input source is a dedicated thread
//! reading entry snapshots from stdin, one JSON object per line, and its
//! sink writes forwarded entries back out as JSON lines. This makes the
//! engine drivable end-to-end from recorded fixtures:
//!
//! ```text
//! cat events.jsonl | retapd config.toml > remapped.jsonl
//! ```
//!
//! Replayed entries are re-stamped at admission time so rule timeouts run
//! against the live clock rather than the capture-time stamps.

use std::io::{BufRead, Write};
use std::sync::Arc;
use std::thread;

use retap_core::{Entry, EventOrigin, EventTimeStamp};
use retap_engine::{Clock, EventSink, InputHandle};

/// Sink that writes each forwarded entry to stdout as one JSON line.
#[derive(Debug, Default)]
pub struct StdoutSink;

impl EventSink for StdoutSink {
    fn post(&self, entry: &Entry) -> Result<(), String> {
        let stdout = std::io::stdout();
        let mut locked = stdout.lock();
        writeln!(locked, "{}", entry.to_json()).map_err(|e| e.to_string())
    }
}

/// Builds the admitted entry for one decoded snapshot line: payloads carry
/// over, the time stamp is taken from `now`, and an unset origin is
/// promoted to `grabbed_device` (the contract for real input sources).
pub fn admission_entry(decoded: &Entry, now: EventTimeStamp) -> Entry {
    let origin = match decoded.event_origin() {
        EventOrigin::None => EventOrigin::GrabbedDevice,
        origin => origin,
    };
    Entry::builder()
        .device_id(decoded.device_id())
        .event_time_stamp(now)
        .event(*decoded.event())
        .event_type(decoded.event_type())
        .original_event(*decoded.original_event())
        .event_origin(origin)
        .build()
}

/// Spawns the stdin reader thread.
///
/// Each parseable line is decoded tolerantly and admitted; lines that are
/// not JSON at all are logged and skipped. On EOF the thread requests
/// pipeline shutdown, so piping a finite fixture through the daemon
/// terminates it.
pub fn spawn_stdin_reader(handle: InputHandle, clock: Arc<dyn Clock>) -> thread::JoinHandle<()> {
    thread::Builder::new()
        .name("retap-stdin".to_string())
        .spawn(move || {
            let stdin = std::io::stdin();
            for line in stdin.lock().lines() {
                let line = match line {
                    Ok(line) => line,
                    Err(error) => {
                        tracing::error!(%error, "stdin read failed, stopping replay");
                        break;
                    }
                };
                if line.trim().is_empty() {
                    continue;
                }
                let value: serde_json::Value = match serde_json::from_str(&line) {
                    Ok(value) => value,
                    Err(error) => {
                        tracing::warn!(%error, "skipping non-JSON input line");
                        continue;
                    }
                };
                let decoded = Entry::from_json(&value);
                let entry = admission_entry(&decoded, EventTimeStamp::new(clock.now()));
                handle.admit(entry);
            }
            tracing::info!("input stream ended, requesting shutdown");
            handle.shutdown();
        })
        .expect("failed to spawn stdin reader thread")
}

#[cfg(test)]
mod tests {
    use super::*;
    use retap_core::{AbsoluteTime, DeviceId, Event, EventType, KeyCode, State, Validity};

    #[test]
    fn test_admission_entry_restamps_and_promotes_origin() {
        // Arrange – a decoded snapshot with no origin and a stale time stamp
        let decoded = Entry::from_json(&serde_json::json!({
            "device_id": 4,
            "event": {"type": "key", "code": "a"},
            "event_time_stamp": {"time_stamp": 1, "input_delay_duration": 0},
        }));

        // Act
        let now = EventTimeStamp::new(AbsoluteTime(999));
        let admitted = admission_entry(&decoded, now);

        // Assert
        assert_eq!(admitted.device_id(), DeviceId(4));
        assert_eq!(admitted.event().key_code(), Some(KeyCode::A));
        assert_eq!(admitted.event_time_stamp().time_stamp(), AbsoluteTime(999));
        assert_eq!(admitted.event_origin(), EventOrigin::GrabbedDevice);
        assert_eq!(admitted.state(), State::Original);
        assert_eq!(admitted.validity(), Validity::Valid);
    }

    #[test]
    fn test_admission_entry_keeps_explicit_origin() {
        // Arrange
        let decoded = Entry::from_json(&serde_json::json!({
            "event": {"type": "key", "code": "b"},
            "event_type": "key_up",
            "event_origin": "virtual_device",
        }));

        // Act
        let admitted = admission_entry(&decoded, EventTimeStamp::new(AbsoluteTime(1)));

        // Assert
        assert_eq!(admitted.event_origin(), EventOrigin::VirtualDevice);
        assert_eq!(admitted.event_type(), EventType::KeyUp);
    }

    #[test]
    fn test_stdout_sink_serializes_without_error() {
        // Arrange
        let sink = StdoutSink;
        let entry = Entry::builder()
            .event(Event::Key { code: KeyCode::A })
            .original_event(Event::Key { code: KeyCode::A })
            .build();

        // Act / Assert – stdout in tests is captured; posting must succeed
        assert!(sink.post(&entry).is_ok());
    }
}
