use chrono::{DateTime, Duration, Utc};
use std::collections::VecDeque;
use std::sync::Mutex;
use tracing::{debug, info};

/// Default ring capacity.
pub const DEFAULT_BUFFER_CAPACITY: usize = 10;
/// Default retention window for recorded packets, in seconds.
pub const DEFAULT_RETENTION_WINDOW_SECS: i64 = 10;

/// One sent payload retained for crash correlation: the raw wire bytes plus
/// the capture timestamp. Owned exclusively by the buffer from insertion
/// until eviction or freeze.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BufferedPacket {
    pub data: Vec<u8>,
    pub captured_at: DateTime<Utc>,
}

/// The outcome of crash correlation: the crash timestamp and the retained
/// packet judged closest in time, if any. Produced at most once per freeze;
/// the buffer never unfreezes.
#[derive(Debug, Clone)]
pub struct CrashRecord {
    pub crash_time: DateTime<Utc>,
    pub cause: Option<BufferedPacket>,
}

#[derive(Debug)]
struct BufferInner {
    entries: VecDeque<BufferedPacket>,
    frozen: bool,
}

/// A bounded, time-windowed, thread-safe ring of recently sent payloads.
///
/// Three concurrent activities coordinate through the internal mutex: the
/// packet-recording feed, the periodic eviction sweep, and the crash
/// listener that triggers `freeze` then `resolve_crash`. The freeze
/// transition is one-way: a frozen buffer is immutable evidence, and a
/// fresh instance must be constructed for the next fuzzing run.
#[derive(Debug)]
pub struct CrashCorrelationBuffer {
    capacity: usize,
    inner: Mutex<BufferInner>,
}

impl CrashCorrelationBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            inner: Mutex::new(BufferInner {
                entries: VecDeque::new(),
                frozen: false,
            }),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BufferInner> {
        // A poisoning panic cannot leave the ring structurally invalid, so
        // recover the guard instead of propagating the poison.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Records a sent payload with the current timestamp. See [`record_at`].
    ///
    /// [`record_at`]: CrashCorrelationBuffer::record_at
    pub fn record(&self, data: Vec<u8>) {
        self.record_at(data, Utc::now());
    }

    /// Records a sent payload with an explicit capture timestamp.
    ///
    /// When the ring is at capacity the oldest entry is evicted first. Calls
    /// against a frozen buffer are logged no-ops, never errors.
    pub fn record_at(&self, data: Vec<u8>, captured_at: DateTime<Utc>) {
        let mut inner = self.lock();
        if inner.frozen {
            debug!(bytes = data.len(), "buffer frozen, dropping record");
            return;
        }
        if inner.entries.len() == self.capacity {
            inner.entries.pop_front();
        }
        inner.entries.push_back(BufferedPacket { data, captured_at });
    }

    /// One-way ACTIVE -> FROZEN transition. Idempotent; never reset for the
    /// lifetime of this instance.
    pub fn freeze(&self) {
        let mut inner = self.lock();
        if !inner.frozen {
            inner.frozen = true;
            info!(retained = inner.entries.len(), "crash buffer frozen");
        }
    }

    pub fn is_frozen(&self) -> bool {
        self.lock().frozen
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// A point-in-time copy of the retained entries, oldest first.
    pub fn snapshot(&self) -> Vec<BufferedPacket> {
        self.lock().entries.iter().cloned().collect()
    }

    /// Removes entries older than `retention_window` relative to `now`.
    /// Once frozen, eviction stops: frozen contents are evidence.
    pub fn evict_expired(&self, now: DateTime<Utc>, retention_window: Duration) {
        let mut inner = self.lock();
        if inner.frozen {
            return;
        }
        let before = inner.entries.len();
        inner
            .entries
            .retain(|packet| now - packet.captured_at <= retention_window);
        let evicted = before - inner.entries.len();
        if evicted > 0 {
            debug!(evicted, retained = inner.entries.len(), "evicted expired packets");
        }
    }

    /// Resolves the retained packet closest in time to `crash_time`.
    ///
    /// Exact ties go to the earliest-inserted entry; preference among
    /// unequal-but-close entries is the minimum absolute difference. An
    /// empty buffer yields a record with no cause.
    pub fn resolve_crash(&self, crash_time: DateTime<Utc>) -> CrashRecord {
        let inner = self.lock();
        let mut cause: Option<&BufferedPacket> = None;
        let mut best_delta: Option<Duration> = None;

        for packet in &inner.entries {
            let delta = (crash_time - packet.captured_at).abs();
            // Strictly-smaller comparison over insertion order: the
            // earliest-inserted entry wins exact ties.
            if best_delta.map_or(true, |best| delta < best) {
                best_delta = Some(delta);
                cause = Some(packet);
            }
        }

        CrashRecord {
            crash_time,
            cause: cause.cloned(),
        }
    }
}

impl Default for CrashCorrelationBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_BUFFER_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::sync::Arc;

    fn ts(millis: i64) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(millis).unwrap()
    }

    #[test]
    fn ring_evicts_oldest_when_over_capacity() {
        let buffer = CrashCorrelationBuffer::new(DEFAULT_BUFFER_CAPACITY);
        for i in 0..=DEFAULT_BUFFER_CAPACITY as i64 {
            buffer.record_at(vec![i as u8], ts(i * 100));
        }
        assert_eq!(buffer.len(), DEFAULT_BUFFER_CAPACITY);

        let entries = buffer.snapshot();
        assert_eq!(entries[0].data, vec![1u8], "oldest original entry must be gone");
        assert_eq!(
            entries.last().unwrap().data,
            vec![DEFAULT_BUFFER_CAPACITY as u8]
        );
    }

    #[test]
    fn frozen_buffer_ignores_records() {
        let buffer = CrashCorrelationBuffer::new(4);
        buffer.record_at(b"p1".to_vec(), ts(0));
        buffer.freeze();
        buffer.record_at(b"p2".to_vec(), ts(1));

        assert_eq!(buffer.len(), 1);
        assert_eq!(buffer.snapshot()[0].data, b"p1".to_vec());
    }

    #[test]
    fn freeze_is_idempotent_and_one_way() {
        let buffer = CrashCorrelationBuffer::new(4);
        assert!(!buffer.is_frozen());
        buffer.freeze();
        buffer.freeze();
        assert!(buffer.is_frozen());
    }

    #[test]
    fn eviction_removes_only_expired_entries() {
        let buffer = CrashCorrelationBuffer::new(8);
        buffer.record_at(b"old".to_vec(), ts(0));
        buffer.record_at(b"fresh".to_vec(), ts(9_000));

        buffer.evict_expired(ts(12_000), Duration::seconds(DEFAULT_RETENTION_WINDOW_SECS));
        assert_eq!(buffer.len(), 1);
        assert_eq!(buffer.snapshot()[0].data, b"fresh".to_vec());
    }

    #[test]
    fn frozen_buffer_ignores_eviction() {
        let buffer = CrashCorrelationBuffer::new(8);
        buffer.record_at(b"old".to_vec(), ts(0));
        buffer.freeze();
        buffer.evict_expired(ts(1_000_000), Duration::seconds(1));
        assert_eq!(buffer.len(), 1);
    }

    #[test]
    fn resolve_crash_on_empty_buffer_has_no_cause() {
        let buffer = CrashCorrelationBuffer::new(4);
        let record = buffer.resolve_crash(ts(500));
        assert!(record.cause.is_none());
        assert_eq!(record.crash_time, ts(500));
    }

    #[test]
    fn resolve_crash_picks_closest_in_time() {
        // Capacity 3, window 100s: P1@0, P2@1s, P3@2s, P4@3s; P1 is evicted
        // by the ring. Crash at 2.4s is closest to P3 (0.4s vs 1.4s vs 0.6s).
        let buffer = CrashCorrelationBuffer::new(3);
        buffer.record_at(b"P1".to_vec(), ts(0));
        buffer.record_at(b"P2".to_vec(), ts(1_000));
        buffer.record_at(b"P3".to_vec(), ts(2_000));
        buffer.record_at(b"P4".to_vec(), ts(3_000));
        buffer.freeze();

        let record = buffer.resolve_crash(ts(2_400));
        assert_eq!(record.cause.unwrap().data, b"P3".to_vec());
    }

    #[test]
    fn resolve_crash_exact_tie_prefers_earliest_inserted() {
        let buffer = CrashCorrelationBuffer::new(4);
        buffer.record_at(b"early".to_vec(), ts(1_000));
        buffer.record_at(b"late".to_vec(), ts(3_000));
        buffer.freeze();

        // Crash at 2s is exactly 1s from both entries.
        let record = buffer.resolve_crash(ts(2_000));
        assert_eq!(record.cause.unwrap().data, b"early".to_vec());
    }

    #[test]
    fn concurrent_recording_and_freeze_preserve_entry_set() {
        let buffer = Arc::new(CrashCorrelationBuffer::new(64));
        let mut handles = Vec::new();
        for thread_id in 0..4u8 {
            let buffer = Arc::clone(&buffer);
            handles.push(std::thread::spawn(move || {
                for i in 0..100i64 {
                    buffer.record_at(vec![thread_id, i as u8], ts(i));
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }

        buffer.freeze();
        let retained = buffer.snapshot();
        buffer.record_at(b"after-freeze".to_vec(), ts(9_999));
        assert_eq!(buffer.snapshot(), retained, "freeze must pin the entry set");
    }
}
