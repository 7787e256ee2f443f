use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::scan::DifferencedScan;

/// A published scan together with its publish sequence number.
#[derive(Debug, Clone)]
pub struct ScanSnapshot {
    /// Sequence number of the publish, starting at 1 and incremented on every publish.
    pub sequence: u64,
    /// The published scan.
    pub scan: Arc<DifferencedScan>,
}

#[derive(Debug, Default)]
struct Slot {
    sequence: u64,
    scan: Option<Arc<DifferencedScan>>,
}

/// Single-slot, latest-value cell between the capture loop and any number of readers.
///
/// Publishing replaces the previous scan, there is no backlog: a reader that polls slower
/// than the capture rate silently misses intermediate scans. Left and right lines are
/// published together as one [`DifferencedScan`], so a reader never observes a pair mixed
/// from two capture cycles.
///
/// Cloning the buffer yields another handle to the same slot.
///
/// # Examples
///
/// ```
/// use robguide_scan::{DifferencedScan, ScanBuffer};
///
/// let buffer = ScanBuffer::new();
/// assert!(!buffer.available());
///
/// let scan = DifferencedScan::from_rows(&[9, 9, 9, 9], &[1, 1, 1, 1]).unwrap();
/// let published = buffer.publish(scan);
///
/// let snapshot = buffer.latest().unwrap();
/// assert_eq!(snapshot.sequence, published.sequence);
/// assert_eq!(snapshot.scan.left().as_slice(), &[8, 8]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct ScanBuffer {
    slot: Arc<Mutex<Slot>>,
}

impl ScanBuffer {
    /// Creates an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    // the slot is only ever replaced by a single assignment, a poisoned lock still holds
    // a consistent value
    fn lock(&self) -> MutexGuard<'_, Slot> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Publishes a new scan, replacing the previous one.
    ///
    /// # Returns
    ///
    /// The published scan with the sequence number assigned to it.
    pub fn publish(&self, scan: DifferencedScan) -> ScanSnapshot {
        let scan = Arc::new(scan);
        let mut slot = self.lock();
        slot.sequence += 1;
        slot.scan = Some(Arc::clone(&scan));
        ScanSnapshot {
            sequence: slot.sequence,
            scan,
        }
    }

    /// Whether at least one scan has been published.
    ///
    /// Reading never resets this flag.
    pub fn available(&self) -> bool {
        self.lock().scan.is_some()
    }

    /// Sequence number of the latest publish, 0 if nothing was published yet.
    pub fn sequence(&self) -> u64 {
        self.lock().sequence
    }

    /// Returns the latest published scan, if any.
    ///
    /// The lock is held only while the shared pointer is copied out.
    pub fn latest(&self) -> Option<ScanSnapshot> {
        let slot = self.lock();
        slot.scan.as_ref().map(|scan| ScanSnapshot {
            sequence: slot.sequence,
            scan: Arc::clone(scan),
        })
    }

    /// Returns the latest scan only if it is newer than `sequence`.
    pub fn latest_since(&self, sequence: u64) -> Option<ScanSnapshot> {
        let slot = self.lock();
        if slot.sequence <= sequence {
            return None;
        }
        slot.scan.as_ref().map(|scan| ScanSnapshot {
            sequence: slot.sequence,
            scan: Arc::clone(scan),
        })
    }

    /// Creates a reader that tracks which publish it consumed last.
    pub fn reader(&self) -> ScanReader {
        ScanReader {
            buffer: self.clone(),
            last_sequence: 0,
        }
    }

    /// Creates a reader that skips whatever is in the buffer now and only yields later
    /// publishes.
    pub fn subscribe(&self) -> ScanReader {
        ScanReader {
            buffer: self.clone(),
            last_sequence: self.sequence(),
        }
    }
}

/// A polling reader of a [`ScanBuffer`] that yields every published version at most once.
#[derive(Debug, Clone)]
pub struct ScanReader {
    buffer: ScanBuffer,
    last_sequence: u64,
}

impl ScanReader {
    /// Returns the latest scan if it was published after the previously returned one.
    pub fn poll(&mut self) -> Option<ScanSnapshot> {
        let snapshot = self.buffer.latest_since(self.last_sequence)?;
        self.last_sequence = snapshot.sequence;
        Some(snapshot)
    }

    /// Sequence number of the last scan returned by [`ScanReader::poll`].
    #[inline]
    pub fn last_sequence(&self) -> u64 {
        self.last_sequence
    }

    /// Number of publishes skipped since the last poll, useful to monitor reader lag.
    pub fn pending(&self) -> u64 {
        self.buffer.sequence().saturating_sub(self.last_sequence)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scan::ScanLine;

    fn marked_scan(marker: u8, len: usize) -> DifferencedScan {
        DifferencedScan::new(
            ScanLine::from_value(len, marker),
            ScanLine::from_value(len, marker.wrapping_add(1)),
        )
        .unwrap()
    }

    #[test]
    fn test_empty_buffer() {
        let buffer = ScanBuffer::new();
        assert!(!buffer.available());
        assert_eq!(buffer.sequence(), 0);
        assert!(buffer.latest().is_none());
        assert!(buffer.reader().poll().is_none());
    }

    #[test]
    fn test_available_survives_reads() {
        let buffer = ScanBuffer::new();
        buffer.publish(marked_scan(3, 8));
        assert!(buffer.latest().is_some());
        assert!(buffer.latest().is_some());
        assert!(buffer.available());
    }

    #[test]
    fn test_overwrite_without_backlog() {
        let buffer = ScanBuffer::new();
        buffer.publish(marked_scan(1, 8));
        buffer.publish(marked_scan(2, 8));
        let published = buffer.publish(marked_scan(3, 8));
        assert_eq!(published.sequence, 3);

        let mut reader = buffer.reader();
        let snapshot = reader.poll().unwrap();
        assert_eq!(snapshot.sequence, 3);
        assert_eq!(snapshot.scan.left().as_slice()[0], 3);
        assert!(reader.poll().is_none());
    }

    #[test]
    fn test_reader_sees_each_version_once() {
        let buffer = ScanBuffer::new();
        let mut reader = buffer.reader();
        for i in 0..5u8 {
            buffer.publish(marked_scan(i, 4));
            assert_eq!(reader.pending(), 1);
            let snapshot = reader.poll().unwrap();
            assert_eq!(snapshot.sequence, i as u64 + 1);
            assert!(reader.poll().is_none());
        }
    }

    #[test]
    fn test_subscribe_skips_current() {
        let buffer = ScanBuffer::new();
        buffer.publish(marked_scan(1, 4));
        let mut reader = buffer.subscribe();
        assert!(reader.poll().is_none());
        buffer.publish(marked_scan(2, 4));
        assert_eq!(reader.poll().map(|s| s.sequence), Some(2));
    }

    #[test]
    fn test_latest_since() {
        let buffer = ScanBuffer::new();
        buffer.publish(marked_scan(1, 4));
        assert!(buffer.latest_since(1).is_none());
        assert_eq!(buffer.latest_since(0).map(|s| s.sequence), Some(1));
    }
}
