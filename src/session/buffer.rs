//! Bounded, sequence-numbered event store for one session

use crate::keyboard::KeyEventRecord;
use log::warn;

/// Default number of records a session keeps
pub const DEFAULT_CAPACITY: usize = 100_000;

/// Append-only record store with a fixed capacity.
///
/// Sequence numbers are assigned on acceptance, starting at 1 with no gaps.
/// Once the buffer is full further records are dropped; the number dropped
/// is counted so the loss can be reported when the session ends.
#[derive(Debug)]
pub struct EventBuffer {
    records: Vec<KeyEventRecord>,
    capacity: usize,
    dropped: u64,
}

impl EventBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            records: Vec::with_capacity(capacity.min(DEFAULT_CAPACITY)),
            capacity,
            dropped: 0,
        }
    }

    /// Accept a record, assigning its sequence number.
    ///
    /// Returns the assigned `seq`, or `None` if the buffer is full and the
    /// record was dropped.
    pub fn append(&mut self, mut record: KeyEventRecord) -> Option<u64> {
        if self.is_full() {
            self.dropped += 1;
            if self.dropped == 1 {
                warn!(
                    "Event buffer full ({} events), further events are dropped",
                    self.capacity
                );
            }
            return None;
        }
        let seq = self.records.len() as u64 + 1;
        record.seq = seq;
        self.records.push(record);
        Some(seq)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.records.len() >= self.capacity
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Records rejected because the buffer was full
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    /// Most recently accepted record
    pub fn last(&self) -> Option<&KeyEventRecord> {
        self.records.last()
    }

    /// All accepted records in acceptance order
    pub fn snapshot(&self) -> &[KeyEventRecord] {
        &self.records
    }
}

impl Default for EventBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
