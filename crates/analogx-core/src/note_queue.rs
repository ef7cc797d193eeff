//! Deferred note-off events

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;
use std::time::Instant;

/// A note-off waiting for its fire time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduledNoteOff {
    pub pitch: u8,
    pub due: Instant,
    seq: u64,
}

impl Ord for ScheduledNoteOff {
    fn cmp(&self, other: &Self) -> Ordering {
        self.due.cmp(&other.due).then(self.seq.cmp(&other.seq))
    }
}

impl PartialOrd for ScheduledNoteOff {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Min-heap of note-offs by fire time; equal times fire in scheduling order
#[derive(Debug, Default)]
pub struct NoteOffQueue {
    heap: BinaryHeap<Reverse<ScheduledNoteOff>>,
    next_seq: u64,
}

impl NoteOffQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule(&mut self, pitch: u8, due: Instant) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.heap.push(Reverse(ScheduledNoteOff { pitch, due, seq }));
    }

    /// Remove and return every note-off whose time has come, earliest first
    pub fn pop_due(&mut self, now: Instant) -> Vec<u8> {
        let mut due = Vec::new();
        while let Some(Reverse(next)) = self.heap.peek() {
            if next.due > now {
                break;
            }
            due.push(next.pitch);
            self.heap.pop();
        }
        due
    }

    pub fn next_due(&self) -> Option<Instant> {
        self.heap.peek().map(|Reverse(next)| next.due)
    }

    /// Drop everything pending, returning the pitches that were waiting
    pub fn clear(&mut self) -> Vec<u8> {
        let mut pending: Vec<ScheduledNoteOff> = self.heap.drain().map(|Reverse(e)| e).collect();
        pending.sort();
        pending.into_iter().map(|e| e.pitch).collect()
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn test_fires_only_after_delay() {
        let t0 = Instant::now();
        let mut queue = NoteOffQueue::new();
        queue.schedule(60, t0 + Duration::from_millis(50));

        assert!(queue.pop_due(t0).is_empty());
        assert!(queue.pop_due(t0 + Duration::from_millis(49)).is_empty());
        assert_eq!(queue.pop_due(t0 + Duration::from_millis(50)), vec![60]);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_order_by_time_then_schedule() {
        let t0 = Instant::now();
        let mut queue = NoteOffQueue::new();
        queue.schedule(72, t0 + Duration::from_millis(20));
        queue.schedule(60, t0 + Duration::from_millis(10));
        queue.schedule(64, t0 + Duration::from_millis(10));
        queue.schedule(67, t0 + Duration::from_millis(10));

        assert_eq!(queue.next_due(), Some(t0 + Duration::from_millis(10)));
        assert_eq!(queue.pop_due(t0 + Duration::from_secs(1)), vec![60, 64, 67, 72]);
        assert_eq!(queue.next_due(), None);
    }

    #[test]
    fn test_clear_returns_pending() {
        let t0 = Instant::now();
        let mut queue = NoteOffQueue::new();
        queue.schedule(50, t0 + Duration::from_millis(30));
        queue.schedule(40, t0 + Duration::from_millis(5));
        assert_eq!(queue.len(), 2);
        assert_eq!(queue.clear(), vec![40, 50]);
        assert!(queue.is_empty());
        assert!(queue.clear().is_empty());
    }
}
