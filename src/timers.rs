//! Deferred actions keyed by due time.
//!
//! Stands in for the page's timeouts and intervals: periodic effects
//! re-schedule themselves when they fire.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::time::{Duration, Instant};

struct Scheduled<T> {
    due: Instant,
    seq: u64,
    action: T,
}

impl<T> PartialEq for Scheduled<T> {
    fn eq(&self, other: &Self) -> bool {
        self.due == other.due && self.seq == other.seq
    }
}

impl<T> Eq for Scheduled<T> {}

impl<T> PartialOrd for Scheduled<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for Scheduled<T> {
    // Reversed so the heap pops the earliest (then first scheduled) entry
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .due
            .cmp(&self.due)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// Min-heap of actions ordered by due time, then insertion order
pub struct Timers<T> {
    queue: BinaryHeap<Scheduled<T>>,
    next_seq: u64,
}

impl<T> Timers<T> {
    pub fn new() -> Self {
        Self {
            queue: BinaryHeap::new(),
            next_seq: 0,
        }
    }

    pub fn schedule(&mut self, due: Instant, action: T) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.queue.push(Scheduled { due, seq, action });
    }

    pub fn after(&mut self, now: Instant, delay: Duration, action: T) {
        self.schedule(now + delay, action);
    }

    /// Pop the next action due at or before `now`
    pub fn pop_due(&mut self, now: Instant) -> Option<(Instant, T)> {
        if self.queue.peek()?.due > now {
            return None;
        }
        self.queue.pop().map(|s| (s.due, s.action))
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

impl<T> Default for Timers<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pops_in_due_order() {
        let t0 = Instant::now();
        let mut timers = Timers::new();
        timers.after(t0, Duration::from_millis(300), "c");
        timers.after(t0, Duration::from_millis(100), "a");
        timers.after(t0, Duration::from_millis(100), "b");

        let now = t0 + Duration::from_millis(200);
        assert_eq!(timers.pop_due(now).map(|(_, a)| a), Some("a"));
        assert_eq!(timers.pop_due(now).map(|(_, a)| a), Some("b"));
        assert_eq!(timers.pop_due(now), None);
        assert_eq!(timers.len(), 1);
    }

    #[test]
    fn test_empty_queue() {
        let mut timers: Timers<()> = Timers::default();
        assert!(timers.is_empty());
        assert!(timers.pop_due(Instant::now()).is_none());
    }
}
