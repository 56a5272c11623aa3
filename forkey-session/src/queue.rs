/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 17/10/26
******************************************************************************/

//! Outbound write queue.
//!
//! Buffers are transmitted strictly in insertion order with at most one in
//! flight. The head is only popped once its own transmission has completed.

use bytes::Bytes;
use std::collections::VecDeque;

/// FIFO of outbound buffers.
#[derive(Debug, Default)]
pub struct WriteQueue {
    queue: VecDeque<Bytes>,
    in_flight: bool,
}

impl WriteQueue {
    /// Creates an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `payload` to the tail.
    ///
    /// Returns true if the queue was empty before the append.
    pub fn push(&mut self, payload: Bytes) -> bool {
        let was_empty = self.queue.is_empty();
        self.queue.push_back(payload);
        was_empty
    }

    /// Marks the head as in flight and returns it.
    ///
    /// Returns `None` if a buffer is already in flight or the queue is empty.
    pub fn start(&mut self) -> Option<Bytes> {
        if self.in_flight {
            return None;
        }
        let head = self.queue.front().cloned()?;
        self.in_flight = true;
        Some(head)
    }

    /// Pops the transmitted head and starts the next buffer, if any.
    pub fn complete(&mut self) -> Option<Bytes> {
        if self.in_flight {
            self.queue.pop_front();
            self.in_flight = false;
        }
        self.start()
    }

    /// Drops every queued buffer. Returns how many were dropped.
    pub fn clear(&mut self) -> usize {
        let dropped = self.queue.len();
        self.queue.clear();
        self.in_flight = false;
        dropped
    }

    /// Returns true if a buffer is awaiting transmission completion.
    #[inline]
    #[must_use]
    pub const fn is_in_flight(&self) -> bool {
        self.in_flight
    }

    /// Returns the number of queued buffers, including the one in flight.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Returns true if nothing is queued.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_one_in_flight() {
        let mut queue = WriteQueue::new();
        assert!(queue.push(Bytes::from_static(b"line 1\r\n")));
        assert_eq!(queue.start(), Some(Bytes::from_static(b"line 1\r\n")));

        assert!(!queue.push(Bytes::from_static(b"line 2\r\n")));
        assert_eq!(queue.start(), None);
        assert!(queue.is_in_flight());
        assert_eq!(queue.len(), 2);
    }

    #[test]
    fn test_complete_drains_in_order() {
        let mut queue = WriteQueue::new();
        queue.push(Bytes::from_static(b"a"));
        queue.push(Bytes::from_static(b"b"));
        queue.push(Bytes::from_static(b"c"));

        assert_eq!(queue.start(), Some(Bytes::from_static(b"a")));
        assert_eq!(queue.complete(), Some(Bytes::from_static(b"b")));
        assert_eq!(queue.complete(), Some(Bytes::from_static(b"c")));
        assert_eq!(queue.complete(), None);
        assert!(queue.is_empty());
        assert!(!queue.is_in_flight());
    }

    #[test]
    fn test_complete_without_flight_does_not_pop() {
        let mut queue = WriteQueue::new();
        queue.push(Bytes::from_static(b"held"));
        assert_eq!(queue.complete(), Some(Bytes::from_static(b"held")));
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn test_clear_drops_everything() {
        let mut queue = WriteQueue::new();
        queue.push(Bytes::from_static(b"a"));
        queue.push(Bytes::from_static(b"b"));
        queue.start();

        assert_eq!(queue.clear(), 2);
        assert!(queue.is_empty());
        assert_eq!(queue.start(), None);
    }
}
