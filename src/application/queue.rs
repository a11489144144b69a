//! Bounded overflow queue for deferred claims.
//!
//! Producers never block: a full queue rejects the claim immediately so the
//! request handler can fail fast with a service-unavailable answer.

use crate::domain::claim::ClaimRequest;
use parking_lot::Mutex;
use std::collections::VecDeque;

/// Error returned when constructing a queue with no capacity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("queue capacity must be greater than 0")]
pub struct ZeroCapacity;

/// Fixed-capacity FIFO of pending claims.
///
/// Safe for any number of concurrent producers and consumers. No
/// reordering and no deduplication: the same destination may appear
/// several times.
#[derive(Debug)]
pub struct DispatchQueue {
    entries: Mutex<VecDeque<ClaimRequest>>,
    capacity: usize,
}

impl DispatchQueue {
    /// Create a queue holding at most `capacity` claims.
    ///
    /// # Errors
    /// Returns `ZeroCapacity` if `capacity` is zero.
    pub fn new(capacity: usize) -> Result<Self, ZeroCapacity> {
        if capacity == 0 {
            return Err(ZeroCapacity);
        }
        Ok(Self {
            entries: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
        })
    }

    /// Append a claim unless the queue is full.
    ///
    /// Returns the claim back to the caller when there is no room, leaving
    /// the queue unchanged.
    pub fn try_enqueue(&self, claim: ClaimRequest) -> Result<(), ClaimRequest> {
        let mut entries = self.entries.lock();
        if entries.len() >= self.capacity {
            return Err(claim);
        }
        entries.push_back(claim);
        Ok(())
    }

    /// Remove the oldest claim, if any.
    pub fn dequeue(&self) -> Option<ClaimRequest> {
        self.entries.lock().pop_front()
    }

    /// Number of pending claims.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Whether no claims are pending.
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Maximum number of pending claims.
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claim(dest: &str) -> ClaimRequest {
        ClaimRequest::native(dest).unwrap()
    }

    #[test]
    fn test_zero_capacity_rejected() {
        assert_eq!(DispatchQueue::new(0).unwrap_err(), ZeroCapacity);
    }

    #[test]
    fn test_fifo_order() {
        let queue = DispatchQueue::new(3).unwrap();
        queue.try_enqueue(claim("0x1")).unwrap();
        queue.try_enqueue(claim("0x2")).unwrap();
        queue.try_enqueue(claim("0x3")).unwrap();

        assert_eq!(queue.dequeue().unwrap().destination(), "0x1");
        assert_eq!(queue.dequeue().unwrap().destination(), "0x2");
        assert_eq!(queue.dequeue().unwrap().destination(), "0x3");
        assert!(queue.dequeue().is_none());
    }

    #[test]
    fn test_full_queue_rejects_and_keeps_length() {
        let queue = DispatchQueue::new(2).unwrap();
        assert!(queue.try_enqueue(claim("0xB")).is_ok());
        assert!(queue.try_enqueue(claim("0xC")).is_ok());

        let rejected = queue.try_enqueue(claim("0xD")).unwrap_err();
        assert_eq!(rejected.destination(), "0xD");
        assert_eq!(queue.len(), 2);

        queue.dequeue();
        assert!(queue.try_enqueue(claim("0xD")).is_ok());
        assert_eq!(queue.len(), 2);
    }

    #[test]
    fn test_duplicates_kept() {
        let queue = DispatchQueue::new(4).unwrap();
        queue.try_enqueue(claim("0xA")).unwrap();
        queue.try_enqueue(claim("0xA")).unwrap();
        assert_eq!(queue.len(), 2);
    }

    #[test]
    fn test_empty_state() {
        let queue = DispatchQueue::new(1).unwrap();
        assert!(queue.is_empty());
        assert_eq!(queue.capacity(), 1);
        queue.try_enqueue(claim("0xA")).unwrap();
        assert!(!queue.is_empty());
    }

    #[test]
    fn test_concurrent_producers_respect_capacity() {
        use std::sync::Arc;
        use std::thread;

        let queue = Arc::new(DispatchQueue::new(50).unwrap());
        let handles: Vec<_> = (0..10)
            .map(|t| {
                let queue = Arc::clone(&queue);
                thread::spawn(move || {
                    (0..20)
                        .filter(|i| queue.try_enqueue(claim(&format!("0x{}{}", t, i))).is_ok())
                        .count()
                })
            })
            .collect();

        let accepted: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
        assert_eq!(accepted, 50);
        assert_eq!(queue.len(), 50);
    }
}
