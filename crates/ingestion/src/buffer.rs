//! Bounded drop buffer between the bus callback and the relay loop.
//!
//! Writes never block: when the ring is full the oldest payload is evicted
//! and the shared loss counter is incremented. Reads wait on a `Notify`
//! until a payload arrives or the buffer is closed.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use bytes::Bytes;
use contracts::Counter;
use ringbuf::{traits::*, HeapRb};
use tokio::sync::Notify;

/// Fixed-capacity FIFO of batch payloads with evict-oldest overflow
pub struct DropBuffer {
    ring: Mutex<HeapRb<Bytes>>,
    capacity: usize,
    lost: Arc<Counter>,
    readable: Notify,
    closed: AtomicBool,
}

impl fmt::Debug for DropBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DropBuffer")
            .field("len", &self.len())
            .field("capacity", &self.capacity)
            .field("lost", &self.lost.get())
            .finish()
    }
}

impl DropBuffer {
    /// Create a buffer holding at most `capacity` payloads
    ///
    /// A zero capacity is raised to one.
    pub fn new(capacity: usize, lost: Arc<Counter>) -> Self {
        let capacity = capacity.max(1);
        Self {
            ring: Mutex::new(HeapRb::new(capacity)),
            capacity,
            lost,
            readable: Notify::new(),
            closed: AtomicBool::new(false),
        }
    }

    /// Push a payload without blocking
    ///
    /// If the buffer is full, the oldest payload is dropped. After `close`
    /// the payload itself is dropped. Both count as lost.
    pub fn write(&self, payload: Bytes) {
        if self.is_closed() {
            self.lost.inc();
            return;
        }

        let evicted = self.ring().push_overwrite(payload);
        if evicted.is_some() {
            self.lost.inc();
        }
        self.readable.notify_one();
    }

    /// Pop the oldest payload if one is stored
    pub fn try_read(&self) -> Option<Bytes> {
        self.ring().try_pop()
    }

    /// Wait for the next payload
    ///
    /// Returns `None` once the buffer is closed and empty. Cancel safe: a
    /// payload is only removed when this future completes.
    pub async fn read(&self) -> Option<Bytes> {
        loop {
            let notified = self.readable.notified();
            if let Some(payload) = self.try_read() {
                return Some(payload);
            }
            if self.is_closed() {
                return None;
            }
            notified.await;
        }
    }

    /// Stop accepting payloads and wake the reader
    pub fn close(&self) {
        self.closed.store(true, Ordering::Release);
        self.readable.notify_waiters();
        self.readable.notify_one();
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Stored payload count
    pub fn len(&self) -> usize {
        self.ring().occupied_len()
    }

    pub fn is_empty(&self) -> bool {
        self.ring().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Total payloads lost to overflow or closure
    pub fn lost(&self) -> u64 {
        self.lost.get()
    }

    fn ring(&self) -> MutexGuard<'_, HeapRb<Bytes>> {
        self.ring.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
