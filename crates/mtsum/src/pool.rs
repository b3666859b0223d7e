//! Fixed-population buffer pool
//!
//! Preallocates `capacity` byte buffers and hands them out one task at a
//! time. `acquire` suspends when the pool is empty; the returned lease gives
//! the buffer back on drop. The internal semaphore is the real admission
//! bound on memory: the engine may expand into far more leaf tasks than
//! buffers, but at most `capacity` buffers are ever held at once.

use std::ops::{Deref, DerefMut};
use std::sync::{Arc, Mutex};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

#[derive(Debug)]
struct PoolInner {
    free: Mutex<Vec<Vec<u8>>>,
    slots: Arc<Semaphore>,
    capacity: usize,
    buffer_size: usize,
}

/// Pool of `capacity` buffers, each `buffer_size` bytes.
///
/// Cloning is cheap and shares the same population.
#[derive(Debug, Clone)]
pub struct BufferPool {
    inner: Arc<PoolInner>,
}

impl BufferPool {
    /// Allocate the full population up front; all buffers start free.
    pub fn new(capacity: usize, buffer_size: usize) -> Self {
        assert!(capacity > 0, "buffer pool needs at least one buffer");
        let free = (0..capacity).map(|_| vec![0u8; buffer_size]).collect();
        Self {
            inner: Arc::new(PoolInner {
                free: Mutex::new(free),
                slots: Arc::new(Semaphore::new(capacity)),
                capacity,
                buffer_size,
            }),
        }
    }

    /// Take a free buffer, suspending until one is available.
    pub async fn acquire(&self) -> BufferLease {
        let permit = self
            .inner
            .slots
            .clone()
            .acquire_owned()
            .await
            .expect("buffer pool semaphore closed");
        let buf = self
            .inner
            .free
            .lock()
            .unwrap()
            .pop()
            .expect("semaphore permit guarantees a free buffer");
        BufferLease {
            inner: Arc::clone(&self.inner),
            buf: Some(buf),
            _permit: permit,
        }
    }

    pub fn capacity(&self) -> usize {
        self.inner.capacity
    }

    pub fn buffer_size(&self) -> usize {
        self.inner.buffer_size
    }

    /// Buffers currently free. Racy by nature; useful for tests and logs.
    pub fn available(&self) -> usize {
        self.inner.free.lock().unwrap().len()
    }
}

/// Exclusive hold on one pool buffer; returns it on drop.
#[derive(Debug)]
pub struct BufferLease {
    inner: Arc<PoolInner>,
    buf: Option<Vec<u8>>,
    _permit: OwnedSemaphorePermit,
}

impl Deref for BufferLease {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        self.buf.as_ref().expect("lease already released")
    }
}

impl DerefMut for BufferLease {
    fn deref_mut(&mut self) -> &mut [u8] {
        self.buf.as_mut().expect("lease already released")
    }
}

impl Drop for BufferLease {
    fn drop(&mut self) {
        if let Some(buf) = self.buf.take() {
            let mut free = self.inner.free.lock().unwrap();
            assert!(
                free.len() < self.inner.capacity,
                "buffer returned to a full pool"
            );
            free.push(buf);
        }
    }
}
