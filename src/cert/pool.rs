//! Pooled scratch buffers for per-request decoding.

use once_cell::sync::Lazy;
use parking_lot::Mutex;
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicUsize, Ordering};

const DEFAULT_MAX_RETAINED: usize = 64;

static SHARED: Lazy<BufferPool> = Lazy::new(BufferPool::new);

/// A pool of reusable byte buffers, safe to rent from concurrently.
///
/// Buffers are handed out as [`PooledBuffer`] guards which go back to the
/// pool when dropped, including on early return and unwinding.
///
/// ```rust
/// use pipeline_defaults::BufferPool;
///
/// let pool = BufferPool::new();
/// {
///     let buffer = pool.rent(16);
///     assert_eq!(buffer.len(), 16);
/// }
/// assert_eq!(pool.rented(), 1);
/// assert_eq!(pool.returned(), 1);
/// ```
#[derive(Debug)]
pub struct BufferPool {
    free: Mutex<Vec<Vec<u8>>>,
    max_retained: usize,
    rented: AtomicUsize,
    returned: AtomicUsize,
}

impl BufferPool {
    pub fn new() -> Self {
        Self::with_max_retained(DEFAULT_MAX_RETAINED)
    }

    /// Pool keeping at most `max_retained` idle buffers.
    pub fn with_max_retained(max_retained: usize) -> Self {
        Self {
            free: Mutex::new(Vec::new()),
            max_retained,
            rented: AtomicUsize::new(0),
            returned: AtomicUsize::new(0),
        }
    }

    /// The process-wide pool.
    pub fn shared() -> &'static BufferPool {
        &SHARED
    }

    /// Rent a zeroed buffer of exactly `len` bytes.
    pub fn rent(&self, len: usize) -> PooledBuffer<'_> {
        let reused = {
            let mut free = self.free.lock();
            let fit = free.iter().position(|buf| buf.capacity() >= len);
            fit.map(|i| free.swap_remove(i))
        };
        let mut buf = reused.unwrap_or_else(|| Vec::with_capacity(len));
        buf.resize(len, 0);

        self.rented.fetch_add(1, Ordering::Relaxed);
        PooledBuffer { pool: self, buf }
    }

    fn give_back(&self, mut buf: Vec<u8>) {
        self.returned.fetch_add(1, Ordering::Relaxed);
        buf.clear();

        let mut free = self.free.lock();
        if free.len() < self.max_retained {
            free.push(buf);
        }
    }

    /// Buffers handed out so far.
    pub fn rented(&self) -> usize {
        self.rented.load(Ordering::Relaxed)
    }

    /// Buffers given back so far.
    pub fn returned(&self) -> usize {
        self.returned.load(Ordering::Relaxed)
    }

    /// Buffers currently rented out.
    pub fn outstanding(&self) -> usize {
        self.rented().saturating_sub(self.returned())
    }

    /// Idle buffers held for reuse.
    pub fn idle(&self) -> usize {
        self.free.lock().len()
    }
}

impl Default for BufferPool {
    fn default() -> Self {
        Self::new()
    }
}

/// A rented buffer; returned to its pool on drop.
#[derive(Debug)]
pub struct PooledBuffer<'a> {
    pool: &'a BufferPool,
    buf: Vec<u8>,
}

impl Deref for PooledBuffer<'_> {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.buf
    }
}

impl DerefMut for PooledBuffer<'_> {
    fn deref_mut(&mut self) -> &mut [u8] {
        &mut self.buf
    }
}

impl Drop for PooledBuffer<'_> {
    fn drop(&mut self) {
        self.pool.give_back(std::mem::take(&mut self.buf));
    }
}
