use std::cmp;
use std::sync::atomic::{AtomicUsize, Ordering};

use crossbeam_queue::SegQueue;

use crate::buffer::{BufReader, BufWriter, SharedStream};


/// Buffer size used when none is configured
pub const DEFAULT_BUFFER_SIZE: usize = 1024;

/// Smallest buffer the pool will mint; a PROXY prefix peek needs six bytes in one buffer
pub const MIN_BUFFER_SIZE: usize = 16;


/// Free-lists of read and write buffers, all of one fixed size.
///
/// The pool never evicts: it grows to the high-water mark of concurrently
/// open connections and stays there. Acquire and release are lock-free and
/// may race freely across connection threads.
#[derive(Debug)]
pub struct BufferPool {
    size: usize,
    readers: SegQueue<BufReader<SharedStream>>,
    writers: SegQueue<BufWriter<SharedStream>>,
    allocated_readers: AtomicUsize,
    allocated_writers: AtomicUsize,
}


/// Point-in-time counters for a `BufferPool`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStats {
    pub buffer_size: usize,
    /// readers ever allocated (pool misses)
    pub allocated_readers: usize,
    /// writers ever allocated (pool misses)
    pub allocated_writers: usize,
    pub idle_readers: usize,
    pub idle_writers: usize,
}


impl BufferPool {
    /// Sizes below `MIN_BUFFER_SIZE` are raised to it.
    pub fn new(size: usize) -> Self {
        BufferPool {
            size: cmp::max(size, MIN_BUFFER_SIZE),
            readers: SegQueue::new(),
            writers: SegQueue::new(),
            allocated_readers: AtomicUsize::new(0),
            allocated_writers: AtomicUsize::new(0),
        }
    }

    pub fn buffer_size(&self) -> usize {
        self.size
    }

    pub fn acquire_reader(&self, source: SharedStream) -> BufReader<SharedStream> {
        match self.readers.pop() {
            Some(mut reader) => {
                reader.reset(Some(source));
                reader
            }
            None => {
                self.allocated_readers.fetch_add(1, Ordering::Relaxed);
                BufReader::with_capacity(self.size, source)
            }
        }
    }

    pub fn acquire_writer(&self, sink: SharedStream) -> BufWriter<SharedStream> {
        match self.writers.pop() {
            Some(mut writer) => {
                writer.reset(Some(sink));
                writer
            }
            None => {
                self.allocated_writers.fetch_add(1, Ordering::Relaxed);
                BufWriter::with_capacity(self.size, sink)
            }
        }
    }

    /// Detach the reader from its source and keep it for the next connection.
    pub fn release_reader(&self, mut reader: BufReader<SharedStream>) {
        drop(reader.reset(None));
        self.readers.push(reader);
    }

    /// Detach the writer from its sink, dropping anything unflushed, and keep it.
    pub fn release_writer(&self, mut writer: BufWriter<SharedStream>) {
        drop(writer.reset(None));
        self.writers.push(writer);
    }

    pub fn stats(&self) -> PoolStats {
        PoolStats {
            buffer_size: self.size,
            allocated_readers: self.allocated_readers.load(Ordering::Relaxed),
            allocated_writers: self.allocated_writers.load(Ordering::Relaxed),
            idle_readers: self.readers.len(),
            idle_writers: self.writers.len(),
        }
    }
}

impl Default for BufferPool {
    fn default() -> Self {
        BufferPool::new(DEFAULT_BUFFER_SIZE)
    }
}
