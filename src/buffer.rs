//! Fixed-capacity buffered reader and writer whose backing storage outlives
//! the stream they are bound to, so the pool can hand the same memory to
//! the next connection.

use std::cmp;
use std::fmt;
use std::io::{self, BufRead, Read, Write};
use std::mem;
use std::net::{Shutdown, SocketAddr, TcpStream};
use std::sync::Arc;
use std::time::Duration;

use crate::error::not_connected;


/// An accepted socket shared between the reader half, the writer half and
/// the owning connection. Deliberately not `Clone`: only the connection
/// mints handles, so the socket closes when the connection lets go.
#[derive(Debug)]
pub struct SharedStream(Arc<TcpStream>);

impl SharedStream {
    pub(crate) fn new(stream: TcpStream) -> Self {
        SharedStream(Arc::new(stream))
    }

    pub(crate) fn share(&self) -> Self {
        SharedStream(Arc::clone(&self.0))
    }

    pub fn peer_addr(&self) -> io::Result<SocketAddr> {
        self.0.peer_addr()
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.0.local_addr()
    }

    pub fn set_read_timeout(&self, dur: Option<Duration>) -> io::Result<()> {
        self.0.set_read_timeout(dur)
    }

    pub fn set_write_timeout(&self, dur: Option<Duration>) -> io::Result<()> {
        self.0.set_write_timeout(dur)
    }

    pub fn shutdown(&self, how: Shutdown) -> io::Result<()> {
        self.0.shutdown(how)
    }
}

impl Read for SharedStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        (&*self.0).read(buf)
    }
}

impl Write for SharedStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        (&*self.0).write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        (&*self.0).flush()
    }
}


/// Buffered reader over an optional source. A reader with no source fails
/// every read with `NotConnected`.
pub struct BufReader<R> {
    inner: Option<R>,
    buf: Box<[u8]>,
    pos: usize,
    filled: usize,
}

impl<R> BufReader<R> {
    pub fn with_capacity(capacity: usize, inner: R) -> Self {
        let mut reader = Self::detached(capacity);
        reader.inner = Some(inner);
        reader
    }

    pub(crate) fn detached(capacity: usize) -> Self {
        BufReader {
            inner: None,
            buf: vec![0u8; capacity].into_boxed_slice(),
            pos: 0,
            filled: 0,
        }
    }

    /// Discard any buffered bytes and bind to `inner` (or detach, if `None`).
    /// Returns the previous source.
    pub fn reset(&mut self, inner: Option<R>) -> Option<R> {
        self.pos = 0;
        self.filled = 0;
        mem::replace(&mut self.inner, inner)
    }

    pub fn capacity(&self) -> usize {
        self.buf.len()
    }

    /// Number of bytes read from the source but not yet consumed
    pub fn buffered(&self) -> usize {
        self.filled - self.pos
    }

    pub fn buffer(&self) -> &[u8] {
        &self.buf[self.pos..self.filled]
    }

    pub fn get_ref(&self) -> Option<&R> {
        self.inner.as_ref()
    }

    pub fn is_attached(&self) -> bool {
        self.inner.is_some()
    }
}

impl<R: Read> BufReader<R> {
    /// Return the next `n` bytes without consuming them, reading from the
    /// source until that many are buffered.
    pub fn peek(&mut self, n: usize) -> io::Result<&[u8]> {
        if n > self.buf.len() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("peek of {} bytes exceeds buffer capacity {}", n, self.buf.len()),
            ));
        }
        if self.pos + n > self.buf.len() {
            self.buf.copy_within(self.pos..self.filled, 0);
            self.filled -= self.pos;
            self.pos = 0;
        }
        while self.filled - self.pos < n {
            let inner = self.inner.as_mut().ok_or_else(not_connected)?;
            match inner.read(&mut self.buf[self.filled..]) {
                Ok(0) => {
                    return Err(io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        "end of stream before peeked bytes arrived",
                    ))
                }
                Ok(read) => self.filled += read,
                Err(ref e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e),
            }
        }
        Ok(&self.buf[self.pos..self.pos + n])
    }
}

impl<R: Read> Read for BufReader<R> {
    fn read(&mut self, out: &mut [u8]) -> io::Result<usize> {
        // nothing buffered and a large destination: skip the copy
        if self.pos == self.filled && out.len() >= self.buf.len() {
            return self.inner.as_mut().ok_or_else(not_connected)?.read(out);
        }
        let n = {
            let available = self.fill_buf()?;
            let n = cmp::min(available.len(), out.len());
            out[..n].copy_from_slice(&available[..n]);
            n
        };
        self.consume(n);
        Ok(n)
    }
}

impl<R: Read> BufRead for BufReader<R> {
    fn fill_buf(&mut self) -> io::Result<&[u8]> {
        if self.pos >= self.filled {
            self.pos = 0;
            self.filled = 0;
            let inner = self.inner.as_mut().ok_or_else(not_connected)?;
            self.filled = inner.read(&mut self.buf)?;
        }
        Ok(&self.buf[self.pos..self.filled])
    }

    fn consume(&mut self, amt: usize) {
        self.pos = cmp::min(self.pos + amt, self.filled);
    }
}

impl<R> fmt::Debug for BufReader<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BufReader")
            .field("attached", &self.inner.is_some())
            .field("buffered", &self.buffered())
            .field("capacity", &self.capacity())
            .finish()
    }
}


/// Buffered writer over an optional sink. Writes of at least the buffer's
/// capacity go straight to the sink.
pub struct BufWriter<W> {
    inner: Option<W>,
    buf: Vec<u8>,
    capacity: usize,
}

impl<W> BufWriter<W> {
    pub fn with_capacity(capacity: usize, inner: W) -> Self {
        let mut writer = Self::detached(capacity);
        writer.inner = Some(inner);
        writer
    }

    pub(crate) fn detached(capacity: usize) -> Self {
        BufWriter {
            inner: None,
            buf: Vec::with_capacity(capacity),
            capacity,
        }
    }

    /// Drop pending output and bind to `inner` (or detach, if `None`).
    /// Returns the previous sink.
    pub fn reset(&mut self, inner: Option<W>) -> Option<W> {
        self.buf.clear();
        mem::replace(&mut self.inner, inner)
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Bytes written but not yet flushed to the sink
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }

    pub fn available(&self) -> usize {
        self.capacity - self.buf.len()
    }

    pub fn get_ref(&self) -> Option<&W> {
        self.inner.as_ref()
    }

    pub fn is_attached(&self) -> bool {
        self.inner.is_some()
    }
}

impl<W: Write> BufWriter<W> {
    fn flush_buf(&mut self) -> io::Result<()> {
        if self.buf.is_empty() {
            return Ok(());
        }
        let inner = self.inner.as_mut().ok_or_else(not_connected)?;
        let mut written = 0;
        let mut ret = Ok(());
        while written < self.buf.len() {
            match inner.write(&self.buf[written..]) {
                Ok(0) => {
                    ret = Err(io::Error::new(
                        io::ErrorKind::WriteZero,
                        "failed to write the buffered data",
                    ));
                    break;
                }
                Ok(n) => written += n,
                Err(ref e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => {
                    ret = Err(e);
                    break;
                }
            }
        }
        self.buf.drain(..written);
        ret
    }
}

impl<W: Write> Write for BufWriter<W> {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        if self.inner.is_none() {
            return Err(not_connected());
        }
        if self.buf.len() + data.len() > self.capacity {
            self.flush_buf()?;
        }
        if data.len() >= self.capacity {
            self.inner.as_mut().ok_or_else(not_connected)?.write(data)
        } else {
            self.buf.extend_from_slice(data);
            Ok(data.len())
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        self.flush_buf()?;
        self.inner.as_mut().ok_or_else(not_connected)?.flush()
    }
}

impl<W> fmt::Debug for BufWriter<W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BufWriter")
            .field("attached", &self.inner.is_some())
            .field("buffered", &self.buffered())
            .field("capacity", &self.capacity)
            .finish()
    }
}


/// A paired reader and writer over the same stream.
#[derive(Debug)]
pub struct ReadWriter<S> {
    reader: BufReader<S>,
    writer: BufWriter<S>,
}

impl<S> ReadWriter<S> {
    pub fn new(reader: BufReader<S>, writer: BufWriter<S>) -> Self {
        ReadWriter { reader, writer }
    }

    pub fn into_parts(self) -> (BufReader<S>, BufWriter<S>) {
        (self.reader, self.writer)
    }

    pub fn reader(&self) -> &BufReader<S> {
        &self.reader
    }

    pub fn reader_mut(&mut self) -> &mut BufReader<S> {
        &mut self.reader
    }

    pub fn writer(&self) -> &BufWriter<S> {
        &self.writer
    }

    pub fn writer_mut(&mut self) -> &mut BufWriter<S> {
        &mut self.writer
    }
}

impl<S: Read> ReadWriter<S> {
    pub fn peek(&mut self, n: usize) -> io::Result<&[u8]> {
        self.reader.peek(n)
    }
}

impl<S: Read> Read for ReadWriter<S> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.reader.read(buf)
    }
}

impl<S: Read> BufRead for ReadWriter<S> {
    fn fill_buf(&mut self) -> io::Result<&[u8]> {
        self.reader.fill_buf()
    }

    fn consume(&mut self, amt: usize) {
        self.reader.consume(amt)
    }
}

impl<S: Write> Write for ReadWriter<S> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.writer.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }
}
