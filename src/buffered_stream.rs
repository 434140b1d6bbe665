use std::fmt;
use std::io::{self, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpStream};
use std::sync::Arc;
use std::time::Duration;

use crate::buffer::{ReadWriter, SharedStream};
use crate::error::not_connected;
use crate::logger::DebugLog;
use crate::net::Connection;
use crate::pool::BufferPool;


/// An accepted socket with a pooled read buffer and write buffer in front of it.
///
/// All reads and writes go through the buffers, never the raw socket, so
/// bytes already pulled in by a peek are never skipped. Closing (or
/// dropping) flushes, hands both buffers back to the pool and closes the
/// socket; it only happens once.
pub struct BufferedStream {
    stream: Option<SharedStream>,
    rw: Option<ReadWriter<SharedStream>>,
    pool: Arc<BufferPool>,
    log: Arc<dyn DebugLog>,
}

impl BufferedStream {
    pub(crate) fn new(stream: TcpStream, pool: Arc<BufferPool>, log: Arc<dyn DebugLog>) -> Self {
        let stream = SharedStream::new(stream);
        let reader = pool.acquire_reader(stream.share());
        let writer = pool.acquire_writer(stream.share());
        BufferedStream {
            rw: Some(ReadWriter::new(reader, writer)),
            stream: Some(stream),
            pool,
            log,
        }
    }

    fn stream(&self) -> io::Result<&SharedStream> {
        self.stream.as_ref().ok_or_else(not_connected)
    }

    pub(crate) fn log(&self) -> &Arc<dyn DebugLog> {
        &self.log
    }

    pub fn read_writer(&mut self) -> io::Result<&mut ReadWriter<SharedStream>> {
        self.rw.as_mut().ok_or_else(not_connected)
    }

    pub fn remote_addr(&self) -> io::Result<SocketAddr> {
        self.stream()?.peer_addr()
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.stream()?.local_addr()
    }

    pub fn set_read_timeout(&self, dur: Option<Duration>) -> io::Result<()> {
        self.stream()?.set_read_timeout(dur)
    }

    pub fn set_write_timeout(&self, dur: Option<Duration>) -> io::Result<()> {
        self.stream()?.set_write_timeout(dur)
    }

    pub fn shutdown(&mut self, how: Shutdown) -> io::Result<()> {
        if how != Shutdown::Read {
            self.read_writer()?.flush()?;
        }
        self.stream()?.shutdown(how)
    }

    pub fn is_closed(&self) -> bool {
        self.stream.is_none()
    }

    fn final_flush(&mut self) -> io::Result<()> {
        match self.rw.take() {
            Some(mut rw) => {
                let flushed = rw.flush();
                let (reader, writer) = rw.into_parts();
                self.pool.release_reader(reader);
                self.pool.release_writer(writer);
                flushed
            }
            None => Ok(()),
        }
    }

    /// Returns the error from the final flush, if any; the buffers and the
    /// socket are released regardless.
    pub fn close(&mut self) -> io::Result<()> {
        if let Some(ref stream) = self.stream {
            match stream.peer_addr() {
                Ok(addr) => debugf!(self.log, "closing {}", addr),
                Err(_) => debugf!(self.log, "closing connection"),
            }
        }
        let flushed = self.final_flush();
        // the pool detached the reader and writer, so this is the last handle
        drop(self.stream.take());
        flushed
    }
}

impl Read for BufferedStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.read_writer()?.read(buf)
    }
}

impl Write for BufferedStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.read_writer()?.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.read_writer()?.flush()
    }
}

impl Drop for BufferedStream {
    fn drop(&mut self) {
        let _ = self.close();
    }
}

impl Connection for BufferedStream {
    fn remote_addr(&self) -> io::Result<SocketAddr> {
        BufferedStream::remote_addr(self)
    }

    fn local_addr(&self) -> io::Result<SocketAddr> {
        BufferedStream::local_addr(self)
    }

    fn read_writer(&mut self) -> io::Result<&mut ReadWriter<SharedStream>> {
        BufferedStream::read_writer(self)
    }

    fn set_read_timeout(&self, dur: Option<Duration>) -> io::Result<()> {
        BufferedStream::set_read_timeout(self, dur)
    }

    fn set_write_timeout(&self, dur: Option<Duration>) -> io::Result<()> {
        BufferedStream::set_write_timeout(self, dur)
    }

    fn shutdown(&mut self, how: Shutdown) -> io::Result<()> {
        BufferedStream::shutdown(self, how)
    }

    fn close(&mut self) -> io::Result<()> {
        BufferedStream::close(self)
    }

    fn is_closed(&self) -> bool {
        BufferedStream::is_closed(self)
    }
}

impl fmt::Debug for BufferedStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BufferedStream")
            .field("remote_addr", &self.remote_addr().ok())
            .field("rw", &self.rw)
            .finish()
    }
}
