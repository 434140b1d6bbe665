use std::io;
use std::net::{SocketAddr, TcpListener, ToSocketAddrs};
use std::sync::Arc;

use crate::buffered_listener::BufferedListener;
use crate::error::Result;
use crate::net::Listener;
use crate::pool::BufferPool;
use crate::proxy_stream::ProxyStream;


#[derive(Debug)]
/// A `Listener` which reads an optional PROXY v1 header off every connection
/// accepted by the contained `BufferedListener`
pub struct ProxyListener {
    inner: BufferedListener,
}

impl ProxyListener {
    /// Construct a new `ProxyListener` from an already-constructed `BufferedListener`
    pub fn new(listener: BufferedListener) -> Self {
        ProxyListener { inner: listener }
    }

    /// Wrap an already-bound socket with the default configuration
    pub fn from_tcp(listener: TcpListener) -> Self {
        ProxyListener::new(BufferedListener::new(listener))
    }

    pub fn bind<A: ToSocketAddrs>(addr: A) -> io::Result<Self> {
        Ok(ProxyListener::new(BufferedListener::bind(addr)?))
    }

    pub fn pool(&self) -> &Arc<BufferPool> {
        self.inner.pool()
    }

    pub fn get_ref(&self) -> &BufferedListener {
        &self.inner
    }
}

impl Listener for ProxyListener {
    type Conn = ProxyStream;

    /// Accept a single connection and strip its PROXY header, if any. A
    /// malformed header closes that connection and returns the error; the
    /// listener itself is unaffected.
    fn accept(&self) -> Result<ProxyStream> {
        let stream = self.inner.accept()?;
        ProxyStream::from_stream(stream)
    }

    /// Find out the local address we are bound to
    fn local_addr(&self) -> io::Result<SocketAddr> {
        self.inner.local_addr()
    }
}


#[cfg(unix)]
impl ::std::os::unix::io::AsRawFd for ProxyListener {
    fn as_raw_fd(&self) -> ::std::os::unix::io::RawFd {
        self.inner.as_raw_fd()
    }
}
