use std::io::{self, Read, Write};
use std::net::{Shutdown, SocketAddr};
use std::time::Duration;

use crate::buffer::{ReadWriter, SharedStream};
use crate::buffered_stream::BufferedStream;
use crate::error::{not_connected, Error, Result};
use crate::net::Connection;
use crate::proxy_protocol::{read_preamble, ProxiedAddrs};


#[derive(Debug)]
/// Wrapper for a `BufferedStream` which we may have already read the PROXY header off of
pub struct ProxyStream {
    inner: BufferedStream,
    proxied: Option<ProxiedAddrs>,
}

impl ProxyStream {
    /// Decode an optional PROXY header from the front of `stream`. On error the
    /// stream has been closed and its buffers returned.
    pub(crate) fn from_stream(mut stream: BufferedStream) -> Result<Self> {
        let result = stream.read_writer()
            .map_err(Error::from)
            .and_then(|rw| read_preamble(rw.reader_mut()));
        match result {
            Ok(proxied) => {
                if let Some(ref p) = proxied {
                    debugf!(stream.log(), "proxied connection from {} to {}", p.source, p.destination);
                }
                Ok(ProxyStream { inner: stream, proxied })
            }
            Err(e) => {
                debugf!(stream.log(), "dropping connection with bad PROXY header: {}", e);
                let _ = stream.close();
                Err(e)
            }
        }
    }

    /// Addresses from the PROXY header, if the client sent one
    pub fn proxied(&self) -> Option<&ProxiedAddrs> {
        self.proxied.as_ref()
    }

    /// The client's address: the proxied source if there was a header, else the socket peer
    pub fn remote_addr(&self) -> io::Result<SocketAddr> {
        match self.proxied {
            Some(ref p) if !self.inner.is_closed() => Ok(p.source),
            Some(_) => Err(not_connected()),
            None => self.inner.remote_addr(),
        }
    }

    /// The address the client dialed: the proxied destination if there was a
    /// header, else our end of the socket
    pub fn proxy_local_addr(&self) -> io::Result<SocketAddr> {
        match self.proxied {
            Some(ref p) if !self.inner.is_closed() => Ok(p.destination),
            Some(_) => Err(not_connected()),
            None => self.inner.local_addr(),
        }
    }

    /// Our end of the socket, regardless of any header
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.inner.local_addr()
    }

    pub fn read_writer(&mut self) -> io::Result<&mut ReadWriter<SharedStream>> {
        self.inner.read_writer()
    }

    pub fn get_ref(&self) -> &BufferedStream {
        &self.inner
    }

    pub fn get_mut(&mut self) -> &mut BufferedStream {
        &mut self.inner
    }

    pub fn set_read_timeout(&self, dur: Option<Duration>) -> io::Result<()> {
        self.inner.set_read_timeout(dur)
    }

    pub fn set_write_timeout(&self, dur: Option<Duration>) -> io::Result<()> {
        self.inner.set_write_timeout(dur)
    }

    pub fn shutdown(&mut self, how: Shutdown) -> io::Result<()> {
        self.inner.shutdown(how)
    }

    pub fn close(&mut self) -> io::Result<()> {
        self.inner.close()
    }

    pub fn is_closed(&self) -> bool {
        self.inner.is_closed()
    }
}

impl Read for ProxyStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read(buf)
    }
}

impl Write for ProxyStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.inner.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

impl Connection for ProxyStream {
    fn remote_addr(&self) -> io::Result<SocketAddr> {
        ProxyStream::remote_addr(self)
    }

    fn local_addr(&self) -> io::Result<SocketAddr> {
        ProxyStream::local_addr(self)
    }

    fn read_writer(&mut self) -> io::Result<&mut ReadWriter<SharedStream>> {
        ProxyStream::read_writer(self)
    }

    fn set_read_timeout(&self, dur: Option<Duration>) -> io::Result<()> {
        ProxyStream::set_read_timeout(self, dur)
    }

    fn set_write_timeout(&self, dur: Option<Duration>) -> io::Result<()> {
        ProxyStream::set_write_timeout(self, dur)
    }

    fn shutdown(&mut self, how: Shutdown) -> io::Result<()> {
        ProxyStream::shutdown(self, how)
    }

    fn close(&mut self) -> io::Result<()> {
        ProxyStream::close(self)
    }

    fn is_closed(&self) -> bool {
        ProxyStream::is_closed(self)
    }
}


#[cfg(test)]
mod tests {
    use super::ProxyStream;
    use crate::buffered_stream::BufferedStream;
    use crate::error::{Error, HeaderError};
    use crate::logger::NullLog;
    use crate::pool::BufferPool;
    use std::io::{ErrorKind, Read, Write};
    use std::net::{SocketAddr, TcpListener, TcpStream};
    use std::sync::Arc;

    fn connected(pool: &Arc<BufferPool>, preamble: &[u8]) -> (BufferedStream, TcpStream) {
        let listener = TcpListener::bind("127.0.0.1:0").expect("should be able to bind");
        let mut client = TcpStream::connect(listener.local_addr().unwrap()).expect("should connect");
        client.write_all(preamble).expect("write must succeed");
        let (server, _) = listener.accept().expect("should accept");
        (BufferedStream::new(server, Arc::clone(pool), Arc::new(NullLog)), client)
    }

    #[test]
    fn test_proxied_addresses_win() {
        let pool = Arc::new(BufferPool::new(64));
        let (conn, _client) = connected(&pool, b"PROXY TCP4 10.1.1.1 20.2.2.2 1000 2000\r\nHELLO");
        let raw_local = conn.local_addr().unwrap();
        let mut conn = ProxyStream::from_stream(conn).expect("should parse");

        assert_eq!(conn.remote_addr().unwrap(), "10.1.1.1:1000".parse::<SocketAddr>().unwrap());
        assert_eq!(conn.proxy_local_addr().unwrap(), "20.2.2.2:2000".parse::<SocketAddr>().unwrap());
        assert_eq!(conn.local_addr().unwrap(), raw_local);

        let mut body = [0u8; 5];
        conn.read_exact(&mut body).expect("read should succeed");
        assert_eq!(&body, b"HELLO");
    }

    #[test]
    fn test_plain_connection_falls_back_to_socket() {
        let pool = Arc::new(BufferPool::new(64));
        let (conn, client) = connected(&pool, b"CONN TEST");
        let mut conn = ProxyStream::from_stream(conn).expect("no header is not an error");

        assert!(conn.proxied().is_none());
        assert_eq!(conn.remote_addr().unwrap(), client.local_addr().unwrap());
        assert_eq!(conn.proxy_local_addr().unwrap(), client.peer_addr().unwrap());

        let mut body = [0u8; 9];
        conn.read_exact(&mut body).expect("read should succeed");
        assert_eq!(&body, b"CONN TEST");
    }

    #[test]
    fn test_malformed_header_closes() {
        let pool = Arc::new(BufferPool::new(64));
        let (conn, mut client) = connected(&pool, b"PROXY UDP4 1.1.1.1 2.2.2.2 1 2\r\n");
        match ProxyStream::from_stream(conn) {
            Err(Error::Header(HeaderError::UnknownFamily(family))) => assert_eq!(family, "UDP4"),
            other => panic!("expected UnknownFamily, got {:?}", other),
        }

        let mut buf = [0u8; 1];
        assert_eq!(client.read(&mut buf).expect("EOF, not an error"), 0);
        let stats = pool.stats();
        assert_eq!((stats.idle_readers, stats.idle_writers), (1, 1));
    }

    #[test]
    fn test_addresses_unavailable_after_close() {
        let pool = Arc::new(BufferPool::new(64));
        let (conn, _client) = connected(&pool, b"PROXY TCP6 ::1 ::2 80 443\r\n");
        let mut conn = ProxyStream::from_stream(conn).expect("should parse");
        assert_eq!(conn.remote_addr().unwrap(), "[::1]:80".parse::<SocketAddr>().unwrap());

        conn.close().expect("close");
        assert_eq!(conn.remote_addr().unwrap_err().kind(), ErrorKind::NotConnected);
        assert_eq!(conn.proxy_local_addr().unwrap_err().kind(), ErrorKind::NotConnected);
        assert!(conn.proxied().is_some());
    }
}
