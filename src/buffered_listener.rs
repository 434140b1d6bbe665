use std::fmt;
use std::io;
use std::net::{SocketAddr, TcpListener, ToSocketAddrs};
use std::sync::Arc;

use crate::buffered_stream::BufferedStream;
use crate::config::ListenerBuilder;
use crate::error::{BoxError, Error, Result};
use crate::logger::DebugLog;
use crate::net::Listener;
use crate::pool::BufferPool;


/// Called with each freshly wrapped connection before the application sees it
pub type AcceptHook = Arc<dyn Fn(&mut BufferedStream) -> ::std::result::Result<(), BoxError> + Send + Sync>;


/// A `TcpListener` whose accepted connections come wrapped in pooled buffers
pub struct BufferedListener {
    inner: TcpListener,
    pool: Arc<BufferPool>,
    hook: Option<AcceptHook>,
    log: Arc<dyn DebugLog>,
}

impl BufferedListener {
    /// Wrap an already-bound listener with the default configuration
    pub fn new(listener: TcpListener) -> Self {
        ListenerBuilder::new().build(listener)
    }

    pub fn bind<A: ToSocketAddrs>(addr: A) -> io::Result<Self> {
        ListenerBuilder::new().bind(addr)
    }

    pub(crate) fn from_parts(
        inner: TcpListener,
        pool: Arc<BufferPool>,
        hook: Option<AcceptHook>,
        log: Arc<dyn DebugLog>,
    ) -> Self {
        BufferedListener { inner, pool, hook, log }
    }

    /// The pool backing every connection this listener hands out
    pub fn pool(&self) -> &Arc<BufferPool> {
        &self.pool
    }

    pub fn get_ref(&self) -> &TcpListener {
        &self.inner
    }
}

impl Listener for BufferedListener {
    type Conn = BufferedStream;

    /// Accept a single connection. Errors from the socket pass through as
    /// they are; a hook rejection closes the connection and returns the
    /// hook's error.
    fn accept(&self) -> Result<BufferedStream> {
        let (stream, peer) = self.inner.accept()?;
        debugf!(self.log, "accepted {}", peer);
        let mut conn = BufferedStream::new(stream, Arc::clone(&self.pool), Arc::clone(&self.log));
        if let Some(ref hook) = self.hook {
            if let Err(e) = hook(&mut conn) {
                debugf!(self.log, "accept hook rejected {}: {}", peer, e);
                let _ = conn.close();
                return Err(Error::Rejected(e));
            }
        }
        Ok(conn)
    }

    fn local_addr(&self) -> io::Result<SocketAddr> {
        self.inner.local_addr()
    }
}

impl fmt::Debug for BufferedListener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BufferedListener")
            .field("inner", &self.inner)
            .field("pool", &self.pool.stats())
            .field("hook", &self.hook.is_some())
            .finish()
    }
}


#[cfg(unix)]
impl ::std::os::unix::io::AsRawFd for BufferedListener {
    fn as_raw_fd(&self) -> ::std::os::unix::io::RawFd {
        self.inner.as_raw_fd()
    }
}


#[cfg(test)]
mod tests {
    use super::BufferedListener;
    use crate::config::ListenerBuilder;
    use crate::error::Error;
    use crate::logger::tests::Recorder;
    use crate::net::Listener;
    use std::io::{Read, Write};
    use std::net::{SocketAddr, TcpStream};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Barrier, Mutex};
    use std::thread;

    #[test]
    fn test_basic() {
        let listener = BufferedListener::bind("127.0.0.1:0").expect("should be able to bind");
        let addr = listener.local_addr().expect("should be able to find local addr");
        let client_addr: Arc<Mutex<Option<SocketAddr>>> = Arc::new(Mutex::new(None));
        let connected = Arc::new(Barrier::new(2));

        let handle = {
            let client_addr = Arc::clone(&client_addr);
            let connected = Arc::clone(&connected);
            thread::spawn(move || {
                let mut conn = TcpStream::connect(addr).expect("should be able to connect");
                *client_addr.lock().unwrap() = Some(conn.local_addr().unwrap());
                connected.wait();
                conn.write_all(b"CONN TEST").expect("write must succeed");
                let mut reply = String::new();
                conn.read_to_string(&mut reply).expect("reply read should succeed");
                reply
            })
        };

        let mut conn = listener.accept().expect("should be able to accept a connection");
        connected.wait();
        let expected_peer = (*client_addr.lock().unwrap()).expect("should be some");
        assert_eq!(conn.remote_addr().expect("remote addr"), expected_peer);
        assert_eq!(conn.local_addr().expect("local addr"), addr);

        let mut body = [0u8; 9];
        conn.read_writer().unwrap().read_exact(&mut body).expect("body read should succeed");
        assert_eq!(&body, b"CONN TEST");
        conn.write_all(b"OK").expect("write must succeed");
        conn.close().expect("close should flush");

        assert_eq!(handle.join().expect("must be able to join thread"), "OK");
    }

    #[test]
    fn test_sequential_connections_recycle_buffers() {
        let listener = ListenerBuilder::new().buffer_size(128).bind("127.0.0.1:0").expect("should be able to bind");
        let addr = listener.local_addr().unwrap();

        for _ in 0..20 {
            let _client = TcpStream::connect(addr).expect("should connect");
            let mut conn = listener.accept().expect("should accept");
            conn.close().expect("close");
        }

        let stats = listener.pool().stats();
        assert_eq!((stats.allocated_readers, stats.allocated_writers), (1, 1));
        assert_eq!((stats.idle_readers, stats.idle_writers), (1, 1));
    }

    #[test]
    fn test_rejecting_hook() {
        let listener = ListenerBuilder::new()
            .on_accept(|_conn| Err("not today".into()))
            .bind("127.0.0.1:0")
            .expect("should be able to bind");
        let addr = listener.local_addr().unwrap();

        for _ in 0..3 {
            let mut client = TcpStream::connect(addr).expect("should connect");
            match listener.accept() {
                Err(Error::Rejected(e)) => assert_eq!(e.to_string(), "not today"),
                other => panic!("expected a rejection, got {:?}", other),
            }
            // the server side is gone
            let mut buf = [0u8; 1];
            assert_eq!(client.read(&mut buf).expect("EOF, not an error"), 0);
        }

        let stats = listener.pool().stats();
        assert_eq!((stats.idle_readers, stats.idle_writers), (1, 1));
    }

    #[test]
    fn test_hook_sees_connection_and_listener_recovers() {
        let calls = Arc::new(AtomicUsize::new(0));
        let rec = Arc::new(Recorder::default());
        let listener = {
            let calls = Arc::clone(&calls);
            ListenerBuilder::new()
                .on_accept(move |conn| {
                    assert!(conn.remote_addr().is_ok());
                    if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                        Err("first one is refused".into())
                    } else {
                        Ok(())
                    }
                })
                .logger(Arc::clone(&rec))
                .bind("127.0.0.1:0")
                .expect("should be able to bind")
        };
        let addr = listener.local_addr().unwrap();

        let _first = TcpStream::connect(addr).expect("should connect");
        assert!(listener.accept().is_err());
        let _second = TcpStream::connect(addr).expect("should connect");
        let conn = listener.accept().expect("second accept should succeed");
        assert!(!conn.is_closed());
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        let lines = rec.lines.lock().unwrap();
        assert!(lines.iter().any(|l| l.starts_with("accept hook rejected") && l.ends_with("first one is refused")));
        assert_eq!(lines.iter().filter(|l| l.starts_with("accepted ")).count(), 2);
    }

    #[test]
    fn test_incoming_yields_connections() {
        let listener = BufferedListener::bind("127.0.0.1:0").expect("should be able to bind");
        let addr = listener.local_addr().unwrap();
        let _a = TcpStream::connect(addr).expect("should connect");
        let _b = TcpStream::connect(addr).expect("should connect");

        let conns: Vec<_> = listener.incoming().take(2).collect();
        assert_eq!(conns.len(), 2);
        assert!(conns.iter().all(|c| c.is_ok()));
    }
}
