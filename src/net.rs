use std::io::{self, Read, Write};
use std::net::{Shutdown, SocketAddr};
use std::time::Duration;

use crate::buffer::{ReadWriter, SharedStream};
use crate::error::Result;


/// What every connection handed out by this crate can do, proxied or not.
pub trait Connection: Read + Write + Send {
    /// Address of the client. For proxied connections, the client the load balancer forwarded.
    fn remote_addr(&self) -> io::Result<SocketAddr>;

    /// Address of our end of the socket
    fn local_addr(&self) -> io::Result<SocketAddr>;

    /// The buffered view, for peeking and explicit flushes
    fn read_writer(&mut self) -> io::Result<&mut ReadWriter<SharedStream>>;

    fn set_read_timeout(&self, dur: Option<Duration>) -> io::Result<()>;

    fn set_write_timeout(&self, dur: Option<Duration>) -> io::Result<()>;

    /// Flush (unless only the read half is shut) and shut down the socket
    /// without giving up the buffers
    fn shutdown(&mut self, how: Shutdown) -> io::Result<()>;

    /// Flush, return the buffers to the pool and close the socket.
    /// Calling it again does nothing.
    fn close(&mut self) -> io::Result<()>;

    fn is_closed(&self) -> bool;
}


/// A source of connections
pub trait Listener {
    type Conn: Connection;

    /// Block until the next connection is accepted and ready for the application
    fn accept(&self) -> Result<Self::Conn>;

    fn local_addr(&self) -> io::Result<SocketAddr>;

    /// Accept forever. A failed accept is yielded and the loop carries on.
    fn incoming(&self) -> Incoming<'_, Self> where Self: Sized {
        Incoming { listener: self }
    }
}


/// Iterator returned by `Listener::incoming`; never yields `None`.
#[derive(Debug)]
pub struct Incoming<'a, L: 'a> {
    listener: &'a L,
}

impl<'a, L: Listener> Iterator for Incoming<'a, L> {
    type Item = Result<L::Conn>;

    fn next(&mut self) -> Option<Self::Item> {
        Some(self.listener.accept())
    }
}


#[cfg(feature = "hyper")]
mod hyper_net {
    use std::io;
    use std::net::{Shutdown, SocketAddr};
    use std::time::Duration;

    use hyper::net::NetworkStream;

    use super::Connection;
    use crate::buffered_stream::BufferedStream;
    use crate::proxy_stream::ProxyStream;

    impl NetworkStream for BufferedStream {
        fn peer_addr(&mut self) -> io::Result<SocketAddr> {
            Connection::remote_addr(self)
        }

        fn set_read_timeout(&self, dur: Option<Duration>) -> io::Result<()> {
            Connection::set_read_timeout(self, dur)
        }

        fn set_write_timeout(&self, dur: Option<Duration>) -> io::Result<()> {
            Connection::set_write_timeout(self, dur)
        }

        fn close(&mut self, how: Shutdown) -> io::Result<()> {
            Connection::shutdown(self, how)
        }
    }

    impl NetworkStream for ProxyStream {
        fn peer_addr(&mut self) -> io::Result<SocketAddr> {
            Connection::remote_addr(self)
        }

        fn set_read_timeout(&self, dur: Option<Duration>) -> io::Result<()> {
            Connection::set_read_timeout(self, dur)
        }

        fn set_write_timeout(&self, dur: Option<Duration>) -> io::Result<()> {
            Connection::set_write_timeout(self, dur)
        }

        fn close(&mut self, how: Shutdown) -> io::Result<()> {
            Connection::shutdown(self, how)
        }
    }

}
