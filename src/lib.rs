//! TCP listeners whose connections come with pooled, reusable buffers, and
//! optionally with the PROXY protocol (v1, text) header stripped and decoded.
//!
//! ```no_run
//! use std::io::Read;
//! use buffered_proxy_listener::{Listener, ProxyListener};
//!
//! let listener = ProxyListener::bind("0.0.0.0:2020").unwrap();
//! for conn in listener.incoming() {
//!     let mut conn = match conn {
//!         Ok(conn) => conn,
//!         Err(_) => continue,
//!     };
//!     std::thread::spawn(move || {
//!         let client = conn.remote_addr();
//!         let mut first = [0u8; 16];
//!         let _ = conn.read(&mut first);
//!         println!("{:?} sent {:?}", client, first);
//!     });
//! }
//! ```

#[macro_use]
mod logger;

mod buffer;
mod buffered_listener;
mod buffered_stream;
mod config;
mod error;
mod net;
mod pool;
mod proxy_listener;
mod proxy_protocol;
mod proxy_stream;

pub use buffer::{BufReader, BufWriter, ReadWriter, SharedStream};
pub use buffered_listener::{AcceptHook, BufferedListener};
pub use buffered_stream::BufferedStream;
pub use config::{ListenerBuilder, ListenerConfig};
pub use error::{BoxError, Error, HeaderError, Result};
pub use logger::{DebugLog, LogFacade, NullLog};
pub use net::{Connection, Incoming, Listener};
pub use pool::{BufferPool, PoolStats, DEFAULT_BUFFER_SIZE, MIN_BUFFER_SIZE};
pub use proxy_listener::ProxyListener;
pub use proxy_protocol::{parse_header_line, Family, ProxiedAddrs, MAX_HEADER_LEN};
pub use proxy_stream::ProxyStream;
