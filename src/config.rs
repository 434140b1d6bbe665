use std::fmt;
use std::io;
use std::net::{TcpListener, ToSocketAddrs};
use std::sync::Arc;

use serde::Deserialize;

use crate::buffered_listener::{AcceptHook, BufferedListener};
use crate::buffered_stream::BufferedStream;
use crate::error::BoxError;
use crate::logger::{DebugLog, LogFacade};
use crate::pool::{BufferPool, DEFAULT_BUFFER_SIZE};
use crate::proxy_listener::ProxyListener;


/// Serializable listener settings, suitable for embedding in a host's config file
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ListenerConfig {
    /// Size in bytes of every pooled read buffer and write buffer
    pub buffer_size: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        ListenerConfig {
            buffer_size: DEFAULT_BUFFER_SIZE,
        }
    }
}


/// Assembles a listener. Everything is fixed once `build` is called; buffers
/// already handed out keep the size they were minted with.
pub struct ListenerBuilder {
    config: ListenerConfig,
    hook: Option<AcceptHook>,
    log: Arc<dyn DebugLog>,
}

impl ListenerBuilder {
    pub fn new() -> Self {
        Self::from_config(ListenerConfig::default())
    }

    pub fn from_config(config: ListenerConfig) -> Self {
        ListenerBuilder {
            config,
            hook: None,
            log: Arc::new(LogFacade),
        }
    }

    pub fn buffer_size(mut self, size: usize) -> Self {
        self.config.buffer_size = size;
        self
    }

    /// Run `hook` on every freshly wrapped connection before `accept` returns it.
    /// An `Err` closes the connection and becomes the accept error.
    pub fn on_accept<F>(mut self, hook: F) -> Self
        where F: Fn(&mut BufferedStream) -> Result<(), BoxError> + Send + Sync + 'static
    {
        self.hook = Some(Arc::new(hook));
        self
    }

    pub fn logger<L: DebugLog + 'static>(mut self, log: L) -> Self {
        self.log = Arc::new(log);
        self
    }

    pub fn build(self, listener: TcpListener) -> BufferedListener {
        let pool = Arc::new(BufferPool::new(self.config.buffer_size));
        BufferedListener::from_parts(listener, pool, self.hook, self.log)
    }

    pub fn build_proxy(self, listener: TcpListener) -> ProxyListener {
        ProxyListener::new(self.build(listener))
    }

    pub fn bind<A: ToSocketAddrs>(self, addr: A) -> io::Result<BufferedListener> {
        Ok(self.build(TcpListener::bind(addr)?))
    }

    pub fn bind_proxy<A: ToSocketAddrs>(self, addr: A) -> io::Result<ProxyListener> {
        Ok(self.build_proxy(TcpListener::bind(addr)?))
    }
}

impl Default for ListenerBuilder {
    fn default() -> Self {
        ListenerBuilder::new()
    }
}

impl fmt::Debug for ListenerBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerBuilder")
            .field("config", &self.config)
            .field("hook", &self.hook.is_some())
            .finish()
    }
}
