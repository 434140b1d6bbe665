use std::error::Error as StdError;
use std::io;

use thiserror::Error;


/// Boxed error returned by accept hooks.
pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;


/// Everything `accept()` can fail with
#[derive(Debug, Error)]
pub enum Error {
    /// Transport failure (accept, read, write, deadline). Passed through untouched.
    #[error(transparent)]
    Io(#[from] io::Error),
    /// The PROXY preamble was present but could not be decoded; the connection was closed
    #[error("malformed PROXY header: {0}")]
    Header(#[from] HeaderError),
    /// The accept hook refused the connection; the connection was closed
    #[error("{0}")]
    Rejected(BoxError),
}

impl Error {
    pub fn is_transport(&self) -> bool {
        match *self {
            Error::Io(_) => true,
            _ => false,
        }
    }

    pub fn is_malformed(&self) -> bool {
        match *self {
            Error::Header(_) => true,
            _ => false,
        }
    }
}


/// Ways a PROXY v1 header line can be malformed
#[derive(Debug, Error, PartialEq, Eq)]
pub enum HeaderError {
    #[error("invalid header line: {0}")]
    FieldCount(String),
    #[error("unhandled address type: {0}")]
    UnknownFamily(String),
    #[error("invalid source ip: {0}")]
    SourceIp(String),
    #[error("invalid source port: {0}")]
    SourcePort(String),
    #[error("invalid destination ip: {0}")]
    DestinationIp(String),
    #[error("invalid destination port: {0}")]
    DestinationPort(String),
    #[error("header line not terminated by CRLF: {0:?}")]
    MissingCrlf(String),
    #[error("header line exceeds {0} bytes")]
    TooLong(usize),
    #[error("header line is not valid UTF-8")]
    NotUtf8,
}


pub type Result<T> = ::std::result::Result<T, Error>;


pub(crate) fn not_connected() -> io::Error {
    io::Error::new(io::ErrorKind::NotConnected, "connection is closed")
}


#[cfg(test)]
mod tests {
    use super::{Error, HeaderError};
    use std::io;

    #[test]
    fn test_classification() {
        let io_err = Error::from(io::Error::new(io::ErrorKind::TimedOut, "deadline"));
        assert!(io_err.is_transport());
        assert!(!io_err.is_malformed());

        let header_err = Error::from(HeaderError::UnknownFamily("UDP4".to_string()));
        assert!(header_err.is_malformed());
        assert!(!header_err.is_transport());

        let rejected = Error::Rejected("nope".into());
        assert!(!rejected.is_transport());
        assert!(!rejected.is_malformed());
    }

    #[test]
    fn test_messages_name_the_offending_text() {
        let err = Error::from(HeaderError::FieldCount("PROXY TCP4 1.1.1.1".to_string()));
        assert_eq!(err.to_string(), "malformed PROXY header: invalid header line: PROXY TCP4 1.1.1.1");

        let rejected = Error::Rejected("banned peer".into());
        assert_eq!(rejected.to_string(), "banned peer");
    }
}
