use std::io::{self, BufRead, Read};
use std::net::{IpAddr, SocketAddr};

use crate::buffer::BufReader;
use crate::error::{HeaderError, Result};


/// Literal every PROXY v1 header starts with
const PREFIX: &[u8] = b"PROXY ";

/// Longest legal PROXY v1 header line, CRLF included
pub const MAX_HEADER_LEN: usize = 107;


/// Address family named in the header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Family {
    Tcp4,
    Tcp6,
}


/// The original client and destination, as reported by the load balancer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProxiedAddrs {
    pub family: Family,
    pub source: SocketAddr,
    pub destination: SocketAddr,
}


/// Parse one header line with the trailing CRLF already removed:
/// `PROXY <TCP4|TCP6> <src-ip> <dst-ip> <src-port> <dst-port>`
pub fn parse_header_line(line: &str) -> ::std::result::Result<ProxiedAddrs, HeaderError> {
    let parts: Vec<&str> = line.split(' ').collect();
    if parts.len() != 6 || parts[0] != "PROXY" {
        return Err(HeaderError::FieldCount(line.to_string()));
    }

    let family = match parts[1] {
        "TCP4" => Family::Tcp4,
        "TCP6" => Family::Tcp6,
        other => return Err(HeaderError::UnknownFamily(other.to_string())),
    };

    let source_ip: IpAddr = parts[2].parse().map_err(|_| HeaderError::SourceIp(parts[2].to_string()))?;
    let source_port: u16 = parts[4].parse().map_err(|_| HeaderError::SourcePort(parts[4].to_string()))?;
    let dest_ip: IpAddr = parts[3].parse().map_err(|_| HeaderError::DestinationIp(parts[3].to_string()))?;
    let dest_port: u16 = parts[5].parse().map_err(|_| HeaderError::DestinationPort(parts[5].to_string()))?;

    Ok(ProxiedAddrs {
        family,
        source: SocketAddr::new(source_ip, source_port),
        destination: SocketAddr::new(dest_ip, dest_port),
    })
}


/// Look for a PROXY v1 header at the front of `r`.
///
/// The prefix is peeked one byte at a time, so input from a client that
/// never sent a header is left untouched and `Ok(None)` is returned. Once
/// the whole prefix matches, the header line is consumed.
pub(crate) fn read_preamble<R: Read>(r: &mut BufReader<R>) -> Result<Option<ProxiedAddrs>> {
    for i in 1..=PREFIX.len() {
        if r.peek(i)? != &PREFIX[..i] {
            return Ok(None);
        }
    }

    let mut line = Vec::with_capacity(MAX_HEADER_LEN);
    r.by_ref().take(MAX_HEADER_LEN as u64).read_until(b'\n', &mut line)?;
    if line.last() != Some(&b'\n') {
        if line.len() >= MAX_HEADER_LEN {
            return Err(HeaderError::TooLong(MAX_HEADER_LEN).into());
        }
        return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "stream ended inside PROXY header").into());
    }

    let line = String::from_utf8(line).map_err(|_| HeaderError::NotUtf8)?;
    let header = match line.strip_suffix("\r\n") {
        Some(header) => header,
        None => return Err(HeaderError::MissingCrlf(line.trim_end().to_string()).into()),
    };
    Ok(Some(parse_header_line(header)?))
}
