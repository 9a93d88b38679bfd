//! The LDAP ping transport: send the encoded `SearchRequest` over a
//! single UDP datagram or a single TCP round trip, port 389 always.
//!
//! Mirrors the DNS resolver's shape (`dns::resolver::WireResolver`): one
//! blocking call per ping, UDP first, no persistent connection state.
use std::io::{Read, Write};
use std::net::{SocketAddr, TcpStream, UdpSocket};
use std::time::Duration;

use crate::dns::request::TransportToken;
use crate::error::{Error, Result};

/// AD's LDAP ping always targets this port, on both transports.
pub const LDAP_PORT: u16 = 389;

/// Datagrams and single TCP reads are capped here; a real AD response
/// never exceeds this, so a longer read would only mean a malformed peer.
const MAX_RESPONSE_LEN: usize = 512;

/// Sends one already-encoded LDAP ping request and returns the raw
/// response bytes, or `None` if the peer gave no response within the
/// read timeout (UDP zero-length datagram, TCP connection closed).
pub struct PingTransport {
    connect_timeout: Option<Duration>,
    read_timeout: Option<Duration>,
}

impl PingTransport {
    /// No explicit timeouts; relies on OS defaults.
    pub fn new() -> Self {
        Self {
            connect_timeout: None,
            read_timeout: None,
        }
    }

    /// Bound the TCP `connect()` call (UDP has no connect phase).
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Bound the blocking receive/read call on either transport.
    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = Some(timeout);
        self
    }

    /// Send `request` to `addr` over `transport` and return the response
    /// bytes, or `None` on a clean "no response" signal.
    pub fn ping(
        &self,
        addr: SocketAddr,
        transport: TransportToken,
        request: &[u8],
    ) -> Result<Option<Vec<u8>>> {
        match transport {
            TransportToken::Udp => self.ping_udp(addr, request),
            TransportToken::Tcp => self.ping_tcp(addr, request),
        }
    }

    fn ping_udp(&self, addr: SocketAddr, request: &[u8]) -> Result<Option<Vec<u8>>> {
        let bind_addr: SocketAddr = if addr.is_ipv6() {
            "[::]:0".parse().unwrap()
        } else {
            "0.0.0.0:0".parse().unwrap()
        };
        let socket = UdpSocket::bind(bind_addr).map_err(|e| Error::communication(addr, e))?;
        socket
            .set_read_timeout(self.read_timeout)
            .map_err(|e| Error::communication(addr, e))?;
        socket
            .send_to(request, addr)
            .map_err(|e| Error::communication(addr, e))?;

        let mut buf = vec![0u8; MAX_RESPONSE_LEN];
        let n = match socket.recv(&mut buf) {
            Ok(n) => n,
            Err(e) if is_timeout(&e) => return Ok(None),
            Err(e) => return Err(Error::communication(addr, e)),
        };
        if n == 0 {
            return Ok(None);
        }
        buf.truncate(n);
        Ok(Some(buf))
    }

    fn ping_tcp(&self, addr: SocketAddr, request: &[u8]) -> Result<Option<Vec<u8>>> {
        let mut stream = match self.connect_timeout {
            Some(t) => TcpStream::connect_timeout(&addr, t),
            None => TcpStream::connect(addr),
        }
        .map_err(|e| Error::communication(addr, e))?;
        stream
            .set_read_timeout(self.read_timeout)
            .map_err(|e| Error::communication(addr, e))?;
        stream
            .write_all(request)
            .map_err(|e| Error::communication(addr, e))?;

        let mut buf = vec![0u8; MAX_RESPONSE_LEN];
        let n = match stream.read(&mut buf) {
            Ok(n) => n,
            Err(e) if is_timeout(&e) => return Ok(None),
            Err(e) => return Err(Error::communication(addr, e)),
        };
        if n == 0 {
            return Ok(None);
        }
        buf.truncate(n);
        Ok(Some(buf))
    }
}

impl Default for PingTransport {
    fn default() -> Self {
        Self::new()
    }
}

fn is_timeout(e: &std::io::Error) -> bool {
    matches!(
        e.kind(),
        std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut
    )
}
