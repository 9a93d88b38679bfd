//! The live DNS lookup: builds the SRV query name, resolves it over a
//! hand-rolled synchronous UDP/TCP DNS client, and applies RFC 2782
//! selection.
//!
//! This stays consistent with the rest of the locator: no async runtime,
//! one blocking call per lookup, using the same transport shape as the
//! LDAP ping (`UDP`, fall back to `TCP` on truncation).
use std::fs;
use std::io::{Read, Write};
use std::net::{SocketAddr, TcpStream, ToSocketAddrs, UdpSocket};
use std::time::Duration;

use hickory_proto::op::{Message, MessageType, OpCode, Query, ResponseCode};
use hickory_proto::rr::{Name, RData, RecordType};
use hickory_proto::serialize::binary::{BinDecodable, BinEncodable};

use super::name::build_srv_name;
use super::request::DnsLocatorRequest;
use super::srv::{CandidateHost, SrvRecord, is_service_not_provided, select};
use crate::error::{Error, Result};

const DEFAULT_DNS_PORT: u16 = 53;

/// Abstraction over "something that can answer an SRV query", so the
/// concrete resolver is pluggable -- tests substitute a fixed-record
/// resolver instead of touching the network.
pub trait SrvResolver {
    /// Resolve `name` to its SRV records. A name with no SRV recordset
    /// at all returns `Err(Error::NameNotFound(_))`; the RFC 2782
    /// "service not provided" sentinel surfaces as `Ok(vec![])`.
    fn lookup_srv(&self, name: &str) -> Result<Vec<SrvRecord>>;
}

/// [`SrvResolver`] that speaks DNS directly over UDP, falling back to TCP
/// when the response is truncated.
pub struct WireResolver {
    nameserver: SocketAddr,
    connect_timeout: Option<Duration>,
    read_timeout: Option<Duration>,
}

impl WireResolver {
    /// Query a specific nameserver.
    pub fn new(nameserver: SocketAddr) -> Self {
        Self {
            nameserver,
            connect_timeout: None,
            read_timeout: None,
        }
    }

    /// Read the first `nameserver` line out of `/etc/resolv.conf`.
    pub fn from_system_conf() -> Result<Self> {
        let contents = fs::read_to_string("/etc/resolv.conf")
            .map_err(|e| Error::communication("/etc/resolv.conf", e))?;
        let addr = contents
            .lines()
            .map(str::trim)
            .find_map(|line| line.strip_prefix("nameserver"))
            .map(str::trim)
            .ok_or_else(|| Error::Configuration("no nameserver in /etc/resolv.conf".into()))?;
        let ip: std::net::IpAddr = addr
            .parse()
            .map_err(|_| Error::Configuration(format!("invalid nameserver address {addr:?}")))?;
        Ok(Self::new(SocketAddr::new(ip, DEFAULT_DNS_PORT)))
    }

    /// Bound the DNS client's read wait (becomes the socket's SO_TIMEOUT).
    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = Some(timeout);
        self
    }

    /// Bound the TCP connect (only used on a truncated UDP reply).
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    fn query_udp(&self, request: &[u8]) -> Result<Vec<u8>> {
        let socket = UdpSocket::bind(bind_addr_for(&self.nameserver))
            .map_err(|e| Error::communication(self.nameserver, e))?;
        socket
            .set_read_timeout(self.read_timeout)
            .map_err(|e| Error::communication(self.nameserver, e))?;
        socket
            .send_to(request, self.nameserver)
            .map_err(|e| Error::communication(self.nameserver, e))?;
        let mut buf = vec![0u8; 4096];
        let n = socket
            .recv(&mut buf)
            .map_err(|e| Error::communication(self.nameserver, e))?;
        buf.truncate(n);
        Ok(buf)
    }

    fn query_tcp(&self, request: &[u8]) -> Result<Vec<u8>> {
        let mut stream = match self.connect_timeout {
            Some(t) => TcpStream::connect_timeout(&self.nameserver, t),
            None => TcpStream::connect(self.nameserver),
        }
        .map_err(|e| Error::communication(self.nameserver, e))?;
        stream
            .set_read_timeout(self.read_timeout)
            .map_err(|e| Error::communication(self.nameserver, e))?;

        let len = u16::try_from(request.len())
            .map_err(|_| Error::Configuration("DNS query too large for TCP framing".into()))?;
        stream
            .write_all(&len.to_be_bytes())
            .and_then(|_| stream.write_all(request))
            .map_err(|e| Error::communication(self.nameserver, e))?;

        let mut len_buf = [0u8; 2];
        stream
            .read_exact(&mut len_buf)
            .map_err(|e| Error::communication(self.nameserver, e))?;
        let mut body = vec![0u8; u16::from_be_bytes(len_buf) as usize];
        stream
            .read_exact(&mut body)
            .map_err(|e| Error::communication(self.nameserver, e))?;
        Ok(body)
    }
}

impl SrvResolver for WireResolver {
    fn lookup_srv(&self, name: &str) -> Result<Vec<SrvRecord>> {
        let query = encode_srv_query(name)?;
        let mut response_bytes = self.query_udp(&query)?;
        let mut response = decode_message(&response_bytes)?;

        if response.header().truncated() {
            log::debug!("SRV response for {name} was truncated over UDP, retrying over TCP");
            response_bytes = self.query_tcp(&query)?;
            response = decode_message(&response_bytes)?;
        }

        match response.response_code() {
            ResponseCode::NoError => {}
            ResponseCode::NXDomain => return Err(Error::NameNotFound(name.to_owned())),
            other => {
                return Err(Error::communication(
                    self.nameserver,
                    std::io::Error::other(format!("DNS server returned {other}")),
                ));
            }
        }

        let records: Vec<SrvRecord> = response
            .answers()
            .iter()
            .filter_map(|rr| match rr.data() {
                RData::SRV(srv) => Some(SrvRecord {
                    priority: srv.priority(),
                    weight: srv.weight(),
                    port: srv.port(),
                    target: srv.target().to_string(),
                }),
                _ => None,
            })
            .collect();

        if records.is_empty() {
            return Err(Error::NameNotFound(name.to_owned()));
        }
        Ok(records)
    }
}

fn bind_addr_for(peer: &SocketAddr) -> SocketAddr {
    if peer.is_ipv6() {
        "[::]:0".parse().unwrap()
    } else {
        "0.0.0.0:0".parse().unwrap()
    }
}

fn encode_srv_query(name: &str) -> Result<Vec<u8>> {
    let qname = Name::from_ascii(name)
        .map_err(|e| Error::Configuration(format!("invalid SRV query name {name:?}: {e}")))?;

    let mut message = Message::new();
    message.set_id(rand::random());
    message.set_message_type(MessageType::Query);
    message.set_op_code(OpCode::Query);
    message.set_recursion_desired(true);
    message.add_query(Query::query(qname, RecordType::SRV));

    message
        .to_bytes()
        .map_err(|e| Error::communication("<encode>", e))
}

fn decode_message(bytes: &[u8]) -> Result<Message> {
    Message::from_bytes(bytes).map_err(|e| Error::communication("<decode>", e))
}

// also resolve plain hostnames (the ping transport needs this)
pub(crate) fn resolve_host_port(host: &str, port: u16) -> Result<SocketAddr> {
    (host, port)
        .to_socket_addrs()
        .map_err(|e| Error::communication(host, e))?
        .next()
        .ok_or_else(|| Error::NameNotFound(host.to_owned()))
}

/// Idempotent builder for a single SRV lookup + RFC 2782 selection.
///
/// Mirrors the locator's other builders: mutating after [`DnsLocatorBuilder::build`]
/// is a programmer error and rejected rather than silently ignored.
#[derive(Default)]
pub struct DnsLocatorBuilder {
    read_timeout: Option<Duration>,
    connect_timeout: Option<Duration>,
    built: bool,
}

impl DnsLocatorBuilder {
    /// Start a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a read timeout to the underlying DNS call.
    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = Some(timeout);
        self
    }

    /// Bound the TCP connect used when a UDP reply comes back truncated.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Finalize, constructing the default resolver from `/etc/resolv.conf`.
    pub fn build(mut self) -> Result<DnsLocator<WireResolver>> {
        if self.built {
            return Err(Error::Configuration(
                "DnsLocatorBuilder already built".into(),
            ));
        }
        self.built = true;
        let mut resolver = WireResolver::from_system_conf()?;
        if let Some(t) = self.read_timeout {
            resolver = resolver.with_read_timeout(t);
        }
        if let Some(t) = self.connect_timeout {
            resolver = resolver.with_connect_timeout(t);
        }
        Ok(DnsLocator { resolver })
    }

    /// Finalize with a caller-supplied resolver (the "pluggable resolver
    /// factory" -- tests and non-standard deployments substitute here).
    pub fn build_with<R: SrvResolver>(mut self, resolver: R) -> Result<DnsLocator<R>> {
        if self.built {
            return Err(Error::Configuration(
                "DnsLocatorBuilder already built".into(),
            ));
        }
        self.built = true;
        Ok(DnsLocator { resolver })
    }
}

/// A built DNS SRV locator: construct the name, look it up, apply
/// RFC 2782 selection.
pub struct DnsLocator<R: SrvResolver> {
    resolver: R,
}

impl<R: SrvResolver> DnsLocator<R> {
    /// Run the lookup described by `request` end-to-end.
    pub fn locate(&self, request: &DnsLocatorRequest) -> Result<Vec<CandidateHost>> {
        let name = build_srv_name(request);
        let records = self.resolver.lookup_srv(&name)?;
        if is_service_not_provided(&records) {
            return Ok(Vec::new());
        }
        Ok(select(&records))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dns::request::ServiceToken;
    use std::cell::RefCell;

    struct FixedResolver {
        records: Vec<SrvRecord>,
        seen: RefCell<Vec<String>>,
    }

    impl SrvResolver for FixedResolver {
        fn lookup_srv(&self, name: &str) -> Result<Vec<SrvRecord>> {
            self.seen.borrow_mut().push(name.to_owned());
            Ok(self.records.clone())
        }
    }

    #[test]
    fn locate_builds_name_and_selects() {
        let resolver = FixedResolver {
            records: vec![SrvRecord {
                priority: 0,
                weight: 0,
                port: 389,
                target: "dc1.example.com.".into(),
            }],
            seen: RefCell::new(Vec::new()),
        };
        let locator = DnsLocatorBuilder::new().build_with(resolver).unwrap();
        let req = DnsLocatorRequest::new(ServiceToken::Ldap, "example.com");
        let hosts = locator.locate(&req).unwrap();
        assert_eq!(hosts.len(), 1);
        assert_eq!(hosts[0].host, "dc1.example.com");
        assert_eq!(locator.resolver.seen.borrow()[0], "_ldap._tcp.example.com");
    }

    #[test]
    fn service_not_provided_sentinel_yields_empty_list() {
        let resolver = FixedResolver {
            records: vec![SrvRecord {
                priority: 0,
                weight: 0,
                port: 0,
                target: ".".into(),
            }],
            seen: RefCell::new(Vec::new()),
        };
        let locator = DnsLocatorBuilder::new().build_with(resolver).unwrap();
        let req = DnsLocatorRequest::new(ServiceToken::Ldap, "example.com");
        assert!(locator.locate(&req).unwrap().is_empty());
    }

    #[test]
    fn builder_rejects_double_build() {
        let mut b = DnsLocatorBuilder::new();
        b.built = true;
        let err = b
            .build_with(FixedResolver {
                records: vec![],
                seen: RefCell::new(Vec::new()),
            })
            .unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }
}
