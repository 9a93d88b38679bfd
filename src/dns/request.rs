//! Request shape for a single SRV lookup, and the AD-specific name tokens
//! that make one up.
use std::fmt;

use crate::error::{Error, Result};

/// LDAP-family service a [`DnsLocatorRequest`] is asking about.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ServiceToken {
    /// `_ldap`
    Ldap,
    /// `_kerberos`
    Kerberos,
    /// `_kpasswd`
    Kpasswd,
    /// `_gc`
    Gc,
}

impl ServiceToken {
    /// Parse a bare token (no leading underscore).
    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "ldap" => Ok(Self::Ldap),
            "kerberos" => Ok(Self::Kerberos),
            "kpasswd" => Ok(Self::Kpasswd),
            "gc" => Ok(Self::Gc),
            other => Err(Error::Configuration(format!(
                "unknown DNS locator service token {other:?}"
            ))),
        }
    }
}

impl fmt::Display for ServiceToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Ldap => "ldap",
            Self::Kerberos => "kerberos",
            Self::Kpasswd => "kpasswd",
            Self::Gc => "gc",
        };
        write!(f, "{s}")
    }
}

/// Transport token for a [`DnsLocatorRequest`]; defaults to `tcp`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum TransportToken {
    /// `_tcp`
    #[default]
    Tcp,
    /// `_udp`
    Udp,
}

impl TransportToken {
    /// Parse a bare token (no leading underscore).
    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "tcp" => Ok(Self::Tcp),
            "udp" => Ok(Self::Udp),
            other => Err(Error::Configuration(format!(
                "unknown DNS locator transport token {other:?}"
            ))),
        }
    }
}

impl fmt::Display for TransportToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Tcp => "tcp",
            Self::Udp => "udp",
        };
        write!(f, "{s}")
    }
}

/// DC-type token inserted before `_msdcs` in the SRV name; absent for a
/// plain directory-service lookup.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum DcTypeToken {
    /// any writable DC
    Dc,
    /// Global Catalog
    Gc,
    /// PDC emulator
    Pdc,
}

impl DcTypeToken {
    /// Parse a bare token (no leading underscore).
    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "dc" => Ok(Self::Dc),
            "gc" => Ok(Self::Gc),
            "pdc" => Ok(Self::Pdc),
            other => Err(Error::Configuration(format!(
                "unknown DNS locator dc-type token {other:?}"
            ))),
        }
    }
}

impl fmt::Display for DcTypeToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Dc => "dc",
            Self::Gc => "gc",
            Self::Pdc => "pdc",
        };
        write!(f, "{s}")
    }
}

/// Everything needed to build one AD-shaped SRV query name (see
/// [`super::name::build_srv_name`]).
#[derive(Debug, Clone)]
pub struct DnsLocatorRequest {
    pub(crate) service: ServiceToken,
    pub(crate) transport: TransportToken,
    pub(crate) site_name: Option<String>,
    pub(crate) dc_type: Option<DcTypeToken>,
    pub(crate) domain_name: String,
}

impl DnsLocatorRequest {
    /// Start building a request for `domain_name` over `service`.
    pub fn new(service: ServiceToken, domain_name: impl Into<String>) -> Self {
        Self {
            service,
            transport: TransportToken::default(),
            site_name: None,
            dc_type: None,
            domain_name: domain_name.into(),
        }
    }

    /// Override the transport token (default `tcp`).
    pub fn with_transport(mut self, transport: TransportToken) -> Self {
        self.transport = transport;
        self
    }

    /// Scope the query to a site.
    pub fn with_site(mut self, site_name: impl Into<String>) -> Self {
        self.site_name = Some(site_name.into());
        self
    }

    /// Scope the query to a DC type (`dc`, `gc`, `pdc`).
    pub fn with_dc_type(mut self, dc_type: DcTypeToken) -> Self {
        self.dc_type = Some(dc_type);
        self
    }
}
