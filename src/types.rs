//! The orchestrator's own request/result value types.
use std::net::Ipv4Addr;
use std::time::Duration;

use uuid::Uuid;

use crate::error::{Error, Result};
use crate::flags::DcLocatorFlag;

/// A request to locate a domain controller.
///
/// Value-typed and immutable once built: [`DcLocatorRequestBuilder`] is
/// the only way to construct one, and mutating it after `build()` is a
/// programmer error.
#[derive(Debug, Clone)]
pub struct DcLocatorRequest {
    pub(crate) computer_name: Option<String>,
    pub(crate) domain_name: Option<String>,
    pub(crate) site_name: Option<String>,
    pub(crate) flags: DcLocatorFlag,
    pub(crate) read_timeout: Option<Duration>,
}

impl DcLocatorRequest {
    /// domain name as given, before any effective-domain resolution
    pub fn domain_name(&self) -> Option<&str> {
        self.domain_name.as_deref()
    }

    /// site name as given
    pub fn site_name(&self) -> Option<&str> {
        self.site_name.as_deref()
    }

    /// the request's (already-normalized) flag set
    pub fn flags(&self) -> DcLocatorFlag {
        self.flags
    }

    /// the configured read timeout, if any
    pub fn read_timeout(&self) -> Option<Duration> {
        self.read_timeout
    }
}

/// Idempotent builder for [`DcLocatorRequest`].
#[derive(Debug, Default)]
pub struct DcLocatorRequestBuilder {
    computer_name: Option<String>,
    domain_name: Option<String>,
    site_name: Option<String>,
    flags: DcLocatorFlag,
    read_timeout: Option<Duration>,
    built: bool,
}

impl DcLocatorRequestBuilder {
    /// Start a new builder with no flags set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request a specific remote computer by name (always rejected at
    /// validation -- RPC-to-named-computer is unsupported).
    pub fn computer_name(mut self, name: impl Into<String>) -> Self {
        self.computer_name = Some(name.into());
        self
    }

    /// The domain (or, with `DS_GC_SERVER_REQUIRED`, forest) to locate a
    /// DC for. Must be a fully-qualified DNS name if set at all.
    pub fn domain_name(mut self, name: impl Into<String>) -> Self {
        self.domain_name = Some(name.into());
        self
    }

    /// Scope the search to a specific AD site.
    pub fn site_name(mut self, name: impl Into<String>) -> Self {
        self.site_name = Some(name.into());
        self
    }

    /// Add a `DS_*` requirement/preference flag.
    pub fn flag(mut self, flag: u32) -> Self {
        self.flags = self.flags.insert(flag);
        self
    }

    /// Apply a read timeout to every DNS lookup and ping performed.
    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = Some(timeout);
        self
    }

    /// Validate and normalize the request (see
    /// [`crate::locator::validate_and_normalize`]), finalizing the builder.
    pub fn build(mut self) -> Result<DcLocatorRequest> {
        if self.built {
            return Err(Error::Configuration(
                "DcLocatorRequestBuilder already built".into(),
            ));
        }
        self.built = true;
        let request = DcLocatorRequest {
            computer_name: self.computer_name.clone(),
            domain_name: self.domain_name.clone(),
            site_name: self.site_name.clone(),
            flags: self.flags,
            read_timeout: self.read_timeout,
        };
        crate::locator::validate_and_normalize(request)
    }
}

/// The located domain controller and the metadata describing it.
#[derive(Debug, Clone)]
pub struct DomainControllerInfo {
    /// DNS or NetBIOS name, per `DS_RETURN_FLAT_NAME`
    pub domain_controller_name: String,
    /// present when the DC's `dcSockAddr` was available
    pub ip_address: Option<Ipv4Addr>,
    /// the domain's GUID
    pub domain_guid: Uuid,
    /// the domain name, DNS or NetBIOS form per `DS_RETURN_FLAT_NAME`
    pub domain_name: Option<String>,
    /// DNS name of the forest
    pub dns_forest_name: String,
    /// the DC's reported DS flags, plus `DS_DNS_FOREST_FLAG` and, when
    /// DNS naming was used, `DS_DNS_CONTROLLER_FLAG`/`DS_DNS_DOMAIN_FLAG`
    pub flags: crate::flags::DsFlag,
    /// the site the DC itself belongs to
    pub dc_site_name: String,
    /// the site the caller was determined to belong to, if known
    pub client_site_name: Option<String>,
}
