//! The DC locator orchestrator: validates a request, resolves the
//! effective domain, probes DNS-discovered candidates, applies
//! site/next-closest-site fallback, filters by DS capability flags, and
//! builds the final [`DomainControllerInfo`].
use std::time::Duration;

use crate::dns::{
    CandidateHost, DcTypeToken, DnsLocator, DnsLocatorBuilder, DnsLocatorRequest, ServiceToken,
    SrvResolver, TransportToken, WireResolver,
};
use crate::encoder::Encodable;
use crate::error::{Error, Result};
use crate::flags::{DcLocatorFlag, DsFlag, NetlogonNtVersion};
use crate::ldap::{LdapPingRequest, decode_ping_response};
use crate::netlogon::{self, NetlogonResponse, NetlogonSamLogonExResponse};
use crate::transport::PingTransport;
use crate::types::{DcLocatorRequest, DomainControllerInfo};

/// Validate and normalize a freshly-built request. Called only from
/// [`crate::types::DcLocatorRequestBuilder::build`].
pub(crate) fn validate_and_normalize(mut request: DcLocatorRequest) -> Result<DcLocatorRequest> {
    if request.computer_name.is_some() {
        return Err(Error::OperationNotSupported(
            "location of a named remote computer via RPC is not supported".into(),
        ));
    }

    if let Some(domain) = &request.domain_name {
        if !has_interior_dot(domain) {
            return Err(Error::Configuration(format!(
                "domain name {domain:?} must be fully qualified"
            )));
        }
    }

    if request.flags.contains(DcLocatorFlag::IsFlatName) {
        return Err(Error::Configuration(
            "DS_IS_FLAT_NAME is not supported".into(),
        ));
    }

    if request.flags.contains(DcLocatorFlag::KeyListSupportRequired)
        && !request.flags.contains(DcLocatorFlag::KdcRequired)
    {
        return Err(Error::Configuration(
            "DS_KEY_LIST_SUPPORT_REQUIRED requires DS_KDC_REQUIRED".into(),
        ));
    }

    if request.flags.contains(DcLocatorFlag::TryNextClosestSite)
        && request.site_name.as_deref().is_some_and(|s| !s.is_empty())
    {
        return Err(Error::Configuration(
            "DS_TRY_NEXTCLOSEST_SITE cannot be combined with an explicit site name".into(),
        ));
    }

    reject_if_multiple(
        request.flags,
        &[
            DcLocatorFlag::GcServerRequired,
            DcLocatorFlag::PdcRequired,
            DcLocatorFlag::KdcRequired,
        ],
    )?;
    reject_if_multiple(
        request.flags,
        &[DcLocatorFlag::IsDnsName, DcLocatorFlag::IsFlatName],
    )?;
    reject_if_multiple(
        request.flags,
        &[
            DcLocatorFlag::ReturnDnsName,
            DcLocatorFlag::ReturnFlatName,
        ],
    )?;
    reject_if_multiple(
        request.flags,
        &[
            DcLocatorFlag::DirectoryServiceRequired,
            DcLocatorFlag::DirectoryService6Required,
            DcLocatorFlag::DirectoryService8Required,
            DcLocatorFlag::DirectoryService9Required,
            DcLocatorFlag::DirectoryService10Required,
        ],
    )?;

    if request.flags.contains(DcLocatorFlag::GoodTimeservPreferred)
        && [
            DcLocatorFlag::GcServerRequired,
            DcLocatorFlag::PdcRequired,
            DcLocatorFlag::KdcRequired,
            DcLocatorFlag::DirectoryServiceRequired,
        ]
        .iter()
        .any(|f| request.flags.contains(*f))
    {
        return Err(Error::Configuration(
            "DS_GOOD_TIMESERV_PREFERRED cannot be combined with a required-role flag".into(),
        ));
    }

    for ignored in [
        DcLocatorFlag::ForceRediscovery,
        DcLocatorFlag::BackgroundOnly,
        DcLocatorFlag::AvoidSelf,
        DcLocatorFlag::DirectoryServicePreferred,
        DcLocatorFlag::GoodTimeservPreferred,
    ] {
        request.flags = request.flags.remove(ignored);
    }

    if request.flags.contains(DcLocatorFlag::OnlyLdapNeeded) {
        for dropped in [
            DcLocatorFlag::DirectoryServiceRequired,
            DcLocatorFlag::DirectoryServicePreferred,
            DcLocatorFlag::PdcRequired,
            DcLocatorFlag::KdcRequired,
            DcLocatorFlag::TimeservRequired,
            DcLocatorFlag::GoodTimeservPreferred,
            DcLocatorFlag::DirectoryService6Required,
            DcLocatorFlag::DirectoryService8Required,
            DcLocatorFlag::DirectoryService9Required,
            DcLocatorFlag::DirectoryService10Required,
            DcLocatorFlag::WebServiceRequired,
            DcLocatorFlag::KeyListSupportRequired,
        ] {
            request.flags = request.flags.remove(dropped);
        }
    }

    if request.flags.contains(DcLocatorFlag::PdcRequired)
        || request.flags.contains(DcLocatorFlag::ReturnFlatName)
    {
        request.flags = request.flags.remove(DcLocatorFlag::TryNextClosestSite);
    }

    if request.flags.contains(DcLocatorFlag::ReturnDnsName)
        && !request.flags.contains(DcLocatorFlag::IpRequired)
    {
        request.flags = request.flags.insert(DcLocatorFlag::IpRequired);
    }

    Ok(request)
}

fn has_interior_dot(name: &str) -> bool {
    let last = name.len().saturating_sub(1);
    name.char_indices().any(|(i, c)| c == '.' && i != last)
}

fn reject_if_multiple(flags: DcLocatorFlag, set: &[u32]) -> Result<()> {
    let present: Vec<u32> = set.iter().copied().filter(|f| flags.contains(*f)).collect();
    if present.len() >= 2 {
        let subset = present
            .iter()
            .fold(DcLocatorFlag::empty(), |acc, f| acc.insert(*f));
        return Err(Error::Configuration(format!(
            "Flags [{}] cannot be combined",
            subset.to_flags_string()
        )));
    }
    Ok(())
}

fn service_and_dc_type(flags: DcLocatorFlag) -> (ServiceToken, Option<DcTypeToken>) {
    if flags.contains(DcLocatorFlag::OnlyLdapNeeded) && flags.contains(DcLocatorFlag::GcServerRequired)
    {
        (ServiceToken::Gc, None)
    } else if flags.contains(DcLocatorFlag::OnlyLdapNeeded) {
        (ServiceToken::Ldap, None)
    } else if flags.contains(DcLocatorFlag::PdcRequired) {
        (ServiceToken::Ldap, Some(DcTypeToken::Pdc))
    } else if flags.contains(DcLocatorFlag::GcServerRequired) {
        (ServiceToken::Ldap, Some(DcTypeToken::Gc))
    } else if flags.contains(DcLocatorFlag::KdcRequired) {
        (ServiceToken::Kerberos, Some(DcTypeToken::Dc))
    } else {
        (ServiceToken::Ldap, Some(DcTypeToken::Dc))
    }
}

const SERVER_SELECTION_TABLE: &[(u32, u32)] = &[
    (DcLocatorFlag::DirectoryServiceRequired, DsFlag::Ds),
    (DcLocatorFlag::GcServerRequired, DsFlag::Gc),
    (DcLocatorFlag::PdcRequired, DsFlag::Pdc),
    (DcLocatorFlag::KdcRequired, DsFlag::Kdc),
    (DcLocatorFlag::TimeservRequired, DsFlag::Timeserv),
    (DcLocatorFlag::WritableRequired, DsFlag::Writable),
    (DcLocatorFlag::OnlyLdapNeeded, DsFlag::Ldap),
    (DcLocatorFlag::DirectoryService6Required, DsFlag::FullSecretDomain6),
    (DcLocatorFlag::WebServiceRequired, DsFlag::Ws),
    (DcLocatorFlag::DirectoryService8Required, DsFlag::Ds8),
    (DcLocatorFlag::DirectoryService9Required, DsFlag::Ds9),
    (DcLocatorFlag::DirectoryService10Required, DsFlag::Ds10),
    (DcLocatorFlag::KeyListSupportRequired, DsFlag::KeyList),
];

fn required_ds_flags(flags: DcLocatorFlag) -> DsFlag {
    SERVER_SELECTION_TABLE
        .iter()
        .filter(|(locator_flag, _)| flags.contains(*locator_flag))
        .fold(DsFlag::empty(), |acc, (_, ds_flag)| acc.insert(*ds_flag))
}

fn compose_probe_nt_version(flags: DcLocatorFlag) -> NetlogonNtVersion {
    let mut bits = NetlogonNtVersion::V1 | NetlogonNtVersion::V5EX | NetlogonNtVersion::VCS;
    if flags.contains(DcLocatorFlag::IpRequired) {
        bits |= NetlogonNtVersion::V5EP;
    }
    if flags.contains(DcLocatorFlag::GcServerRequired) {
        bits |= NetlogonNtVersion::VGC;
    }
    if flags.contains(DcLocatorFlag::PdcRequired) {
        bits |= NetlogonNtVersion::VPDC;
    }
    NetlogonNtVersion::from_bits(bits)
}

fn satisfies(resp: &NetlogonSamLogonExResponse, required: DsFlag) -> bool {
    resp.flags.contains(required.bits())
}

fn local_fqdn() -> Result<String> {
    hostname::get()
        .ok()
        .and_then(|s| s.into_string().ok())
        .ok_or_else(|| {
            Error::Configuration("could not determine the local fully-qualified host name".into())
        })
}

fn suffix_after_first_dot(fqdn: &str) -> Result<String> {
    fqdn.split_once('.')
        .map(|(_, suffix)| suffix.to_owned())
        .ok_or_else(|| {
            Error::Configuration(format!(
                "local host name {fqdn:?} is not itself fully qualified"
            ))
        })
}

/// Collaborator that performs one LDAP ping against a candidate and
/// returns its decoded Netlogon response. Pluggable so tests can drive
/// the orchestrator's control flow without opening a socket.
pub trait Prober {
    /// Ping `candidate`, requesting `nt_version`, with the given filter
    /// inputs, and return the decoded V5EX response.
    fn probe(
        &self,
        candidate: &CandidateHost,
        nt_version: NetlogonNtVersion,
        dns_domain: &str,
        dns_hostname: &str,
    ) -> Result<NetlogonSamLogonExResponse>;
}

/// [`Prober`] that resolves the candidate host and performs a real LDAP
/// ping over UDP.
pub struct WireProber {
    transport: PingTransport,
}

impl WireProber {
    /// A prober with no explicit timeouts.
    pub fn new() -> Self {
        Self {
            transport: PingTransport::new(),
        }
    }

    /// Bound the ping's read wait.
    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.transport = self.transport.with_read_timeout(timeout);
        self
    }
}

impl Default for WireProber {
    fn default() -> Self {
        Self::new()
    }
}

impl Prober for WireProber {
    fn probe(
        &self,
        candidate: &CandidateHost,
        nt_version: NetlogonNtVersion,
        dns_domain: &str,
        dns_hostname: &str,
    ) -> Result<NetlogonSamLogonExResponse> {
        let addr = crate::dns::resolver::resolve_host_port(&candidate.host, candidate.port)?;
        let ping = LdapPingRequest::new(candidate.host.clone(), nt_version)
            .with_dns_domain(dns_domain)
            .with_dns_hostname(dns_hostname);
        let request_bytes = ping.to_vec()?;

        let response_bytes = self
            .transport
            .ping(addr, TransportToken::Udp, &request_bytes)?
            .ok_or_else(|| {
                Error::communication(
                    addr,
                    std::io::Error::new(std::io::ErrorKind::TimedOut, "no ping response"),
                )
            })?;

        let netlogon_bytes = decode_ping_response(&response_bytes)?;
        match netlogon::decode(&netlogon_bytes, nt_version)? {
            NetlogonResponse::V5Ex(resp) => Ok(resp),
            _ => Err(Error::communication(
                addr,
                std::io::Error::new(
                    std::io::ErrorKind::InvalidData,
                    "expected a V5EX netlogon response to a probe that requested V5EX",
                ),
            )),
        }
    }
}

/// Idempotent builder for [`DcLocator`].
#[derive(Default)]
pub struct DcLocatorBuilder {
    read_timeout: Option<Duration>,
    connect_timeout: Option<Duration>,
    built: bool,
}

impl DcLocatorBuilder {
    /// Start a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a read timeout to every DNS lookup and ping.
    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = Some(timeout);
        self
    }

    /// Apply a connect timeout to TCP fallback paths (DNS-over-TCP; LDAP
    /// ping is always UDP, so this currently only bounds the former).
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Finalize, constructing the default system resolver and prober.
    pub fn build(mut self) -> Result<DcLocator<WireResolver, WireProber>> {
        if self.built {
            return Err(Error::Configuration("DcLocatorBuilder already built".into()));
        }
        self.built = true;

        let mut dns_builder = DnsLocatorBuilder::new();
        if let Some(t) = self.read_timeout {
            dns_builder = dns_builder.read_timeout(t);
        }
        if let Some(t) = self.connect_timeout {
            dns_builder = dns_builder.connect_timeout(t);
        }
        let dns = dns_builder.build()?;

        let mut prober = WireProber::new();
        if let Some(t) = self.read_timeout {
            prober = prober.with_read_timeout(t);
        }

        Ok(DcLocator { dns, prober })
    }

    /// Finalize with caller-supplied DNS and probe collaborators (the
    /// pluggable-factory pattern tests use to avoid the network).
    pub fn build_with<R: SrvResolver, P: Prober>(
        mut self,
        dns: DnsLocator<R>,
        prober: P,
    ) -> Result<DcLocator<R, P>> {
        if self.built {
            return Err(Error::Configuration("DcLocatorBuilder already built".into()));
        }
        self.built = true;
        Ok(DcLocator { dns, prober })
    }
}

/// A built DC locator.
pub struct DcLocator<R: SrvResolver, P: Prober> {
    dns: DnsLocator<R>,
    prober: P,
}

impl<R: SrvResolver, P: Prober> DcLocator<R, P> {
    /// Run the full location algorithm described by `request`.
    pub fn locate(&self, request: &DcLocatorRequest) -> Result<DomainControllerInfo> {
        let (service, dc_type) = service_and_dc_type(request.flags());
        let local_fqdn = local_fqdn()?;

        let effective_domain = match request.domain_name() {
            Some(d) => d.to_owned(),
            None if request.flags().contains(DcLocatorFlag::GcServerRequired) => {
                let local_domain_suffix = suffix_after_first_dot(&local_fqdn)?;
                self.determine_forest_name(&local_domain_suffix, &local_fqdn)?
            }
            None => suffix_after_first_dot(&local_fqdn)?,
        };

        let nt_version = compose_probe_nt_version(request.flags());
        let required = required_ds_flags(request.flags());

        match request.site_name() {
            Some(site) => {
                let mut tried = 0usize;
                self.try_site(
                    service,
                    dc_type,
                    site,
                    &effective_domain,
                    &local_fqdn,
                    nt_version,
                    required,
                    request.flags(),
                    &mut tried,
                )?
                .ok_or_else(|| Error::ServiceUnavailable {
                    tried,
                    domain: effective_domain.clone(),
                    site: Some(site.to_owned()),
                })
            }
            None => self.locate_site_discovery(
                service,
                dc_type,
                &effective_domain,
                &local_fqdn,
                nt_version,
                required,
                request.flags(),
            ),
        }
    }

    fn determine_forest_name(&self, local_domain_suffix: &str, local_fqdn: &str) -> Result<String> {
        let mut req = DnsLocatorRequest::new(ServiceToken::Ldap, local_domain_suffix);
        req = req.with_dc_type(DcTypeToken::Dc);
        let candidates = self.dns.locate(&req)?;
        let nt_version = NetlogonNtVersion::from_bits(
            NetlogonNtVersion::V1 | NetlogonNtVersion::V5EX | NetlogonNtVersion::VCS,
        );

        for candidate in &candidates {
            match self.prober.probe(candidate, nt_version, local_domain_suffix, local_fqdn) {
                Ok(resp) => return Ok(resp.dns_forest_name),
                Err(e) => {
                    log::debug!("probe of {}:{} failed: {e}", candidate.host, candidate.port);
                }
            }
        }
        Err(Error::ServiceUnavailable {
            tried: candidates.len(),
            domain: local_domain_suffix.to_owned(),
            site: None,
        })
    }

    #[allow(clippy::too_many_arguments)]
    fn try_site(
        &self,
        service: ServiceToken,
        dc_type: Option<DcTypeToken>,
        site: &str,
        domain: &str,
        local_fqdn: &str,
        nt_version: NetlogonNtVersion,
        required: DsFlag,
        request_flags: DcLocatorFlag,
        tried: &mut usize,
    ) -> Result<Option<DomainControllerInfo>> {
        let mut req = DnsLocatorRequest::new(service, domain).with_site(site);
        if let Some(t) = dc_type {
            req = req.with_dc_type(t);
        }
        let candidates = match self.dns.locate(&req) {
            Ok(c) => c,
            Err(_) => return Ok(None),
        };

        let check_pdc_site = request_flags.contains(DcLocatorFlag::PdcRequired);
        for candidate in &candidates {
            *tried += 1;
            let resp = match self.prober.probe(candidate, nt_version, domain, local_fqdn) {
                Ok(resp) => resp,
                Err(e) => {
                    log::debug!("probe of {}:{} failed: {e}", candidate.host, candidate.port);
                    continue;
                }
            };
            if !satisfies(&resp, required) {
                continue;
            }
            if check_pdc_site && !resp.dc_site_name.eq_ignore_ascii_case(site) {
                continue;
            }
            return Ok(Some(build_domain_controller_info(
                resp,
                request_flags,
                Some(site),
            )));
        }
        Ok(None)
    }

    #[allow(clippy::too_many_arguments)]
    fn locate_site_discovery(
        &self,
        service: ServiceToken,
        dc_type: Option<DcTypeToken>,
        domain: &str,
        local_fqdn: &str,
        nt_version: NetlogonNtVersion,
        required: DsFlag,
        request_flags: DcLocatorFlag,
    ) -> Result<DomainControllerInfo> {
        let mut broad_req = DnsLocatorRequest::new(service, domain);
        if let Some(t) = dc_type {
            broad_req = broad_req.with_dc_type(t);
        }
        let candidates = self.dns.locate(&broad_req)?;
        let mut tried = 0usize;

        // Open question #3: the initial broad-scope probe accepts any
        // reachable DC, regardless of the caller's required DS flags --
        // it exists only to learn the client's site.
        let mut discovery: Option<NetlogonSamLogonExResponse> = None;
        for candidate in &candidates {
            tried += 1;
            match self.prober.probe(candidate, nt_version, domain, local_fqdn) {
                Ok(resp) => {
                    discovery = Some(resp);
                    break;
                }
                Err(e) => {
                    log::debug!("probe of {}:{} failed: {e}", candidate.host, candidate.port);
                }
            }
        }

        let Some(discovery) = discovery else {
            return Err(Error::ServiceUnavailable {
                tried,
                domain: domain.to_owned(),
                site: None,
            });
        };

        if let Some(site) = discovery
            .client_site_name
            .as_deref()
            .filter(|s| !s.is_empty())
        {
            if let Some(info) = self.try_site(
                service,
                dc_type,
                site,
                domain,
                local_fqdn,
                nt_version,
                required,
                request_flags,
                &mut tried,
            )? {
                return Ok(info);
            }
        }

        if request_flags.contains(DcLocatorFlag::TryNextClosestSite) {
            if let Some(site) = discovery
                .next_closest_site_name
                .as_deref()
                .filter(|s| !s.is_empty())
            {
                if let Some(info) = self.try_site(
                    service,
                    dc_type,
                    site,
                    domain,
                    local_fqdn,
                    nt_version,
                    required,
                    request_flags,
                    &mut tried,
                )? {
                    return Ok(info);
                }
            }
        }

        // fall back to the broad list, this time applying real filtering
        for candidate in &candidates {
            tried += 1;
            match self.prober.probe(candidate, nt_version, domain, local_fqdn) {
                Ok(resp) if satisfies(&resp, required) => {
                    return Ok(build_domain_controller_info(resp, request_flags, None));
                }
                Ok(_) => {}
                Err(e) => {
                    log::debug!("probe of {}:{} failed: {e}", candidate.host, candidate.port);
                }
            }
        }

        Err(Error::ServiceUnavailable {
            tried,
            domain: domain.to_owned(),
            site: None,
        })
    }
}

fn build_domain_controller_info(
    resp: NetlogonSamLogonExResponse,
    request_flags: DcLocatorFlag,
    queried_site: Option<&str>,
) -> DomainControllerInfo {
    let mut flags = resp.flags.insert(DsFlag::DnsForest);

    let (domain_controller_name, domain_name) = if request_flags.contains(DcLocatorFlag::ReturnFlatName)
    {
        (
            resp.netbios_computer_name
                .clone()
                .unwrap_or_else(|| resp.dns_host_name.clone()),
            resp.netbios_domain_name.clone(),
        )
    } else {
        flags = flags.insert(DsFlag::DnsController).insert(DsFlag::DnsDomain);
        (resp.dns_host_name.clone(), Some(resp.dns_domain_name.clone()))
    };

    if let Some(site) = queried_site {
        if resp.dc_site_name.eq_ignore_ascii_case(site) {
            flags = flags.insert(DsFlag::Closest);
        }
    }

    DomainControllerInfo {
        domain_controller_name,
        ip_address: resp.dc_sock_addr.map(|a| *a.ip()),
        domain_guid: resp.domain_guid,
        domain_name,
        dns_forest_name: resp.dns_forest_name,
        flags,
        dc_site_name: resp.dc_site_name,
        client_site_name: resp.client_site_name,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dns::SrvRecord;
    use crate::types::DcLocatorRequestBuilder;
    use std::cell::RefCell;
    use std::collections::HashMap;
    use std::net::{Ipv4Addr, SocketAddrV4};
    use uuid::Uuid;

    #[test]
    fn gc_and_pdc_together_is_rejected() {
        let err = DcLocatorRequestBuilder::new()
            .domain_name("example.com")
            .flag(DcLocatorFlag::GcServerRequired)
            .flag(DcLocatorFlag::PdcRequired)
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("cannot be combined"));
    }

    #[test]
    fn key_list_without_kdc_is_rejected() {
        let err = DcLocatorRequestBuilder::new()
            .domain_name("example.com")
            .flag(DcLocatorFlag::KeyListSupportRequired)
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[test]
    fn site_name_with_try_next_closest_is_rejected() {
        let err = DcLocatorRequestBuilder::new()
            .domain_name("example.com")
            .site_name("Site1")
            .flag(DcLocatorFlag::TryNextClosestSite)
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[test]
    fn computer_name_is_operation_not_supported() {
        let err = DcLocatorRequestBuilder::new()
            .computer_name("OTHERHOST")
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::OperationNotSupported(_)));
    }

    #[test]
    fn unqualified_domain_name_is_rejected() {
        for bad in ["foo", "foo."] {
            let err = DcLocatorRequestBuilder::new()
                .domain_name(bad)
                .build()
                .unwrap_err();
            assert!(matches!(err, Error::Configuration(_)), "domain {bad:?}");
        }
    }

    #[test]
    fn qualified_domain_name_is_accepted() {
        let req = DcLocatorRequestBuilder::new()
            .domain_name("foo.bar")
            .build()
            .unwrap();
        assert_eq!(req.domain_name(), Some("foo.bar"));
    }

    #[test]
    fn return_dns_name_implies_ip_required() {
        let req = DcLocatorRequestBuilder::new()
            .domain_name("example.com")
            .flag(DcLocatorFlag::ReturnDnsName)
            .build()
            .unwrap();
        assert!(req.flags().contains(DcLocatorFlag::IpRequired));
    }

    #[test]
    fn ignored_flags_are_silently_dropped() {
        let req = DcLocatorRequestBuilder::new()
            .domain_name("example.com")
            .flag(DcLocatorFlag::ForceRediscovery)
            .build()
            .unwrap();
        assert!(!req.flags().contains(DcLocatorFlag::ForceRediscovery));
    }

    // -- orchestrator integration test doubles --

    struct FixedResolver(HashMap<String, Vec<SrvRecord>>);

    impl SrvResolver for FixedResolver {
        fn lookup_srv(&self, name: &str) -> Result<Vec<SrvRecord>> {
            self.0
                .get(name)
                .cloned()
                .ok_or_else(|| Error::NameNotFound(name.to_owned()))
        }
    }

    fn srv(target: &str) -> SrvRecord {
        SrvRecord {
            priority: 0,
            weight: 0,
            port: 389,
            target: format!("{target}."),
        }
    }

    fn ex_response(site: &str, client_site: Option<&str>, next_closest: Option<&str>, flags: DsFlag) -> NetlogonSamLogonExResponse {
        NetlogonSamLogonExResponse {
            flags,
            domain_guid: Uuid::nil(),
            dns_forest_name: "example.com".into(),
            dns_domain_name: "example.com".into(),
            dns_host_name: "dc1.example.com".into(),
            netbios_domain_name: None,
            netbios_computer_name: None,
            user_name: None,
            dc_site_name: site.into(),
            client_site_name: client_site.map(str::to_owned),
            dc_sock_addr: Some(SocketAddrV4::new(Ipv4Addr::new(10, 0, 0, 5), 389)),
            next_closest_site_name: next_closest.map(str::to_owned),
            nt_version: NetlogonNtVersion::from_bits(
                NetlogonNtVersion::V1 | NetlogonNtVersion::V5EX,
            ),
            lm_token: 0xffff,
            nt_token: 0xffff,
        }
    }

    struct FixedProber {
        responses: RefCell<HashMap<String, Result<NetlogonSamLogonExResponse>>>,
    }

    impl Prober for FixedProber {
        fn probe(
            &self,
            candidate: &CandidateHost,
            _nt_version: NetlogonNtVersion,
            _dns_domain: &str,
            _dns_hostname: &str,
        ) -> Result<NetlogonSamLogonExResponse> {
            match self.responses.borrow_mut().remove(&candidate.host) {
                Some(Ok(resp)) => Ok(resp),
                Some(Err(e)) => Err(e),
                None => Err(Error::communication(
                    candidate.host.as_str(),
                    std::io::Error::other("no fixture for this host"),
                )),
            }
        }
    }

    /// Mirrors the spec's own "site fallback" scenario: a broad-scope
    /// probe of the first candidate learns a client site that lacks a
    /// capable DC, so the locator falls back to next-closest-site, and
    /// finally to the broad list.
    #[test]
    fn site_fallback_to_next_closest_site() {
        let broad_name = "_ldap._tcp.gc._msdcs.example.com";
        let s1_name = "_ldap._tcp.S1._sites.gc._msdcs.example.com";
        let s2_name = "_ldap._tcp.S2._sites.gc._msdcs.example.com";

        let mut zones = HashMap::new();
        zones.insert(broad_name.to_owned(), vec![srv("a.example.com"), srv("b.example.com")]);
        zones.insert(s1_name.to_owned(), vec![srv("a.example.com")]);
        zones.insert(s2_name.to_owned(), vec![srv("c.example.com")]);
        let dns = DnsLocatorBuilder::new()
            .build_with(FixedResolver(zones))
            .unwrap();

        let mut responses = HashMap::new();
        // broad probe of "a" succeeds but lacks DS_GC_FLAG
        responses.insert(
            "a.example.com".to_owned(),
            Ok(ex_response("S1", Some("S1"), Some("S2"), DsFlag::Ds)),
        );
        // site S1 has no GC-capable candidate either
        // (re-probing "a" under S1 still lacks GC)
        responses.insert(
            "c.example.com".to_owned(),
            Ok(ex_response("S2", None, None, DsFlag::Ds.insert(DsFlag::Gc))),
        );
        let prober = FixedProber {
            responses: RefCell::new(responses),
        };

        let locator = DcLocatorBuilder::new().build_with(dns, prober).unwrap();
        let request = DcLocatorRequestBuilder::new()
            .domain_name("example.com")
            .flag(DcLocatorFlag::GcServerRequired)
            .flag(DcLocatorFlag::TryNextClosestSite)
            .build()
            .unwrap();

        // "a" is consumed by the broad probe and is gone from the fixture
        // map by the time S1 is retried, so S1 fails and S2 (next-closest)
        // wins with its GC-capable candidate "c".
        let info = locator.locate(&request).unwrap();
        assert_eq!(info.dc_site_name, "S2");
        assert!(info.flags.contains(DsFlag::Gc));
    }
}
