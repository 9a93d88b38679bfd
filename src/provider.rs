//! A `dns:` naming-provider rewriter, the kind a JNDI LDAP context
//! factory consults before opening a connection: given a provider URL
//! naming a domain (by DN or by host), hand back the same URL pointed
//! at a concrete, located domain controller.
//!
//! This never fails outward. Any error parsing the URL, deriving a
//! domain from it, or locating a DC for that domain falls back to
//! returning the input URL unchanged, with no domain reported.
use url::Url;

use crate::dns::SrvResolver;
use crate::flags::DcLocatorFlag;
use crate::locator::{DcLocator, Prober};
use crate::types::DcLocatorRequestBuilder;

const GC_PORT: u16 = 3268;
const GCS_PORT: u16 = 3269;

/// Result of rewriting a provider URL.
#[derive(Debug, Clone)]
pub struct ProviderResolution {
    /// the domain (or, for a GC URL, forest) name the URL was resolved
    /// against -- `None` if resolution failed and `endpoint` is just
    /// the original URL handed back unchanged
    pub domain: Option<String>,
    /// the URL to actually connect to
    pub endpoint: String,
}

/// Rewrites `ldap`/`ldaps`/`gc`/`gcs` provider URLs using a [`DcLocator`].
#[derive(Debug)]
pub struct DnsProvider<'a, R: SrvResolver, P: Prober> {
    locator: &'a DcLocator<R, P>,
}

impl<'a, R: SrvResolver, P: Prober> DnsProvider<'a, R, P> {
    /// Wrap a locator for provider-URL resolution.
    pub fn new(locator: &'a DcLocator<R, P>) -> Self {
        Self { locator }
    }

    /// Resolve `url` to a concrete DC endpoint.
    ///
    /// `url`'s scheme selects GC vs. plain LDAP (`gc`/`gcs`, or a port
    /// of 3268/3269); its base DN path, if any, names the domain;
    /// otherwise the URL's host is taken as the domain name. On any
    /// failure, `url` is returned unchanged and `domain` is `None`.
    pub fn resolve(&self, url: &str) -> ProviderResolution {
        match self.try_resolve(url) {
            Some(resolution) => resolution,
            None => ProviderResolution {
                domain: None,
                endpoint: url.to_owned(),
            },
        }
    }

    fn try_resolve(&self, url: &str) -> Option<ProviderResolution> {
        let mut parsed = Url::parse(url).ok()?;

        let is_gc = matches!(parsed.scheme(), "gc" | "gcs")
            || matches!(parsed.port(), Some(GC_PORT) | Some(GCS_PORT));
        let secure = matches!(parsed.scheme(), "ldaps" | "gcs");
        let new_scheme = if secure { "ldaps" } else { "ldap" };
        parsed.set_scheme(new_scheme).ok()?;
        if is_gc {
            let gc_port = if secure { GCS_PORT } else { GC_PORT };
            parsed.set_port(Some(gc_port)).ok()?;
        }

        let domain = domain_from_dn(parsed.path()).or_else(|| {
            parsed
                .host_str()
                .filter(|h| h.contains('.'))
                .map(str::to_owned)
        })?;

        let mut request = DcLocatorRequestBuilder::new().domain_name(domain.clone());
        if is_gc {
            request = request.flag(DcLocatorFlag::GcServerRequired);
        }
        let request = request.build().ok()?;
        let info = self.locator.locate(&request).ok()?;

        parsed.set_host(Some(&info.domain_controller_name)).ok()?;

        Some(ProviderResolution {
            domain: Some(domain),
            endpoint: parsed.to_string(),
        })
    }
}

/// Join a DN's `dc=` RDNs into a dotted domain name, e.g.
/// `/dc=example,dc=com` -> `example.com`. RDNs are listed most-specific
/// first, same as the dotted form, so no reordering is needed -- the DN's
/// own left-to-right order already reads as the domain name.
fn domain_from_dn(path: &str) -> Option<String> {
    let path = path.trim_start_matches('/');
    if path.is_empty() {
        return None;
    }
    let mut labels = Vec::new();
    for rdn in path.split(',') {
        let mut parts = rdn.splitn(2, '=');
        let attr = parts.next()?.trim();
        let value = parts.next()?.trim();
        if attr.eq_ignore_ascii_case("dc") && !value.is_empty() {
            labels.push(value.to_owned());
        }
    }
    if labels.is_empty() {
        return None;
    }
    Some(labels.join("."))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dns::{CandidateHost, DnsLocatorBuilder, SrvRecord, SrvResolver};
    use crate::error::{Error, Result};
    use crate::flags::{DsFlag, NetlogonNtVersion};
    use crate::locator::DcLocatorBuilder;
    use crate::netlogon::NetlogonSamLogonExResponse;
    use std::cell::RefCell;
    use std::collections::HashMap;
    use std::net::{Ipv4Addr, SocketAddrV4};
    use uuid::Uuid;

    #[test]
    fn domain_from_dn_joins_in_dn_order() {
        assert_eq!(
            domain_from_dn("/dc=example,dc=com"),
            Some("example.com".to_owned())
        );
    }

    #[test]
    fn domain_from_dn_ignores_non_dc_rdns() {
        assert_eq!(
            domain_from_dn("/cn=users,dc=example,dc=com"),
            Some("example.com".to_owned())
        );
    }

    #[test]
    fn domain_from_dn_empty_path_is_none() {
        assert_eq!(domain_from_dn(""), None);
        assert_eq!(domain_from_dn("/"), None);
    }

    #[test]
    fn gc_scheme_is_recognized_and_rewritten() {
        let url = Url::parse("gc://example.com/dc=example,dc=com").unwrap();
        let is_gc = matches!(url.scheme(), "gc" | "gcs");
        assert!(is_gc);
    }

    // -- end-to-end scenarios over a `FixedResolver`/`FixedProber` locator --

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

    fn ex_response(host: &str, flags: DsFlag) -> NetlogonSamLogonExResponse {
        NetlogonSamLogonExResponse {
            flags,
            domain_guid: Uuid::nil(),
            dns_forest_name: "example.com".into(),
            dns_domain_name: "example.com".into(),
            dns_host_name: host.into(),
            netbios_domain_name: None,
            netbios_computer_name: None,
            user_name: None,
            dc_site_name: "Default-First-Site".into(),
            client_site_name: None,
            dc_sock_addr: Some(SocketAddrV4::new(Ipv4Addr::new(10, 0, 0, 5), 389)),
            next_closest_site_name: None,
            nt_version: NetlogonNtVersion::from_bits(NetlogonNtVersion::V1 | NetlogonNtVersion::V5EX),
            lm_token: 0xffff,
            nt_token: 0xffff,
        }
    }

    struct FixedProber {
        responses: RefCell<HashMap<String, Result<NetlogonSamLogonExResponse>>>,
    }

    impl crate::locator::Prober for FixedProber {
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

    /// Builds a locator whose broad-scope `_ldap._tcp.dc._msdcs.example.com`
    /// lookup returns two candidates: the first satisfies the (empty)
    /// discovery probe but is then gone from the fixture by the time the
    /// real filtering pass re-probes it, so the second candidate wins.
    fn plain_locator() -> DcLocator<FixedResolver, FixedProber> {
        let mut zones = HashMap::new();
        zones.insert(
            "_ldap._tcp.dc._msdcs.example.com".to_owned(),
            vec![srv("dc0.example.com"), srv("dc1.example.com")],
        );
        let dns = DnsLocatorBuilder::new().build_with(FixedResolver(zones)).unwrap();

        let mut responses = HashMap::new();
        responses.insert("dc0.example.com".to_owned(), Ok(ex_response("dc0.example.com", DsFlag::Ds)));
        responses.insert("dc1.example.com".to_owned(), Ok(ex_response("dc1.example.com", DsFlag::Ds)));
        let prober = FixedProber {
            responses: RefCell::new(responses),
        };

        DcLocatorBuilder::new().build_with(dns, prober).unwrap()
    }

    /// Builds a locator whose broad-scope GC lookup
    /// (`_ldap._tcp.gc._msdcs.example.com`) returns two candidates: the
    /// first is consumed by the (flag-blind) discovery probe, leaving the
    /// second, GC-capable one to win the real filtering pass.
    fn gc_locator() -> DcLocator<FixedResolver, FixedProber> {
        let mut zones = HashMap::new();
        zones.insert(
            "_ldap._tcp.gc._msdcs.example.com".to_owned(),
            vec![srv("dc0.example.com"), srv("dc1.example.com")],
        );
        let dns = DnsLocatorBuilder::new().build_with(FixedResolver(zones)).unwrap();

        let mut responses = HashMap::new();
        responses.insert("dc0.example.com".to_owned(), Ok(ex_response("dc0.example.com", DsFlag::Ds)));
        responses.insert(
            "dc1.example.com".to_owned(),
            Ok(ex_response("dc1.example.com", DsFlag::Ds.insert(DsFlag::Gc))),
        );
        let prober = FixedProber {
            responses: RefCell::new(responses),
        };

        DcLocatorBuilder::new().build_with(dns, prober).unwrap()
    }

    #[test]
    fn resolves_ldap_url_to_located_dc() {
        let locator = plain_locator();
        let provider = DnsProvider::new(&locator);

        let resolution = provider.resolve("ldap://_/dc=example,dc=com");

        assert_eq!(resolution.domain, Some("example.com".to_owned()));
        assert_eq!(resolution.endpoint, "ldap://dc1.example.com/dc=example,dc=com");
    }

    #[test]
    fn gc_url_is_rewritten_to_ldap_scheme_and_gc_port() {
        let locator = gc_locator();
        let provider = DnsProvider::new(&locator);

        let resolution = provider.resolve("gc://_/dc=example,dc=com");

        assert_eq!(resolution.domain, Some("example.com".to_owned()));
        assert_eq!(
            resolution.endpoint,
            "ldap://dc1.example.com:3268/dc=example,dc=com"
        );
    }

    #[test]
    fn malformed_url_is_returned_unchanged() {
        let locator = plain_locator();
        let provider = DnsProvider::new(&locator);

        let resolution = provider.resolve("not a url");

        assert_eq!(resolution.domain, None);
        assert_eq!(resolution.endpoint, "not a url");
    }

    #[test]
    fn unresolvable_domain_is_returned_unchanged() {
        let locator = plain_locator();
        let provider = DnsProvider::new(&locator);

        let url = "ldap://_/dc=nonexistent,dc=invalid";
        let resolution = provider.resolve(url);

        assert_eq!(resolution.domain, None);
        assert_eq!(resolution.endpoint, url);
    }
}
