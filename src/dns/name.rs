//! AD-shaped SRV query name construction.
//!
//! ```text
//! _{service}._{protocol|tcp}[.{siteName}._sites][.{dcType}._msdcs].{domainName}
//! ```
//! Bracketed segments are omitted entirely when empty.
use super::request::DnsLocatorRequest;

/// Build the SRV query name for `request`.
pub fn build_srv_name(request: &DnsLocatorRequest) -> String {
    let mut name = format!("_{}._{}", request.service, request.transport);

    if let Some(site) = request.site_name.as_deref().filter(|s| !s.is_empty()) {
        name.push('.');
        name.push_str(site);
        name.push_str("._sites");
    }

    if let Some(dc_type) = request.dc_type {
        name.push('.');
        name.push_str(&dc_type.to_string());
        name.push_str("._msdcs");
    }

    name.push('.');
    name.push_str(&request.domain_name);
    name
}
