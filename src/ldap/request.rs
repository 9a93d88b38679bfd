//! Builds the anonymous LDAP ping `SearchRequest`.
use crate::encoder::{Encodable, Encoder};
use crate::error::EncodeResult;
use crate::flags::NetlogonNtVersion;

use super::ber;

/// Everything needed to assemble one LDAP ping `SearchRequest`.
///
/// Filter terms beyond `NtVer` are included only when non-empty, matching
/// the real DC locator's behavior of omitting `DnsDomain`/`DnsHostName`
/// rather than sending an empty-string equality match.
#[derive(Debug, Clone)]
pub struct LdapPingRequest {
    /// host the ping is ultimately destined for (transport-level, not encoded)
    pub hostname: String,
    /// `NtVer` bit-vector; governs which response variant the DC returns
    pub nt_version: NetlogonNtVersion,
    /// filter term `DnsDomain`, omitted from the wire if empty
    pub dns_domain: Option<String>,
    /// filter term `DnsHostName`, omitted from the wire if empty
    pub dns_hostname: Option<String>,
}

impl LdapPingRequest {
    /// Start a request against `hostname` for the given NT version bits.
    pub fn new(hostname: impl Into<String>, nt_version: NetlogonNtVersion) -> Self {
        Self {
            hostname: hostname.into(),
            nt_version,
            dns_domain: None,
            dns_hostname: None,
        }
    }

    /// Add a `DnsDomain` filter term.
    pub fn with_dns_domain(mut self, domain: impl Into<String>) -> Self {
        self.dns_domain = Some(domain.into());
        self
    }

    /// Add a `DnsHostName` filter term.
    pub fn with_dns_hostname(mut self, hostname: impl Into<String>) -> Self {
        self.dns_hostname = Some(hostname.into());
        self
    }
}

fn equality_match(attribute: &str, value: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend(ber::encode_tlv(ber::TAG_OCTET_STRING, attribute.as_bytes()));
    body.extend(ber::encode_tlv(ber::TAG_OCTET_STRING, value));
    ber::encode_tlv(ber::TAG_EQUALITY_MATCH, &body)
}

impl Encodable for LdapPingRequest {
    fn encode(&self, e: &mut Encoder<'_>) -> EncodeResult<()> {
        let mut filter_terms = equality_match("NtVer", &self.nt_version.bits().to_le_bytes());
        if let Some(domain) = self.dns_domain.as_deref().filter(|s| !s.is_empty()) {
            filter_terms.extend(equality_match("DnsDomain", domain.as_bytes()));
        }
        if let Some(host) = self.dns_hostname.as_deref().filter(|s| !s.is_empty()) {
            filter_terms.extend(equality_match("DnsHostName", host.as_bytes()));
        }
        let filter = ber::encode_tlv(ber::TAG_FILTER_AND, &filter_terms);

        let attributes = ber::encode_tlv(
            ber::TAG_SEQUENCE,
            &ber::encode_tlv(ber::TAG_OCTET_STRING, b"Netlogon"),
        );

        let mut search_request_body = Vec::new();
        search_request_body.extend(ber::encode_tlv(ber::TAG_OCTET_STRING, b"")); // baseObject
        search_request_body.extend(ber::encode_integer(ber::TAG_ENUMERATED, 0)); // scope
        search_request_body.extend(ber::encode_integer(ber::TAG_ENUMERATED, 0)); // derefAliases
        search_request_body.extend(ber::encode_integer(ber::TAG_INTEGER, 0)); // sizeLimit
        search_request_body.extend(ber::encode_integer(ber::TAG_INTEGER, 0)); // timeLimit
        search_request_body.extend(ber::encode_boolean(false)); // typesOnly
        search_request_body.extend(filter);
        search_request_body.extend(attributes);

        let search_request = ber::encode_tlv(ber::TAG_SEARCH_REQUEST, &search_request_body);

        let mut message_body = ber::encode_integer(ber::TAG_INTEGER, 1); // messageID
        message_body.extend(search_request);

        let message = ber::encode_tlv(ber::TAG_SEQUENCE, &message_body);
        ber::write(e, &message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoder::Decoder;

    #[test]
    fn encodes_messageid_and_single_ntver_term() {
        // NtVersion = {V1, V5EX} = 0x00000005, no DnsDomain/DnsHostName.
        let req = LdapPingRequest::new(
            "dc1.example.com",
            NetlogonNtVersion::from_bits(0x0000_0005),
        );
        let bytes = req.to_vec().unwrap();

        let mut outer = Decoder::new(&bytes);
        let message = ber::read_tlv(&mut outer).unwrap();
        assert_eq!(message.tag, ber::TAG_SEQUENCE);
        assert!(outer.is_empty(), "no trailing bytes after the LDAPMessage");

        let mut inner = Decoder::new(message.content);
        let message_id = ber::read_tlv(&mut inner).unwrap();
        assert_eq!(message_id.tag, ber::TAG_INTEGER);
        assert_eq!(ber::decode_integer(message_id.content).unwrap(), 1);

        let search_request = ber::read_tlv(&mut inner).unwrap();
        assert_eq!(search_request.tag, ber::TAG_SEARCH_REQUEST);
        assert!(inner.is_empty());

        let mut fields = Decoder::new(search_request.content);
        let base_object = ber::read_tlv(&mut fields).unwrap();
        assert_eq!(base_object.content, b"");
        let _scope = ber::read_tlv(&mut fields).unwrap();
        let _deref = ber::read_tlv(&mut fields).unwrap();
        let _size_limit = ber::read_tlv(&mut fields).unwrap();
        let _time_limit = ber::read_tlv(&mut fields).unwrap();
        let _types_only = ber::read_tlv(&mut fields).unwrap();

        let filter = ber::read_tlv(&mut fields).unwrap();
        assert_eq!(filter.tag, ber::TAG_FILTER_AND);

        let mut filter_terms = Decoder::new(filter.content);
        let term = ber::read_tlv(&mut filter_terms).unwrap();
        assert_eq!(term.tag, ber::TAG_EQUALITY_MATCH);
        assert!(
            filter_terms.is_empty(),
            "only one filter term since DnsDomain/DnsHostName are empty"
        );

        let mut term_fields = Decoder::new(term.content);
        let attr = ber::read_tlv(&mut term_fields).unwrap();
        assert_eq!(attr.content, b"NtVer");
        let value = ber::read_tlv(&mut term_fields).unwrap();
        assert_eq!(value.content, [0x05, 0x00, 0x00, 0x00]);

        let attributes = ber::read_tlv(&mut fields).unwrap();
        assert_eq!(attributes.tag, ber::TAG_SEQUENCE);
        assert!(fields.is_empty());
    }

    #[test]
    fn omits_empty_dns_domain_and_hostname() {
        let req = LdapPingRequest::new("dc1", NetlogonNtVersion::from_bits(1))
            .with_dns_domain("")
            .with_dns_hostname("");
        let bytes = req.to_vec().unwrap();
        let mut outer = Decoder::new(&bytes);
        let message = ber::read_tlv(&mut outer).unwrap();
        let mut inner = Decoder::new(message.content);
        let _message_id = ber::read_tlv(&mut inner).unwrap();
        let search_request = ber::read_tlv(&mut inner).unwrap();
        let mut fields = Decoder::new(search_request.content);
        for _ in 0..6 {
            ber::read_tlv(&mut fields).unwrap();
        }
        let filter = ber::read_tlv(&mut fields).unwrap();
        let mut filter_terms = Decoder::new(filter.content);
        ber::read_tlv(&mut filter_terms).unwrap();
        assert!(filter_terms.is_empty());
    }

    #[test]
    fn includes_dns_domain_and_hostname_when_present() {
        let req = LdapPingRequest::new("dc1", NetlogonNtVersion::from_bits(1))
            .with_dns_domain("example.com")
            .with_dns_hostname("dc1.example.com");
        let bytes = req.to_vec().unwrap();
        let mut outer = Decoder::new(&bytes);
        let message = ber::read_tlv(&mut outer).unwrap();
        let mut inner = Decoder::new(message.content);
        let _message_id = ber::read_tlv(&mut inner).unwrap();
        let search_request = ber::read_tlv(&mut inner).unwrap();
        let mut fields = Decoder::new(search_request.content);
        for _ in 0..6 {
            ber::read_tlv(&mut fields).unwrap();
        }
        let filter = ber::read_tlv(&mut fields).unwrap();
        let mut filter_terms = Decoder::new(filter.content);
        let mut count = 0;
        while !filter_terms.is_empty() {
            ber::read_tlv(&mut filter_terms).unwrap();
            count += 1;
        }
        assert_eq!(count, 3);
    }
}
