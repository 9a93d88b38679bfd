//! Decodes the LDAPMessage stream returned by an LDAP ping and extracts
//! the raw `Netlogon` attribute value (the caller hands that to the
//! Netlogon decoder).
use crate::decoder::Decoder;
use crate::error::{Error, Result};

use super::protocol::{self, ProtocolOp};

/// Parse `bytes` as one or more LDAPMessages terminated by a
/// `SearchResultDone`, and return the first `Netlogon` attribute value
/// seen in any `SearchResultEntry`. Subsequent duplicates are logged and
/// dropped rather than overwriting the first.
pub fn decode_ping_response(bytes: &[u8]) -> Result<Vec<u8>> {
    let mut d = Decoder::new(bytes);
    let mut netlogon_value: Option<Vec<u8>> = None;

    loop {
        if d.is_empty() {
            return Err(Error::Communication {
                addr: "<decode>".to_owned(),
                source: Box::new(crate::error::DecodeError::EndOfBuffer { index: d.position() }),
            });
        }

        match protocol::read_ldap_message(&mut d)? {
            ProtocolOp::SearchResultEntry(entry) => {
                for attribute in entry.attributes {
                    if !attribute.name.eq_ignore_ascii_case(b"Netlogon") {
                        continue;
                    }
                    let Some(value) = attribute.values.first() else {
                        continue;
                    };
                    if netlogon_value.is_some() {
                        log::debug!(
                            "ignoring duplicate Netlogon attribute value in LDAP ping response"
                        );
                    } else {
                        netlogon_value = Some(value.to_vec());
                    }
                }
            }
            ProtocolOp::SearchResultDone(done) => {
                if done.result_code != 0 {
                    return Err(crate::error::DecodeError::LdapResult {
                        code: done.result_code,
                        message: done.diagnostic_message,
                    }
                    .into());
                }
                break;
            }
        }
    }

    netlogon_value.ok_or(Error::NoSuchAttribute)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ldap::ber;

    fn ldap_message(message_id: i64, op_tag: u8, op_content: &[u8]) -> Vec<u8> {
        let mut body = ber::encode_integer(ber::TAG_INTEGER, message_id);
        body.extend(ber::encode_tlv(op_tag, op_content));
        ber::encode_tlv(ber::TAG_SEQUENCE, &body)
    }

    fn search_result_entry(object_name: &str, attrs: &[(&str, &[&[u8]])]) -> Vec<u8> {
        let mut attr_list = Vec::new();
        for (name, values) in attrs {
            let mut vals = Vec::new();
            for v in *values {
                vals.extend(ber::encode_tlv(ber::TAG_OCTET_STRING, v));
            }
            let mut attr = ber::encode_tlv(ber::TAG_OCTET_STRING, name.as_bytes());
            attr.extend(ber::encode_tlv(ber::TAG_SET, &vals));
            attr_list.extend(ber::encode_tlv(ber::TAG_SEQUENCE, &attr));
        }
        let mut body = ber::encode_tlv(ber::TAG_OCTET_STRING, object_name.as_bytes());
        body.extend(ber::encode_tlv(ber::TAG_SEQUENCE, &attr_list));
        body
    }

    fn search_result_done(result_code: i64, diagnostic: &str) -> Vec<u8> {
        let mut body = ber::encode_integer(ber::TAG_ENUMERATED, result_code);
        body.extend(ber::encode_tlv(ber::TAG_OCTET_STRING, b"")); // matchedDN
        body.extend(ber::encode_tlv(
            ber::TAG_OCTET_STRING,
            diagnostic.as_bytes(),
        ));
        body
    }

    #[test]
    fn extracts_netlogon_value() {
        let netlogon_bytes: &[u8] = &[0x13, 0x00, 0xde, 0xad];
        let mut stream = ldap_message(
            1,
            ber::TAG_SEARCH_RESULT_ENTRY,
            &search_result_entry("", &[("Netlogon", &[netlogon_bytes])]),
        );
        stream.extend(ldap_message(
            1,
            ber::TAG_SEARCH_RESULT_DONE,
            &search_result_done(0, ""),
        ));

        let value = decode_ping_response(&stream).unwrap();
        assert_eq!(value, netlogon_bytes);
    }

    #[test]
    fn attribute_name_match_is_case_insensitive() {
        let netlogon_bytes: &[u8] = &[0x01, 0x02];
        let mut stream = ldap_message(
            1,
            ber::TAG_SEARCH_RESULT_ENTRY,
            &search_result_entry("", &[("netLOGON", &[netlogon_bytes])]),
        );
        stream.extend(ldap_message(
            1,
            ber::TAG_SEARCH_RESULT_DONE,
            &search_result_done(0, ""),
        ));
        assert_eq!(decode_ping_response(&stream).unwrap(), netlogon_bytes);
    }

    #[test]
    fn duplicate_values_keep_the_first() {
        let first: &[u8] = &[0x01];
        let second: &[u8] = &[0x02];
        let mut stream = ldap_message(
            1,
            ber::TAG_SEARCH_RESULT_ENTRY,
            &search_result_entry("", &[("Netlogon", &[first])]),
        );
        stream.extend(ldap_message(
            1,
            ber::TAG_SEARCH_RESULT_ENTRY,
            &search_result_entry("", &[("Netlogon", &[second])]),
        ));
        stream.extend(ldap_message(
            1,
            ber::TAG_SEARCH_RESULT_DONE,
            &search_result_done(0, ""),
        ));
        assert_eq!(decode_ping_response(&stream).unwrap(), first);
    }

    #[test]
    fn missing_attribute_is_no_such_attribute() {
        let mut stream = ldap_message(
            1,
            ber::TAG_SEARCH_RESULT_ENTRY,
            &search_result_entry("", &[("otherAttr", &[&[0u8]])]),
        );
        stream.extend(ldap_message(
            1,
            ber::TAG_SEARCH_RESULT_DONE,
            &search_result_done(0, ""),
        ));
        assert!(matches!(
            decode_ping_response(&stream),
            Err(Error::NoSuchAttribute)
        ));
    }

    #[test]
    fn nonzero_result_code_is_an_error() {
        let stream = ldap_message(
            1,
            ber::TAG_SEARCH_RESULT_DONE,
            &search_result_done(32, "no such object"),
        );
        let err = decode_ping_response(&stream).unwrap_err();
        assert!(err.to_string().contains("resultCode 32"));
    }

    #[test]
    fn missing_search_result_done_is_an_error() {
        let stream = ldap_message(
            1,
            ber::TAG_SEARCH_RESULT_ENTRY,
            &search_result_entry("", &[("Netlogon", &[&[0u8]])]),
        );
        assert!(decode_ping_response(&stream).is_err());
    }
}
