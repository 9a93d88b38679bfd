//! Tag-level parsing of the three LDAPMessage shapes the ping ever sees:
//! `SearchResultEntry`, `SearchResultDone`, and nothing else.
use crate::decoder::Decoder;
use crate::error::{DecodeError, DecodeResult};

use super::ber;

/// One attribute and its values, as carried in a `SearchResultEntry`.
pub struct PartialAttribute<'a> {
    /// attribute description (e.g. `"Netlogon"`)
    pub name: &'a [u8],
    /// raw attribute values, in wire order
    pub values: Vec<&'a [u8]>,
}

/// A decoded `SearchResultEntry` protocolOp.
pub struct SearchResultEntry<'a> {
    /// attributes attached to this entry
    pub attributes: Vec<PartialAttribute<'a>>,
}

/// A decoded `SearchResultDone` protocolOp.
pub struct SearchResultDone {
    /// LDAP resultCode; 0 is success
    pub result_code: i64,
    /// diagnosticMessage, possibly empty
    pub diagnostic_message: String,
}

/// One parsed LDAPMessage's protocolOp.
pub enum ProtocolOp<'a> {
    /// `SearchResultEntry` (APPLICATION 4)
    SearchResultEntry(SearchResultEntry<'a>),
    /// `SearchResultDone` (APPLICATION 5)
    SearchResultDone(SearchResultDone),
}

/// Read one `LDAPMessage ::= SEQUENCE { messageID INTEGER, protocolOp CHOICE {...}, ... }`
/// from the front of `d`, returning its protocolOp.
pub fn read_ldap_message<'a>(d: &mut Decoder<'a>) -> DecodeResult<ProtocolOp<'a>> {
    let message = ber::read_tlv(d)?;
    if message.tag != ber::TAG_SEQUENCE {
        return Err(DecodeError::UnexpectedTag {
            found: message.tag,
            expected: ber::TAG_SEQUENCE,
        });
    }

    let mut fields = Decoder::new(message.content);
    let message_id = ber::read_tlv(&mut fields)?;
    if message_id.tag != ber::TAG_INTEGER {
        return Err(DecodeError::UnexpectedTag {
            found: message_id.tag,
            expected: ber::TAG_INTEGER,
        });
    }

    let op = ber::read_tlv(&mut fields)?;
    match op.tag {
        ber::TAG_SEARCH_RESULT_ENTRY => Ok(ProtocolOp::SearchResultEntry(
            read_search_result_entry(op.content)?,
        )),
        ber::TAG_SEARCH_RESULT_DONE => Ok(ProtocolOp::SearchResultDone(read_search_result_done(
            op.content,
        )?)),
        other => Err(DecodeError::UnexpectedTag {
            found: other,
            expected: ber::TAG_SEARCH_RESULT_ENTRY,
        }),
    }
}

fn read_search_result_entry(content: &[u8]) -> DecodeResult<SearchResultEntry<'_>> {
    let mut d = Decoder::new(content);
    let _object_name = ber::read_tlv(&mut d)?; // objectName, not needed for a ping

    let attribute_list = ber::read_tlv(&mut d)?;
    if attribute_list.tag != ber::TAG_SEQUENCE {
        return Err(DecodeError::UnexpectedTag {
            found: attribute_list.tag,
            expected: ber::TAG_SEQUENCE,
        });
    }

    let mut attrs = Decoder::new(attribute_list.content);
    let mut attributes = Vec::new();
    while !attrs.is_empty() {
        let partial_attribute = ber::read_tlv(&mut attrs)?;
        if partial_attribute.tag != ber::TAG_SEQUENCE {
            return Err(DecodeError::UnexpectedTag {
                found: partial_attribute.tag,
                expected: ber::TAG_SEQUENCE,
            });
        }
        let mut fields = Decoder::new(partial_attribute.content);
        let name = ber::read_tlv(&mut fields)?;
        let vals = ber::read_tlv(&mut fields)?;
        if vals.tag != ber::TAG_SET {
            return Err(DecodeError::UnexpectedTag {
                found: vals.tag,
                expected: ber::TAG_SET,
            });
        }
        let mut vals_decoder = Decoder::new(vals.content);
        let mut values = Vec::new();
        while !vals_decoder.is_empty() {
            let value = ber::read_tlv(&mut vals_decoder)?;
            values.push(value.content);
        }
        attributes.push(PartialAttribute {
            name: name.content,
            values,
        });
    }

    Ok(SearchResultEntry { attributes })
}

fn read_search_result_done(content: &[u8]) -> DecodeResult<SearchResultDone> {
    let mut d = Decoder::new(content);
    let result_code = ber::read_tlv(&mut d)?;
    let result_code = ber::decode_integer(result_code.content)?;
    let _matched_dn = ber::read_tlv(&mut d)?;
    let diagnostic_message = ber::read_tlv(&mut d)?;
    let diagnostic_message = String::from_utf8_lossy(diagnostic_message.content).into_owned();
    Ok(SearchResultDone {
        result_code,
        diagnostic_message,
    })
}
