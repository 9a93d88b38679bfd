//! Minimal BER (Basic Encoding Rules) primitives -- just enough to build
//! and tear down the handful of LDAP PDUs the ping needs. This is not a
//! general ASN.1 library: only definite-length tags are supported, which
//! is all an LDAP ping request or an AD DC's response ever uses.
use crate::decoder::Decoder;
use crate::encoder::Encoder;
use crate::error::{DecodeError, DecodeResult, EncodeResult};

/// universal SEQUENCE
pub const TAG_SEQUENCE: u8 = 0x30;
/// universal INTEGER
pub const TAG_INTEGER: u8 = 0x02;
/// universal OCTET STRING
pub const TAG_OCTET_STRING: u8 = 0x04;
/// universal ENUMERATED
pub const TAG_ENUMERATED: u8 = 0x0a;
/// universal BOOLEAN
pub const TAG_BOOLEAN: u8 = 0x01;
/// universal SET (constructed)
pub const TAG_SET: u8 = 0x31;
/// APPLICATION 3, constructed: SearchRequest
pub const TAG_SEARCH_REQUEST: u8 = 0x63;
/// APPLICATION 4, constructed: SearchResultEntry
pub const TAG_SEARCH_RESULT_ENTRY: u8 = 0x64;
/// APPLICATION 5, constructed: SearchResultDone
pub const TAG_SEARCH_RESULT_DONE: u8 = 0x65;
/// context [0] constructed: "and" filter
pub const TAG_FILTER_AND: u8 = 0xa0;
/// context [3] constructed: equalityMatch AttributeValueAssertion
pub const TAG_EQUALITY_MATCH: u8 = 0xa3;

/// One decoded tag-length-value, borrowing its content from the input.
#[derive(Debug, Clone, Copy)]
pub struct Tlv<'a> {
    /// the tag octet, including class and constructed bits
    pub tag: u8,
    /// the value octets
    pub content: &'a [u8],
}

/// Encode the BER definite-length octets for `len`.
pub fn encode_length(len: usize) -> Vec<u8> {
    if len < 0x80 {
        return vec![len as u8];
    }
    let be = len.to_be_bytes();
    let first_nonzero = be.iter().position(|&b| b != 0).unwrap_or(be.len() - 1);
    let significant = &be[first_nonzero..];
    let mut out = Vec::with_capacity(1 + significant.len());
    out.push(0x80 | significant.len() as u8);
    out.extend_from_slice(significant);
    out
}

/// Wrap `content` in a tag + definite-length header.
pub fn encode_tlv(tag: u8, content: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(2 + content.len());
    out.push(tag);
    out.extend(encode_length(content.len()));
    out.extend_from_slice(content);
    out
}

/// Encode a minimal two's-complement INTEGER/ENUMERATED value.
pub fn encode_integer(tag: u8, value: i64) -> Vec<u8> {
    let mut bytes = value.to_be_bytes().to_vec();
    while bytes.len() > 1 {
        let drop_leading_zero = bytes[0] == 0x00 && bytes[1] & 0x80 == 0;
        let drop_leading_ff = bytes[0] == 0xff && bytes[1] & 0x80 != 0;
        if drop_leading_zero || drop_leading_ff {
            bytes.remove(0);
        } else {
            break;
        }
    }
    encode_tlv(tag, &bytes)
}

/// Encode a BOOLEAN.
pub fn encode_boolean(value: bool) -> Vec<u8> {
    encode_tlv(TAG_BOOLEAN, &[if value { 0xff } else { 0x00 }])
}

/// Read the BER definite-length header; the indefinite form (`0x80`) is
/// rejected since neither the request nor the response ever uses it.
fn read_length(d: &mut Decoder<'_>) -> DecodeResult<usize> {
    let first = d.read_u8()?;
    if first & 0x80 == 0 {
        return Ok(first as usize);
    }
    let n = (first & 0x7f) as usize;
    if n == 0 {
        return Err(DecodeError::MalformedLength(first));
    }
    let bytes = d.read_slice(n)?;
    Ok(bytes.iter().fold(0usize, |acc, &b| (acc << 8) | b as usize))
}

/// Read one TLV, consuming its tag, length, and content from `d`.
pub fn read_tlv<'a>(d: &mut Decoder<'a>) -> DecodeResult<Tlv<'a>> {
    let tag = d.read_u8()?;
    let len = read_length(d)?;
    let content = d.read_slice(len)?;
    Ok(Tlv { tag, content })
}

/// Decode a two's-complement INTEGER/ENUMERATED value.
pub fn decode_integer(content: &[u8]) -> DecodeResult<i64> {
    if content.is_empty() {
        return Err(DecodeError::EndOfBuffer { index: 0 });
    }
    let mut value: i64 = if content[0] & 0x80 != 0 { -1 } else { 0 };
    for &b in content {
        value = (value << 8) | b as i64;
    }
    Ok(value)
}

/// Write already-assembled BER bytes through an [`Encoder`].
pub fn write(e: &mut Encoder<'_>, bytes: &[u8]) -> EncodeResult<()> {
    e.write_slice(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_form_length() {
        assert_eq!(encode_length(5), vec![0x05]);
        assert_eq!(encode_length(127), vec![0x7f]);
    }

    #[test]
    fn long_form_length() {
        assert_eq!(encode_length(128), vec![0x81, 0x80]);
        assert_eq!(encode_length(300), vec![0x82, 0x01, 0x2c]);
    }

    #[test]
    fn integer_round_trip() {
        for v in [0i64, 1, -1, 5, 127, 128, 255, 256, -128, -129, 0x7fffffff] {
            let enc = encode_integer(TAG_INTEGER, v);
            let mut d = Decoder::new(&enc);
            let tlv = read_tlv(&mut d).unwrap();
            assert_eq!(tlv.tag, TAG_INTEGER);
            assert_eq!(decode_integer(tlv.content).unwrap(), v);
        }
    }

    #[test]
    fn indefinite_length_is_rejected() {
        let mut d = Decoder::new(&[0x30, 0x80]);
        assert!(matches!(
            read_tlv(&mut d),
            Err(DecodeError::MalformedLength(0x80))
        ));
    }
}
