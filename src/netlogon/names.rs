//! DNS-label-compressed name decoding (RFC 1035 §4.1.4) and the
//! UTF-16LE "unicode" string encoding, both reused across every
//! Netlogon response variant.
use crate::decoder::Decoder;
use crate::error::{DecodeError, DecodeResult};

/// Decode a sequence of length-prefixed labels, following at most one
/// chain of backward-only compression pointers, joined with `.`. An
/// empty label list decodes to `None`.
///
/// Once a pointer is followed, the outer decoder's cursor resumes right
/// after the first pointer's two bytes -- not wherever the pointer chain
/// eventually bottoms out.
pub fn decode_compressed_name(d: &mut Decoder<'_>) -> DecodeResult<Option<String>> {
    let mut pos = d.position();
    let mut resume: Option<usize> = None;
    let mut labels: Vec<String> = Vec::new();

    loop {
        let len_byte = d.slice_at(pos, 1)?[0];
        if len_byte & 0xc0 == 0xc0 {
            let second = d.slice_at(pos + 1, 1)?[0];
            let offset = (((len_byte & 0x3f) as usize) << 8) | second as usize;
            if resume.is_none() {
                resume = Some(pos + 2);
            }
            if pos < 2 || offset >= pos - 2 {
                return Err(DecodeError::InvalidLabelPointer { at: pos, target: offset });
            }
            pos = offset;
            continue;
        }
        if len_byte & 0xc0 != 0 {
            return Err(DecodeError::InvalidLabelPointer {
                at: pos,
                target: len_byte as usize,
            });
        }

        let len = len_byte as usize;
        if len == 0 {
            pos += 1;
            if resume.is_none() {
                resume = Some(pos);
            }
            break;
        }
        let label = d.slice_at(pos + 1, len)?;
        labels.push(std::str::from_utf8(label)?.to_owned());
        pos += 1 + len;
    }

    d.seek_to(resume.expect("loop always sets resume before breaking"))?;

    if labels.is_empty() {
        Ok(None)
    } else {
        Ok(Some(labels.join(".")))
    }
}

/// Decode a UTF-16LE string terminated by a `0x0000` code unit. A lone
/// terminator decodes to `None`.
pub fn decode_unicode_string(d: &mut Decoder<'_>) -> DecodeResult<Option<String>> {
    let mut units = Vec::new();
    loop {
        let unit = d.read_u16_le()?;
        if unit == 0 {
            break;
        }
        units.push(unit);
    }
    if units.is_empty() {
        return Ok(None);
    }
    String::from_utf16(&units)
        .map(Some)
        .map_err(|_| DecodeError::Utf16Error)
}
