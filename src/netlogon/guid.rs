//! The Microsoft `GUID` wire layout: `Data1` (u32 LE), `Data2` (u16 LE),
//! `Data3` (u16 LE), `Data4` (8 bytes, network order). `uuid::Uuid::from_fields`
//! takes exactly this shape, so there is no manual byte shuffling to get
//! the most-significant 64 bits right.
use uuid::Uuid;

use crate::decoder::Decoder;
use crate::error::DecodeResult;

/// Decode a 16-byte Microsoft GUID into a [`Uuid`].
pub fn decode_guid(d: &mut Decoder<'_>) -> DecodeResult<Uuid> {
    let data1 = d.read_u32_le()?;
    let data2 = d.read_u16_le()?;
    let data3 = d.read_u16_le()?;
    let data4: [u8; 8] = d.read()?;
    Ok(Uuid::from_fields(data1, data2, data3, &data4))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_known_guid() {
        // Data1=0x01020304, Data2=0x0506, Data3=0x0708, Data4=0x090a0b0c0d0e0f10
        let bytes: [u8; 16] = [
            0x04, 0x03, 0x02, 0x01, // Data1 LE
            0x06, 0x05, // Data2 LE
            0x08, 0x07, // Data3 LE
            0x09, 0x0a, 0x0b, 0x0c, 0x0d, 0x0e, 0x0f, 0x10, // Data4
        ];
        let mut d = Decoder::new(&bytes);
        let uuid = decode_guid(&mut d).unwrap();
        assert_eq!(
            uuid.to_string(),
            "01020304-0506-0708-090a-0b0c0d0e0f10"
        );
    }
}
