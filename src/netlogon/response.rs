//! The three `NETLOGON_SAM_LOGON_RESPONSE*` wire shapes, modeled as a
//! tagged variant rather than a class hierarchy: [`decode`] is the single
//! constructor, dispatching on the wire opcode and (for opcode 19) on
//! which NT version bits the caller originally requested.
use std::net::{Ipv4Addr, SocketAddrV4};

use uuid::Uuid;

use crate::decoder::Decoder;
use crate::error::{DecodeError, DecodeResult};
use crate::flags::{DsFlag, NetlogonNtVersion};

use super::{guid, names};

/// `LOGON_SAM_LOGON_RESPONSE`, shared by the NT40 and V5 shapes.
const OPCODE_SAM_LOGON_RESPONSE: u16 = 19;
/// `LOGON_SAM_LOGON_RESPONSE_EX`.
const OPCODE_SAM_LOGON_RESPONSE_EX: u16 = 23;

/// The legacy, NT4-compatible response shape.
#[derive(Debug, Clone)]
pub struct NetlogonSamLogonNt40Response {
    /// `\\`-prefixed NetBIOS name of the answering server, if present
    pub logon_server: Option<String>,
    /// requesting user name echoed back, if present
    pub user_name: Option<String>,
    /// NetBIOS domain name, if present
    pub domain_name: Option<String>,
    /// version bits the server actually reported
    pub nt_version: NetlogonNtVersion,
    /// trailing LmToken (required to be non-zero)
    pub lm_token: u16,
    /// trailing NtToken (required to be non-zero)
    pub nt_token: u16,
}

/// The extended (non-EX) response shape.
#[derive(Debug, Clone)]
pub struct NetlogonSamLogonResponse {
    /// `\\`-prefixed NetBIOS name of the answering server, if present
    pub logon_server: Option<String>,
    /// requesting user name echoed back, if present
    pub user_name: Option<String>,
    /// NetBIOS domain name, if present
    pub domain_name: Option<String>,
    /// domain's GUID
    pub domain_guid: Uuid,
    /// DNS name of the forest, if present
    pub dns_forest_name: Option<String>,
    /// DNS name of the domain, if present
    pub dns_domain_name: Option<String>,
    /// DNS name of the answering host, if present
    pub dns_host_name: Option<String>,
    /// the DC's IPv4 address
    pub dc_ip_address: Ipv4Addr,
    /// DS capability flags the DC reports about itself
    pub flags: DsFlag,
    /// version bits the server actually reported
    pub nt_version: NetlogonNtVersion,
    /// trailing LmToken (required to be non-zero)
    pub lm_token: u16,
    /// trailing NtToken (required to be non-zero)
    pub nt_token: u16,
}

/// The current (EX) response shape.
#[derive(Debug, Clone)]
pub struct NetlogonSamLogonExResponse {
    /// DS capability flags the DC reports about itself
    pub flags: DsFlag,
    /// domain's GUID
    pub domain_guid: Uuid,
    /// DNS name of the forest
    pub dns_forest_name: String,
    /// DNS name of the domain
    pub dns_domain_name: String,
    /// DNS name of the answering host
    pub dns_host_name: String,
    /// NetBIOS domain name, if present
    pub netbios_domain_name: Option<String>,
    /// NetBIOS computer name, if present
    pub netbios_computer_name: Option<String>,
    /// requesting user name echoed back, if present
    pub user_name: Option<String>,
    /// the site the answering DC itself belongs to
    pub dc_site_name: String,
    /// the site the probing client belongs to, if the DC could determine it
    pub client_site_name: Option<String>,
    /// present iff the request's NtVersion carried `V5EP`
    pub dc_sock_addr: Option<SocketAddrV4>,
    /// present iff the request's NtVersion carried `VCS`
    pub next_closest_site_name: Option<String>,
    /// version bits the server actually reported
    pub nt_version: NetlogonNtVersion,
    /// trailing LmToken (required to be non-zero)
    pub lm_token: u16,
    /// trailing NtToken (required to be non-zero)
    pub nt_token: u16,
}

/// One decoded Netlogon ping response, tagged by which wire shape it was.
#[derive(Debug, Clone)]
pub enum NetlogonResponse {
    /// opcode 19, decoded as the legacy NT40 shape
    Nt40(NetlogonSamLogonNt40Response),
    /// opcode 19, decoded as the extended (non-EX) shape
    V5(NetlogonSamLogonResponse),
    /// opcode 23
    V5Ex(NetlogonSamLogonExResponse),
}

/// Decode a Netlogon ping response. `requested` is the `NtVer` bit-vector
/// the original LDAP ping asked for: for opcode 19 it decides whether the
/// NT40 or V5 layout applies, since both share an opcode.
pub fn decode(bytes: &[u8], requested: NetlogonNtVersion) -> DecodeResult<NetlogonResponse> {
    let opcode_bytes = bytes
        .get(0..2)
        .ok_or(DecodeError::EndOfBuffer { index: 2 })?;
    let opcode = u16::from_le_bytes([opcode_bytes[0], opcode_bytes[1]]);

    let mut d = Decoder::new(bytes);
    match opcode {
        OPCODE_SAM_LOGON_RESPONSE_EX => Ok(NetlogonResponse::V5Ex(decode_v5ex(&mut d)?)),
        OPCODE_SAM_LOGON_RESPONSE if requested.contains(NetlogonNtVersion::V5) => {
            Ok(NetlogonResponse::V5(decode_v5(&mut d)?))
        }
        OPCODE_SAM_LOGON_RESPONSE => Ok(NetlogonResponse::Nt40(decode_nt40(&mut d)?)),
        other => Err(DecodeError::UnexpectedOpcode {
            found: other,
            expected: OPCODE_SAM_LOGON_RESPONSE,
        }),
    }
}

fn check_lm_tokens(lm_token: u16, nt_token: u16) -> DecodeResult<()> {
    if lm_token == 0 || nt_token == 0 {
        Err(DecodeError::ZeroLmToken)
    } else {
        Ok(())
    }
}

fn check_nt_version(found: NetlogonNtVersion, required: u32) -> DecodeResult<()> {
    if found.contains(required) {
        Ok(())
    } else {
        Err(DecodeError::MissingNtVersionBits {
            found: found.bits(),
            required,
        })
    }
}

fn decode_nt40(d: &mut Decoder<'_>) -> DecodeResult<NetlogonSamLogonNt40Response> {
    let opcode = d.read_u16_le()?;
    if opcode != OPCODE_SAM_LOGON_RESPONSE {
        return Err(DecodeError::UnexpectedOpcode {
            found: opcode,
            expected: OPCODE_SAM_LOGON_RESPONSE,
        });
    }
    let logon_server = names::decode_unicode_string(d)?;
    let user_name = names::decode_unicode_string(d)?;
    let domain_name = names::decode_unicode_string(d)?;
    let nt_version = NetlogonNtVersion::from_bits(d.read_u32_le()?);
    let lm_token = d.read_u16_le()?;
    let nt_token = d.read_u16_le()?;
    check_lm_tokens(lm_token, nt_token)?;
    check_nt_version(nt_version, NetlogonNtVersion::V1)?;

    Ok(NetlogonSamLogonNt40Response {
        logon_server,
        user_name,
        domain_name,
        nt_version,
        lm_token,
        nt_token,
    })
}

fn decode_v5(d: &mut Decoder<'_>) -> DecodeResult<NetlogonSamLogonResponse> {
    let opcode = d.read_u16_le()?;
    if opcode != OPCODE_SAM_LOGON_RESPONSE {
        return Err(DecodeError::UnexpectedOpcode {
            found: opcode,
            expected: OPCODE_SAM_LOGON_RESPONSE,
        });
    }
    let logon_server = names::decode_unicode_string(d)?;
    let user_name = names::decode_unicode_string(d)?;
    let domain_name = names::decode_unicode_string(d)?;
    let domain_guid = guid::decode_guid(d)?;
    let _null_guid: [u8; 16] = d.read()?;
    let dns_forest_name = names::decode_compressed_name(d)?;
    let dns_domain_name = names::decode_compressed_name(d)?;
    let dns_host_name = names::decode_compressed_name(d)?;

    let mut ip_bytes: [u8; 4] = d.read()?;
    ip_bytes.reverse();
    let dc_ip_address = Ipv4Addr::from(ip_bytes);

    let flags = DsFlag::from_bits(d.read_u32_le()?);
    let nt_version = NetlogonNtVersion::from_bits(d.read_u32_le()?);
    let lm_token = d.read_u16_le()?;
    let nt_token = d.read_u16_le()?;
    check_lm_tokens(lm_token, nt_token)?;
    check_nt_version(nt_version, NetlogonNtVersion::V1 | NetlogonNtVersion::V5)?;

    Ok(NetlogonSamLogonResponse {
        logon_server,
        user_name,
        domain_name,
        domain_guid,
        dns_forest_name,
        dns_domain_name,
        dns_host_name,
        dc_ip_address,
        flags,
        nt_version,
        lm_token,
        nt_token,
    })
}

fn decode_v5ex(d: &mut Decoder<'_>) -> DecodeResult<NetlogonSamLogonExResponse> {
    let total_len = d.len();

    let opcode = d.read_u16_le()?;
    if opcode != OPCODE_SAM_LOGON_RESPONSE_EX {
        return Err(DecodeError::UnexpectedOpcode {
            found: opcode,
            expected: OPCODE_SAM_LOGON_RESPONSE_EX,
        });
    }
    let _sbz = d.read_u16_le()?;
    let flags = DsFlag::from_bits(d.read_u32_le()?);
    let domain_guid = guid::decode_guid(d)?;
    let dns_forest_name = names::decode_compressed_name(d)?.unwrap_or_default();
    let dns_domain_name = names::decode_compressed_name(d)?.unwrap_or_default();
    let dns_host_name = names::decode_compressed_name(d)?.unwrap_or_default();
    let netbios_domain_name = names::decode_compressed_name(d)?;
    let netbios_computer_name = names::decode_compressed_name(d)?;
    let user_name = names::decode_compressed_name(d)?;
    let dc_site_name = names::decode_compressed_name(d)?.unwrap_or_default();
    let client_site_name = names::decode_compressed_name(d)?;

    if total_len < 8 {
        return Err(DecodeError::EndOfBuffer { index: total_len });
    }
    let nt_version_offset = total_len - 8;
    let nt_version_bytes = d.slice_at(nt_version_offset, 4)?;
    let nt_version = NetlogonNtVersion::from_bits(u32::from_le_bytes(
        nt_version_bytes.try_into().expect("slice_at(.., 4)"),
    ));

    let dc_sock_addr = if nt_version.contains(NetlogonNtVersion::V5EP) {
        let _dc_sock_addr_size = d.read_u8()?;
        let sin_family = d.read_u16_le()?;
        let sin_port = d.read_u16()?;
        let sin_addr: [u8; 4] = d.read()?;
        let _sin_zero: [u8; 8] = d.read()?;
        if sin_family == 2 {
            Some(SocketAddrV4::new(Ipv4Addr::from(sin_addr), sin_port))
        } else {
            log::debug!(
                "netlogon dcSockAddr had unexpected sin_family {sin_family}, ignoring address"
            );
            None
        }
    } else {
        None
    };

    let next_closest_site_name = if nt_version.contains(NetlogonNtVersion::VCS) {
        names::decode_compressed_name(d)?
    } else {
        None
    };

    if d.position() != nt_version_offset {
        return Err(DecodeError::TrailingFieldMisaligned {
            expected: nt_version_offset,
            found: d.position(),
        });
    }
    let _nt_version_consumed = d.read_u32_le()?;
    let lm_token = d.read_u16_le()?;
    let nt_token = d.read_u16_le()?;
    check_lm_tokens(lm_token, nt_token)?;
    check_nt_version(nt_version, NetlogonNtVersion::V1 | NetlogonNtVersion::V5EX)?;

    Ok(NetlogonSamLogonExResponse {
        flags,
        domain_guid,
        dns_forest_name,
        dns_domain_name,
        dns_host_name,
        netbios_domain_name,
        netbios_computer_name,
        user_name,
        dc_site_name,
        client_site_name,
        dc_sock_addr,
        next_closest_site_name,
        nt_version,
        lm_token,
        nt_token,
    })
}
