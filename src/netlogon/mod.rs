//! Decodes the `NETLOGON_SAM_LOGON_RESPONSE{,_EX,_NT40}` binary formats
//! carried as the LDAP ping's `Netlogon` attribute value.
pub mod guid;
pub mod names;
pub mod response;

pub use response::{
    NetlogonResponse, NetlogonSamLogonExResponse, NetlogonSamLogonNt40Response,
    NetlogonSamLogonResponse, decode,
};
