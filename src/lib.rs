//! A client-side Active Directory Domain Controller locator.
//!
//! [`locator::DcLocatorBuilder`] ties the three pieces together: DNS SRV
//! discovery ([`dns`]), an LDAP ping codec ([`ldap`], [`transport`]), and
//! a Netlogon response decoder ([`netlogon`]). [`types::DcLocatorRequestBuilder`]
//! builds the request; [`locator::validate_and_normalize`] and the rest
//! of [`locator`] run the location algorithm described in Microsoft's
//! `DsGetDcName` behavior.
#![warn(
    missing_debug_implementations,
    // missing_docs,
    rust_2018_idioms,
    non_snake_case,
    non_upper_case_globals
)]

pub mod decoder;
pub mod dns;
pub mod encoder;
pub mod error;
pub mod flags;
pub mod ldap;
pub mod locator;
pub mod netlogon;
pub mod provider;
pub mod transport;
pub mod types;

pub use error::{Error, Result};
pub use flags::{DcLocatorFlag, DsFlag, NetlogonNtVersion};
pub use locator::{DcLocator, DcLocatorBuilder, Prober, WireProber};
pub use provider::{DnsProvider, ProviderResolution};
pub use types::{DcLocatorRequest, DcLocatorRequestBuilder, DomainControllerInfo};
