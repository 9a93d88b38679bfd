//! DNS SRV locator: AD-shaped name construction, a synchronous wire
//! client, and RFC 2782 priority/weight host selection.
pub mod name;
pub mod request;
pub mod resolver;
pub mod srv;

pub use name::build_srv_name;
pub use request::{DcTypeToken, DnsLocatorRequest, ServiceToken, TransportToken};
pub use resolver::{DnsLocator, DnsLocatorBuilder, SrvResolver, WireResolver};
pub use srv::{CandidateHost, SrvRecord};
