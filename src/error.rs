//! Error types for the locator, its codecs, and its transports.
use std::net::SocketAddr;

use thiserror::Error;

/// Convenience type for decode errors.
pub type DecodeResult<T> = Result<T, DecodeError>;

/// Returned from types that decode a wire format (BER, Netlogon).
#[derive(Error, Debug)]
pub enum DecodeError {
    /// decoder ran out of bytes to read
    #[error("decoder ran out of bytes to read on byte {index}")]
    EndOfBuffer {
        /// index in buffer
        index: usize,
    },

    /// add overflow while computing an offset
    #[error("decoder checked_add failed")]
    AddOverflow,

    /// error converting to utf-8
    #[error("error converting to UTF-8: {0}")]
    Utf8Error(#[from] std::str::Utf8Error),

    /// error converting a utf-16 sequence
    #[error("error converting UTF-16 string")]
    Utf16Error,

    /// a BER tag did not match what was expected at this point in the grammar
    #[error("unexpected BER tag {found:#x}, expected {expected:#x}")]
    UnexpectedTag {
        /// tag found on the wire
        found: u8,
        /// tag expected by the grammar
        expected: u8,
    },

    /// a BER length encoding was malformed (e.g. the reserved 0x80 indefinite form)
    #[error("malformed BER length octet {0:#x}")]
    MalformedLength(u8),

    /// a DNS label-compression pointer pointed forward or at/after itself
    #[error("label pointer at position {at} targets invalid offset {target}")]
    InvalidLabelPointer {
        /// position of the pointer byte
        at: usize,
        /// offset the pointer referred to
        target: usize,
    },

    /// an LDAP `SearchResultDone` reported a non-success resultCode
    #[error("LDAP ping failed with resultCode {code}: {message}")]
    LdapResult {
        /// the LDAP resultCode
        code: i64,
        /// diagnosticMessage, if the server sent one
        message: String,
    },

    /// an opcode on the wire did not match the variant being decoded
    #[error("unexpected netlogon opcode {found}, expected {expected}")]
    UnexpectedOpcode {
        /// opcode found on the wire
        found: u16,
        /// opcode expected for this response variant
        expected: u16,
    },

    /// a trailing LmNtToken/Lm20Token field was all-zero
    #[error("netlogon response carried an all-zero LmToken")]
    ZeroLmToken,

    /// after parsing V5EX's optional trailing fields the cursor did not land
    /// on the NtVersion offset that was peeked ahead of time
    #[error("netlogon V5EX trailing fields misaligned: expected NtVersion at {expected}, cursor at {found}")]
    TrailingFieldMisaligned {
        /// offset the NtVersion int32 was peeked at
        expected: usize,
        /// where the cursor actually ended up
        found: usize,
    },

    /// the NtVersion bits actually present were not a superset of what was requested
    #[error(
        "netlogon response NtVersion {found:#x} does not contain required bits {required:#x}"
    )]
    MissingNtVersionBits {
        /// bits present on the wire
        found: u32,
        /// bits the variant requires
        required: u32,
    },
}

/// Convenience type for encode errors.
pub type EncodeResult<T> = Result<T, EncodeError>;

/// Returned from types that encode a wire format.
#[derive(Error, Debug)]
pub enum EncodeError {
    /// addition overflow while laying out a buffer
    #[error("encoder checked_add failed")]
    AddOverflow,

    /// a value exceeds the size its field can carry
    #[error("value of length {len} exceeds the max size of {max}")]
    ValueTooBig {
        /// size of the value
        len: usize,
        /// max size allowed
        max: usize,
    },
}

/// Parsing a pipe-delimited flag string failed because a token was unrecognized.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown flag token {0:?}")]
pub struct FlagParseError(pub String);

/// Convenience type for locator-level results.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error taxonomy for the DC locator.
///
/// Each variant corresponds to one of the error kinds described by the
/// locator's error handling design: validation failures abort before any
/// I/O, communication failures against a single candidate are logged and
/// retried against the next candidate, and `ServiceUnavailable` is only
/// raised once every candidate has been exhausted.
#[derive(Error, Debug)]
pub enum Error {
    /// the request was malformed or internally inconsistent
    #[error("configuration error: {0}")]
    Configuration(String),

    /// the caller asked for an operation this locator does not implement
    #[error("operation not supported: {0}")]
    OperationNotSupported(String),

    /// network I/O (resolve, connect, read, write) or wire decoding failed
    #[error("communication error talking to {addr}: {source}")]
    Communication {
        /// the address that was being contacted
        addr: String,
        /// underlying cause
        #[source]
        source: Box<dyn std::error::Error + Send + Sync + 'static>,
    },

    /// DNS or probing produced candidates but none passed filtering
    #[error(
        "no domain controller satisfied the request after probing {tried} candidate(s) for domain {domain:?} site {site:?}"
    )]
    ServiceUnavailable {
        /// number of candidates that were probed
        tried: usize,
        /// domain that was queried
        domain: String,
        /// site that was queried, if any
        site: Option<String>,
    },

    /// the requested SRV name does not exist at all
    #[error("name not found: {0}")]
    NameNotFound(String),

    /// the LDAP response decoded correctly but carried no Netlogon attribute
    #[error("no such attribute: Netlogon value was not present in the response")]
    NoSuchAttribute,
}

impl Error {
    /// Wrap an I/O-ish failure against a specific peer as a communication error.
    pub fn communication(
        addr: impl Into<SocketAddrOrName>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Error::Communication {
            addr: addr.into().0,
            source: Box::new(source),
        }
    }
}

/// Accepts either a [`SocketAddr`] or a plain string when building an
/// [`Error::Communication`] -- probes may fail before a name ever resolves.
pub struct SocketAddrOrName(String);

impl From<SocketAddr> for SocketAddrOrName {
    fn from(addr: SocketAddr) -> Self {
        Self(addr.to_string())
    }
}
impl From<&str> for SocketAddrOrName {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}
impl From<String> for SocketAddrOrName {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<DecodeError> for Error {
    fn from(e: DecodeError) -> Self {
        Error::Communication {
            addr: "<decode>".to_owned(),
            source: Box::new(e),
        }
    }
}

impl From<EncodeError> for Error {
    fn from(e: EncodeError) -> Self {
        Error::Communication {
            addr: "<encode>".to_owned(),
            source: Box::new(e),
        }
    }
}

impl From<FlagParseError> for Error {
    fn from(e: FlagParseError) -> Self {
        Error::Configuration(e.to_string())
    }
}
