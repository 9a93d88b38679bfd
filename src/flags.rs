//! Bit-flag enumerations used across the locator: DC-locator request
//! flags, DS capability flags returned by a domain controller, and
//! Netlogon `NtVer` bits.
//!
//! All three follow the same shape, so [`flag_set!`] generates the
//! common `int <-> set`, `set <-> string` conversions once. Token order
//! on output always matches declaration order, matching how the real
//! DC locator renders `nltest`-style flag strings.
use std::fmt;

use crate::error::FlagParseError;

macro_rules! flag_set {
    (
        $(#[$meta:meta])*
        $name:ident : $repr:ty {
            $($(#[$vmeta:meta])* $variant:ident = $value:expr => $token:expr),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Copy, Clone, PartialEq, Eq, Default, Hash)]
        pub struct $name($repr);

        impl $name {
            $(
                $(#[$vmeta])*
                #[allow(non_upper_case_globals)]
                pub const $variant: $repr = $value;
            )+

            const ALL: &'static [($repr, &'static str)] = &[
                $(($value, $token)),+
            ];

            /// The empty flag set.
            pub fn empty() -> Self {
                Self(0)
            }

            /// Build a set from a raw bit-vector, keeping unknown bits as-is.
            pub fn from_bits(bits: $repr) -> Self {
                Self(bits)
            }

            /// The raw bit-vector for this set.
            pub fn bits(self) -> $repr {
                self.0
            }

            /// Whether every bit of `flag` is present in this set.
            pub fn contains(self, flag: $repr) -> bool {
                self.0 & flag == flag
            }

            /// Whether this set carries no bits at all.
            pub fn is_empty(self) -> bool {
                self.0 == 0
            }

            /// Number of known flags set (bits outside `ALL` are ignored).
            pub fn count(self) -> usize {
                Self::ALL.iter().filter(|(bit, _)| self.0 & bit == *bit).count()
            }

            /// Set `flag`'s bits, returning the updated set.
            pub fn insert(mut self, flag: $repr) -> Self {
                self.0 |= flag;
                self
            }

            /// Clear `flag`'s bits, returning the updated set.
            pub fn remove(mut self, flag: $repr) -> Self {
                self.0 &= !flag;
                self
            }

            /// Union of two sets.
            pub fn union(self, other: Self) -> Self {
                Self(self.0 | other.0)
            }

            /// Render as the canonical `A|B|C` string, in declaration order.
            /// Bits with no known name are silently dropped.
            pub fn to_flags_string(self) -> String {
                Self::ALL
                    .iter()
                    .filter(|(bit, _)| *bit != 0 && self.0 & bit == *bit)
                    .map(|(_, name)| *name)
                    .collect::<Vec<_>>()
                    .join("|")
            }

            /// Parse the canonical `A|B|C` string. Unknown tokens are a hard error;
            /// the empty string parses to the empty set.
            pub fn from_flags_string(s: &str) -> Result<Self, FlagParseError> {
                let mut out = Self::empty();
                let s = s.trim();
                if s.is_empty() {
                    return Ok(out);
                }
                for token in s.split('|') {
                    let token = token.trim();
                    let (bit, _) = Self::ALL
                        .iter()
                        .find(|(_, name)| *name == token)
                        .ok_or_else(|| FlagParseError(token.to_owned()))?;
                    out.0 |= bit;
                }
                Ok(out)
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({:#x}, {})", stringify!($name), self.0, self.to_flags_string())
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.to_flags_string())
            }
        }

        impl From<$repr> for $name {
            fn from(bits: $repr) -> Self {
                Self::from_bits(bits)
            }
        }
        impl From<$name> for $repr {
            fn from(set: $name) -> Self {
                set.bits()
            }
        }
        impl std::ops::BitOr for $name {
            type Output = Self;
            fn bitor(self, rhs: Self) -> Self {
                self.union(rhs)
            }
        }
    };
}

flag_set! {
    /// Flags a caller passes into [`crate::locator::DcLocatorRequest`] to
    /// steer which kind of domain controller is acceptable.
    ///
    /// Values match the well-known `DS_*` constants from `dsgetdc.h`.
    DcLocatorFlag: u32 {
        /// force a fresh lookup rather than reusing any cached result (accepted, ignored)
        ForceRediscovery = 0x0000_0001 => "DS_FORCE_REDISCOVERY",
        /// require an LDAP/directory-services-capable DC
        DirectoryServiceRequired = 0x0000_0010 => "DS_DIRECTORY_SERVICE_REQUIRED",
        /// prefer but do not require directory services (accepted, ignored)
        DirectoryServicePreferred = 0x0000_0020 => "DS_DIRECTORY_SERVICE_PREFERRED",
        /// require a Global Catalog server
        GcServerRequired = 0x0000_0040 => "DS_GC_SERVER_REQUIRED",
        /// require the PDC emulator
        PdcRequired = 0x0000_0080 => "DS_PDC_REQUIRED",
        /// only use cached/background information (accepted, ignored)
        BackgroundOnly = 0x0000_0100 => "DS_BACKGROUND_ONLY",
        /// caller wants the DC's IP address in the result
        IpRequired = 0x0000_0200 => "DS_IP_REQUIRED",
        /// require a KDC
        KdcRequired = 0x0000_0400 => "DS_KDC_REQUIRED",
        /// require w32time service support
        TimeservRequired = 0x0000_0800 => "DS_TIMESERV_REQUIRED",
        /// require a writable DC
        WritableRequired = 0x0000_1000 => "DS_WRITABLE_REQUIRED",
        /// prefer (not require) a good time server (accepted, ignored)
        GoodTimeservPreferred = 0x0000_2000 => "DS_GOOD_TIMESERV_PREFERRED",
        /// avoid returning the local machine (accepted, ignored)
        AvoidSelf = 0x0000_4000 => "DS_AVOID_SELF",
        /// only an LDAP ping is needed, skip RPC-only capability checks
        OnlyLdapNeeded = 0x0000_8000 => "DS_ONLY_LDAP_NEEDED",
        /// domainName is a flat (NetBIOS) name -- unsupported, rejected at validation
        IsFlatName = 0x0001_0000 => "DS_IS_FLAT_NAME",
        /// domainName is a DNS name
        IsDnsName = 0x0002_0000 => "DS_IS_DNS_NAME",
        /// if the site-specific query fails, retry against the client's next-closest site
        TryNextClosestSite = 0x0004_0000 => "DS_TRY_NEXTCLOSEST_SITE",
        /// require Directory Services 6.0 support
        DirectoryService6Required = 0x0008_0000 => "DS_DIRECTORY_SERVICE_6_REQUIRED",
        /// require the ADWS web service
        WebServiceRequired = 0x0010_0000 => "DS_WEB_SERVICE_REQUIRED",
        /// require Directory Services 8.0 support
        DirectoryService8Required = 0x0020_0000 => "DS_DIRECTORY_SERVICE_8_REQUIRED",
        /// require Directory Services 9.0 support
        DirectoryService9Required = 0x0040_0000 => "DS_DIRECTORY_SERVICE_9_REQUIRED",
        /// require Directory Services 10.0 support
        DirectoryService10Required = 0x0080_0000 => "DS_DIRECTORY_SERVICE_10_REQUIRED",
        /// require public-key trust anchor / key list support
        KeyListSupportRequired = 0x0100_0000 => "DS_KEY_LIST_SUPPORT_REQUIRED",
        /// return the DC's DNS name in the result
        ReturnDnsName = 0x4000_0000 => "DS_RETURN_DNS_NAME",
        /// return the DC's flat (NetBIOS) name in the result
        ReturnFlatName = 0x8000_0000 => "DS_RETURN_FLAT_NAME",
    }
}

flag_set! {
    /// Capability flags a domain controller reports about itself in a
    /// Netlogon ping response, and that appear (plus `DnsForest`) in
    /// the final [`crate::locator::DomainControllerInfo`].
    DsFlag: u32 {
        /// PDC emulator
        Pdc = 0x0000_0001 => "DS_PDC_FLAG",
        /// Global Catalog server
        Gc = 0x0000_0004 => "DS_GC_FLAG",
        /// answers LDAP
        Ldap = 0x0000_0008 => "DS_LDAP_FLAG",
        /// directory service (i.e. is a DC, not just a member server)
        Ds = 0x0000_0010 => "DS_DS_FLAG",
        /// KDC
        Kdc = 0x0000_0020 => "DS_KDC_FLAG",
        /// w32time time server
        Timeserv = 0x0000_0040 => "DS_TIMESERV_FLAG",
        /// is in the client's own site
        Closest = 0x0000_0080 => "DS_CLOSEST_FLAG",
        /// writable DC
        Writable = 0x0000_0100 => "DS_WRITABLE_FLAG",
        /// a "good" (non-default-weight) time server
        GoodTimeserv = 0x0000_0200 => "DS_GOOD_TIMESERV_FLAG",
        /// non-domain NC server
        Ndnc = 0x0000_0400 => "DS_NDNC_FLAG",
        /// selects the secret domain (Windows 2000 SP1+ trust key rollover)
        SelectSecretDomain6 = 0x0000_0800 => "DS_SELECT_SECRET_DOMAIN_6_FLAG",
        /// full secret domain (Windows 2000 SP1+ trust key rollover)
        FullSecretDomain6 = 0x0000_1000 => "DS_FULL_SECRET_DOMAIN_6_FLAG",
        /// ADWS web service
        Ws = 0x0000_2000 => "DS_WS_FLAG",
        /// Directory Services 8.0 (Windows Server 2008)
        Ds8 = 0x0000_4000 => "DS_DS_8_FLAG",
        /// Directory Services 9.0 (Windows Server 2008 R2)
        Ds9 = 0x0000_8000 => "DS_DS_9_FLAG",
        /// Directory Services 10.0 (Windows Server 2012)
        Ds10 = 0x0001_0000 => "DS_DS_10_FLAG",
        /// public-key trust anchor / key list support
        KeyList = 0x0002_0000 => "DS_KEY_LIST_FLAG",
        /// server is a DC for `DnsDomain`
        DnsController = 0x2000_0000 => "DS_DNS_CONTROLLER_FLAG",
        /// `DnsDomain` is a DNS-named domain
        DnsDomain = 0x4000_0000 => "DS_DNS_DOMAIN_FLAG",
        /// `DnsForest` is a DNS-named forest
        DnsForest = 0x8000_0000 => "DS_DNS_FOREST_FLAG",
    }
}

flag_set! {
    /// Bits of the Netlogon `NtVer` filter term and the version field
    /// echoed back in every `NETLOGON_SAM_LOGON_RESPONSE*` variant.
    NetlogonNtVersion: u32 {
        /// base NT4-style response shape is understood
        V1 = 0x0000_0001 => "NETLOGON_NT_VERSION_1",
        /// caller understands the V5 (extended, non-EX) response shape
        V5 = 0x0000_0002 => "NETLOGON_NT_VERSION_5",
        /// caller understands the V5EX response shape
        V5EX = 0x0000_0004 => "NETLOGON_NT_VERSION_5EX",
        /// caller wants the optional `dcSockAddr` field in a V5EX response
        V5EP = 0x0000_0008 => "NETLOGON_NT_VERSION_5EX_WITH_IP",
        /// caller wants `nextClosestSiteName` in a V5EX response
        VCS = 0x0000_0010 => "NETLOGON_NT_VERSION_WITH_CLOSEST_SITE",
        /// caller is an NT4 domain member
        VNT4 = 0x0100_0000 => "NETLOGON_NT_VERSION_AVOID_NT4EMUL",
        /// caller wants a PDC specifically
        VPDC = 0x1000_0000 => "NETLOGON_NT_VERSION_PDC",
        /// caller wants the DC's IP address
        VIP = 0x2000_0000 => "NETLOGON_NT_VERSION_IP",
        /// caller wants the local (non-GC) DC
        VL = 0x4000_0000 => "NETLOGON_NT_VERSION_LOCAL",
        /// caller wants a Global Catalog server
        VGC = 0x8000_0000 => "NETLOGON_NT_VERSION_GC",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn round_trips_known_combination() {
        let f = DcLocatorFlag::empty()
            .insert(DcLocatorFlag::GcServerRequired)
            .insert(DcLocatorFlag::PdcRequired);
        let s = f.to_flags_string();
        assert_eq!(s, "DS_GC_SERVER_REQUIRED|DS_PDC_REQUIRED");
        assert_eq!(DcLocatorFlag::from_flags_string(&s).unwrap(), f);
    }

    #[test]
    fn empty_string_is_empty_set() {
        assert_eq!(DcLocatorFlag::from_flags_string("").unwrap(), DcLocatorFlag::empty());
        assert_eq!(DcLocatorFlag::empty().to_flags_string(), "");
    }

    #[test]
    fn unknown_token_is_rejected() {
        assert!(DcLocatorFlag::from_flags_string("DS_NOT_A_REAL_FLAG").is_err());
    }

    proptest! {
        #[test]
        fn flags_string_round_trip(bits in any::<u32>()) {
            let known_mask = DcLocatorFlag::from_bits(u32::MAX).to_flags_string();
            let _ = known_mask; // sanity the table itself builds
            let f = DcLocatorFlag::from_bits(bits);
            let roundtrip = DcLocatorFlag::from_flags_string(&f.to_flags_string()).unwrap();
            // only bits with known names survive the string form
            let known_bits: u32 = DcLocatorFlag::ALL.iter().map(|(b, _)| b).fold(0, |a, b| a | b);
            prop_assert_eq!(roundtrip.bits(), f.bits() & known_bits);
        }

        #[test]
        fn flags_int_round_trip(bits in any::<u32>()) {
            let f = DsFlag::from_bits(bits);
            prop_assert_eq!(u32::from(f), bits);
        }
    }
}
