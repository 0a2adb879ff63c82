//! Small address helpers used by defaulting and validation.

use std::{
    fmt,
    net::{IpAddr, Ipv4Addr, Ipv6Addr},
    str::FromStr,
};

use snafu::{OptionExt, ResultExt, Snafu, ensure};

#[derive(Debug, PartialEq, Snafu)]
pub enum ParseCidrError {
    #[snafu(display("missing '/<prefix>' suffix"))]
    MissingPrefix,

    #[snafu(display("failed to parse network address {address:?}"))]
    ParseAddress {
        source: std::net::AddrParseError,
        address: String,
    },

    #[snafu(display("failed to parse prefix length {prefix:?}"))]
    ParsePrefix {
        source: std::num::ParseIntError,
        prefix: String,
    },

    #[snafu(display("prefix length {prefix} exceeds {max} bits"))]
    PrefixTooLong { prefix: u8, max: u8 },
}

/// An IP network in CIDR notation, for example `10.96.0.0/12`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Cidr {
    address: IpAddr,
    prefix: u8,
}

impl Cidr {
    pub fn prefix(&self) -> u8 {
        self.prefix
    }

    /// Returns the `n`-th address of the network, counting the network address
    /// itself as zero. Returns [`None`] if the network is too small.
    pub fn nth_address(&self, n: u32) -> Option<IpAddr> {
        match self.address {
            IpAddr::V4(address) => {
                let host_bits = 32 - u32::from(self.prefix);
                let size = 1u64 << host_bits;
                if u64::from(n) >= size {
                    return None;
                }
                let mask = u32::MAX.checked_shl(host_bits).unwrap_or(0);
                let base = u32::from(address) & mask;
                Some(IpAddr::V4(Ipv4Addr::from(base + n)))
            }
            IpAddr::V6(address) => {
                let host_bits = 128 - u32::from(self.prefix);
                if host_bits < 32 && u64::from(n) >= 1u64 << host_bits {
                    return None;
                }
                let mask = u128::MAX.checked_shl(host_bits).unwrap_or(0);
                let base = u128::from(address) & mask;
                Some(IpAddr::V6(Ipv6Addr::from(base + u128::from(n))))
            }
        }
    }
}

impl FromStr for Cidr {
    type Err = ParseCidrError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let (address, prefix) = input.split_once('/').context(MissingPrefixSnafu)?;

        let address = IpAddr::from_str(address).context(ParseAddressSnafu { address })?;
        let prefix = prefix.parse::<u8>().context(ParsePrefixSnafu { prefix })?;

        let max = if address.is_ipv4() { 32 } else { 128 };
        ensure!(prefix <= max, PrefixTooLongSnafu { prefix, max });

        Ok(Self { address, prefix })
    }
}

impl fmt::Display for Cidr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.address, self.prefix)
    }
}

/// Splits a `host[:port]` endpoint. IPv6 hosts must be bracketed when a port
/// is present, e.g. `[fd00::1]:6443`.
pub fn split_host_port(endpoint: &str) -> (&str, Option<&str>) {
    if let Some(rest) = endpoint.strip_prefix('[') {
        if let Some((host, tail)) = rest.split_once(']') {
            return (host, tail.strip_prefix(':'));
        }
    }

    match endpoint.rsplit_once(':') {
        // More than one colon without brackets is a bare IPv6 address.
        Some((host, _)) if host.contains(':') => (endpoint, None),
        Some((host, port)) => (host, Some(port)),
        None => (endpoint, None),
    }
}
