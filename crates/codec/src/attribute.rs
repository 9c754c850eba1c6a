//! STUN attribute types and the address attributes this toolkit cares about.
//!
//! [RFC 5389 section 15]: https://tools.ietf.org/html/rfc5389#section-15

use crate::{Error, TransactionId, MAGIC_COOKIE};

use num_enum::{FromPrimitive, IntoPrimitive};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};

const FAMILY_IPV4: u8 = 0x01;
const FAMILY_IPV6: u8 = 0x02;

/// STUN attribute type numbers. Only the ones this toolkit decodes or
/// encodes are named; everything else is carried as [`AttributeType::Other`].
#[repr(u16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromPrimitive, IntoPrimitive)]
pub enum AttributeType {
    MappedAddress = 0x0001,
    XorMappedAddress = 0x0020,
    #[num_enum(catch_all)]
    Other(u16),
}

/// Encodes a [`SocketAddr`] as a MAPPED-ADDRESS or XOR-MAPPED-ADDRESS value
/// (the 8- or 20-byte body that follows the attribute header).
///
/// The XOR-MAPPED-ADDRESS XOR key is the magic cookie for IPv4, and the
/// magic cookie concatenated with the transaction identifier for IPv6
/// (RFC 5389 section 15.2).
pub fn encode_address(addr: &SocketAddr, token: &TransactionId, xor: bool, out: &mut Vec<u8>) {
    let addr = if xor { xor_address(addr, token) } else { *addr };

    out.push(0);
    out.push(if addr.is_ipv4() { FAMILY_IPV4 } else { FAMILY_IPV6 });
    out.extend_from_slice(&addr.port().to_be_bytes());

    match addr.ip() {
        IpAddr::V4(ip) => out.extend_from_slice(&ip.octets()),
        IpAddr::V6(ip) => out.extend_from_slice(&ip.octets()),
    }
}

/// Decodes a MAPPED-ADDRESS or XOR-MAPPED-ADDRESS attribute value into a
/// [`SocketAddr`].
pub fn decode_address(value: &[u8], token: &TransactionId, xor: bool) -> Result<SocketAddr, Error> {
    if value.len() < 4 {
        return Err(Error::Truncated);
    }

    let family = value[1];
    let port = u16::from_be_bytes([value[2], value[3]]);

    let ip = match family {
        FAMILY_IPV4 => {
            if value.len() < 8 {
                return Err(Error::Truncated);
            }
            let octets: [u8; 4] = value[4..8].try_into().unwrap();
            IpAddr::V4(Ipv4Addr::from(octets))
        }
        FAMILY_IPV6 => {
            if value.len() < 20 {
                return Err(Error::Truncated);
            }
            let octets: [u8; 16] = value[4..20].try_into().unwrap();
            IpAddr::V6(Ipv6Addr::from(octets))
        }
        _ => return Err(Error::InvalidInput),
    };

    let addr = SocketAddr::new(ip, port);
    Ok(if xor { xor_address(&addr, token) } else { addr })
}

/// XORs a socket address's port and IP against the magic cookie (IPv4) or
/// the magic cookie concatenated with the transaction id (IPv6). XOR is its
/// own inverse, so this same function both encodes and decodes.
fn xor_address(addr: &SocketAddr, token: &TransactionId) -> SocketAddr {
    let cookie = MAGIC_COOKIE.to_be_bytes();
    let port = addr.port() ^ ((MAGIC_COOKIE >> 16) as u16);

    let ip = match addr.ip() {
        IpAddr::V4(ip) => {
            let xored = u32::from_be_bytes(ip.octets()) ^ MAGIC_COOKIE;
            IpAddr::V4(Ipv4Addr::from(xored))
        }
        IpAddr::V6(ip) => {
            let mut key = [0u8; 16];
            key[..4].copy_from_slice(&cookie);
            key[4..].copy_from_slice(token);

            let mut octets = ip.octets();
            for (b, k) in octets.iter_mut().zip(key.iter()) {
                *b ^= k;
            }

            IpAddr::V6(Ipv6Addr::from(octets))
        }
    };

    SocketAddr::new(ip, port)
}
