//! The value types shared by the STUN client, the classifier, and the
//! hole-punching engine: [`Endpoint`], [`Mapping`], and [`NatType`].

use std::{
    fmt,
    net::{SocketAddr, ToSocketAddrs},
    str::FromStr,
    time::{Duration, Instant},
};

/// An IP address plus a UDP port, value-typed and stringifiable as `ip:port`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Endpoint(SocketAddr);

impl Endpoint {
    pub fn new(addr: SocketAddr) -> Self {
        Self(addr)
    }

    pub fn addr(&self) -> SocketAddr {
        self.0
    }

    pub fn ip(&self) -> std::net::IpAddr {
        self.0.ip()
    }

    pub fn port(&self) -> u16 {
        self.0.port()
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Endpoint {
    type Err = std::net::AddrParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse().map(Self)
    }
}

impl From<SocketAddr> for Endpoint {
    fn from(addr: SocketAddr) -> Self {
        Self(addr)
    }
}

impl ToSocketAddrs for Endpoint {
    type Iter = std::option::IntoIter<SocketAddr>;

    fn to_socket_addrs(&self) -> std::io::Result<Self::Iter> {
        self.0.to_socket_addrs()
    }
}

/// The behavioral type of a NAT, ordered by hole-punching difficulty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NatType {
    OpenInternet,
    FullCone,
    RestrictedCone,
    PortRestrictedCone,
    Symmetric,
    Blocked,
    Unknown,
}

impl NatType {
    /// Fixed difficulty score in `[0, 10]`; monotone with traversal difficulty.
    pub fn difficulty(self) -> u8 {
        match self {
            Self::OpenInternet => 0,
            Self::FullCone => 1,
            Self::RestrictedCone => 3,
            Self::PortRestrictedCone => 5,
            Self::Symmetric => 9,
            Self::Blocked => 10,
            Self::Unknown => 10,
        }
    }

    /// Whether this NAT type, in isolation, admits any peer-to-peer path.
    pub fn feasible(self) -> bool {
        !matches!(self, Self::Blocked)
    }
}

/// Conservative peer-compatibility matrix. Symmetric in
/// its arguments; a pair involving `Blocked` is never compatible, and a
/// pair involving `Symmetric` is never compatible under this matrix.
pub fn compatible(a: NatType, b: NatType) -> bool {
    use NatType::*;

    if a == Blocked || b == Blocked {
        return false;
    }

    if a == OpenInternet || b == OpenInternet {
        return true;
    }

    if a == FullCone || b == FullCone {
        return true;
    }

    if a == RestrictedCone && b == RestrictedCone {
        return true;
    }

    if a == PortRestrictedCone && b == PortRestrictedCone {
        return true;
    }

    false
}

/// A discovery record produced by the classifier.
#[derive(Debug, Clone)]
pub struct Mapping {
    pub local_endpoint: Endpoint,
    pub public_endpoint: Endpoint,
    pub nat_type: NatType,
    pub detected_at: Instant,
}

impl Mapping {
    /// A mapping is valid for `max_age` iff it was detected less than
    /// `max_age` ago. The public endpoint is always non-empty by
    /// construction, so only staleness is checked here.
    pub fn is_valid(&self, max_age: Duration) -> bool {
        self.detected_at.elapsed() < max_age
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_to_string_round_trips() {
        let original: Endpoint = "203.0.113.9:4242".parse().unwrap();
        let reparsed: Endpoint = original.to_string().parse().unwrap();
        assert_eq!(original, reparsed);
    }

    #[test]
    fn endpoint_to_string_round_trips_ipv6() {
        let original: Endpoint = "[2001:db8::7]:80".parse().unwrap();
        let reparsed: Endpoint = original.to_string().parse().unwrap();
        assert_eq!(original, reparsed);
    }

    #[test]
    fn difficulty_is_monotone() {
        let ordered = [
            NatType::OpenInternet,
            NatType::FullCone,
            NatType::RestrictedCone,
            NatType::PortRestrictedCone,
            NatType::Symmetric,
        ];

        for pair in ordered.windows(2) {
            assert!(pair[0].difficulty() < pair[1].difficulty());
        }

        assert!(NatType::Symmetric.difficulty() <= NatType::Blocked.difficulty());
        assert_eq!(NatType::Blocked.difficulty(), NatType::Unknown.difficulty());
    }

    #[test]
    fn compatibility_is_symmetric_and_rejects_blocked() {
        use NatType::*;

        let all = [
            OpenInternet,
            FullCone,
            RestrictedCone,
            PortRestrictedCone,
            Symmetric,
            Blocked,
            Unknown,
        ];

        for &a in &all {
            for &b in &all {
                assert_eq!(compatible(a, b), compatible(b, a));
                assert!(!compatible(a, Blocked));
            }
        }
    }

    #[test]
    fn symmetric_pairs_are_incompatible() {
        assert!(!compatible(NatType::Symmetric, NatType::Symmetric));
        assert!(!compatible(NatType::Symmetric, NatType::RestrictedCone));
    }

    #[test]
    fn cone_pairs_are_compatible() {
        assert!(compatible(NatType::RestrictedCone, NatType::RestrictedCone));
        assert!(compatible(NatType::PortRestrictedCone, NatType::PortRestrictedCone));
        assert!(compatible(NatType::OpenInternet, NatType::Symmetric));
        assert!(compatible(NatType::FullCone, NatType::PortRestrictedCone));
    }

    #[test]
    fn mapping_staleness() {
        let mapping = Mapping {
            local_endpoint: "127.0.0.1:1".parse::<Endpoint>().unwrap(),
            public_endpoint: "203.0.113.1:1".parse::<Endpoint>().unwrap(),
            nat_type: NatType::RestrictedCone,
            detected_at: Instant::now() - Duration::from_secs(120),
        };

        assert!(!mapping.is_valid(Duration::from_secs(60)));
        assert!(mapping.is_valid(Duration::from_secs(600)));
    }
}
