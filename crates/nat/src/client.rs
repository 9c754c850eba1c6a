//! C2: a STUN client that binds a UDP socket, sends one Binding request,
//! and extracts the peer's externally-visible endpoint from the response.

use crate::{endpoint::Endpoint, error::DiscoveryError};

use codec::{
    attribute::{decode_address, AttributeType},
    generate_transaction_id,
    message::{decode, encode_binding_request, MessageType},
};

use std::{
    net::{SocketAddr, UdpSocket},
    time::Duration,
};

/// The result of a single STUN discovery.
#[derive(Debug, Clone)]
pub struct DiscoveryRecord {
    pub local_endpoint: Endpoint,
    pub public_endpoint: Endpoint,
    pub server_endpoint: Endpoint,
}

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// A STUN client bound to a single UDP socket. `discover` is not
/// reentrant on one client; independent clients may run in parallel.
pub struct StunClient {
    socket: UdpSocket,
    timeout: Duration,
}

impl StunClient {
    /// Binds an ephemeral UDP socket on all interfaces.
    pub fn new() -> Result<Self, DiscoveryError> {
        Self::bind("0.0.0.0:0".parse().unwrap())
    }

    /// Binds on a caller-supplied local address.
    pub fn bind(local: SocketAddr) -> Result<Self, DiscoveryError> {
        let socket = UdpSocket::bind(local).map_err(DiscoveryError::IoError)?;
        Ok(Self {
            socket,
            timeout: DEFAULT_TIMEOUT,
        })
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn local_endpoint(&self) -> Result<Endpoint, DiscoveryError> {
        self.socket
            .local_addr()
            .map(Endpoint::new)
            .map_err(DiscoveryError::IoError)
    }

    /// Resolves `server`, sends a single Binding request, and waits up to
    /// `self.timeout` for a matching response.
    pub fn discover(&self, server: &str) -> Result<DiscoveryRecord, DiscoveryError> {
        let server_addr = std::net::ToSocketAddrs::to_socket_addrs(server)
            .map_err(DiscoveryError::BadServer)?
            .next()
            .ok_or_else(|| {
                DiscoveryError::BadServer(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    "no address resolved",
                ))
            })?;

        let transaction_id = generate_transaction_id();
        let request = encode_binding_request(&transaction_id);

        self.socket
            .send_to(&request, server_addr)
            .map_err(DiscoveryError::IoError)?;

        self.socket
            .set_read_timeout(Some(self.timeout))
            .map_err(DiscoveryError::IoError)?;

        let mut buf = [0u8; 512];
        let (size, _from) = match self.socket.recv_from(&mut buf) {
            Ok(v) => v,
            Err(e) if matches!(e.kind(), std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut) => {
                return Err(DiscoveryError::Timeout)
            }
            Err(e) => return Err(DiscoveryError::IoError(e)),
        };

        let message = decode(&buf[..size])?;

        if message.message_type != MessageType::BindingSuccess {
            return Err(DiscoveryError::ProtocolError(
                "response was not a Binding success".into(),
            ));
        }

        if message.transaction_id != transaction_id {
            return Err(DiscoveryError::ProtocolError(
                "transaction id did not match the request".into(),
            ));
        }

        // Prefer XOR-MAPPED-ADDRESS; it is immune to naive NAT rewriting.
        let public_addr = if let Some(value) = message.get(AttributeType::XorMappedAddress) {
            decode_address(value, &transaction_id, true)?
        } else if let Some(value) = message.get(AttributeType::MappedAddress) {
            decode_address(value, &transaction_id, false)?
        } else {
            return Err(DiscoveryError::ProtocolError(
                "response carried no mapped address attribute".into(),
            ));
        };

        Ok(DiscoveryRecord {
            local_endpoint: self.local_endpoint()?,
            public_endpoint: Endpoint::new(public_addr),
            server_endpoint: Endpoint::new(server_addr),
        })
    }

    /// Retries `discover` up to `max_attempts` times total, backing off
    /// `min(10s, 2^attempt_index seconds)` before each retry. A new
    /// transaction identifier is generated per attempt (implicitly, inside
    /// `discover`); the socket is reused.
    pub fn discover_with_retry(
        &self,
        server: &str,
        max_attempts: u32,
    ) -> Result<DiscoveryRecord, DiscoveryError> {
        let mut last_err = None;

        for attempt in 0..max_attempts.max(1) {
            if attempt > 0 {
                let backoff = Duration::from_secs(2u64.saturating_pow(attempt - 1)).min(Duration::from_secs(10));
                std::thread::sleep(backoff);
            }

            match self.discover(server) {
                Ok(record) => return Ok(record),
                Err(e) => {
                    log::warn!("STUN discovery attempt {} against {} failed: {}", attempt + 1, server, e);
                    last_err = Some(e);
                }
            }
        }

        Err(DiscoveryError::Exhausted(Box::new(
            last_err.unwrap_or(DiscoveryError::Timeout),
        )))
    }
}
