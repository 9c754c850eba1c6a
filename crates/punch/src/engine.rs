//! C4: the hole-punching engine. Coordinates a LAN short-circuit probe and
//! a simultaneous bidirectional UDP exchange over one socket, followed by
//! a PING/PONG certification of a live path.

use crate::error::PunchError;

use nat::{compatible, Endpoint, Mapping, NatType};

use std::{
    net::SocketAddr,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::{Duration, Instant},
};

use tokio::{
    net::UdpSocket,
    sync::{oneshot, Mutex},
    time::timeout,
};

const PING: &[u8] = b"PING";
const PONG: &[u8] = b"PONG";
const LAN_PROBE_DEADLINE: Duration = Duration::from_secs(2);
const RECV_BUF_LEN: usize = 1500;

/// What the engine knows about the remote peer before punching.
#[derive(Debug, Clone)]
pub struct PeerInfo {
    pub public_endpoint: Endpoint,
    pub local_endpoints: Vec<Endpoint>,
    pub remote_nat_type: Option<NatType>,
}

impl PeerInfo {
    pub fn new(public_endpoint: Endpoint) -> Self {
        Self {
            public_endpoint,
            local_endpoints: Vec::new(),
            remote_nat_type: None,
        }
    }

    pub fn with_local_candidates(mut self, candidates: Vec<Endpoint>) -> Self {
        self.local_endpoints = candidates;
        self
    }

    pub fn with_remote_nat_type(mut self, nat_type: NatType) -> Self {
        self.remote_nat_type = Some(nat_type);
        self
    }
}

/// `{ overall_deadline, probe_interval, max_probes }`, clamped:
/// `probe_interval >= 1ms`, `max_probes >= 1`.
#[derive(Debug, Clone, Copy)]
pub struct PunchConfig {
    pub overall_deadline: Duration,
    pub probe_interval: Duration,
    pub max_probes: u32,
}

impl Default for PunchConfig {
    fn default() -> Self {
        Self {
            overall_deadline: Duration::from_secs(30),
            probe_interval: Duration::from_millis(200),
            max_probes: 50,
        }
    }
}

impl PunchConfig {
    fn normalized(self) -> Self {
        Self {
            overall_deadline: self.overall_deadline,
            probe_interval: self.probe_interval.max(Duration::from_millis(1)),
            max_probes: self.max_probes.max(1),
        }
    }
}

/// The post-punch handle. Exclusively owns the UDP socket for the
/// remainder of its life; dropping it closes the socket.
pub struct Connection {
    socket: Arc<UdpSocket>,
    pub remote_endpoint: Endpoint,
    pub rtt: Duration,
    pub is_relayed: bool,
    pub established_at: Instant,
}

impl Connection {
    /// The shared socket backing this connection. Residual `"PING"`/`"PONG"`
    /// control datagrams may still be queued on it; well-behaved callers
    /// drain and ignore those tokens.
    pub fn socket(&self) -> &Arc<UdpSocket> {
        &self.socket
    }
}

/// A UDP socket, an optional local [`Mapping`], a punch configuration, and
/// a mutex preventing concurrent punch attempts on the same socket.
pub struct Puncher {
    socket: Arc<UdpSocket>,
    mapping: Option<Mapping>,
    config: PunchConfig,
    lock: Mutex<()>,
    closed: AtomicBool,
}

impl Puncher {
    pub fn new(socket: UdpSocket, mapping: Option<Mapping>, config: PunchConfig) -> Self {
        Self {
            socket: Arc::new(socket),
            mapping,
            config: config.normalized(),
            lock: Mutex::new(()),
            closed: AtomicBool::new(false),
        }
    }

    /// Releases the engine's socket. Monotonic: once closed, `punch` fails
    /// with [`PunchError::Closed`] rather than re-entering IDLE.
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Attempts to open a direct path to `peer`. Only one `punch` call may
    /// run on a given engine at a time; the internal lock is held across
    /// the whole call, so a second concurrent call serializes behind it.
    pub async fn punch(&self, peer: &PeerInfo) -> Result<Connection, PunchError> {
        let _guard = self.lock.lock().await;

        if self.is_closed() {
            return Err(PunchError::Closed);
        }

        if let (Some(mapping), Some(remote_type)) = (&self.mapping, peer.remote_nat_type) {
            if !compatible(mapping.nat_type, remote_type) {
                log::info!(
                    "refusing to punch: local NAT {:?} incompatible with remote {:?}",
                    mapping.nat_type,
                    remote_type
                );
                return Err(PunchError::Incompatible);
            }
        }

        let start = Instant::now();
        let deadline = start + self.config.overall_deadline;

        for candidate in &peer.local_endpoints {
            if let Some(conn) = self.try_lan_candidate(candidate.addr()).await? {
                return Ok(conn);
            }
        }

        self.simultaneous_punch(peer.public_endpoint.addr(), start, deadline).await
    }

    /// Phase A: try one candidate with a single PING and a 2-second
    /// deadline to observe a PONG from that exact address. All failures
    /// fall through to Phase B without closing the socket. RTT is timed
    /// from this candidate's own send, not from the top of `punch`.
    async fn try_lan_candidate(&self, candidate: SocketAddr) -> Result<Option<Connection>, PunchError> {
        let start = Instant::now();
        self.socket.send_to(PING, candidate).await?;

        let result = timeout(LAN_PROBE_DEADLINE, async {
            let mut buf = [0u8; RECV_BUF_LEN];
            loop {
                let (size, from) = self.socket.recv_from(&mut buf).await?;
                if from == candidate && buf[..size].starts_with(PONG) {
                    return Ok::<_, std::io::Error>(());
                }
                // Anything else during the LAN probe (including an
                // incoming PING from the same candidate, answered below)
                // is not a certifying reply.
                if from == candidate && buf[..size].starts_with(PING) {
                    let _ = self.socket.send_to(PONG, candidate).await;
                }
            }
        })
        .await;

        match result {
            Ok(Ok(())) => Ok(Some(Connection {
                socket: self.socket.clone(),
                remote_endpoint: Endpoint::new(candidate),
                rtt: start.elapsed(),
                is_relayed: false,
                established_at: Instant::now(),
            })),
            Ok(Err(e)) => Err(PunchError::IoError(e)),
            Err(_) => Ok(None),
        }
    }

    /// Phase B: a sender task retransmits PING to the peer's public
    /// endpoint while a receiver task answers incoming PINGs with PONG and
    /// watches for an incoming PONG, which certifies the path.
    async fn simultaneous_punch(
        &self,
        remote: SocketAddr,
        start: Instant,
        deadline: Instant,
    ) -> Result<Connection, PunchError> {
        let (certified_tx, certified_rx) = oneshot::channel::<Result<SocketAddr, std::io::Error>>();
        let (stop_tx, mut stop_rx) = oneshot::channel::<()>();

        let sender_socket = self.socket.clone();
        let max_probes = self.config.max_probes;
        let probe_interval = self.config.probe_interval;

        let sender = tokio::spawn(async move {
            for _ in 0..max_probes {
                if Instant::now() >= deadline {
                    return;
                }

                if sender_socket.send_to(PING, remote).await.is_err() {
                    return;
                }

                tokio::select! {
                    _ = tokio::time::sleep(probe_interval) => {}
                    _ = &mut stop_rx => return,
                }
            }
        });

        let receiver_socket = self.socket.clone();
        let receiver = tokio::spawn(async move {
            let mut buf = [0u8; RECV_BUF_LEN];
            loop {
                let (size, from) = match receiver_socket.recv_from(&mut buf).await {
                    Ok(v) => v,
                    Err(e) => {
                        let _ = certified_tx.send(Err(e));
                        return;
                    }
                };

                let payload = &buf[..size];

                if payload.starts_with(PONG) {
                    let _ = certified_tx.send(Ok(from));
                    return;
                }

                if payload.starts_with(PING) {
                    let _ = receiver_socket.send_to(PONG, from).await;
                }
                // Any other payload is ignored for control purposes, and
                // remains available to the caller once a Connection is
                // returned (it is not consumed here since we never match it).
            }
        });

        let outcome = tokio::select! {
            Ok(result) = certified_rx => Some(result),
            _ = tokio::time::sleep_until(deadline.into()) => None,
        };

        let _ = stop_tx.send(());
        sender.abort();
        receiver.abort();

        match outcome {
            Some(Ok(from)) => Ok(Connection {
                socket: self.socket.clone(),
                remote_endpoint: Endpoint::new(from),
                rtt: start.elapsed(),
                is_relayed: false,
                established_at: Instant::now(),
            }),
            Some(Err(e)) => Err(PunchError::IoError(e)),
            None => Err(PunchError::Timeout),
        }
    }
}

/// Re-invokes [`Puncher::punch`] up to `max_attempts` times with
/// exponential backoff `min(10s, 2^attempt s)` between attempts, reusing
/// the same socket.
pub async fn punch_with_retry(
    puncher: &Puncher,
    peer: &PeerInfo,
    max_attempts: u32,
) -> Result<Connection, PunchError> {
    let mut last_err = None;

    for attempt in 0..max_attempts.max(1) {
        if attempt > 0 {
            let backoff = Duration::from_secs(2u64.saturating_pow(attempt - 1)).min(Duration::from_secs(10));
            tokio::time::sleep(backoff).await;
        }

        match puncher.punch(peer).await {
            Ok(conn) => return Ok(conn),
            Err(PunchError::Incompatible) => return Err(PunchError::Incompatible),
            Err(e) => {
                log::warn!("punch attempt {} failed: {}", attempt + 1, e);
                last_err = Some(e);
            }
        }
    }

    Err(PunchError::Exhausted(Box::new(
        last_err.unwrap_or(PunchError::Timeout),
    )))
}
