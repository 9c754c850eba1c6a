use std::fmt;

/// Errors from [`crate::client::discover`] and its retry wrapper.
#[derive(Debug)]
pub enum DiscoveryError {
    /// The STUN server address could not be resolved.
    BadServer(std::io::Error),
    /// No response arrived before the read deadline.
    Timeout,
    /// The response was not a well-formed, matching Binding success.
    ProtocolError(String),
    /// The retry budget was spent; wraps the last underlying failure.
    Exhausted(Box<DiscoveryError>),
    /// An OS-level socket failure.
    IoError(std::io::Error),
}

impl std::error::Error for DiscoveryError {}

impl fmt::Display for DiscoveryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BadServer(e) => write!(f, "could not resolve STUN server: {e}"),
            Self::Timeout => write!(f, "timed out waiting for STUN response"),
            Self::ProtocolError(msg) => write!(f, "STUN protocol error: {msg}"),
            Self::Exhausted(cause) => write!(f, "retry budget exhausted: {cause}"),
            Self::IoError(e) => write!(f, "socket I/O error: {e}"),
        }
    }
}

impl From<codec::Error> for DiscoveryError {
    fn from(value: codec::Error) -> Self {
        Self::ProtocolError(value.to_string())
    }
}

/// Errors from [`crate::classifier::classify`] and its retry wrapper.
#[derive(Debug)]
pub enum ClassifyError {
    Discovery(DiscoveryError),
    Exhausted(Box<ClassifyError>),
}

impl std::error::Error for ClassifyError {}

impl fmt::Display for ClassifyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Discovery(e) => write!(f, "{e}"),
            Self::Exhausted(cause) => write!(f, "retry budget exhausted: {cause}"),
        }
    }
}

impl From<DiscoveryError> for ClassifyError {
    fn from(value: DiscoveryError) -> Self {
        Self::Discovery(value)
    }
}
