use std::fmt;

#[derive(Debug)]
pub enum PunchError {
    /// A caller-side precondition was violated.
    BadArgument(&'static str),
    /// The local and remote NAT types predict hole-punching cannot succeed.
    Incompatible,
    /// The overall deadline elapsed before a path was certified.
    Timeout,
    /// An OS-level socket failure.
    IoError(std::io::Error),
    /// The retry budget was spent; wraps the last underlying failure.
    Exhausted(Box<PunchError>),
    /// The engine (or the socket it owns) was already closed.
    Closed,
}

impl std::error::Error for PunchError {}

impl fmt::Display for PunchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BadArgument(msg) => write!(f, "bad argument: {msg}"),
            Self::Incompatible => write!(f, "NAT types predict hole punching cannot succeed"),
            Self::Timeout => write!(f, "overall deadline elapsed before path was certified"),
            Self::IoError(e) => write!(f, "socket I/O error: {e}"),
            Self::Exhausted(cause) => write!(f, "retry budget exhausted: {cause}"),
            Self::Closed => write!(f, "operation invoked after the engine was closed"),
        }
    }
}

impl From<std::io::Error> for PunchError {
    fn from(value: std::io::Error) -> Self {
        Self::IoError(value)
    }
}
