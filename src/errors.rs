/// Error types for UDP engine operations
///
/// Environment failures (socket creation, bind, multicast membership,
/// unexpected send/receive errors) surface as `EngineError` so the owning
/// session decides whether to tear the engine down. Per-datagram conditions
/// use the codec errors below and never escape the engine.
use std::fmt;
use std::io;
use std::net::{IpAddr, SocketAddr};

use thiserror::Error;

use crate::contracts::AddressFamily;

/// Result type alias for engine operations
pub type Result<T> = std::result::Result<T, EngineError>;

/// Result of `attach` and `detach_and_release`, which hand the session back
/// on failure
pub type LifecycleResult<T, Se> = std::result::Result<T, LifecycleError<Se>>;

/// Engine error enumeration
#[derive(Debug, Error)]
pub enum EngineError {
    /// The datagram socket could not be opened
    #[error("socket creation failed: {0}")]
    SocketCreation(#[source] io::Error),

    /// A socket option could not be applied during attach
    #[error("failed to set socket option {option}: {source}")]
    SocketOption {
        option: &'static str,
        #[source]
        source: io::Error,
    },

    /// Binding the receive address failed
    #[error("bind to {addr} failed: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },

    /// Joining the multicast group failed
    #[error("multicast join of {group} failed: {source}")]
    MulticastJoin {
        group: IpAddr,
        #[source]
        source: io::Error,
    },

    /// Reactor registration or deregistration failed
    #[error("reactor registration failed: {0}")]
    Registration(#[source] io::Error),

    /// Send failed with an error class that is not transient
    #[error("send to {dest} failed: {source}")]
    Send {
        dest: SocketAddr,
        #[source]
        source: io::Error,
    },

    /// Receive failed with an error class that is not transient
    #[error("receive failed: {0}")]
    Receive(#[source] io::Error),

    /// Lifecycle method called out of order
    #[error("invalid engine state: expected {expected}, got {actual}")]
    InvalidState {
        expected: &'static str,
        actual: &'static str,
    },

    /// Neither send nor receive was enabled at initialization
    #[error("at least one of send or receive must be enabled")]
    NoDirection,

    /// Raw destination cannot be reached from the socket's address family
    #[error("raw destination {dest} is not reachable from a {family:?} socket")]
    AddressFamilyMismatch {
        dest: SocketAddr,
        family: AddressFamily,
    },
}

/// Lifecycle failure carrying the session back to its owner
///
/// `session` is `None` only when the engine never held one, e.g. detaching
/// an engine that was not attached.
pub struct LifecycleError<Se> {
    pub error: EngineError,
    pub session: Option<Se>,
}

impl<Se> LifecycleError<Se> {
    pub fn new(error: EngineError, session: Option<Se>) -> Self {
        Self { error, session }
    }

    pub fn error(&self) -> &EngineError {
        &self.error
    }

    pub fn into_parts(self) -> (EngineError, Option<Se>) {
        (self.error, self.session)
    }
}

impl<Se> fmt::Debug for LifecycleError<Se> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LifecycleError")
            .field("error", &self.error)
            .field("session_returned", &self.session.is_some())
            .finish()
    }
}

impl<Se> fmt::Display for LifecycleError<Se> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.error, f)
    }
}

impl<Se> std::error::Error for LifecycleError<Se> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        std::error::Error::source(&self.error)
    }
}

impl<Se> From<LifecycleError<Se>> for EngineError {
    fn from(err: LifecycleError<Se>) -> Self {
        err.error
    }
}

/// Framing failures of the group + body envelope
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum FrameError {
    /// Group segment does not fit the one-byte length prefix
    #[error("group segment of {0} bytes exceeds 255")]
    GroupTooLong(usize),

    /// Encoded datagram would exceed the buffer capacity
    #[error("frame of {required} bytes exceeds datagram capacity {available}")]
    FrameTooLarge { required: usize, available: usize },

    /// Received datagram is shorter than its declared group length
    #[error("truncated frame: group declares {declared} bytes, {available} present")]
    Truncated { declared: usize, available: usize },
}

/// Raw-mode `host:port` parse failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddressFormatError {
    #[error("no ':' separator in {0:?}")]
    MissingPort(String),

    #[error("invalid port in {0:?}")]
    InvalidPort(String),

    #[error("invalid IPv4 host in {0:?}")]
    InvalidHost(String),
}
