/// CyDnA UDP Engine - Datagram transport for two-part messaging sessions
///
/// **Creator**: Shayan Golmezerji
/// **License**: Creative Commons Attribution 4.0 International (CC BY 4.0)
///
/// This library adapts connectionless UDP datagrams into the group + body
/// message pairs exchanged with an upstream session, driven entirely by
/// readiness notifications from an external reactor.
///
/// # Design Principles
/// - Single-threaded, never blocks the reactor thread
/// - Pre-allocated send/receive buffers, no per-datagram buffer allocation
/// - Lossy under backpressure, never corrupts the pair stream
/// - Environment failures are typed errors, never process aborts
pub mod config;
pub mod contracts;
pub mod engine;
pub mod errors;
pub mod framer;
pub mod raw_endpoint;
pub mod reactor;
pub mod receiver;
pub mod session;
pub mod socket;
pub mod transmitter;

#[cfg(unix)]
pub mod driver;

pub use config::{EngineOptions, EngineOptionsBuilder};
pub use contracts::{AddressFamily, Message, Mode, ResolvedAddress};
pub use engine::{Engine, EngineState, EngineStats, EventOutcome};
pub use errors::{
    AddressFormatError, EngineError, FrameError, LifecycleError, LifecycleResult, Result,
};
pub use reactor::{Handle, Reactor};
pub use session::{QueueFull, QueueSession, Session};
pub use socket::{DatagramSocket, SystemSocket};

/// Maximum datagram size (in bytes) produced or accepted by the engine
///
/// Both engine buffers are sized to exactly this value.
pub const MAX_DATAGRAM_SIZE: usize = 8192;

/// Largest group segment representable by the one-byte length prefix
pub const MAX_GROUP_LEN: usize = u8::MAX as usize;

/// Length of the framed-mode header (the group length byte)
pub const FRAME_HEADER_LEN: usize = 1;
