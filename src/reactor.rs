/// Reactor interface - readiness notifications for the engine's socket
///
/// The reactor owns the thread. It calls back into the engine when the
/// socket becomes readable or writable, and the engine toggles its interest
/// through this trait while handling those callbacks.
use std::io;

/// Registration token returned by the reactor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Handle(pub usize);

/// Event loop the engine registers its socket with
pub trait Reactor<S> {
    /// Start watching `socket`; no interest is enabled yet
    fn register(&mut self, socket: &S) -> io::Result<Handle>;

    /// Stop watching the socket behind `handle`
    fn deregister(&mut self, handle: Handle) -> io::Result<()>;

    fn set_write_interest(&mut self, handle: Handle, enabled: bool);

    fn set_read_interest(&mut self, handle: Handle, enabled: bool);
}
