/// tokio driver - runs one engine on a tokio runtime
///
/// `TokioReactor` implements the reactor interface on top of `AsyncFd`;
/// `EngineDriver` owns an attached engine and turns readiness, restart
/// notifications and shutdown into engine calls.
use std::collections::HashMap;
use std::future::Future;
use std::io;
use std::os::fd::{AsRawFd, RawFd};
use std::sync::Arc;

use tokio::io::unix::AsyncFd;
use tokio::io::Interest;
use tokio::sync::Notify;
use tracing::{debug, warn};

use crate::engine::{Engine, EventOutcome};
use crate::errors::{EngineError, LifecycleError, LifecycleResult, Result};
use crate::reactor::{Handle, Reactor};
use crate::session::Session;
use crate::socket::SystemSocket;

/// Borrowed descriptor; the engine keeps ownership of the socket
struct Descriptor(RawFd);

impl AsRawFd for Descriptor {
    fn as_raw_fd(&self) -> RawFd {
        self.0
    }
}

struct Registration {
    fd: Arc<AsyncFd<Descriptor>>,
    read: bool,
    write: bool,
}

/// Reactor backed by the tokio I/O driver
///
/// `register` must be called from within a tokio runtime.
#[derive(Default)]
pub struct TokioReactor {
    next_token: usize,
    registrations: HashMap<Handle, Registration>,
}

impl TokioReactor {
    pub fn new() -> Self {
        Self::default()
    }

    fn interest(&self, handle: Handle) -> Option<(Arc<AsyncFd<Descriptor>>, bool, bool)> {
        self.registrations
            .get(&handle)
            .map(|reg| (Arc::clone(&reg.fd), reg.read, reg.write))
    }
}

impl<S: AsRawFd> Reactor<S> for TokioReactor {
    fn register(&mut self, socket: &S) -> io::Result<Handle> {
        let fd = AsyncFd::with_interest(
            Descriptor(socket.as_raw_fd()),
            Interest::READABLE | Interest::WRITABLE,
        )?;

        self.next_token += 1;
        let handle = Handle(self.next_token);
        self.registrations.insert(
            handle,
            Registration {
                fd: Arc::new(fd),
                read: false,
                write: false,
            },
        );
        Ok(handle)
    }

    fn deregister(&mut self, handle: Handle) -> io::Result<()> {
        self.registrations
            .remove(&handle)
            .map(|_| ())
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "unknown reactor handle"))
    }

    fn set_write_interest(&mut self, handle: Handle, enabled: bool) {
        if let Some(reg) = self.registrations.get_mut(&handle) {
            reg.write = enabled;
        }
    }

    fn set_read_interest(&mut self, handle: Handle, enabled: bool) {
        if let Some(reg) = self.registrations.get_mut(&handle) {
            reg.read = enabled;
        }
    }
}

/// Event loop for a single attached engine
pub struct EngineDriver<Se> {
    engine: Engine<SystemSocket, Se>,
    reactor: TokioReactor,
    output_ready: Arc<Notify>,
    input_ready: Arc<Notify>,
}

impl<Se: Session> EngineDriver<Se> {
    /// Attach an initialized engine to `session` on the current runtime
    pub fn attach(
        mut engine: Engine<SystemSocket, Se>,
        session: Se,
    ) -> LifecycleResult<Self, Se> {
        let mut reactor = TokioReactor::new();
        engine.attach(&mut reactor, session)?;

        Ok(Self {
            engine,
            reactor,
            output_ready: Arc::new(Notify::new()),
            input_ready: Arc::new(Notify::new()),
        })
    }

    pub fn engine(&self) -> &Engine<SystemSocket, Se> {
        &self.engine
    }

    /// Notify after queueing outgoing pairs so sending resumes
    pub fn output_ready(&self) -> Arc<Notify> {
        Arc::clone(&self.output_ready)
    }

    /// Notify after draining delivered pairs so reading resumes
    pub fn input_ready(&self) -> Arc<Notify> {
        Arc::clone(&self.input_ready)
    }

    /// Drive the engine until `shutdown` completes or an error occurs
    ///
    /// The engine is detached in both cases and the session is handed back,
    /// inside the error when the loop or the detach failed.
    pub async fn run<F>(mut self, shutdown: F) -> LifecycleResult<Se, Se>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        let handle = self.engine.handle();

        let result: Result<()> = loop {
            let Some((fd, read, write)) = handle.and_then(|handle| self.reactor.interest(handle))
            else {
                break Err(EngineError::Registration(io::Error::new(
                    io::ErrorKind::NotFound,
                    "engine registration disappeared",
                )));
            };

            let step = tokio::select! {
                _ = &mut shutdown => break Ok(()),
                _ = self.output_ready.notified() => {
                    self.engine.restart_output(&mut self.reactor)
                }
                _ = self.input_ready.notified() => {
                    self.engine.restart_input(&mut self.reactor)
                }
                guard = fd.readable(), if read => match guard {
                    Ok(mut guard) => self.engine.on_readable(&mut self.reactor).map(|outcome| {
                        if outcome == EventOutcome::Exhausted {
                            guard.clear_ready();
                        }
                    }),
                    Err(err) => Err(EngineError::Receive(err)),
                },
                guard = fd.writable(), if write => match guard {
                    Ok(mut guard) => self.engine.on_writable(&mut self.reactor).map(|outcome| {
                        if outcome == EventOutcome::Exhausted {
                            guard.clear_ready();
                        }
                    }),
                    Err(err) => Err(EngineError::Registration(err)),
                },
            };

            if let Err(err) = step {
                break Err(err);
            }
        };

        let released = self.engine.detach_and_release(&mut self.reactor);
        debug!(stats = ?self.engine.stats(), "engine driver stopped");

        match (result, released) {
            (Ok(()), released) => released,
            (Err(error), Ok(session)) => Err(LifecycleError::new(error, Some(session))),
            (Err(error), Err(detach)) => {
                warn!(error = %detach.error, "detach after driver failure also failed");
                Err(LifecycleError::new(error, detach.session))
            }
        }
    }
}
