/// Engine - one UDP endpoint attached to one session
///
/// Lifecycle: created empty, initialized once with a resolved address,
/// attached to a reactor and session exactly once, then detached exactly
/// once. The send path lives in `transmitter`, the receive path in
/// `receiver`; this module owns state, socket configuration and teardown.
use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use tracing::{debug, warn};

use crate::config::EngineOptions;
use crate::contracts::{AddressFamily, Mode, ResolvedAddress};
use crate::errors::{EngineError, LifecycleError, LifecycleResult, Result};
use crate::reactor::{Handle, Reactor};
use crate::session::Session;
use crate::socket::DatagramSocket;
use crate::MAX_DATAGRAM_SIZE;

/// Attachment state of an engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Unattached,
    Attached,
    Terminated,
}

impl EngineState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unattached => "unattached",
            Self::Attached => "attached",
            Self::Terminated => "terminated",
        }
    }
}

/// Result of handling one readiness event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventOutcome {
    /// A datagram or message pair was handled; more may be ready
    Progressed,
    /// Nothing left to do until the next readiness event
    Exhausted,
}

/// Counters for engine traffic and drops
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EngineStats {
    pub datagrams_sent: u64,
    pub bytes_sent: u64,
    pub datagrams_received: u64,
    pub bytes_received: u64,

    /// Framed datagrams shorter than their declared group
    pub dropped_malformed: u64,

    /// Raw-mode pairs whose group was not a valid `host:port`
    pub dropped_bad_address: u64,

    /// Outgoing pairs that do not fit in one datagram
    pub dropped_oversize: u64,

    /// Incoming datagrams dropped because the group push was rejected
    pub dropped_group_backpressure: u64,

    /// Incoming datagrams dropped because the body push was rejected
    pub dropped_body_backpressure: u64,

    /// Outgoing segments discarded while sending is disabled
    pub drained_messages: u64,
}

pub struct Engine<S, Se> {
    pub(crate) options: EngineOptions,
    pub(crate) mode: Mode,
    pub(crate) state: EngineState,
    pub(crate) socket: Option<S>,
    pub(crate) address: Option<ResolvedAddress>,
    pub(crate) session: Option<Se>,
    pub(crate) handle: Option<Handle>,
    pub(crate) send_enabled: bool,
    pub(crate) recv_enabled: bool,
    pub(crate) write_interest: bool,
    pub(crate) read_interest: bool,
    /// Fixed destination for framed mode; raw mode resolves per datagram
    pub(crate) out_address: Option<SocketAddr>,
    pub(crate) in_buffer: Box<[u8]>,
    pub(crate) out_buffer: Box<[u8]>,
    pub(crate) stats: EngineStats,
}

impl<S, Se> Engine<S, Se>
where
    S: DatagramSocket,
    Se: Session,
{
    pub fn new(options: EngineOptions) -> Self {
        Self {
            mode: options.mode(),
            options,
            state: EngineState::Unattached,
            socket: None,
            address: None,
            session: None,
            handle: None,
            send_enabled: false,
            recv_enabled: false,
            write_interest: false,
            read_interest: false,
            out_address: None,
            in_buffer: vec![0u8; MAX_DATAGRAM_SIZE].into_boxed_slice(),
            out_buffer: vec![0u8; MAX_DATAGRAM_SIZE].into_boxed_slice(),
            stats: EngineStats::default(),
        }
    }

    /// Open the non-blocking socket for `address`
    ///
    /// # Errors
    /// - `NoDirection` if both directions are disabled
    /// - `InvalidState` if already initialized or attached
    /// - `SocketCreation` if the socket cannot be opened
    pub fn initialize(
        &mut self,
        address: ResolvedAddress,
        send_enabled: bool,
        recv_enabled: bool,
    ) -> Result<()> {
        self.expect_state(EngineState::Unattached)?;
        if self.socket.is_some() {
            return Err(EngineError::InvalidState {
                expected: "uninitialized",
                actual: "initialized",
            });
        }
        if !send_enabled && !recv_enabled {
            return Err(EngineError::NoDirection);
        }

        let socket = S::open(address.family()).map_err(EngineError::SocketCreation)?;

        self.socket = Some(socket);
        self.address = Some(address);
        self.send_enabled = send_enabled;
        self.recv_enabled = recv_enabled;

        debug!(
            target_addr = %address.target_addr(),
            multicast = address.is_multicast(),
            send_enabled,
            recv_enabled,
            mode = ?self.mode,
            "udp engine initialized"
        );
        Ok(())
    }

    /// Register with the reactor, configure the socket and take the session
    ///
    /// On failure the engine is rolled back: the socket is deregistered and
    /// released, the engine ends up `Terminated`, and the session comes back
    /// inside the error.
    pub fn attach<R: Reactor<S>>(
        &mut self,
        reactor: &mut R,
        session: Se,
    ) -> LifecycleResult<(), Se> {
        if let Err(error) = self.expect_state(EngineState::Unattached) {
            return Err(LifecycleError::new(error, Some(session)));
        }
        let Some(socket) = self.socket.as_ref() else {
            let error = EngineError::InvalidState {
                expected: "initialized",
                actual: "uninitialized",
            };
            return Err(LifecycleError::new(error, Some(session)));
        };

        let handle = match reactor.register(socket) {
            Ok(handle) => handle,
            Err(err) => {
                self.abort_attach(reactor);
                return Err(LifecycleError::new(EngineError::Registration(err), Some(session)));
            }
        };

        self.handle = Some(handle);
        self.session = Some(session);
        self.state = EngineState::Attached;

        if let Err(err) = self.configure(reactor) {
            warn!(error = %err, "udp engine attach failed, releasing socket");
            let session = self.abort_attach(reactor);
            return Err(LifecycleError::new(err, session));
        }

        debug!(?handle, "udp engine attached");
        Ok(())
    }

    /// Deregister, release the socket and hand the session back
    ///
    /// The engine is `Terminated` afterwards, even if deregistration fails;
    /// in that case the session is returned inside the error.
    pub fn detach_and_release<R: Reactor<S>>(
        &mut self,
        reactor: &mut R,
    ) -> LifecycleResult<Se, Se> {
        if let Err(error) = self.expect_state(EngineState::Attached) {
            return Err(LifecycleError::new(error, None));
        }

        let deregistered = match self.handle.take() {
            Some(handle) => reactor.deregister(handle),
            None => Ok(()),
        };
        self.socket = None;
        self.write_interest = false;
        self.read_interest = false;
        self.state = EngineState::Terminated;

        match (deregistered, self.session.take()) {
            (Ok(()), Some(session)) => {
                debug!("udp engine detached");
                Ok(session)
            }
            (Err(err), session) => {
                warn!(error = %err, "failed to deregister udp socket on detach");
                Err(LifecycleError::new(EngineError::Registration(err), session))
            }
            (Ok(()), None) => Err(LifecycleError::new(
                EngineError::InvalidState {
                    expected: "session attached",
                    actual: "no session",
                },
                None,
            )),
        }
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    pub fn stats(&self) -> &EngineStats {
        &self.stats
    }

    /// The underlying socket while initialized or attached
    pub fn socket(&self) -> Option<&S> {
        self.socket.as_ref()
    }

    pub fn handle(&self) -> Option<Handle> {
        self.handle
    }

    pub fn is_send_enabled(&self) -> bool {
        self.send_enabled
    }

    pub fn is_recv_enabled(&self) -> bool {
        self.recv_enabled
    }

    pub fn is_write_interested(&self) -> bool {
        self.write_interest
    }

    pub fn is_read_interested(&self) -> bool {
        self.read_interest
    }

    pub(crate) fn expect_state(&self, expected: EngineState) -> Result<()> {
        if self.state == expected {
            Ok(())
        } else {
            Err(EngineError::InvalidState {
                expected: expected.as_str(),
                actual: self.state.as_str(),
            })
        }
    }

    pub(crate) fn session_mut(&mut self) -> Result<&mut Se> {
        self.session.as_mut().ok_or(EngineError::InvalidState {
            expected: "session attached",
            actual: "no session",
        })
    }

    pub(crate) fn set_write_interest<R: Reactor<S>>(&mut self, reactor: &mut R, enabled: bool) {
        if let Some(handle) = self.handle {
            reactor.set_write_interest(handle, enabled);
        }
        self.write_interest = enabled;
    }

    pub(crate) fn set_read_interest<R: Reactor<S>>(&mut self, reactor: &mut R, enabled: bool) {
        if let Some(handle) = self.handle {
            reactor.set_read_interest(handle, enabled);
        }
        self.read_interest = enabled;
    }

    fn configure<R: Reactor<S>>(&mut self, reactor: &mut R) -> Result<()> {
        let address = self.address.ok_or(EngineError::InvalidState {
            expected: "initialized",
            actual: "uninitialized",
        })?;
        let socket = self.socket.as_ref().ok_or(EngineError::InvalidState {
            expected: "initialized",
            actual: "uninitialized",
        })?;

        if let Some(device) = &self.options.bound_device {
            socket
                .bind_device(device)
                .map_err(|source| EngineError::SocketOption {
                    option: "SO_BINDTODEVICE",
                    source,
                })?;
            debug!(device = %device, "udp socket bound to device");
        }

        if self.send_enabled && self.mode == Mode::Framed {
            configure_send(socket, &address, self.options.multicast_loop)?;
            self.out_address = Some(address.target_addr());
        }
        if self.recv_enabled {
            configure_recv(socket, &address)?;
        }

        if self.send_enabled {
            self.set_write_interest(reactor, true);
        }
        if self.recv_enabled {
            self.set_read_interest(reactor, true);
            // drop whatever the session already queued for a receive-only engine
            self.restart_output(reactor)?;
        }
        Ok(())
    }

    fn abort_attach<R: Reactor<S>>(&mut self, reactor: &mut R) -> Option<Se> {
        if let Some(handle) = self.handle.take() {
            if let Err(err) = reactor.deregister(handle) {
                warn!(error = %err, "failed to deregister udp socket during rollback");
            }
        }
        self.socket = None;
        self.write_interest = false;
        self.read_interest = false;
        self.state = EngineState::Terminated;
        self.session.take()
    }
}

fn configure_send<S: DatagramSocket>(
    socket: &S,
    address: &ResolvedAddress,
    multicast_loop: bool,
) -> Result<()> {
    if !address.is_multicast() {
        return Ok(());
    }

    let family = address.family();
    let option = match family {
        AddressFamily::V4 => "IP_MULTICAST_LOOP",
        AddressFamily::V6 => "IPV6_MULTICAST_LOOP",
    };
    socket
        .set_multicast_loop(family, multicast_loop)
        .map_err(|source| EngineError::SocketOption { option, source })?;

    debug!(multicast_loop, "multicast loopback configured");
    Ok(())
}

fn configure_recv<S: DatagramSocket>(socket: &S, address: &ResolvedAddress) -> Result<()> {
    socket
        .set_reuse_address(true)
        .map_err(|source| EngineError::SocketOption {
            option: "SO_REUSEADDR",
            source,
        })?;

    let bind_addr = address.effective_bind_addr();
    socket
        .bind(bind_addr)
        .map_err(|source| EngineError::Bind {
            addr: bind_addr,
            source,
        })?;
    debug!(bind = %bind_addr, "udp socket bound");

    if !address.is_multicast() {
        return Ok(());
    }

    let group = address.target_addr().ip();
    let joined = match group {
        IpAddr::V4(group) => {
            let interface = match address.bind_addr().ip() {
                IpAddr::V4(interface) => interface,
                IpAddr::V6(_) => Ipv4Addr::UNSPECIFIED,
            };
            socket.join_multicast_v4(group, interface)
        }
        IpAddr::V6(group) => socket.join_multicast_v6(group, address.interface_index()),
    };
    joined.map_err(|source| EngineError::MulticastJoin { group, source })?;

    debug!(%group, "joined multicast group");
    Ok(())
}
