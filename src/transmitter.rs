/// Transmitter - send path of the engine
///
/// On writability one group/body pair is pulled from the session, framed
/// (or its raw destination resolved) and sent as exactly one datagram.
/// A receive-only engine never sends; it drains the session instead.
use std::net::SocketAddr;

use tracing::{debug, error, trace, warn};

use crate::contracts::{AddressFamily, Mode};
use crate::engine::{Engine, EngineState, EventOutcome};
use crate::errors::{EngineError, FrameError, Result};
use crate::framer::Framer;
use crate::raw_endpoint::RawEndpoint;
use crate::reactor::Reactor;
use crate::session::Session;
use crate::socket::{is_transient_send_error, DatagramSocket};

impl<S, Se> Engine<S, Se>
where
    S: DatagramSocket,
    Se: Session,
{
    /// Handle a writability notification
    ///
    /// Returns `Exhausted` once the session has nothing left to send; write
    /// interest is switched off at that point. Malformed or oversize pairs
    /// are dropped without sending and leave write interest on.
    ///
    /// # Errors
    /// - `Send` if the socket reports an error class other than would-block
    /// - `AddressFamilyMismatch` if a raw destination needs another family
    pub fn on_writable<R: Reactor<S>>(&mut self, reactor: &mut R) -> Result<EventOutcome> {
        self.expect_state(EngineState::Attached)?;
        if !self.send_enabled {
            return Ok(EventOutcome::Exhausted);
        }

        let session = self.session_mut()?;
        let Some(group) = session.pull_message() else {
            self.set_write_interest(reactor, false);
            return Ok(EventOutcome::Exhausted);
        };
        // sessions hand out pairs, the body is always behind the group
        let body = session.pull_message().unwrap_or_default();

        let (size, dest) = match self.mode {
            Mode::Raw => {
                let dest = match RawEndpoint::parse(group.data()) {
                    Ok(dest) => SocketAddr::V4(dest),
                    Err(err) => {
                        self.stats.dropped_bad_address += 1;
                        debug!(error = %err, "dropping raw message with invalid address");
                        return Ok(EventOutcome::Progressed);
                    }
                };
                let family = self
                    .address
                    .map_or(AddressFamily::V4, |address| address.family());
                if family != AddressFamily::V4 {
                    warn!(%dest, ?family, "raw destination unreachable from socket family");
                    return Err(EngineError::AddressFamilyMismatch { dest, family });
                }
                if body.len() > self.out_buffer.len() {
                    let err = FrameError::FrameTooLarge {
                        required: body.len(),
                        available: self.out_buffer.len(),
                    };
                    self.stats.dropped_oversize += 1;
                    warn!(error = %err, "dropping oversize raw datagram");
                    return Ok(EventOutcome::Progressed);
                }
                self.out_buffer[..body.len()].copy_from_slice(body.data());
                (body.len(), dest)
            }
            Mode::Framed => {
                let dest = self.out_address.ok_or(EngineError::InvalidState {
                    expected: "destination resolved",
                    actual: "no destination",
                })?;
                match Framer::encode(group.data(), body.data(), &mut self.out_buffer) {
                    Ok(size) => (size, dest),
                    Err(err) => {
                        self.stats.dropped_oversize += 1;
                        warn!(error = %err, "dropping message that does not fit one datagram");
                        return Ok(EventOutcome::Progressed);
                    }
                }
            }
        };

        let socket = self.socket.as_ref().ok_or(EngineError::InvalidState {
            expected: "socket open",
            actual: "socket released",
        })?;
        match socket.send_to(&self.out_buffer[..size], dest) {
            Ok(sent) => {
                self.stats.datagrams_sent += 1;
                self.stats.bytes_sent += sent as u64;
                trace!(%dest, bytes = sent, "datagram sent");
            }
            Err(err) if is_transient_send_error(&err) => {
                trace!(%dest, "send would block, treating datagram as sent");
            }
            Err(err) => {
                error!(%dest, error = %err, "udp send failed");
                return Err(EngineError::Send { dest, source: err });
            }
        }

        Ok(EventOutcome::Progressed)
    }

    /// Resume sending after the session queued more output
    ///
    /// Sets write interest and attempts one send right away. With sending
    /// disabled every queued segment is discarded instead.
    pub fn restart_output<R: Reactor<S>>(&mut self, reactor: &mut R) -> Result<()> {
        self.expect_state(EngineState::Attached)?;

        if !self.send_enabled {
            self.drain_outbound()?;
            return Ok(());
        }

        self.set_write_interest(reactor, true);
        self.on_writable(reactor)?;
        Ok(())
    }

    fn drain_outbound(&mut self) -> Result<()> {
        let session = self.session_mut()?;
        let mut drained = 0u64;
        while session.pull_message().is_some() {
            drained += 1;
        }

        if drained > 0 {
            self.stats.drained_messages += drained;
            debug!(drained, "discarded outgoing messages, sending is disabled");
        }
        Ok(())
    }
}
