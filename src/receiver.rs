use tracing::{debug, error, trace, warn};

use crate::contracts::{Message, Mode};
use crate::engine::{Engine, EngineState, EventOutcome};
use crate::errors::{EngineError, Result};
use crate::framer::Framer;
use crate::raw_endpoint::RawEndpoint;
use crate::reactor::Reactor;
use crate::session::Session;
use crate::socket::{is_transient_recv_error, DatagramSocket};

impl<S, Se> Engine<S, Se>
where
    S: DatagramSocket,
    Se: Session,
{
    /// Handle a readability notification: receive and deliver one datagram
    ///
    /// A rejected group push drops the datagram and pauses reading. A
    /// rejected body push (after the group was accepted) also resets the
    /// session's receive state so the orphaned group is discarded.
    pub fn on_readable<R: Reactor<S>>(&mut self, reactor: &mut R) -> Result<EventOutcome> {
        self.expect_state(EngineState::Attached)?;
        if !self.recv_enabled {
            return Ok(EventOutcome::Exhausted);
        }

        let socket = self.socket.as_ref().ok_or(EngineError::InvalidState {
            expected: "socket open",
            actual: "socket released",
        })?;
        let (nbytes, peer) = match socket.recv_from(&mut self.in_buffer) {
            Ok(received) => received,
            Err(err) if is_transient_recv_error(&err) => {
                trace!(error = %err, "receive not ready");
                return Ok(EventOutcome::Exhausted);
            }
            Err(err) => {
                error!(error = %err, "udp receive failed");
                return Err(EngineError::Receive(err));
            }
        };
        self.stats.datagrams_received += 1;
        self.stats.bytes_received += nbytes as u64;

        let datagram = &self.in_buffer[..nbytes];
        let (group, body) = match self.mode {
            Mode::Raw => (
                Message::group(RawEndpoint::format(&peer)),
                Message::from_slice(datagram, false),
            ),
            Mode::Framed => match Framer::decode(datagram) {
                Ok((group, body)) => (
                    Message::from_slice(group, true),
                    Message::from_slice(body, false),
                ),
                Err(err) => {
                    self.stats.dropped_malformed += 1;
                    debug!(%peer, error = %err, "dropping malformed datagram");
                    return Ok(EventOutcome::Progressed);
                }
            },
        };

        if self.session_mut()?.push_message(group).is_err() {
            self.stats.dropped_group_backpressure += 1;
            trace!(%peer, "session full, dropping datagram");
            self.set_read_interest(reactor, false);
            return Ok(EventOutcome::Progressed);
        }

        let session = self.session_mut()?;
        if session.push_message(body).is_err() {
            session.reset_receive_state();
            self.stats.dropped_body_backpressure += 1;
            warn!(%peer, "session full after group, dropping body and resetting");
            self.set_read_interest(reactor, false);
            return Ok(EventOutcome::Progressed);
        }
        session.flush();

        trace!(%peer, bytes = nbytes, "datagram delivered");
        Ok(EventOutcome::Progressed)
    }

    /// Resume reading after the session drained its queue
    ///
    /// Sets read interest and attempts one receive right away.
    pub fn restart_input<R: Reactor<S>>(&mut self, reactor: &mut R) -> Result<()> {
        self.expect_state(EngineState::Attached)?;
        if !self.recv_enabled {
            return Ok(());
        }

        self.set_read_interest(reactor, true);
        self.on_readable(reactor)?;
        Ok(())
    }
}
