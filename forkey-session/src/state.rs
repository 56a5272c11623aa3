/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 17/10/26
******************************************************************************/

//! Session phase machine.
//!
//! [`Session::handle`] is the pure transition function of a connection: it
//! consumes one [`Input`] and returns the [`Command`]s the driver must carry
//! out. It performs no I/O and never re-enters itself, so every transition is
//! one atomic step.
//!
//! Once the session enters [`Phase::Failed`] the error has been emitted and all
//! further input is ignored.

use crate::config::{ReadErrorPolicy, SessionConfig};
use crate::framer::ReadFramer;
use crate::queue::WriteQueue;
use crate::supervisor::TimeoutSupervisor;
use bytes::Bytes;
use forkey_core::error::SessionError;
use forkey_core::types::{OpToken, Phase};
use smallvec::SmallVec;
use std::io;
use std::net::SocketAddr;
use std::time::Duration;
use tracing::{debug, trace, warn};

/// Event fed into the session.
#[derive(Debug)]
pub enum Input {
    /// Caller asked to connect to `host`.
    Connect {
        /// Hostname or address literal.
        host: String,
    },
    /// Hostname lookup completed.
    Resolved {
        /// Token the lookup was issued with.
        token: OpToken,
        /// Endpoints or lookup error.
        result: io::Result<Vec<SocketAddr>>,
    },
    /// TCP connect completed.
    TcpConnected {
        /// Token the connect was issued with.
        token: OpToken,
        /// Connect outcome.
        result: io::Result<()>,
    },
    /// TLS handshake completed.
    Handshaken {
        /// Token the handshake was issued with.
        token: OpToken,
        /// Handshake outcome.
        result: io::Result<()>,
    },
    /// The supervision timer for `token` elapsed.
    TimerExpired {
        /// Token the timer was armed with.
        token: OpToken,
    },
    /// A low-level read returned bytes.
    Received(Bytes),
    /// A low-level read hit end of stream.
    EndOfStream,
    /// A low-level read failed.
    ReadFailed(io::Error),
    /// Caller queued an outbound buffer.
    Write(Bytes),
    /// The in-flight buffer finished transmitting.
    WriteCompleted(io::Result<()>),
}

/// Event delivered to the session handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// Handshake complete; the session is usable.
    Connected,
    /// One inbound line, without its terminator.
    Line(String),
    /// Terminal failure. Emitted at most once.
    Error(SessionError),
}

/// Work the driver must perform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Arm the supervision timer, replacing any previous one.
    ArmTimer {
        /// Token delivered back on expiry.
        token: OpToken,
        /// Time until expiry.
        after: Duration,
    },
    /// Cancel the supervision timer.
    CancelTimer,
    /// Start a hostname lookup.
    Resolve {
        /// Token to complete with.
        token: OpToken,
        /// Hostname to look up.
        host: String,
        /// Service port.
        port: u16,
    },
    /// Start a TCP connect.
    Connect {
        /// Token to complete with.
        token: OpToken,
        /// Endpoints to try in order.
        endpoints: Vec<SocketAddr>,
    },
    /// Start the TLS handshake on the connected socket.
    Handshake {
        /// Token to complete with.
        token: OpToken,
        /// Host the session connected to.
        host: String,
    },
    /// Cancel the in-flight supervised operation, best effort.
    Abort {
        /// Token of the operation to cancel.
        token: OpToken,
    },
    /// Issue the next low-level read.
    Read,
    /// Transmit a buffer.
    Transmit(Bytes),
    /// Deliver an event to the handler.
    Emit(SessionEvent),
    /// Release the socket and every outstanding operation.
    Close,
}

/// Commands produced by a single transition.
pub type Commands = SmallVec<[Command; 4]>;

/// State of one connection attempt.
#[derive(Debug)]
pub struct Session {
    config: SessionConfig,
    phase: Phase,
    host: Option<String>,
    supervisor: TimeoutSupervisor,
    framer: ReadFramer,
    writes: WriteQueue,
    read_errors: u32,
    error_delivered: bool,
}

impl Session {
    /// Creates an idle session.
    #[must_use]
    pub fn new(config: SessionConfig) -> Self {
        let framer = ReadFramer::new(config.max_line_length);
        Self {
            config,
            phase: Phase::Idle,
            host: None,
            supervisor: TimeoutSupervisor::new(),
            framer,
            writes: WriteQueue::new(),
            read_errors: 0,
            error_delivered: false,
        }
    }

    /// Returns the current phase.
    #[inline]
    #[must_use]
    pub const fn phase(&self) -> Phase {
        self.phase
    }

    /// Returns the session configuration.
    #[must_use]
    pub const fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Returns true once the terminal error has been emitted.
    #[must_use]
    pub const fn error_delivered(&self) -> bool {
        self.error_delivered
    }

    /// Returns true if `token` names the currently supervised operation.
    #[must_use]
    pub fn is_current(&self, token: OpToken) -> bool {
        !self.phase.is_terminal() && self.supervisor.is_current(token)
    }

    /// Returns the number of queued outbound buffers.
    #[must_use]
    pub fn queued_writes(&self) -> usize {
        self.writes.len()
    }

    /// Applies one input and returns the resulting commands.
    pub fn handle(&mut self, input: Input) -> Commands {
        let mut out = Commands::new();
        if self.phase.is_terminal() {
            trace!(?input, "session failed, input ignored");
            return out;
        }

        match input {
            Input::Connect { host } => self.on_connect(host, &mut out),
            Input::Resolved { token, result } => self.on_resolved(token, result, &mut out),
            Input::TcpConnected { token, result } => self.on_tcp_connected(token, result, &mut out),
            Input::Handshaken { token, result } => self.on_handshaken(token, result, &mut out),
            Input::TimerExpired { token } => self.on_timer(token, &mut out),
            Input::Received(data) => self.on_received(&data, &mut out),
            Input::EndOfStream => {
                if self.phase == Phase::Connected {
                    self.fail(SessionError::StreamClosed, &mut out);
                }
            }
            Input::ReadFailed(err) => self.on_read_failed(&err, &mut out),
            Input::Write(payload) => self.on_write(payload, &mut out),
            Input::WriteCompleted(result) => self.on_write_completed(result, &mut out),
        }
        out
    }

    fn on_connect(&mut self, host: String, out: &mut Commands) {
        if self.phase != Phase::Idle {
            warn!(phase = %self.phase, "connect ignored, session already started");
            return;
        }
        self.advance(Phase::Resolving);
        let token = self.supervise(out);
        out.push(Command::Resolve {
            token,
            host: host.clone(),
            port: self.config.port,
        });
        self.host = Some(host);
    }

    fn on_resolved(
        &mut self,
        token: OpToken,
        result: io::Result<Vec<SocketAddr>>,
        out: &mut Commands,
    ) {
        if !self.accepts(Phase::Resolving, token) {
            return;
        }
        self.settle(out);

        let host = self.host.clone().unwrap_or_default();
        match result {
            Ok(endpoints) if endpoints.is_empty() => self.fail(
                SessionError::ResolutionFailure {
                    host,
                    reason: "no addresses found".into(),
                },
                out,
            ),
            Ok(endpoints) => {
                self.advance(Phase::Connecting);
                let token = self.supervise(out);
                out.push(Command::Connect { token, endpoints });
            }
            Err(e) => self.fail(
                SessionError::ResolutionFailure {
                    host,
                    reason: e.to_string(),
                },
                out,
            ),
        }
    }

    fn on_tcp_connected(&mut self, token: OpToken, result: io::Result<()>, out: &mut Commands) {
        if !self.accepts(Phase::Connecting, token) {
            return;
        }
        self.settle(out);

        match result {
            Ok(()) => {
                self.advance(Phase::Handshaking);
                let token = self.supervise(out);
                out.push(Command::Handshake {
                    token,
                    host: self.host.clone().unwrap_or_default(),
                });
            }
            Err(e) => self.fail(SessionError::ConnectFailure(e.to_string()), out),
        }
    }

    fn on_handshaken(&mut self, token: OpToken, result: io::Result<()>, out: &mut Commands) {
        if !self.accepts(Phase::Handshaking, token) {
            return;
        }
        self.settle(out);

        match result {
            Ok(()) => {
                self.advance(Phase::Connected);
                out.push(Command::Read);
                if let Some(head) = self.writes.start() {
                    out.push(Command::Transmit(head));
                }
                out.push(Command::Emit(SessionEvent::Connected));
            }
            Err(e) => self.fail(SessionError::HandshakeFailure(e.to_string()), out),
        }
    }

    fn on_timer(&mut self, token: OpToken, out: &mut Commands) {
        let Some((phase, after)) = self.supervisor.expire(token) else {
            debug!(%token, "stale timer expiry ignored");
            return;
        };
        warn!(%phase, ?after, "phase timed out");
        out.push(Command::Abort { token });
        self.fail(
            SessionError::Timeout {
                phase,
                after_ms: u64::try_from(after.as_millis()).unwrap_or(u64::MAX),
            },
            out,
        );
    }

    fn on_received(&mut self, data: &[u8], out: &mut Commands) {
        if self.phase != Phase::Connected {
            debug!(phase = %self.phase, "data outside connected phase ignored");
            return;
        }
        self.read_errors = 0;

        match self.framer.feed(data) {
            Ok(lines) => {
                out.extend(
                    lines
                        .into_iter()
                        .map(|line| Command::Emit(SessionEvent::Line(line))),
                );
                out.push(Command::Read);
            }
            Err(e) => self.fail(SessionError::ReadFailure(e.to_string()), out),
        }
    }

    fn on_read_failed(&mut self, err: &io::Error, out: &mut Commands) {
        if self.phase != Phase::Connected {
            return;
        }
        match self.config.read_error_policy {
            ReadErrorPolicy::Fail => self.fail(SessionError::ReadFailure(err.to_string()), out),
            ReadErrorPolicy::Continue { max_consecutive } => {
                self.read_errors += 1;
                if self.read_errors >= max_consecutive {
                    self.fail(
                        SessionError::ReadFailure(format!(
                            "{err} ({} consecutive errors)",
                            self.read_errors
                        )),
                        out,
                    );
                } else {
                    warn!(error = %err, attempt = self.read_errors, "read failed, reading again");
                    out.push(Command::Read);
                }
            }
        }
    }

    fn on_write(&mut self, payload: Bytes, out: &mut Commands) {
        self.writes.push(payload);
        if self.phase != Phase::Connected {
            return;
        }
        if let Some(head) = self.writes.start() {
            out.push(Command::Transmit(head));
        }
    }

    fn on_write_completed(&mut self, result: io::Result<()>, out: &mut Commands) {
        if self.phase != Phase::Connected {
            return;
        }
        match result {
            Ok(()) => {
                if let Some(next) = self.writes.complete() {
                    out.push(Command::Transmit(next));
                }
            }
            Err(e) => self.fail(SessionError::WriteFailure(e.to_string()), out),
        }
    }

    /// Checks that a completion belongs to the operation currently supervised.
    fn accepts(&self, phase: Phase, token: OpToken) -> bool {
        let accepted = self.phase == phase && self.supervisor.is_current(token);
        if !accepted {
            debug!(%token, phase = %self.phase, "stale completion ignored");
        }
        accepted
    }

    fn advance(&mut self, next: Phase) {
        debug_assert!(self.phase.can_advance_to(next));
        debug!(from = %self.phase, to = %next, "phase transition");
        self.phase = next;
    }

    /// Arms the timer for the current phase.
    fn supervise(&mut self, out: &mut Commands) -> OpToken {
        let after = self
            .config
            .timeout_for(self.phase)
            .unwrap_or(forkey_core::types::DEFAULT_PHASE_TIMEOUT);
        let token = self.supervisor.arm(self.phase, after);
        out.push(Command::ArmTimer { token, after });
        token
    }

    fn settle(&mut self, out: &mut Commands) {
        if self.supervisor.disarm() {
            out.push(Command::CancelTimer);
        }
    }

    fn fail(&mut self, error: SessionError, out: &mut Commands) {
        if self.error_delivered {
            return;
        }
        self.settle(out);
        let dropped = self.writes.clear();
        if dropped > 0 {
            debug!(dropped, "queued writes dropped");
        }
        self.advance(Phase::Failed);
        self.error_delivered = true;
        out.push(Command::Emit(SessionEvent::Error(error)));
        out.push(Command::Close);
    }
}
