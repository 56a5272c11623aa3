/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 17/10/26
******************************************************************************/

//! Session callback interface.
//!
//! Callbacks run on the reactor after the transition that produced them has
//! completed. Writes issued from a callback are queued through the
//! [`SessionContext`] and applied once the callback returns.

use bytes::{Bytes, BytesMut};
use forkey_core::error::SessionError;
use forkey_core::types::Phase;
use forkey_transport::codec::LineCodec;
use std::fmt;

/// Frames `payload` as one outbound line.
///
/// CRLF is appended unless the payload already ends in a linefeed.
#[must_use]
pub fn encode_line(payload: &str) -> Bytes {
    let mut buf = BytesMut::with_capacity(payload.len() + 2);
    LineCodec::put_line(payload.as_bytes(), &mut buf);
    buf.freeze()
}

/// Handle passed to callbacks for acting on the session.
#[derive(Debug)]
pub struct SessionContext {
    phase: Phase,
    outbound: Vec<Bytes>,
    shutdown: bool,
}

impl SessionContext {
    /// Creates a context for a callback running in `phase`.
    #[must_use]
    pub fn new(phase: Phase) -> Self {
        Self {
            phase,
            outbound: Vec::new(),
            shutdown: false,
        }
    }

    /// Queues `payload` for transmission as one line.
    pub fn write(&mut self, payload: impl AsRef<str>) {
        self.outbound.push(encode_line(payload.as_ref()));
    }

    /// Queues an already framed buffer.
    pub fn write_raw(&mut self, payload: Bytes) {
        self.outbound.push(payload);
    }

    /// Asks the reactor to stop once the callback returns.
    pub fn shutdown(&mut self) {
        self.shutdown = true;
    }

    /// Returns the session phase when the callback started.
    #[must_use]
    pub const fn phase(&self) -> Phase {
        self.phase
    }

    /// Returns the buffers queued so far.
    #[must_use]
    pub fn outbound(&self) -> &[Bytes] {
        &self.outbound
    }

    /// Returns true if a shutdown was requested.
    #[must_use]
    pub const fn is_shutdown(&self) -> bool {
        self.shutdown
    }

    /// Splits the context into its queued writes and shutdown flag.
    #[must_use]
    pub fn into_parts(self) -> (Vec<Bytes>, bool) {
        (self.outbound, self.shutdown)
    }
}

/// Receiver of session events.
pub trait SessionHandler {
    /// Called once when the handshake completes.
    fn on_connected(&mut self, ctx: &mut SessionContext) {
        let _ = ctx;
    }

    /// Called for every non-empty inbound line, terminator stripped.
    fn on_line(&mut self, line: &str, ctx: &mut SessionContext);

    /// Called at most once with the terminal error.
    fn on_error(&mut self, error: &SessionError) {
        let _ = error;
    }
}

type ConnectedFn = Box<dyn FnMut(&mut SessionContext) + Send>;
type LineFn = Box<dyn FnMut(&str, &mut SessionContext) + Send>;
type ErrorFn = Box<dyn FnMut(&SessionError) + Send>;

/// Closure-based handler.
///
/// Each callback slot is optional; unset slots ignore their event.
#[derive(Default)]
pub struct Callbacks {
    connected: Option<ConnectedFn>,
    line: Option<LineFn>,
    error: Option<ErrorFn>,
}

impl Callbacks {
    /// Creates a handler with every slot empty.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the connect callback.
    #[must_use]
    pub fn with_on_connected<F>(mut self, f: F) -> Self
    where
        F: FnMut(&mut SessionContext) + Send + 'static,
    {
        self.connected = Some(Box::new(f));
        self
    }

    /// Sets the line callback.
    #[must_use]
    pub fn with_on_read<F>(mut self, f: F) -> Self
    where
        F: FnMut(&str, &mut SessionContext) + Send + 'static,
    {
        self.line = Some(Box::new(f));
        self
    }

    /// Sets the error callback.
    #[must_use]
    pub fn with_on_error<F>(mut self, f: F) -> Self
    where
        F: FnMut(&SessionError) + Send + 'static,
    {
        self.error = Some(Box::new(f));
        self
    }
}

impl fmt::Debug for Callbacks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Callbacks")
            .field("connected", &self.connected.is_some())
            .field("line", &self.line.is_some())
            .field("error", &self.error.is_some())
            .finish()
    }
}

impl SessionHandler for Callbacks {
    fn on_connected(&mut self, ctx: &mut SessionContext) {
        if let Some(f) = self.connected.as_mut() {
            f(ctx);
        }
    }

    fn on_line(&mut self, line: &str, ctx: &mut SessionContext) {
        if let Some(f) = self.line.as_mut() {
            f(line, ctx);
        }
    }

    fn on_error(&mut self, error: &SessionError) {
        if let Some(f) = self.error.as_mut() {
            f(error);
        }
    }
}
