/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 17/10/26
******************************************************************************/

//! Core types for session operations.
//!
//! This module provides fundamental types used throughout the Forkey engine:
//! - [`Phase`]: The stage a session is in
//! - [`OpToken`]: Generation counter for supervised operations

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Default service port used for the rendezvous before the TLS upgrade.
pub const DEFAULT_PORT: u16 = 6667;

/// Timeout applied to resolution, TCP connect and TLS handshake.
pub const DEFAULT_PHASE_TIMEOUT: Duration = Duration::from_secs(10);

/// Connection phase of a session.
///
/// Phases only move forward: `Idle -> Resolving -> Connecting -> Handshaking -> Connected`,
/// and any phase may drop into the terminal `Failed` phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    /// Created, `connect` not yet called.
    Idle,
    /// Waiting for the hostname lookup.
    Resolving,
    /// TCP connect in progress.
    Connecting,
    /// TLS handshake in progress.
    Handshaking,
    /// Steady state: reading lines and draining writes.
    Connected,
    /// Terminal. The error has been delivered.
    Failed,
}

impl Phase {
    /// Returns true if the phase is guarded by the timeout supervisor.
    #[inline]
    #[must_use]
    pub const fn is_supervised(self) -> bool {
        matches!(self, Self::Resolving | Self::Connecting | Self::Handshaking)
    }

    /// Returns true if no further transition is possible.
    #[inline]
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Failed)
    }

    /// Checks whether moving from `self` to `next` is a legal transition.
    #[must_use]
    pub const fn can_advance_to(self, next: Self) -> bool {
        match (self, next) {
            (Self::Failed, _) => false,
            (_, Self::Failed) => true,
            (Self::Idle, Self::Resolving)
            | (Self::Resolving, Self::Connecting)
            | (Self::Connecting, Self::Handshaking)
            | (Self::Handshaking, Self::Connected) => true,
            _ => false,
        }
    }

    /// Returns the lowercase name of the phase.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Resolving => "resolving",
            Self::Connecting => "connecting",
            Self::Handshaking => "handshaking",
            Self::Connected => "connected",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Token identifying one supervised operation.
///
/// Every resolve, connect and handshake is issued with the token current at the
/// time. Completions carrying any other token are stale and must be ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[repr(transparent)]
pub struct OpToken(u64);

impl OpToken {
    /// Creates a token from a raw generation value.
    #[inline]
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Returns the raw generation value.
    #[inline]
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }

    /// Returns the following generation.
    #[inline]
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0.wrapping_add(1))
    }
}

impl fmt::Display for OpToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}
