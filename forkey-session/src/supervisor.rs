/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 17/10/26
******************************************************************************/

//! Timeout supervision for the connection phases.
//!
//! A single timer slot is shared by resolution, connect and handshake. Arming
//! always replaces the previous registration and moves the generation forward,
//! so completions and expiries from an earlier operation no longer match.

use forkey_core::types::{OpToken, Phase};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Armed {
    token: OpToken,
    phase: Phase,
    after: Duration,
}

/// Tracks the one supervised operation of a session.
#[derive(Debug, Default)]
pub struct TimeoutSupervisor {
    generation: OpToken,
    armed: Option<Armed>,
}

impl TimeoutSupervisor {
    /// Creates an idle supervisor.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts supervising a new operation in `phase`.
    ///
    /// Any previously armed operation is forgotten; its token becomes stale.
    pub fn arm(&mut self, phase: Phase, after: Duration) -> OpToken {
        self.generation = self.generation.next();
        self.armed = Some(Armed {
            token: self.generation,
            phase,
            after,
        });
        self.generation
    }

    /// Stops supervising. Returns true if an operation was armed.
    ///
    /// Calling this with nothing armed is a no-op.
    pub fn disarm(&mut self) -> bool {
        self.armed.take().is_some()
    }

    /// Returns true if `token` names the operation currently supervised.
    #[must_use]
    pub fn is_current(&self, token: OpToken) -> bool {
        self.armed.is_some_and(|armed| armed.token == token)
    }

    /// Handles a timer expiry for `token`.
    ///
    /// Returns the supervised phase and its timeout on a genuine expiry, or
    /// `None` if the token is stale.
    pub fn expire(&mut self, token: OpToken) -> Option<(Phase, Duration)> {
        if !self.is_current(token) {
            return None;
        }
        self.armed.take().map(|armed| (armed.phase, armed.after))
    }

    /// Returns the phase currently supervised, if any.
    #[must_use]
    pub fn armed_phase(&self) -> Option<Phase> {
        self.armed.map(|armed| armed.phase)
    }

    /// Returns the latest generation handed out.
    #[must_use]
    pub const fn generation(&self) -> OpToken {
        self.generation
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEN: Duration = Duration::from_secs(10);

    #[test]
    fn test_arm_replaces_previous() {
        let mut supervisor = TimeoutSupervisor::new();
        let first = supervisor.arm(Phase::Resolving, TEN);
        let second = supervisor.arm(Phase::Connecting, TEN);

        assert_ne!(first, second);
        assert!(!supervisor.is_current(first));
        assert!(supervisor.is_current(second));
        assert_eq!(supervisor.armed_phase(), Some(Phase::Connecting));
    }

    #[test]
    fn test_disarm_is_idempotent() {
        let mut supervisor = TimeoutSupervisor::new();
        assert!(!supervisor.disarm());

        let token = supervisor.arm(Phase::Resolving, TEN);
        assert!(supervisor.disarm());
        assert!(!supervisor.disarm());
        assert!(!supervisor.is_current(token));
    }

    #[test]
    fn test_expire_genuine() {
        let mut supervisor = TimeoutSupervisor::new();
        let token = supervisor.arm(Phase::Handshaking, TEN);

        assert_eq!(supervisor.expire(token), Some((Phase::Handshaking, TEN)));
        assert_eq!(supervisor.armed_phase(), None);
        assert_eq!(supervisor.expire(token), None);
    }

    #[test]
    fn test_expire_after_cancel_is_silent() {
        let mut supervisor = TimeoutSupervisor::new();
        let token = supervisor.arm(Phase::Resolving, TEN);
        supervisor.disarm();
        assert_eq!(supervisor.expire(token), None);
    }

    #[test]
    fn test_expire_stale_generation() {
        let mut supervisor = TimeoutSupervisor::new();
        let stale = supervisor.arm(Phase::Resolving, TEN);
        let current = supervisor.arm(Phase::Connecting, TEN);

        assert_eq!(supervisor.expire(stale), None);
        assert!(supervisor.is_current(current));
        assert_eq!(supervisor.generation(), current);
    }
}
