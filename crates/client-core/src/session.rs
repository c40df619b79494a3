//! Session state machine
//!
//! A session is an explicit owned value rather than process-wide state, so
//! multiple independent sessions (and tests) can coexist. The state machine
//! is the single guard for connect/disconnect reentrancy:
//!
//! ```text
//! Idle --connect()--> Connecting --success--> Connected
//!                          |                      |
//!                          +--failure--> Idle     +--disconnect()--> Disconnecting --> Idle
//! ```
//!
//! `connect()` is legal only from `Idle`. Chat turns are legal in any
//! state; speech sync consults the state at reply-resolution time and is
//! skipped (never queued) when the session is not `Connected`.

use chrono::{DateTime, Utc};

use crate::error::{ClientError, ClientResult};

/// States an avatar session moves through
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No media session; chat still works
    Idle,
    /// Negotiation in progress
    Connecting,
    /// Live media session; speech sync active
    Connected,
    /// Teardown in progress; collapses to `Idle` on completion
    Disconnecting,
}

impl SessionState {
    /// Lowercase name used in errors and status text
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Disconnecting => "disconnecting",
        }
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One avatar session (one per browser-tab-equivalent)
///
/// Owns the state and the identity of the tutor being called. Media
/// handles live in the media session manager and are released on
/// teardown; this value only tracks where in the lifecycle we are.
#[derive(Debug, Clone)]
pub struct Session {
    state: SessionState,
    tutor_id: Option<String>,
    connected_at: Option<DateTime<Utc>>,
}

impl Session {
    /// Create a fresh idle session
    pub fn new() -> Self {
        Self {
            state: SessionState::Idle,
            tutor_id: None,
            connected_at: None,
        }
    }

    /// Current state
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Tutor this session is connecting/connected to, if any
    pub fn tutor_id(&self) -> Option<&str> {
        self.tutor_id.as_deref()
    }

    /// When the media session was established, if connected
    pub fn connected_at(&self) -> Option<DateTime<Utc>> {
        self.connected_at
    }

    /// Whether a live media session exists
    pub fn is_connected(&self) -> bool {
        self.state == SessionState::Connected
    }

    /// Enter `Connecting`. Rejected unless the session is `Idle`, which is
    /// the only protection against reentrant connects.
    pub fn begin_connect(&mut self, tutor_id: &str) -> ClientResult<()> {
        if self.state != SessionState::Idle {
            return Err(ClientError::invalid_state(
                SessionState::Idle.as_str(),
                self.state.as_str(),
            ));
        }
        self.transition(SessionState::Connecting);
        self.tutor_id = Some(tutor_id.to_string());
        Ok(())
    }

    /// Commit a successful negotiation: `Connecting` -> `Connected`
    pub fn complete_connect(&mut self) -> ClientResult<()> {
        if self.state != SessionState::Connecting {
            return Err(ClientError::invalid_state(
                SessionState::Connecting.as_str(),
                self.state.as_str(),
            ));
        }
        self.transition(SessionState::Connected);
        self.connected_at = Some(Utc::now());
        Ok(())
    }

    /// Roll back a failed connect attempt: `Connecting` -> `Idle`.
    ///
    /// Tolerates being called when a concurrent disconnect already moved
    /// the session away from `Connecting`; the disconnect owns the reset
    /// in that case.
    pub fn fail_connect(&mut self) {
        if self.state == SessionState::Connecting {
            self.transition(SessionState::Idle);
            self.tutor_id = None;
        } else {
            tracing::debug!(
                "connect failure observed in state {}; leaving it alone",
                self.state
            );
        }
    }

    /// Enter the transient `Disconnecting` state. Legal from any state so
    /// that disconnect stays idempotent.
    pub fn begin_disconnect(&mut self) {
        self.transition(SessionState::Disconnecting);
    }

    /// Collapse `Disconnecting` to `Idle` and forget the session identity
    pub fn complete_disconnect(&mut self) {
        self.transition(SessionState::Idle);
        self.tutor_id = None;
        self.connected_at = None;
    }

    fn transition(&mut self, new_state: SessionState) {
        tracing::debug!("session state: {} -> {}", self.state, new_state);
        self.state = new_state;
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn happy_path_lifecycle() {
        let mut session = Session::new();
        assert_eq!(session.state(), SessionState::Idle);

        session.begin_connect("7").unwrap();
        assert_eq!(session.state(), SessionState::Connecting);
        assert_eq!(session.tutor_id(), Some("7"));

        session.complete_connect().unwrap();
        assert!(session.is_connected());
        assert!(session.connected_at().is_some());

        session.begin_disconnect();
        assert_eq!(session.state(), SessionState::Disconnecting);
        session.complete_disconnect();
        assert_eq!(session.state(), SessionState::Idle);
        assert_eq!(session.tutor_id(), None);
        assert_eq!(session.connected_at(), None);
    }

    #[test]
    fn connect_rejected_unless_idle() {
        let mut session = Session::new();
        session.begin_connect("7").unwrap();

        let err = session.begin_connect("7").unwrap_err();
        assert!(matches!(err, ClientError::InvalidState { .. }));

        session.complete_connect().unwrap();
        let err = session.begin_connect("7").unwrap_err();
        assert!(matches!(err, ClientError::InvalidState { .. }));
    }

    #[test]
    fn failed_connect_returns_to_idle() {
        let mut session = Session::new();
        session.begin_connect("7").unwrap();
        session.fail_connect();
        assert_eq!(session.state(), SessionState::Idle);
        assert_eq!(session.tutor_id(), None);

        // and the session is immediately reusable
        session.begin_connect("8").unwrap();
        assert_eq!(session.tutor_id(), Some("8"));
    }

    #[test]
    fn fail_connect_does_not_stomp_concurrent_disconnect() {
        let mut session = Session::new();
        session.begin_connect("7").unwrap();
        session.begin_disconnect();
        session.fail_connect();
        assert_eq!(session.state(), SessionState::Disconnecting);
    }

    #[test]
    fn complete_connect_rejected_after_disconnect() {
        let mut session = Session::new();
        session.begin_connect("7").unwrap();
        session.begin_disconnect();
        session.complete_disconnect();
        assert!(session.complete_connect().is_err());
        assert_eq!(session.state(), SessionState::Idle);
    }

    #[test]
    fn disconnect_is_legal_from_any_state() {
        let mut session = Session::new();
        session.begin_disconnect();
        session.complete_disconnect();
        assert_eq!(session.state(), SessionState::Idle);
    }
}
