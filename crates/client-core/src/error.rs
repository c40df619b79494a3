//! Error types for avatar client operations
//!
//! The taxonomy mirrors the failure surfaces of the session core:
//! pre-flight (`AvatarUnavailable`), transport setup (`NegotiationFailed`),
//! chat round trips (`ReplyFailed`), speech sync (`SpeechSyncFailed`,
//! swallowed at the coordinator boundary) and the session-state and
//! reentrancy guards. No error here is fatal to the process: every failure
//! path returns control to the caller with a description.

use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum ClientError {
    /// The tutor has no avatar, or its avatar is not in "running" status.
    /// Checked before any media capture so the user is never prompted for
    /// microphone permission needlessly.
    #[error("Avatar unavailable: {reason}")]
    AvatarUnavailable { reason: String },

    /// The offer/answer exchange with the signaling relay failed. There is
    /// no retry; the whole session-connect operation must be restarted.
    #[error("Media negotiation failed: {reason}")]
    NegotiationFailed { reason: String },

    /// The chat turn round trip failed. The session itself is unaffected
    /// and the user turn stays in history, unanswered.
    #[error("Chat reply failed: {reason}")]
    ReplyFailed { reason: String },

    /// Speech synthesis or playback failed. Never surfaced as a chat
    /// error; the coordinator logs it and moves on.
    #[error("Speech sync failed: {reason}")]
    SpeechSyncFailed { reason: String },

    /// An operation was attempted in a session state that does not permit
    /// it (e.g. `connect()` while not idle).
    #[error("Invalid session state: expected {expected}, was {actual}")]
    InvalidState { expected: String, actual: String },

    /// A chat turn is already in flight; submissions are serialized by the
    /// conversation manager's single-slot guard.
    #[error("A chat turn is already in flight")]
    TurnInFlight,

    /// Local media capture could not be acquired.
    #[error("Media capture error: {message}")]
    MediaCapture { message: String },

    /// The peer transport reported an error.
    #[error("Transport error: {message}")]
    Transport { message: String },

    /// Transport-level HTTP failure that does not map to a more specific
    /// variant (health probes, tutor info fetch).
    #[error("Network error: {message}")]
    Network { message: String },
}

/// Result type alias for client operations
pub type ClientResult<T> = std::result::Result<T, ClientError>;

impl ClientError {
    /// Create an `AvatarUnavailable` error
    pub fn avatar_unavailable(reason: impl Into<String>) -> Self {
        Self::AvatarUnavailable { reason: reason.into() }
    }

    /// Create a `NegotiationFailed` error
    pub fn negotiation_failed(reason: impl Into<String>) -> Self {
        Self::NegotiationFailed { reason: reason.into() }
    }

    /// Create a `ReplyFailed` error
    pub fn reply_failed(reason: impl Into<String>) -> Self {
        Self::ReplyFailed { reason: reason.into() }
    }

    /// Create a `SpeechSyncFailed` error
    pub fn speech_sync_failed(reason: impl Into<String>) -> Self {
        Self::SpeechSyncFailed { reason: reason.into() }
    }

    /// Create an `InvalidState` error from the expected and actual states
    pub fn invalid_state(expected: impl Into<String>, actual: impl Into<String>) -> Self {
        Self::InvalidState { expected: expected.into(), actual: actual.into() }
    }

    /// Whether the failure leaves the session usable as-is.
    ///
    /// Recoverable errors are surfaced per-operation and the caller may
    /// simply try again; non-recoverable ones mean the connect attempt was
    /// rolled back and the session reset to idle.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::AvatarUnavailable { .. }
                | Self::ReplyFailed { .. }
                | Self::SpeechSyncFailed { .. }
                | Self::TurnInFlight
        )
    }

    /// Coarse error category for logging and user-facing display
    pub fn category(&self) -> &'static str {
        match self {
            Self::AvatarUnavailable { .. } => "avatar",
            Self::NegotiationFailed { .. } => "negotiation",
            Self::ReplyFailed { .. } => "chat",
            Self::SpeechSyncFailed { .. } => "speech",
            Self::InvalidState { .. } | Self::TurnInFlight => "state",
            Self::MediaCapture { .. } => "capture",
            Self::Transport { .. } => "transport",
            Self::Network { .. } => "network",
        }
    }
}
