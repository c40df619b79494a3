//! # vtutor-client-core
//!
//! Session and negotiation core for a conversational-avatar client: the
//! state machine a session moves through (idle → connecting → connected →
//! disconnecting), WebRTC-style offer/answer negotiation through an HTTP
//! signaling relay, bounded-history chat turns against an opaque reply
//! service, and best-effort speech sync of assistant replies while the
//! media session is live.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                     ClientManager                       │
//! │        (session state machine gates operations)         │
//! └──────┬──────────────────┬──────────────────┬────────────┘
//!        │                  │                  │
//! ┌──────▼───────┐   ┌──────▼────────┐  ┌──────▼────────────┐
//! │ MediaSession │   │ Conversation  │  │ SpeechSync        │
//! │ Manager      │   │ Manager       │  │ Coordinator       │
//! │ capture /    │   │ history /     │  │ TTS + playback,   │
//! │ offer-answer │   │ reply cycle   │  │ connected only    │
//! └──────┬───────┘   └───────────────┘  └───────────────────┘
//!        │
//! ┌──────▼───────┐
//! │ Signaling    │
//! │ Client       │
//! └──────────────┘
//! ```
//!
//! The ambient capabilities (microphone, peer transport, playback surface,
//! audio sink) are injected behind the traits in [`media`], so the whole
//! core runs against in-memory mocks in tests and against real device
//! bindings in an application shell.
//!
//! # Quick start
//!
//! See [`client::ClientManager`] for a full connect/chat/disconnect
//! example.

pub mod client;
pub mod config;
pub mod conversation;
pub mod error;
pub mod media;
pub mod session;
pub mod signaling;
pub mod speech;

// Re-exports for convenience
pub use client::ClientManager;
pub use config::{ClientConfig, TtsConfig, DEFAULT_HISTORY_WINDOW};
pub use conversation::{ConversationManager, ConversationTurn, Role};
pub use error::{ClientError, ClientResult};
pub use media::{MediaSessionManager, IceConfig};
pub use session::{Session, SessionState};
pub use signaling::{
    NegotiationExchange, ServiceStatus, SessionDescription, SignalingClient, TutorInfo,
};
pub use speech::SpeechSyncCoordinator;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
