//! Media capability abstraction
//!
//! The ambient browser capabilities (capture device, peer transport,
//! playback surface) are injected behind traits so the session core is
//! testable without real hardware or network. The layering mirrors the
//! audio device abstraction used elsewhere in the workspace:
//!
//! ```text
//! ┌─────────────────────┐    ┌──────────────────────┐    ┌─────────────────────┐
//! │   ClientManager     │    │ MediaSessionManager  │    │  Capability impls   │
//! │                     │    │                      │    │                     │
//! │ connect()           │───▶│ MediaCapture trait   │───▶│ browser / mock      │
//! │ disconnect()        │    │ TransportSession     │    │ track delivery      │
//! │                     │    │ PlaybackSurface      │    │                     │
//! └─────────────────────┘    └──────────────────────┘    └─────────────────────┘
//! ```
//!
//! Only audio is ever captured locally; video flows in one direction, from
//! the avatar renderer to the playback surface.

pub mod manager;
pub mod mock;

pub use manager::MediaSessionManager;

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::error::ClientResult;
use crate::signaling::SessionDescription;

/// Kind of a media track
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackKind {
    /// Microphone audio (the only kind captured locally)
    Audio,
    /// Video (received only)
    Video,
}

/// One local media track
#[derive(Debug, Clone)]
pub struct MediaTrack {
    /// Track identifier
    pub id: String,
    /// Track kind
    pub kind: TrackKind,
}

/// A remote media stream delivered by the transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteMediaStream {
    /// Stream identifier
    pub id: String,
}

/// Callback invoked by the transport when a remote stream arrives
pub type RemoteStreamHandler = Box<dyn Fn(RemoteMediaStream) + Send + Sync>;

/// ICE configuration handed to the transport factory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IceConfig {
    /// STUN server URIs for relay-assisted connectivity
    pub stun_servers: Vec<String>,
}

impl Default for IceConfig {
    fn default() -> Self {
        Self {
            stun_servers: vec!["stun:stun.l.google.com:19302".to_string()],
        }
    }
}

/// Local media capture capability (microphone access).
///
/// Acquiring a stream is what triggers the user permission prompt, so
/// callers run their preconditions (avatar pre-flight) first.
#[async_trait]
pub trait MediaCapture: Send + Sync {
    /// Acquire an audio-only local capture stream
    async fn capture_audio(&self) -> ClientResult<Box<dyn LocalMediaStream>>;
}

/// An owned local capture stream; all tracks stop on teardown
#[async_trait]
pub trait LocalMediaStream: Send + Sync {
    /// Tracks carried by this stream
    fn tracks(&self) -> Vec<MediaTrack>;

    /// Stop every track and release the capture device
    async fn stop(&self);
}

/// A live peer transport (the WebRTC peer connection equivalent)
#[async_trait]
pub trait TransportSession: Send + Sync {
    /// Attach a local track for sending
    async fn add_track(&self, track: &MediaTrack) -> ClientResult<()>;

    /// Register the handler invoked on each inbound remote stream.
    /// Must be registered before the answer is applied.
    fn set_remote_stream_handler(&self, handler: RemoteStreamHandler);

    /// Produce the local capability offer
    async fn create_offer(&self) -> ClientResult<SessionDescription>;

    /// Apply the remote answer, completing the stable description pair
    async fn apply_remote_answer(&self, answer: &SessionDescription) -> ClientResult<()>;

    /// Close the transport; idempotent
    async fn close(&self);
}

/// Constructs transport sessions bound to the configured ICE servers
pub trait TransportFactory: Send + Sync {
    /// Create a fresh transport session
    fn create(&self, ice: &IceConfig) -> ClientResult<Box<dyn TransportSession>>;
}

/// The surface remote avatar video is bound to
pub trait PlaybackSurface: Send + Sync {
    /// Bind a remote stream to the surface, replacing any prior binding
    fn bind_stream(&self, stream: RemoteMediaStream);

    /// Clear the binding
    fn clear(&self);

    /// Currently bound stream, if any
    fn bound_stream(&self) -> Option<RemoteMediaStream>;
}

/// Plays raw synthesized audio (the speech-sync output path)
#[async_trait]
pub trait AudioPlayer: Send + Sync {
    /// Play an audio payload to completion
    async fn play(&self, audio: Bytes) -> ClientResult<()>;
}
