//! Client configuration
//!
//! Endpoint and behavior configuration for an avatar client session,
//! in the builder style used across the workspace:
//!
//! ```rust
//! use vtutor_client_core::config::ClientConfig;
//!
//! let config = ClientConfig::new("7")
//!     .with_backend_url("http://localhost:8000")
//!     .with_avatar_service_url("http://localhost:8001")
//!     .with_voice("en-US-AriaNeural");
//!
//! assert_eq!(config.tutor_id, "7");
//! assert_eq!(config.history_window, 10);
//! ```

use serde::{Deserialize, Serialize};

use crate::media::IceConfig;

/// Number of prior turns sent along with each chat message.
///
/// Bounds the request size; the in-memory history itself is unbounded for
/// the life of the session.
pub const DEFAULT_HISTORY_WINDOW: usize = 10;

/// Speech synthesis engine and voice, held fixed for the session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TtsConfig {
    /// Synthesis engine identifier understood by the avatar service
    pub engine: String,
    /// Voice identifier within the engine
    pub voice: String,
}

impl Default for TtsConfig {
    fn default() -> Self {
        Self {
            engine: "edge-tts".to_string(),
            voice: "zh-CN-XiaoxiaoNeural".to_string(),
        }
    }
}

/// Configuration for an avatar client session
///
/// One per browser-tab-equivalent session. The backend handles tutor
/// metadata, signaling relay and chat; the avatar service handles speech
/// synthesis and its own liveness probe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Web backend base URL (tutor info, signaling relay, chat)
    pub backend_url: String,
    /// Avatar service base URL (speech synthesis, liveness)
    pub avatar_service_url: String,
    /// Opaque identifier of the tutor whose avatar is being called
    pub tutor_id: String,
    /// How many prior turns accompany each chat request
    pub history_window: usize,
    /// Speech synthesis configuration
    pub tts: TtsConfig,
    /// STUN servers handed to the transport factory
    pub ice: IceConfig,
}

impl ClientConfig {
    /// Create a configuration for the given tutor with default endpoints
    pub fn new(tutor_id: impl Into<String>) -> Self {
        Self {
            backend_url: "http://localhost:8000".to_string(),
            avatar_service_url: "http://localhost:8001".to_string(),
            tutor_id: tutor_id.into(),
            history_window: DEFAULT_HISTORY_WINDOW,
            tts: TtsConfig::default(),
            ice: IceConfig::default(),
        }
    }

    /// Set the web backend base URL
    pub fn with_backend_url(mut self, url: impl Into<String>) -> Self {
        self.backend_url = trim_trailing_slash(url.into());
        self
    }

    /// Set the avatar service base URL
    pub fn with_avatar_service_url(mut self, url: impl Into<String>) -> Self {
        self.avatar_service_url = trim_trailing_slash(url.into());
        self
    }

    /// Set the number of prior turns sent with each chat request
    pub fn with_history_window(mut self, window: usize) -> Self {
        self.history_window = window;
        self
    }

    /// Set the synthesis engine
    pub fn with_engine(mut self, engine: impl Into<String>) -> Self {
        self.tts.engine = engine.into();
        self
    }

    /// Set the synthesis voice
    pub fn with_voice(mut self, voice: impl Into<String>) -> Self {
        self.tts.voice = voice.into();
        self
    }

    /// Replace the ICE configuration handed to the transport factory
    pub fn with_ice(mut self, ice: IceConfig) -> Self {
        self.ice = ice;
        self
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new("1")
    }
}

fn trim_trailing_slash(mut url: String) -> String {
    while url.ends_with('/') {
        url.pop();
    }
    url
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_local_deployment() {
        let config = ClientConfig::default();
        assert_eq!(config.backend_url, "http://localhost:8000");
        assert_eq!(config.avatar_service_url, "http://localhost:8001");
        assert_eq!(config.tutor_id, "1");
        assert_eq!(config.history_window, DEFAULT_HISTORY_WINDOW);
        assert_eq!(config.tts.engine, "edge-tts");
    }

    #[test]
    fn builder_methods_chain() {
        let config = ClientConfig::new("42")
            .with_backend_url("https://api.example.com/")
            .with_history_window(5)
            .with_voice("en-GB-SoniaNeural");
        assert_eq!(config.backend_url, "https://api.example.com");
        assert_eq!(config.history_window, 5);
        assert_eq!(config.tts.voice, "en-GB-SoniaNeural");
        assert_eq!(config.tts.engine, "edge-tts");
    }
}
