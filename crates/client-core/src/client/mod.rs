//! Client manager
//!
//! The coordination layer tying the pieces together: one `ClientManager`
//! per session owns the session state machine, the signaling client, the
//! media session manager, the conversation manager and the speech sync
//! coordinator. The state machine gates which operations are permitted;
//! media and chat execute independently but both consult it, and speech
//! sync bridges the two only while the session is connected.
//!
//! # Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use vtutor_client_core::{ClientConfig, ClientManager};
//! use vtutor_client_core::media::mock::{
//!     MockAudioPlayer, MockMediaCapture, MockPlaybackSurface, MockTransportFactory,
//! };
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = ClientManager::new(
//!     ClientConfig::new("7"),
//!     Arc::new(MockMediaCapture::new()),
//!     Arc::new(MockTransportFactory::new()),
//!     Arc::new(MockPlaybackSurface::new()),
//!     Arc::new(MockAudioPlayer::new()),
//! );
//!
//! let status = client.check_services().await;
//! println!("startup: {}", status.summary());
//!
//! client.connect().await?;
//! if let Some(reply) = client.send_turn("Hello!").await? {
//!     println!("assistant: {reply}");
//! }
//! client.disconnect().await;
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use tokio::sync::RwLock;

use crate::config::ClientConfig;
use crate::conversation::{ConversationManager, ConversationTurn};
use crate::error::{ClientError, ClientResult};
use crate::media::{
    AudioPlayer, MediaCapture, MediaSessionManager, PlaybackSurface, TransportFactory,
};
use crate::session::{Session, SessionState};
use crate::signaling::{ServiceStatus, SignalingClient};
use crate::speech::SpeechSyncCoordinator;

/// Coordinates one avatar session end to end
pub struct ClientManager {
    config: ClientConfig,
    session: RwLock<Session>,
    signaling: SignalingClient,
    media: MediaSessionManager,
    conversation: ConversationManager,
    speech: SpeechSyncCoordinator,
}

impl ClientManager {
    /// Create a client over the injected media capabilities.
    ///
    /// One HTTP client is shared across signaling, chat and synthesis.
    pub fn new(
        config: ClientConfig,
        capture: Arc<dyn MediaCapture>,
        transport_factory: Arc<dyn TransportFactory>,
        playback: Arc<dyn PlaybackSurface>,
        player: Arc<dyn AudioPlayer>,
    ) -> Self {
        let http = reqwest::Client::new();
        let signaling = SignalingClient::new(
            http.clone(),
            config.backend_url.clone(),
            config.avatar_service_url.clone(),
        );
        let media = MediaSessionManager::new(
            capture,
            transport_factory,
            playback,
            config.ice.clone(),
        );
        let conversation = ConversationManager::new(
            http.clone(),
            config.backend_url.clone(),
            config.history_window,
        );
        let speech = SpeechSyncCoordinator::new(
            http,
            config.avatar_service_url.clone(),
            config.tts.clone(),
            player,
        );

        Self {
            config,
            session: RwLock::new(Session::new()),
            signaling,
            media,
            conversation,
            speech,
        }
    }

    /// Current session state
    pub async fn state(&self) -> SessionState {
        self.session.read().await.state()
    }

    /// Snapshot of the conversation history
    pub async fn history(&self) -> Vec<ConversationTurn> {
        self.conversation.history().await
    }

    /// Startup liveness probes; informational only
    pub async fn check_services(&self) -> ServiceStatus {
        self.signaling.check_services(&self.config.tutor_id).await
    }

    /// Establish the avatar media session.
    ///
    /// Rejected unless the session is idle. The avatar pre-flight runs
    /// before any capture so a stopped avatar never triggers a microphone
    /// permission prompt. Every failure path rolls partial media state
    /// back and leaves the session idle.
    pub async fn connect(&self) -> ClientResult<()> {
        self.session
            .write()
            .await
            .begin_connect(&self.config.tutor_id)?;

        if let Err(e) = self.try_connect().await {
            self.session.write().await.fail_connect();
            return Err(e);
        }

        // Commit only if nothing moved the session away from Connecting
        // in the meantime; a concurrent disconnect wins and the late
        // negotiation result is discarded.
        let mut session = self.session.write().await;
        if session.state() != SessionState::Connecting {
            let actual = session.state();
            drop(session);
            tracing::info!(
                "discarding completed negotiation; session moved to {}",
                actual
            );
            self.media.teardown().await;
            return Err(ClientError::invalid_state(
                SessionState::Connecting.as_str(),
                actual.as_str(),
            ));
        }
        session.complete_connect()?;
        tracing::info!("avatar session connected to tutor {}", self.config.tutor_id);
        Ok(())
    }

    async fn try_connect(&self) -> ClientResult<()> {
        let info = self.signaling.tutor_info(&self.config.tutor_id).await?;
        if !info.is_running() {
            return Err(ClientError::avatar_unavailable(if info.has_avatar {
                format!("avatar status is \"{}\"", info.avatar_status)
            } else {
                "tutor has no avatar".to_string()
            }));
        }

        self.media
            .establish(&self.signaling, &self.config.tutor_id)
            .await
    }

    /// Tear the session down. Idempotent, always succeeds, callable from
    /// any state: aborts speech playback, releases all media resources and
    /// resets the session to idle.
    pub async fn disconnect(&self) {
        self.session.write().await.begin_disconnect();
        self.speech.cancel().await;
        self.media.teardown().await;
        self.session.write().await.complete_disconnect();
        tracing::info!("avatar session disconnected");
    }

    /// Send one chat turn; returns `None` for empty input.
    ///
    /// Legal in any session state. When the session is connected at the
    /// moment the reply resolves, the reply is handed to the speech sync
    /// coordinator; otherwise speech is skipped entirely, never queued.
    pub async fn send_turn(&self, message: &str) -> ClientResult<Option<String>> {
        let reply = self
            .conversation
            .send_turn(&self.config.tutor_id, message)
            .await?;

        if let Some(text) = reply.as_deref() {
            if self.session.read().await.is_connected() {
                self.speech.sync_speech(text).await;
            } else {
                tracing::debug!("session not connected; skipping speech sync");
            }
        }
        Ok(reply)
    }

    /// Wait for any in-flight speech playback (orderly shutdown and tests)
    pub async fn wait_for_speech(&self) {
        self.speech.wait_for_playback().await;
    }
}
