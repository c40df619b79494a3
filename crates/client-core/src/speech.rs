//! Speech sync coordinator
//!
//! On each assistant reply (and only while the session is connected, which
//! the client manager gates), requests synthesized audio from the avatar
//! service and plays it through the injected [`AudioPlayer`]. The whole
//! cycle runs in a spawned task so the chat flow never waits on it, and
//! any failure is logged and swallowed: speech is a best-effort
//! enhancement, never a required part of the exchange.
//!
//! The coordinator keeps a single-slot cancellable task handle: a newer
//! reply aborts the still-running cycle, and disconnect aborts it too, so
//! overlapping audio cannot occur.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::config::TtsConfig;
use crate::error::{ClientError, ClientResult};
use crate::media::AudioPlayer;

#[derive(Serialize)]
struct SynthesizeRequest {
    text: String,
    engine: String,
    voice: String,
}

/// Bridges assistant replies to synthesized speech playback
pub struct SpeechSyncCoordinator {
    http: reqwest::Client,
    avatar_service_url: String,
    tts: TtsConfig,
    player: Arc<dyn AudioPlayer>,
    current: Mutex<Option<JoinHandle<()>>>,
}

impl SpeechSyncCoordinator {
    /// Create a coordinator over an existing HTTP client
    pub fn new(
        http: reqwest::Client,
        avatar_service_url: impl Into<String>,
        tts: TtsConfig,
        player: Arc<dyn AudioPlayer>,
    ) -> Self {
        Self {
            http,
            avatar_service_url: avatar_service_url.into(),
            tts,
            player,
            current: Mutex::new(None),
        }
    }

    /// Kick off one synthesis+playback cycle for an assistant reply.
    ///
    /// Returns as soon as the task is spawned. Any still-running prior
    /// cycle is aborted first; there is no queue.
    pub async fn sync_speech(&self, text: &str) {
        let request = SynthesizeRequest {
            text: text.to_string(),
            engine: self.tts.engine.clone(),
            voice: self.tts.voice.clone(),
        };
        let http = self.http.clone();
        let url = format!("{}/tts/synthesize", self.avatar_service_url);
        let player = Arc::clone(&self.player);

        let task = tokio::spawn(async move {
            match synthesize_and_play(http, url, request, player).await {
                Ok(()) => tracing::debug!("speech sync cycle complete"),
                Err(e) => tracing::warn!("speech sync failed: {}", e),
            }
        });

        let mut current = self.current.lock().await;
        if let Some(previous) = current.take() {
            if !previous.is_finished() {
                tracing::debug!("aborting previous speech playback");
                previous.abort();
            }
        }
        *current = Some(task);
    }

    /// Abort the in-flight cycle, if any. Called on disconnect.
    pub async fn cancel(&self) {
        if let Some(task) = self.current.lock().await.take() {
            task.abort();
        }
    }

    /// Wait for the in-flight cycle to finish (orderly shutdown and tests)
    pub async fn wait_for_playback(&self) {
        let task = self.current.lock().await.take();
        if let Some(task) = task {
            // An aborted task surfaces a JoinError; nothing to do with it.
            let _ = task.await;
        }
    }
}

async fn synthesize_and_play(
    http: reqwest::Client,
    url: String,
    request: SynthesizeRequest,
    player: Arc<dyn AudioPlayer>,
) -> ClientResult<()> {
    let response = http
        .post(&url)
        .json(&request)
        .send()
        .await
        .map_err(|e| ClientError::speech_sync_failed(format!("synthesis unreachable: {e}")))?;

    let status = response.status();
    if !status.is_success() {
        return Err(ClientError::speech_sync_failed(format!(
            "synthesis returned {status}"
        )));
    }

    let audio = response
        .bytes()
        .await
        .map_err(|e| ClientError::speech_sync_failed(format!("synthesis body: {e}")))?;
    tracing::debug!("playing {} bytes of synthesized speech", audio.len());
    player.play(audio).await
}
