//! Media session manager
//!
//! Owns the peer connection lifecycle: local audio capture, transport
//! construction, offer/answer negotiation through the signaling client,
//! remote stream attachment and teardown. The session state machine lives
//! in the client manager; this type only manages the media resources of
//! the one active session.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::error::ClientResult;
use crate::media::{
    IceConfig, LocalMediaStream, MediaCapture, PlaybackSurface, TrackKind, TransportFactory,
    TransportSession,
};
use crate::signaling::{NegotiationExchange, SignalingClient};

/// Resources of the one active media session
struct ActiveMedia {
    stream: Box<dyn LocalMediaStream>,
    transport: Box<dyn TransportSession>,
}

/// Manages local capture, the peer transport and the playback binding
pub struct MediaSessionManager {
    capture: Arc<dyn MediaCapture>,
    transport_factory: Arc<dyn TransportFactory>,
    playback: Arc<dyn PlaybackSurface>,
    ice: IceConfig,
    active: Mutex<Option<ActiveMedia>>,
}

impl MediaSessionManager {
    /// Create a manager over the injected capabilities
    pub fn new(
        capture: Arc<dyn MediaCapture>,
        transport_factory: Arc<dyn TransportFactory>,
        playback: Arc<dyn PlaybackSurface>,
        ice: IceConfig,
    ) -> Self {
        Self {
            capture,
            transport_factory,
            playback,
            ice,
            active: Mutex::new(None),
        }
    }

    /// Whether media resources are currently held
    pub async fn has_active_media(&self) -> bool {
        self.active.lock().await.is_some()
    }

    /// Establish the media path: capture, transport, tracks, offer/answer,
    /// remote stream binding.
    ///
    /// On any failure everything acquired so far is released and the
    /// playback binding cleared before the error is returned, so a failed
    /// connect leaves no media state behind.
    pub async fn establish(
        &self,
        signaling: &SignalingClient,
        tutor_id: &str,
    ) -> ClientResult<()> {
        let stream = self.capture.capture_audio().await?;

        let transport = match self.transport_factory.create(&self.ice) {
            Ok(transport) => transport,
            Err(e) => {
                stream.stop().await;
                return Err(e);
            }
        };

        {
            let mut active = self.active.lock().await;
            *active = Some(ActiveMedia { stream, transport });
        }

        if let Err(e) = self.negotiate_active(signaling, tutor_id).await {
            self.teardown().await;
            return Err(e);
        }

        tracing::info!("media session established with tutor {}", tutor_id);
        Ok(())
    }

    /// Release every media resource. Idempotent and infallible: safe to
    /// call when nothing was ever established or establish failed midway.
    pub async fn teardown(&self) {
        let active = self.active.lock().await.take();
        if let Some(active) = active {
            active.transport.close().await;
            active.stream.stop().await;
            tracing::debug!("media session resources released");
        }
        self.playback.clear();
    }

    async fn negotiate_active(
        &self,
        signaling: &SignalingClient,
        tutor_id: &str,
    ) -> ClientResult<()> {
        let active = self.active.lock().await;
        let Some(active) = active.as_ref() else {
            return Ok(());
        };

        for track in active.stream.tracks() {
            if track.kind == TrackKind::Audio {
                active.transport.add_track(&track).await?;
            }
        }

        // Bind exactly one playback surface to exactly one remote stream:
        // only the first stream the transport delivers is attached.
        let playback = Arc::clone(&self.playback);
        let bound = AtomicBool::new(false);
        active.transport.set_remote_stream_handler(Box::new(move |remote| {
            if !bound.swap(true, Ordering::SeqCst) {
                tracing::debug!("binding remote stream {}", remote.id);
                playback.bind_stream(remote);
            } else {
                tracing::debug!("ignoring additional remote stream {}", remote.id);
            }
        }));

        let local_offer = active.transport.create_offer().await?;
        let remote_answer = signaling.negotiate(tutor_id, &local_offer).await?;
        let exchange = NegotiationExchange { local_offer, remote_answer };
        active.transport.apply_remote_answer(&exchange.remote_answer).await?;
        // exchange is dropped here; the transport now holds the stable pair

        Ok(())
    }
}
