//! Mock media backends
//!
//! In-memory capability implementations used by the test suites (and
//! useful for headless simulation). They simulate negotiation success and
//! failure, remote track delivery on answer application, and record enough
//! state for tests to assert that teardown released everything.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use uuid::Uuid;

use crate::error::{ClientError, ClientResult};
use crate::media::{
    AudioPlayer, IceConfig, LocalMediaStream, MediaCapture, MediaTrack, PlaybackSurface,
    RemoteMediaStream, RemoteStreamHandler, TrackKind, TransportFactory, TransportSession,
};
use crate::signaling::SessionDescription;

/// Mock microphone capture
#[derive(Default)]
pub struct MockMediaCapture {
    failing: AtomicBool,
    delay_ms: AtomicUsize,
    capture_calls: AtomicUsize,
    stopped_flags: Mutex<Vec<Arc<AtomicBool>>>,
}

impl MockMediaCapture {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent capture attempts fail
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Delay each capture, for exercising disconnect-during-connect
    pub fn set_delay(&self, delay: Duration) {
        self.delay_ms.store(delay.as_millis() as usize, Ordering::SeqCst);
    }

    /// How many times capture was attempted
    pub fn capture_count(&self) -> usize {
        self.capture_calls.load(Ordering::SeqCst)
    }

    /// Whether every stream handed out so far has been stopped
    pub fn all_streams_stopped(&self) -> bool {
        self.stopped_flags
            .lock()
            .unwrap()
            .iter()
            .all(|flag| flag.load(Ordering::SeqCst))
    }
}

#[async_trait]
impl MediaCapture for MockMediaCapture {
    async fn capture_audio(&self) -> ClientResult<Box<dyn LocalMediaStream>> {
        self.capture_calls.fetch_add(1, Ordering::SeqCst);
        let delay = self.delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay as u64)).await;
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(ClientError::MediaCapture {
                message: "mock capture failure".to_string(),
            });
        }
        let stopped = Arc::new(AtomicBool::new(false));
        self.stopped_flags.lock().unwrap().push(Arc::clone(&stopped));
        Ok(Box::new(MockLocalStream {
            tracks: vec![MediaTrack {
                id: Uuid::new_v4().to_string(),
                kind: TrackKind::Audio,
            }],
            stopped,
        }))
    }
}

struct MockLocalStream {
    tracks: Vec<MediaTrack>,
    stopped: Arc<AtomicBool>,
}

#[async_trait]
impl LocalMediaStream for MockLocalStream {
    fn tracks(&self) -> Vec<MediaTrack> {
        self.tracks.clone()
    }

    async fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
    }
}

/// Shared state of one mock transport, inspectable after the session
/// manager has taken ownership of the boxed session
pub struct MockTransportState {
    added_tracks: Mutex<Vec<MediaTrack>>,
    handler: Mutex<Option<RemoteStreamHandler>>,
    closed: AtomicBool,
    applied_answer: Mutex<Option<SessionDescription>>,
    deliver_streams: usize,
    fail_offer: bool,
    fail_answer: bool,
}

impl MockTransportState {
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn added_track_count(&self) -> usize {
        self.added_tracks.lock().unwrap().len()
    }

    pub fn applied_answer(&self) -> Option<SessionDescription> {
        self.applied_answer.lock().unwrap().clone()
    }
}

/// Mock transport factory
pub struct MockTransportFactory {
    failing: AtomicBool,
    fail_offer: AtomicBool,
    fail_answer: AtomicBool,
    deliver_streams: AtomicUsize,
    created: Mutex<Vec<Arc<MockTransportState>>>,
}

impl Default for MockTransportFactory {
    fn default() -> Self {
        Self {
            failing: AtomicBool::new(false),
            fail_offer: AtomicBool::new(false),
            fail_answer: AtomicBool::new(false),
            deliver_streams: AtomicUsize::new(1),
            created: Mutex::new(Vec::new()),
        }
    }
}

impl MockTransportFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail transport construction
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Fail offer creation on transports created afterwards
    pub fn set_fail_offer(&self, fail: bool) {
        self.fail_offer.store(fail, Ordering::SeqCst);
    }

    /// Fail answer application on transports created afterwards
    pub fn set_fail_answer(&self, fail: bool) {
        self.fail_answer.store(fail, Ordering::SeqCst);
    }

    /// How many remote streams each transport delivers once the remote
    /// answer is applied (default 1)
    pub fn set_deliver_streams(&self, count: usize) {
        self.deliver_streams.store(count, Ordering::SeqCst);
    }

    pub fn created_count(&self) -> usize {
        self.created.lock().unwrap().len()
    }

    /// Inspectable state of every transport created so far
    pub fn transports(&self) -> Vec<Arc<MockTransportState>> {
        self.created.lock().unwrap().clone()
    }

    pub fn all_closed(&self) -> bool {
        self.created
            .lock()
            .unwrap()
            .iter()
            .all(|state| state.is_closed())
    }
}

impl TransportFactory for MockTransportFactory {
    fn create(&self, _ice: &IceConfig) -> ClientResult<Box<dyn TransportSession>> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(ClientError::Transport {
                message: "mock transport construction failure".to_string(),
            });
        }
        let state = Arc::new(MockTransportState {
            added_tracks: Mutex::new(Vec::new()),
            handler: Mutex::new(None),
            closed: AtomicBool::new(false),
            applied_answer: Mutex::new(None),
            deliver_streams: self.deliver_streams.load(Ordering::SeqCst),
            fail_offer: self.fail_offer.load(Ordering::SeqCst),
            fail_answer: self.fail_answer.load(Ordering::SeqCst),
        });
        self.created.lock().unwrap().push(Arc::clone(&state));
        Ok(Box::new(MockTransport { state }))
    }
}

struct MockTransport {
    state: Arc<MockTransportState>,
}

#[async_trait]
impl TransportSession for MockTransport {
    async fn add_track(&self, track: &MediaTrack) -> ClientResult<()> {
        if self.state.is_closed() {
            return Err(ClientError::Transport {
                message: "transport closed".to_string(),
            });
        }
        self.state.added_tracks.lock().unwrap().push(track.clone());
        Ok(())
    }

    fn set_remote_stream_handler(&self, handler: RemoteStreamHandler) {
        *self.state.handler.lock().unwrap() = Some(handler);
    }

    async fn create_offer(&self) -> ClientResult<SessionDescription> {
        if self.state.fail_offer {
            return Err(ClientError::Transport {
                message: "mock offer failure".to_string(),
            });
        }
        Ok(SessionDescription::offer("v=0\r\nmock offer"))
    }

    async fn apply_remote_answer(&self, answer: &SessionDescription) -> ClientResult<()> {
        if self.state.fail_answer {
            return Err(ClientError::Transport {
                message: "mock answer failure".to_string(),
            });
        }
        *self.state.applied_answer.lock().unwrap() = Some(answer.clone());
        // Track delivery follows a completed description pair, as with a
        // real peer connection's ontrack.
        let handler = self.state.handler.lock().unwrap();
        if let Some(handler) = handler.as_ref() {
            for i in 0..self.state.deliver_streams {
                handler(RemoteMediaStream { id: format!("remote-{i}") });
            }
        }
        Ok(())
    }

    async fn close(&self) {
        self.state.closed.store(true, Ordering::SeqCst);
    }
}

/// Mock playback surface
#[derive(Default)]
pub struct MockPlaybackSurface {
    bound: Mutex<Option<RemoteMediaStream>>,
    clear_calls: AtomicUsize,
}

impl MockPlaybackSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear_count(&self) -> usize {
        self.clear_calls.load(Ordering::SeqCst)
    }
}

impl PlaybackSurface for MockPlaybackSurface {
    fn bind_stream(&self, stream: RemoteMediaStream) {
        *self.bound.lock().unwrap() = Some(stream);
    }

    fn clear(&self) {
        self.clear_calls.fetch_add(1, Ordering::SeqCst);
        *self.bound.lock().unwrap() = None;
    }

    fn bound_stream(&self) -> Option<RemoteMediaStream> {
        self.bound.lock().unwrap().clone()
    }
}

/// Mock audio sink for synthesized speech
#[derive(Default)]
pub struct MockAudioPlayer {
    failing: AtomicBool,
    delay_ms: AtomicUsize,
    played: Mutex<Vec<Bytes>>,
}

impl MockAudioPlayer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Simulate playback duration, for exercising cancellation
    pub fn set_delay(&self, delay: Duration) {
        self.delay_ms.store(delay.as_millis() as usize, Ordering::SeqCst);
    }

    /// Payloads played to completion
    pub fn played(&self) -> Vec<Bytes> {
        self.played.lock().unwrap().clone()
    }
}

#[async_trait]
impl AudioPlayer for MockAudioPlayer {
    async fn play(&self, audio: Bytes) -> ClientResult<()> {
        let delay = self.delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay as u64)).await;
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(ClientError::speech_sync_failed("mock playback failure"));
        }
        self.played.lock().unwrap().push(audio);
        Ok(())
    }
}
