//! Integration tests for chat turns and speech sync gating
//!
//! Chat must work in any session state; speech sync must fire only when
//! the session is connected at the moment the assistant reply resolves.

use std::sync::Arc;
use std::time::Duration;

use vtutor_client_core::media::mock::{
    MockAudioPlayer, MockMediaCapture, MockPlaybackSurface, MockTransportFactory,
};
use vtutor_client_core::{
    ClientConfig, ClientError, ClientManager, ConversationTurn, SessionState,
};

struct Harness {
    backend: mockito::ServerGuard,
    avatar: mockito::ServerGuard,
    player: Arc<MockAudioPlayer>,
    client: Arc<ClientManager>,
}

impl Harness {
    async fn new() -> Self {
        let backend = mockito::Server::new_async().await;
        let avatar = mockito::Server::new_async().await;
        let player = Arc::new(MockAudioPlayer::new());

        let config = ClientConfig::new("7")
            .with_backend_url(backend.url())
            .with_avatar_service_url(avatar.url());
        let client = Arc::new(ClientManager::new(
            config,
            Arc::new(MockMediaCapture::new()),
            Arc::new(MockTransportFactory::new()),
            Arc::new(MockPlaybackSurface::new()),
            player.clone(),
        ));

        Self { backend, avatar, player, client }
    }

    async fn mock_chat_reply(&mut self, reply: &str) {
        self.backend
            .mock("POST", "/tutors/7/chat")
            .with_status(200)
            .with_body(format!(r#"{{"response":"{reply}"}}"#))
            .expect_at_least(0)
            .create_async()
            .await;
    }

    async fn mock_connectable_avatar(&mut self) {
        self.backend
            .mock("GET", "/tutors/7/info")
            .with_status(200)
            .with_body(r#"{"has_avatar":true,"avatar_status":"running"}"#)
            .create_async()
            .await;
        self.backend
            .mock("POST", "/tutors/7/webrtc/offer")
            .with_status(200)
            .with_body(r#"{"sdp":"v=0\r\nanswer","type":"answer"}"#)
            .create_async()
            .await;
    }
}

#[tokio::test]
async fn chat_works_without_a_media_session() {
    let mut h = Harness::new().await;
    h.mock_chat_reply("Hi!").await;
    let tts = h
        .avatar
        .mock("POST", "/tts/synthesize")
        .expect(0)
        .create_async()
        .await;

    let reply = h.client.send_turn("Hello").await.unwrap();
    assert_eq!(reply.as_deref(), Some("Hi!"));
    assert_eq!(
        h.client.history().await,
        vec![ConversationTurn::user("Hello"), ConversationTurn::assistant("Hi!")]
    );

    // idle session: the reply must not trigger synthesis
    h.client.wait_for_speech().await;
    assert!(h.player.played().is_empty());
    tts.assert_async().await;
}

#[tokio::test]
async fn speech_syncs_while_connected() {
    let mut h = Harness::new().await;
    h.mock_connectable_avatar().await;
    h.mock_chat_reply("Hi there").await;
    h.avatar
        .mock("POST", "/tts/synthesize")
        .match_body(mockito::Matcher::PartialJson(serde_json::json!({
            "text": "Hi there",
            "engine": "edge-tts",
            "voice": "zh-CN-XiaoxiaoNeural",
        })))
        .with_status(200)
        .with_body(b"synthesized".to_vec())
        .create_async()
        .await;

    h.client.connect().await.unwrap();
    let reply = h.client.send_turn("Hello").await.unwrap();
    assert_eq!(reply.as_deref(), Some("Hi there"));

    h.client.wait_for_speech().await;
    let played = h.player.played();
    assert_eq!(played.len(), 1);
    assert_eq!(&played[0][..], b"synthesized");
}

#[tokio::test]
async fn speech_skipped_after_disconnect() {
    let mut h = Harness::new().await;
    h.mock_connectable_avatar().await;
    h.mock_chat_reply("Hi!").await;
    let tts = h
        .avatar
        .mock("POST", "/tts/synthesize")
        .expect(0)
        .create_async()
        .await;

    h.client.connect().await.unwrap();
    h.client.disconnect().await;

    h.client.send_turn("Hello").await.unwrap();
    h.client.wait_for_speech().await;
    assert!(h.player.played().is_empty());
    tts.assert_async().await;
}

#[tokio::test]
async fn failed_reply_keeps_session_and_history_consistent() {
    let mut h = Harness::new().await;
    h.mock_connectable_avatar().await;
    h.backend
        .mock("POST", "/tutors/7/chat")
        .with_status(502)
        .create_async()
        .await;

    h.client.connect().await.unwrap();
    let err = h.client.send_turn("Hello").await.unwrap_err();
    assert!(matches!(err, ClientError::ReplyFailed { .. }));
    assert!(err.is_recoverable());

    // exactly one unanswered user turn; the media session is untouched
    assert_eq!(h.client.history().await, vec![ConversationTurn::user("Hello")]);
    assert_eq!(h.client.state().await, SessionState::Connected);
}

#[tokio::test]
async fn empty_input_is_ignored_in_any_state() {
    let mut h = Harness::new().await;
    let chat = h
        .backend
        .mock("POST", "/tutors/7/chat")
        .expect(0)
        .create_async()
        .await;

    assert_eq!(h.client.send_turn("").await.unwrap(), None);
    assert_eq!(h.client.send_turn("   ").await.unwrap(), None);
    assert!(h.client.history().await.is_empty());
    chat.assert_async().await;
}

#[tokio::test]
async fn history_alternates_across_many_turns() {
    let mut h = Harness::new().await;
    h.mock_chat_reply("ok").await;

    for i in 0..5 {
        h.client.send_turn(&format!("message {i}")).await.unwrap();
    }

    let history = h.client.history().await;
    assert_eq!(history.len(), 10);
    assert!(history
        .iter()
        .enumerate()
        .all(|(i, turn)| (i % 2 == 0) == (turn.role == vtutor_client_core::Role::User)));
}

#[tokio::test]
async fn newer_reply_replaces_running_playback() {
    let mut h = Harness::new().await;
    h.mock_connectable_avatar().await;
    h.mock_chat_reply("reply").await;
    h.avatar
        .mock("POST", "/tts/synthesize")
        .with_status(200)
        .with_body(b"audio".to_vec())
        .expect(2)
        .create_async()
        .await;
    h.player.set_delay(Duration::from_millis(250));

    h.client.connect().await.unwrap();
    h.client.send_turn("one").await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;
    h.client.send_turn("two").await.unwrap();

    h.client.wait_for_speech().await;
    // the first playback was aborted when the second reply arrived
    assert_eq!(h.player.played().len(), 1);
}
