//! Conversation manager
//!
//! Owns the append-only turn history and the request/response cycle with
//! the reply service. Each successful turn appends a `user` entry before
//! the request goes out and an `assistant` entry strictly after the
//! response arrives; a failed turn leaves exactly the unanswered `user`
//! entry behind. The request carries at most the last
//! [`DEFAULT_HISTORY_WINDOW`](crate::config::DEFAULT_HISTORY_WINDOW)
//! prior turns to bound its size, while the in-memory record grows
//! unbounded for the life of the session.
//!
//! Submissions are serialized by a single-slot in-flight guard inside the
//! manager, so correctness does not depend on any caller-side discipline
//! (a disabled send button, for instance).

use std::sync::atomic::{AtomicBool, Ordering};

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::error::{ClientError, ClientResult};

/// Attribution of a conversation turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One message in the conversation. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: Role,
    pub content: String,
}

impl ConversationTurn {
    /// Create a user turn
    pub fn user(content: impl Into<String>) -> Self {
        Self { role: Role::User, content: content.into() }
    }

    /// Create an assistant turn
    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: Role::Assistant, content: content.into() }
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    message: &'a str,
    conversation_history: &'a [ConversationTurn],
}

#[derive(Deserialize)]
struct ChatResponse {
    response: String,
}

/// Manages turn sequencing and the reply-service round trip
pub struct ConversationManager {
    http: reqwest::Client,
    backend_url: String,
    history_window: usize,
    history: Mutex<Vec<ConversationTurn>>,
    in_flight: AtomicBool,
}

impl ConversationManager {
    /// Create a manager over an existing HTTP client
    pub fn new(
        http: reqwest::Client,
        backend_url: impl Into<String>,
        history_window: usize,
    ) -> Self {
        Self {
            http,
            backend_url: backend_url.into(),
            history_window,
            history: Mutex::new(Vec::new()),
            in_flight: AtomicBool::new(false),
        }
    }

    /// Snapshot of the full in-memory history
    pub async fn history(&self) -> Vec<ConversationTurn> {
        self.history.lock().await.clone()
    }

    /// Whether a turn is currently awaiting its reply
    pub fn is_turn_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Send one chat turn and return the assistant reply.
    ///
    /// Empty or whitespace-only input is a no-op (`Ok(None)`): nothing is
    /// appended and the reply service is not invoked at all. A second call
    /// while one is in flight fails with [`ClientError::TurnInFlight`]
    /// without touching history. On request failure the `user` turn stays
    /// in history unanswered and the session is unaffected.
    pub async fn send_turn(
        &self,
        tutor_id: &str,
        message: &str,
    ) -> ClientResult<Option<String>> {
        let message = message.trim();
        if message.is_empty() {
            return Ok(None);
        }

        if self.in_flight.swap(true, Ordering::SeqCst) {
            return Err(ClientError::TurnInFlight);
        }
        let result = self.run_turn(tutor_id, message).await;
        self.in_flight.store(false, Ordering::SeqCst);
        result.map(Some)
    }

    async fn run_turn(&self, tutor_id: &str, message: &str) -> ClientResult<String> {
        // The user turn is appended before the request is issued; the
        // window sent out covers the turns prior to it.
        let window = {
            let mut history = self.history.lock().await;
            history.push(ConversationTurn::user(message));
            let prior = &history[..history.len() - 1];
            let start = prior.len().saturating_sub(self.history_window);
            prior[start..].to_vec()
        };

        let url = format!("{}/tutors/{}/chat", self.backend_url, tutor_id);
        let response = self
            .http
            .post(&url)
            .json(&ChatRequest { message, conversation_history: &window })
            .send()
            .await
            .map_err(|e| ClientError::reply_failed(format!("reply service unreachable: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::reply_failed(format!(
                "reply service returned {status}"
            )));
        }

        let body: ChatResponse = response
            .json()
            .await
            .map_err(|e| ClientError::reply_failed(format!("reply body did not parse: {e}")))?;

        self.history
            .lock()
            .await
            .push(ConversationTurn::assistant(&body.response));
        tracing::debug!("assistant reply received ({} chars)", body.response.len());
        Ok(body.response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager_for(server: &mockito::ServerGuard) -> ConversationManager {
        ConversationManager::new(reqwest::Client::new(), server.url(), 10)
    }

    #[tokio::test]
    async fn successful_turn_appends_both_roles() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/tutors/7/chat")
            .with_status(200)
            .with_body(r#"{"response":"Hi!"}"#)
            .create_async()
            .await;

        let manager = manager_for(&server);
        let reply = manager.send_turn("7", "Hello").await.unwrap();
        assert_eq!(reply.as_deref(), Some("Hi!"));

        let history = manager.history().await;
        assert_eq!(
            history,
            vec![ConversationTurn::user("Hello"), ConversationTurn::assistant("Hi!")]
        );
    }

    #[tokio::test]
    async fn failed_turn_leaves_user_turn_unanswered() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/tutors/7/chat")
            .with_status(500)
            .create_async()
            .await;

        let manager = manager_for(&server);
        let err = manager.send_turn("7", "Hello").await.unwrap_err();
        assert!(matches!(err, ClientError::ReplyFailed { .. }));

        let history = manager.history().await;
        assert_eq!(history, vec![ConversationTurn::user("Hello")]);

        // guard must have been released
        assert!(!manager.is_turn_in_flight());
    }

    #[tokio::test]
    async fn whitespace_input_is_a_no_op() {
        let mut server = mockito::Server::new_async().await;
        let chat = server
            .mock("POST", "/tutors/7/chat")
            .expect(0)
            .create_async()
            .await;

        let manager = manager_for(&server);
        assert_eq!(manager.send_turn("7", "   \n\t").await.unwrap(), None);
        assert!(manager.history().await.is_empty());
        chat.assert_async().await;
    }

    #[tokio::test]
    async fn input_is_trimmed_before_sending() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/tutors/7/chat")
            .match_body(mockito::Matcher::PartialJson(serde_json::json!({
                "message": "Hello"
            })))
            .with_status(200)
            .with_body(r#"{"response":"Hi!"}"#)
            .create_async()
            .await;

        let manager = manager_for(&server);
        let reply = manager.send_turn("7", "  Hello  ").await.unwrap();
        assert_eq!(reply.as_deref(), Some("Hi!"));
        assert_eq!(manager.history().await[0], ConversationTurn::user("Hello"));
    }

    #[tokio::test]
    async fn history_alternates_over_successful_turns() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/tutors/7/chat")
            .with_status(200)
            .with_body(r#"{"response":"ok"}"#)
            .expect(3)
            .create_async()
            .await;

        let manager = manager_for(&server);
        for i in 0..3 {
            manager.send_turn("7", &format!("m{i}")).await.unwrap();
        }

        let history = manager.history().await;
        assert_eq!(history.len(), 6);
        for (i, turn) in history.iter().enumerate() {
            let expected = if i % 2 == 0 { Role::User } else { Role::Assistant };
            assert_eq!(turn.role, expected);
        }
    }

    #[tokio::test]
    async fn request_window_is_truncated_to_last_ten_prior_turns() {
        let mut server = mockito::Server::new_async().await;
        let warmup = server
            .mock("POST", "/tutors/7/chat")
            .with_status(200)
            .with_body(r#"{"response":"ok"}"#)
            .expect(10)
            .create_async()
            .await;

        let manager = manager_for(&server);
        for i in 1..=10 {
            manager.send_turn("7", &format!("m{i}")).await.unwrap();
        }
        warmup.assert_async().await;

        // After 10 turns the history holds 20 entries; the 11th request
        // must carry exactly the 10 turns immediately preceding it.
        let mut expected = Vec::new();
        for i in 6..=10 {
            expected.push(serde_json::json!({"role": "user", "content": format!("m{i}")}));
            expected.push(serde_json::json!({"role": "assistant", "content": "ok"}));
        }
        let eleventh = server
            .mock("POST", "/tutors/7/chat")
            .match_body(mockito::Matcher::Json(serde_json::json!({
                "message": "m11",
                "conversation_history": expected,
            })))
            .with_status(200)
            .with_body(r#"{"response":"ok"}"#)
            .create_async()
            .await;

        manager.send_turn("7", "m11").await.unwrap();
        eleventh.assert_async().await;
        assert_eq!(manager.history().await.len(), 22);
    }

    #[tokio::test]
    async fn second_turn_while_in_flight_is_refused() {
        use std::io::Write;

        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/tutors/7/chat")
            .with_status(200)
            .with_chunked_body(|writer| {
                std::thread::sleep(std::time::Duration::from_millis(200));
                writer.write_all(br#"{"response":"slow"}"#)
            })
            .create_async()
            .await;

        let manager = std::sync::Arc::new(manager_for(&server));
        let first = {
            let manager = std::sync::Arc::clone(&manager);
            tokio::spawn(async move { manager.send_turn("7", "first").await })
        };

        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        let err = manager.send_turn("7", "second").await.unwrap_err();
        assert!(matches!(err, ClientError::TurnInFlight));

        let reply = first.await.unwrap().unwrap();
        assert_eq!(reply.as_deref(), Some("slow"));

        // the refused turn left no trace
        let history = manager.history().await;
        assert_eq!(
            history,
            vec![ConversationTurn::user("first"), ConversationTurn::assistant("slow")]
        );
    }
}
