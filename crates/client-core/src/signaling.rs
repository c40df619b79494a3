//! Signaling client
//!
//! Turns a local media offer into an HTTP round trip against the relay and
//! returns the remote answer, plus the pre-flight tutor metadata fetch and
//! the startup liveness probes.
//!
//! Endpoints (all relative to the configured base URLs):
//!
//! - `GET  {backend}/tutors/{id}/info` - avatar presence and status
//! - `POST {backend}/tutors/{id}/webrtc/offer` - offer in, answer out
//! - `GET  {backend}/health`, `GET {avatar}/health`,
//!   `GET  {backend}/tutors/{id}/health` - liveness, status text only
//!
//! A failed negotiation is surfaced as [`ClientError::NegotiationFailed`]
//! with no retry; the caller must restart the whole connect operation.

use serde::{Deserialize, Serialize};

use crate::error::{ClientError, ClientResult};

/// A session description as exchanged with the relay (`{sdp, type}`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionDescription {
    /// SDP payload
    pub sdp: String,
    /// Description type: "offer" or "answer"
    #[serde(rename = "type")]
    pub kind: String,
}

impl SessionDescription {
    /// Create an offer description
    pub fn offer(sdp: impl Into<String>) -> Self {
        Self { sdp: sdp.into(), kind: "offer".to_string() }
    }

    /// Create an answer description
    pub fn answer(sdp: impl Into<String>) -> Self {
        Self { sdp: sdp.into(), kind: "answer".to_string() }
    }

    /// Syntactic sanity check: non-empty SDP with a known type.
    ///
    /// Full SDP parsing belongs to the transport primitive; the signaling
    /// client only refuses to ship obviously broken payloads.
    pub fn is_valid(&self) -> bool {
        !self.sdp.trim().is_empty() && matches!(self.kind.as_str(), "offer" | "answer")
    }
}

/// The local/remote description pair of one connection attempt.
///
/// Ephemeral: created per attempt and dropped once the transport holds a
/// stable description pair, or on failure.
#[derive(Debug, Clone)]
pub struct NegotiationExchange {
    /// Our capability offer
    pub local_offer: SessionDescription,
    /// The relay's answer
    pub remote_answer: SessionDescription,
}

/// Tutor metadata consulted before any media capture is attempted
#[derive(Debug, Clone, Deserialize)]
pub struct TutorInfo {
    /// Whether the tutor has an avatar at all
    pub has_avatar: bool,
    /// Operational status of the avatar ("running" means callable)
    #[serde(default)]
    pub avatar_status: String,
}

impl TutorInfo {
    /// Whether a connect attempt may proceed to media capture
    pub fn is_running(&self) -> bool {
        self.has_avatar && self.avatar_status == "running"
    }
}

/// Result of the startup liveness probes.
///
/// Informational only: probe failures affect displayed status text and
/// never block any operation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ServiceStatus {
    /// Web backend answered its health probe
    pub backend_ok: bool,
    /// Avatar service answered its health probe
    pub avatar_service_ok: bool,
    /// Tutor-scoped health probe answered
    pub tutor_ok: bool,
}

impl ServiceStatus {
    /// One-line status text for display
    pub fn summary(&self) -> &'static str {
        match (self.backend_ok, self.avatar_service_ok, self.tutor_ok) {
            (true, true, true) => "all services ready",
            (true, true, false) => "tutor not ready",
            (false, _, _) => "backend unreachable",
            (_, false, _) => "avatar service unreachable",
        }
    }
}

/// HTTP client for the signaling relay and liveness probes
#[derive(Debug, Clone)]
pub struct SignalingClient {
    http: reqwest::Client,
    backend_url: String,
    avatar_service_url: String,
}

impl SignalingClient {
    /// Create a signaling client over an existing HTTP client
    pub fn new(
        http: reqwest::Client,
        backend_url: impl Into<String>,
        avatar_service_url: impl Into<String>,
    ) -> Self {
        Self {
            http,
            backend_url: backend_url.into(),
            avatar_service_url: avatar_service_url.into(),
        }
    }

    /// Exchange a local offer for a remote answer through the relay.
    ///
    /// A single POST, no retry. Non-success status or a body that does not
    /// parse as a session description both yield `NegotiationFailed`.
    pub async fn negotiate(
        &self,
        tutor_id: &str,
        local_offer: &SessionDescription,
    ) -> ClientResult<SessionDescription> {
        if !local_offer.is_valid() {
            return Err(ClientError::negotiation_failed(
                "local offer is not a valid session description",
            ));
        }

        let url = format!("{}/tutors/{}/webrtc/offer", self.backend_url, tutor_id);
        tracing::debug!("sending offer to relay at {}", url);

        let response = self
            .http
            .post(&url)
            .json(local_offer)
            .send()
            .await
            .map_err(|e| ClientError::negotiation_failed(format!("relay unreachable: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::negotiation_failed(format!(
                "relay returned {status}"
            )));
        }

        let answer: SessionDescription = response.json().await.map_err(|e| {
            ClientError::negotiation_failed(format!("answer did not parse: {e}"))
        })?;
        if !answer.is_valid() {
            return Err(ClientError::negotiation_failed(
                "relay answer is not a valid session description",
            ));
        }

        tracing::debug!("received remote answer ({} bytes of sdp)", answer.sdp.len());
        Ok(answer)
    }

    /// Pre-flight metadata fetch for a tutor's avatar.
    ///
    /// A missing tutor (non-2xx) is reported as `AvatarUnavailable` so the
    /// connect path can fail before prompting for capture permission.
    pub async fn tutor_info(&self, tutor_id: &str) -> ClientResult<TutorInfo> {
        let url = format!("{}/tutors/{}/info", self.backend_url, tutor_id);
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| ClientError::Network { message: format!("tutor info fetch: {e}") })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::avatar_unavailable(format!(
                "tutor info returned {status}"
            )));
        }

        response
            .json()
            .await
            .map_err(|e| ClientError::Network { message: format!("tutor info body: {e}") })
    }

    /// Probe backend, avatar service and tutor liveness.
    ///
    /// Never fails; each probe degrades independently to `false`.
    pub async fn check_services(&self, tutor_id: &str) -> ServiceStatus {
        let backend_ok = self.probe(format!("{}/health", self.backend_url)).await;
        let avatar_service_ok = self
            .probe(format!("{}/health", self.avatar_service_url))
            .await;
        let tutor_ok = self
            .probe(format!("{}/tutors/{}/health", self.backend_url, tutor_id))
            .await;

        let status = ServiceStatus { backend_ok, avatar_service_ok, tutor_ok };
        tracing::info!("service check: {}", status.summary());
        status
    }

    async fn probe(&self, url: String) -> bool {
        match self.http.get(&url).send().await {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                tracing::debug!("health probe {} failed: {}", url, e);
                false
            }
        }
    }
}
