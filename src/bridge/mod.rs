//! Request/response channel between the page context and a display surface.
//!
//! Two message kinds cross the bridge: `getTranscript` (display to page,
//! answered exactly once to the requester that sent it) and `timeupdate`
//! (page to display, one-way, dropped when the display falls behind).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use uuid::Uuid;

use crate::transcribe::Transcript;
use crate::ErrorCode;

/// Messages exchanged over the bridge, tagged by `action` on the wire
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action")]
pub enum Message {
    #[serde(rename = "getTranscript")]
    GetTranscript,

    #[serde(rename = "timeupdate")]
    TimeUpdate { time: f64 },
}

/// Answer to `getTranscript`: `{ "transcript": .. }` or `{ "error": .. }`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TranscriptResponse {
    Transcript { transcript: Transcript },
    Error { error: ErrorCode },
}

impl TranscriptResponse {
    pub fn error(code: ErrorCode) -> Self {
        TranscriptResponse::Error { error: code }
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum BridgeError {
    #[error("The page context is not listening")]
    Disconnected,

    #[error("The page context dropped request {0} without answering")]
    NoResponse(Uuid),
}

/// Page-side handler for incoming requests
#[async_trait]
pub trait RequestHandler: Send + Sync + 'static {
    /// Handle one message; `None` means the kind expects no reply
    async fn handle(&self, message: Message) -> Option<TranscriptResponse>;
}

struct Request {
    id: Uuid,
    message: Message,
    reply: oneshot::Sender<TranscriptResponse>,
}

/// Create a connected pair of endpoints
pub fn channel(capacity: usize) -> (BridgeHost, BridgeClient) {
    let (request_tx, request_rx) = mpsc::channel(capacity);
    let (update_tx, update_rx) = mpsc::channel(capacity);

    (
        BridgeHost {
            requests: request_rx,
            notifier: TimeNotifier { updates: update_tx },
        },
        BridgeClient {
            requests: request_tx,
            updates: update_rx,
        },
    )
}

/// Display-side endpoint
pub struct BridgeClient {
    requests: mpsc::Sender<Request>,
    updates: mpsc::Receiver<Message>,
}

impl BridgeClient {
    /// Send a request and wait for its matching response
    pub async fn request(&self, message: Message) -> Result<TranscriptResponse, BridgeError> {
        let id = Uuid::new_v4();
        let (reply, response) = oneshot::channel();

        tracing::debug!("Bridge request {} ({:?})", id, message);

        self.requests
            .send(Request { id, message, reply })
            .await
            .map_err(|_| BridgeError::Disconnected)?;

        response.await.map_err(|_| BridgeError::NoResponse(id))
    }

    pub async fn get_transcript(&self) -> Result<TranscriptResponse, BridgeError> {
        self.request(Message::GetTranscript).await
    }

    /// Next playback time published by the page, `None` once it hangs up
    pub async fn next_time_update(&mut self) -> Option<f64> {
        while let Some(message) = self.updates.recv().await {
            if let Message::TimeUpdate { time } = message {
                return Some(time);
            }
        }
        None
    }
}

/// Page-side endpoint
pub struct BridgeHost {
    requests: mpsc::Receiver<Request>,
    notifier: TimeNotifier,
}

impl BridgeHost {
    /// Handle for publishing playback time
    pub fn notifier(&self) -> TimeNotifier {
        self.notifier.clone()
    }

    /// Answer requests until every client is gone.
    ///
    /// Requests are handled concurrently so that simultaneous
    /// `getTranscript` calls can share one fetch.
    pub async fn serve<H: RequestHandler>(mut self, handler: Arc<H>) {
        while let Some(request) = self.requests.recv().await {
            let handler = Arc::clone(&handler);
            tokio::spawn(async move {
                let Request { id, message, reply } = request;
                match handler.handle(message).await {
                    Some(response) => {
                        if reply.send(response).is_err() {
                            tracing::debug!("Requester for {} went away before the reply", id);
                        }
                    }
                    None => tracing::debug!("Request {} needs no reply", id),
                }
            });
        }

        tracing::debug!("Bridge closed: no clients left");
    }
}

/// One-way `timeupdate` publisher
#[derive(Clone)]
pub struct TimeNotifier {
    updates: mpsc::Sender<Message>,
}

impl TimeNotifier {
    /// Publish a playback position; returns false when the display is gone
    pub fn notify_time(&self, time: f64) -> bool {
        match self.updates.try_send(Message::TimeUpdate { time }) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::trace!("Display lagging; dropped timeupdate at {:.3}", time);
                true
            }
            Err(mpsc::error::TrySendError::Closed(_)) => false,
        }
    }
}
