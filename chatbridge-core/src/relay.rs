//! Per-exchange bridge between a UI surface and the answer session.
//!
//! A channel carries exactly one question and its resulting answer
//! sequence, then closes. Each channel moves open -> answering -> closed;
//! closure happens on completion, on error, or when the UI side goes away.
//! Sends after the peer disconnects are no-ops, never a crash, and no
//! exchange is ever retried — the user resubmits.

use std::sync::Arc;

use futures_util::StreamExt;
use tokio::sync::mpsc;

use crate::config::Config;
use crate::error::{BridgeError, CoreResult};
use crate::http_client::HttpClient;
use crate::model::AnswerChunk;
use crate::session::AnswerSession;
use crate::token::TokenCache;

/// Messages a UI surface sends to the relay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiMessage {
    Question { question: String },
}

/// Messages the relay sends back to the UI surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayMessage {
    AnswerText { answer: String },
    AnswerDone,
    AnswerError { error: String },
}

/// The relay's end of one exchange channel.
pub struct BridgePort {
    rx: mpsc::Receiver<UiMessage>,
    tx: mpsc::Sender<RelayMessage>,
}

/// The UI surface's end of one exchange channel.
pub struct UiPort {
    tx: mpsc::Sender<UiMessage>,
    rx: mpsc::Receiver<RelayMessage>,
}

impl UiPort {
    /// Submit the question for this exchange. Returns false if the relay
    /// side is already gone.
    pub async fn submit(&self, question: impl Into<String>) -> bool {
        self.tx
            .send(UiMessage::Question {
                question: question.into(),
            })
            .await
            .is_ok()
    }

    /// Next relay message; None once the channel is closed.
    pub async fn recv(&mut self) -> Option<RelayMessage> {
        self.rx.recv().await
    }
}

/// Create one exchange channel. Channels are single-use: one question in,
/// one answer sequence out, then closed.
pub fn channel(capacity: usize) -> (UiPort, BridgePort) {
    let (ui_tx, bridge_rx) = mpsc::channel(capacity);
    let (bridge_tx, ui_rx) = mpsc::channel(capacity);
    (
        UiPort {
            tx: ui_tx,
            rx: ui_rx,
        },
        BridgePort {
            rx: bridge_rx,
            tx: bridge_tx,
        },
    )
}

/// Serves exchange channels. Cheap to clone; every clone shares the same
/// credential cache, so one relay value can serve many concurrent channels.
#[derive(Clone)]
pub struct Relay {
    session: AnswerSession,
    tokens: Arc<TokenCache>,
}

impl Relay {
    pub fn new(session: AnswerSession, tokens: Arc<TokenCache>) -> Self {
        Self { session, tokens }
    }

    pub fn from_config(cfg: &Config) -> CoreResult<Self> {
        let http = HttpClient::new(&cfg.http)?;
        let tokens = Arc::new(TokenCache::from_config(http.clone(), cfg));
        let session = AnswerSession::from_config(http, tokens.clone(), cfg);
        Ok(Self::new(session, tokens))
    }

    /// Serve one channel to completion. Consumes the port; when this
    /// returns the channel is closed and nothing more will be sent on it.
    pub async fn serve(&self, port: BridgePort) {
        let BridgePort { mut rx, tx } = port;
        tracing::debug!("channel open");

        let Some(UiMessage::Question { question }) = rx.recv().await else {
            tracing::debug!("channel disconnected before a question arrived");
            return;
        };
        tracing::debug!(question = preview(&question), "answering");

        let mut stream = match self.session.ask(&question).await {
            Ok(stream) => stream,
            Err(e) => {
                self.fail(&tx, e).await;
                return;
            }
        };

        while let Some(item) = stream.next().await {
            match item {
                Ok(AnswerChunk::Delta(answer)) => {
                    if tx.send(RelayMessage::AnswerText { answer }).await.is_err() {
                        tracing::debug!("channel disconnected while answering");
                        return;
                    }
                }
                Ok(AnswerChunk::Done) => {
                    let _ = tx.send(RelayMessage::AnswerDone).await;
                    tracing::debug!("channel closed, answer complete");
                    return;
                }
                Err(e) => {
                    self.fail(&tx, e).await;
                    return;
                }
            }
        }

        // Server closed the connection without the termination sentinel.
        self.fail(&tx, BridgeError::network("stream ended before completion"))
            .await;
    }

    async fn fail(&self, tx: &mpsc::Sender<RelayMessage>, e: BridgeError) {
        tracing::debug!(error = %e, "channel closed on error");
        let _ = tx
            .send(RelayMessage::AnswerError {
                error: e.to_string(),
            })
            .await;
        // Most observed failures stem from an expired or rejected
        // credential; force a fresh fetch on the next exchange.
        self.tokens.invalidate();
    }
}

fn preview(q: &str) -> &str {
    match q.char_indices().nth(20) {
        Some((i, _)) => &q[..i],
        None => q,
    }
}
