//! One question/answer exchange against the remote chat endpoint.
//!
//! Contract:
//! - The stream may yield 0..n `Delta` chunks followed by at most one
//!   terminal item: `Done` or an error.
//! - After the terminal item the stream is fused; no further protocol
//!   events are read.
//! - Errors are yielded as values, never translated into channel messages
//!   here; that is the relay's job.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures_util::stream::Stream;
use secrecy::ExposeSecret;
use uuid::Uuid;

use crate::config::Config;
use crate::error::{BridgeError, CoreResult};
use crate::http_client::HttpClient;
use crate::model::{AnswerChunk, ConversationEvent, ConversationRequest};
use crate::normalizer::clean_question;
use crate::sse::EventStream;
use crate::token::TokenCache;

/// Literal data payload the remote sends to terminate a stream.
const DONE_SENTINEL: &str = "[DONE]";

#[derive(Clone)]
pub struct AnswerSession {
    http: HttpClient,
    tokens: Arc<TokenCache>,
    conversation_url: String,
    model: String,
}

impl AnswerSession {
    pub fn new(
        http: HttpClient,
        tokens: Arc<TokenCache>,
        conversation_url: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            http,
            tokens,
            conversation_url: conversation_url.into(),
            model: model.into(),
        }
    }

    pub fn from_config(http: HttpClient, tokens: Arc<TokenCache>, cfg: &Config) -> Self {
        Self::new(
            http,
            tokens,
            cfg.endpoints.conversation_url.clone(),
            cfg.endpoints.model.clone(),
        )
    }

    /// Open one exchange. Credential failures propagate unchanged; the
    /// message and parent ids are fresh per call, unique per request only.
    pub async fn ask(&self, question: &str) -> CoreResult<AnswerStream> {
        let token = self.tokens.get().await?;

        let question = clean_question(question);
        let message_id = Uuid::new_v4().to_string();
        let parent_message_id = Uuid::new_v4().to_string();
        let payload = ConversationRequest::next_question(
            &question,
            &self.model,
            message_id,
            parent_message_id,
        );

        let auth = format!("Bearer {}", token.expose_secret());
        let events = self
            .http
            .post_event_stream(
                &self.conversation_url,
                &payload,
                &[("Authorization", auth.as_str())],
            )
            .await?;

        Ok(AnswerStream {
            inner: events,
            done: false,
        })
    }
}

/// Decoded protocol events mapped to `AnswerChunk`s, fused at the first
/// terminal item.
pub struct AnswerStream {
    inner: EventStream,
    done: bool,
}

impl Stream for AnswerStream {
    type Item = CoreResult<AnswerChunk>;

    fn poll_next(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Self::Item>> {
        loop {
            if self.done {
                return Poll::Ready(None);
            }
            match self.inner.as_mut().poll_next(cx) {
                Poll::Ready(Some(Ok(ev))) => {
                    if ev.data == DONE_SENTINEL {
                        self.done = true;
                        return Poll::Ready(Some(Ok(AnswerChunk::Done)));
                    }
                    match serde_json::from_str::<ConversationEvent>(&ev.data) {
                        Ok(parsed) => match parsed.into_fragment() {
                            Some(fragment) => {
                                return Poll::Ready(Some(Ok(AnswerChunk::Delta(fragment))));
                            }
                            // Structural event with no payload; not an error.
                            None => continue,
                        },
                        Err(e) => {
                            self.done = true;
                            return Poll::Ready(Some(Err(BridgeError::MalformedEvent(
                                e.to_string(),
                            ))));
                        }
                    }
                }
                Poll::Ready(Some(Err(e))) => {
                    self.done = true;
                    return Poll::Ready(Some(Err(e)));
                }
                Poll::Ready(None) => {
                    self.done = true;
                    return Poll::Ready(None);
                }
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}
