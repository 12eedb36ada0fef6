//! Log channel: one websocket per run, receive-only.

use crate::model::StreamEnd;
use anyhow::{anyhow, Context, Result};
use futures::StreamExt;
use reqwest::Url;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_tungstenite::{tungstenite::Message, MaybeTlsStream, WebSocketStream};

/// Reserved prefix of the terminal signal that carries the run identifier.
pub const RESULTS_READY_PREFIX: &str = "RESULTS_READY:";

/// Classification of one text frame received on the log channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamMessage {
    /// Terminal signal: the run finished and its manifest can be fetched.
    ResultsReady(String),
    /// Plain log text, kept verbatim.
    Line(String),
}

impl StreamMessage {
    /// Classify a raw frame. The identifier is everything after the fixed prefix,
    /// so identifiers containing `:` survive intact. An empty identifier is not a
    /// signal.
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim_end_matches(['\r', '\n']);
        match trimmed.strip_prefix(RESULTS_READY_PREFIX) {
            Some(id) if !id.trim().is_empty() => StreamMessage::ResultsReady(id.trim().to_string()),
            _ => StreamMessage::Line(raw.to_string()),
        }
    }
}

pub struct LogStream {
    inner: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl LogStream {
    pub async fn connect(url: &Url) -> Result<Self> {
        Self::connect_within(url, super::REQUEST_TIMEOUT).await
    }

    /// Connect, giving up when the handshake has not completed within `limit`.
    async fn connect_within(url: &Url, limit: Duration) -> Result<Self> {
        let (inner, _resp) =
            tokio::time::timeout(limit, tokio_tungstenite::connect_async(url.as_str()))
                .await
                .map_err(|_| anyhow!("connect {url}: timed out after {limit:?}"))?
                .with_context(|| format!("connect {url}"))?;
        tracing::info!(%url, "log channel open");
        Ok(Self { inner })
    }

    /// Forward every text frame to `on_message` until the channel ends.
    pub async fn pump<F>(mut self, mut on_message: F) -> StreamEnd
    where
        F: FnMut(String),
    {
        while let Some(frame) = self.inner.next().await {
            match frame {
                Ok(Message::Text(text)) => on_message(text),
                Ok(Message::Binary(bytes)) => {
                    on_message(String::from_utf8_lossy(&bytes).into_owned())
                }
                Ok(Message::Close(frame)) => {
                    tracing::info!(?frame, "log channel closed by server");
                    return StreamEnd::Closed;
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!(error = %e, "log channel error");
                    return StreamEnd::Error(e.to_string());
                }
            }
        }
        StreamEnd::Closed
    }
}
