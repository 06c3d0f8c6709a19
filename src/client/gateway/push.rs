//! Push Channel
//!
//! Keeps one server-sent event connection open per session and forwards
//! decoded [`PushEvent`]s into a tokio channel. The connection is
//! authenticated at handshake with the same bearer token as the REST calls.
//! Dropped connections are retried with exponential backoff; consumers only
//! notice a pause in events. Connection state is published separately as
//! [`PushStatus`] for UI indicators.

use super::backoff::{Backoff, BackoffStrategy};
use crate::client::config::Config;
use crate::client::error::{ClientError, ClientResult};
use crate::shared::event::PushEvent;
use futures_util::StreamExt;
use reqwest::header::ACCEPT;
use reqwest::{Client, Response, StatusCode};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Push connection status reported to the UI
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushStatus {
    Connecting,
    Connected,
    Retrying,
    Error(String),
    Disconnected,
}

/// One dispatched server-sent event
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SseFrame {
    pub event: Option<String>,
    pub data: String,
    pub id: Option<String>,
}

/// Incremental decoder for a `text/event-stream` body
///
/// Chunks may split lines (and multi-byte characters) anywhere; only complete
/// lines are interpreted.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
    event: Option<String>,
    data: Vec<String>,
    last_id: Option<String>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk and return the frames it completed
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<SseFrame> {
        self.buffer.extend_from_slice(chunk);
        let mut frames = Vec::new();
        while let Some(newline_pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let raw: Vec<u8> = self.buffer.drain(..=newline_pos).collect();
            let text = String::from_utf8_lossy(&raw);
            let line = text.trim_end_matches(|c| c == '\n' || c == '\r');
            if let Some(frame) = self.process_line(line) {
                frames.push(frame);
            }
        }
        frames
    }

    fn process_line(&mut self, line: &str) -> Option<SseFrame> {
        if line.is_empty() {
            return self.dispatch();
        }
        // Comment / keep-alive
        if line.starts_with(':') {
            return None;
        }
        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };
        match field {
            "event" => self.event = Some(value.to_string()),
            "data" => self.data.push(value.to_string()),
            "id" => self.last_id = Some(value.to_string()),
            _ => {}
        }
        None
    }

    fn dispatch(&mut self) -> Option<SseFrame> {
        let event = self.event.take();
        if self.data.is_empty() {
            return None;
        }
        Some(SseFrame {
            event,
            data: std::mem::take(&mut self.data).join("\n"),
            id: self.last_id.clone(),
        })
    }
}

/// Handle to the background push connection
#[derive(Debug)]
pub struct PushChannel {
    shutdown: CancellationToken,
    status: watch::Receiver<PushStatus>,
    handle: Option<JoinHandle<()>>,
}

impl PushChannel {
    /// Spawn the connection task
    ///
    /// Returns the handle and the receiving end of the event channel, which
    /// is meant to be handed to `NotificationService::consume`.
    pub fn connect(config: Config) -> ClientResult<(Self, mpsc::Receiver<PushEvent>)> {
        let token = config
            .get_token()
            .cloned()
            .ok_or(ClientError::NotAuthenticated)?;
        let (event_tx, event_rx) = mpsc::channel(config.app().push_buffer);
        let (status_tx, status_rx) = watch::channel(PushStatus::Connecting);
        let shutdown = CancellationToken::new();

        let handle = tokio::spawn(run_connection(
            config,
            token,
            event_tx,
            status_tx,
            shutdown.clone(),
        ));

        Ok((
            Self {
                shutdown,
                status: status_rx,
                handle: Some(handle),
            },
            event_rx,
        ))
    }

    /// Latest connection status
    pub fn status(&self) -> PushStatus {
        self.status.borrow().clone()
    }

    pub fn subscribe_status(&self) -> watch::Receiver<PushStatus> {
        self.status.clone()
    }

    /// Stop the connection and wait for the task to finish
    pub async fn close(mut self) {
        self.shutdown.cancel();
        if let Some(handle) = self.handle.take() {
            if let Err(e) = handle.await {
                tracing::warn!("[PUSH] connection task ended abnormally: {}", e);
            }
        }
    }
}

impl Drop for PushChannel {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

enum StreamEnd {
    Shutdown,
    ReceiverGone,
    Closed,
    Failed(String),
}

async fn run_connection(
    config: Config,
    token: String,
    events: mpsc::Sender<PushEvent>,
    status: watch::Sender<PushStatus>,
    shutdown: CancellationToken,
) {
    let client = Client::new();
    let url = config.push_url();
    let mut backoff = Backoff::new(BackoffStrategy::Exponential {
        base: config.app().reconnect_base,
        max: config.app().reconnect_max,
    });

    loop {
        if events.is_closed() {
            break;
        }
        status.send_replace(PushStatus::Connecting);
        tracing::info!("[PUSH] connecting to {}", url);

        let request = client
            .get(&url)
            .bearer_auth(&token)
            .header(ACCEPT, "text/event-stream");
        let response = tokio::select! {
            _ = shutdown.cancelled() => break,
            response = request.send() => response,
        };

        match response {
            Ok(response) if response.status().is_success() => {
                backoff.reset();
                status.send_replace(PushStatus::Connected);
                tracing::info!("[PUSH] connected");
                match read_events(response, &events, &shutdown).await {
                    StreamEnd::Shutdown | StreamEnd::ReceiverGone => break,
                    StreamEnd::Closed => {
                        tracing::info!("[PUSH] stream closed by server, reconnecting");
                    }
                    StreamEnd::Failed(reason) => {
                        tracing::warn!("[PUSH] stream failed: {}", reason);
                        status.send_replace(PushStatus::Error(reason));
                    }
                }
            }
            Ok(response)
                if matches!(response.status(), StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) =>
            {
                tracing::error!("[PUSH] handshake rejected: {}", response.status());
                status.send_replace(PushStatus::Error(format!("http: {}", response.status())));
                break;
            }
            Ok(response) => {
                tracing::warn!("[PUSH] handshake failed: {} (will retry)", response.status());
                status.send_replace(PushStatus::Error(format!("http: {}", response.status())));
            }
            Err(e) => {
                tracing::warn!("[PUSH] connection failed (will retry): {}", e);
                status.send_replace(PushStatus::Error(format!("network: {}", e)));
            }
        }

        status.send_replace(PushStatus::Retrying);
        let delay = backoff.next_delay();
        tracing::debug!("[PUSH] reconnecting in {:?} (attempt {})", delay, backoff.attempt());
        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = tokio::time::sleep(delay) => {}
        }
    }

    status.send_replace(PushStatus::Disconnected);
    tracing::info!("[PUSH] disconnected");
}

async fn read_events(
    response: Response,
    events: &mpsc::Sender<PushEvent>,
    shutdown: &CancellationToken,
) -> StreamEnd {
    let mut stream = response.bytes_stream();
    let mut decoder = SseDecoder::new();

    loop {
        let chunk = tokio::select! {
            _ = shutdown.cancelled() => return StreamEnd::Shutdown,
            chunk = stream.next() => chunk,
        };
        let bytes = match chunk {
            None => return StreamEnd::Closed,
            Some(Err(e)) => return StreamEnd::Failed(format!("stream: {}", e)),
            Some(Ok(bytes)) => bytes,
        };
        for frame in decoder.feed(&bytes) {
            let event = match PushEvent::from_frame(frame.event.as_deref(), &frame.data) {
                Ok(event) => event,
                Err(e) => {
                    tracing::warn!("[PUSH] dropping malformed frame: {}", e);
                    continue;
                }
            };
            let event = match frame.id {
                Some(id) => event.with_id(id),
                None => event,
            };
            tracing::debug!("[PUSH] received {}", event.event_type.name());
            if events.send(event).await.is_err() {
                return StreamEnd::ReceiverGone;
            }
        }
    }
}
