//! WebSocket transport over `tokio-tungstenite`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::stream::{SplitSink, StreamExt};
use futures_util::SinkExt;
use tokio::net::TcpStream;
use tokio::sync::mpsc::UnboundedSender;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use crate::error::TransportError;
use crate::transport::{Transport, TransportEvent};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsSink = SplitSink<WsStream, WsMessage>;

/// Live TMI transport: one `wss://` connection, text frames in both
/// directions.
///
/// Inbound text frames are forwarded verbatim as [`TransportEvent::Data`];
/// WebSocket ping/pong and binary frames are skipped (TMI liveness runs at
/// the IRC layer). Outbound frames are trimmed of CR-LF before being
/// wrapped in a text frame.
pub struct WsTransport {
    label: String,
    events: UnboundedSender<TransportEvent>,
    writer: tokio::sync::Mutex<Option<WsSink>>,
    connected: Arc<AtomicBool>,
    ever_connected: AtomicBool,
    endpoint: std::sync::Mutex<Option<String>>,
    reader_stop: std::sync::Mutex<Option<CancellationToken>>,
}

impl WsTransport {
    /// Build a transport that reports through `events`. `label` prefixes
    /// every log line this transport emits.
    pub fn new(label: String, events: UnboundedSender<TransportEvent>) -> Self {
        Self {
            label,
            events,
            writer: tokio::sync::Mutex::new(None),
            connected: Arc::new(AtomicBool::new(false)),
            ever_connected: AtomicBool::new(false),
            endpoint: std::sync::Mutex::new(None),
            reader_stop: std::sync::Mutex::new(None),
        }
    }

    fn spawn_reader(&self, mut read: futures_util::stream::SplitStream<WsStream>) {
        let stop = CancellationToken::new();
        let events = self.events.clone();
        let connected = Arc::clone(&self.connected);
        let label = self.label.clone();
        *self.reader_stop.lock().expect("reader lock poisoned") = Some(stop.clone());

        tokio::spawn(async move {
            loop {
                let frame = tokio::select! {
                    _ = stop.cancelled() => break,
                    frame = read.next() => frame,
                };
                match frame {
                    Some(Ok(WsMessage::Text(text))) => {
                        let _ = events.send(TransportEvent::Data(text));
                    }
                    Some(Ok(WsMessage::Close(_))) | None => break,
                    Some(Ok(WsMessage::Binary(_))) => {
                        warn!("{label} ignoring binary frame (TMI is text-only)");
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        warn!("{label} websocket read failed: {e}");
                        break;
                    }
                }
            }
            connected.store(false, Ordering::SeqCst);
            let _ = events.send(TransportEvent::Closed);
        });
    }
}

#[async_trait]
impl Transport for WsTransport {
    async fn start(&self, uri: &str, cancel: &CancellationToken) -> Result<(), TransportError> {
        let (stream, _response) = tokio::select! {
            _ = cancel.cancelled() => return Err(TransportError::Cancelled),
            conn = connect_async(uri) => conn?,
        };
        debug!("{} websocket open to {uri}", self.label);

        let (sink, read) = stream.split();
        *self.writer.lock().await = Some(sink);
        *self.endpoint.lock().expect("endpoint lock poisoned") = Some(uri.to_string());
        self.connected.store(true, Ordering::SeqCst);
        self.spawn_reader(read);

        let reconnection = self.ever_connected.swap(true, Ordering::SeqCst);
        let _ = self.events.send(TransportEvent::Open { reconnection });
        Ok(())
    }

    async fn send(&self, frame: &str, suppress_log: bool) -> Result<(), TransportError> {
        if !self.is_connected() {
            return Err(TransportError::NotConnected);
        }
        if suppress_log {
            trace!("{} → (credentials suppressed)", self.label);
        } else {
            trace!("{} → {}", self.label, frame.trim_end());
        }

        let mut writer = self.writer.lock().await;
        let sink = writer.as_mut().ok_or(TransportError::NotConnected)?;
        // One line per text frame; the CR-LF terminator stays local.
        let body = frame.trim_end_matches(['\r', '\n']);
        sink.send(WsMessage::text(body)).await?;
        Ok(())
    }

    async fn disconnect(&self, _cancel: &CancellationToken) -> Result<(), TransportError> {
        if let Some(stop) = self
            .reader_stop
            .lock()
            .expect("reader lock poisoned")
            .take()
        {
            stop.cancel();
        }
        self.connected.store(false, Ordering::SeqCst);
        if let Some(mut sink) = self.writer.lock().await.take() {
            let _ = sink.send(WsMessage::Close(None)).await;
            let _ = sink.close().await;
        }
        debug!("{} websocket closed", self.label);
        Ok(())
    }

    async fn restart(
        &self,
        delay: Duration,
        cancel: &CancellationToken,
    ) -> Result<(), TransportError> {
        let endpoint = self
            .endpoint
            .lock()
            .expect("endpoint lock poisoned")
            .clone()
            .ok_or(TransportError::NotConnected)?;

        self.disconnect(cancel).await?;
        tokio::select! {
            _ = cancel.cancelled() => return Err(TransportError::Cancelled),
            _ = tokio::time::sleep(delay) => {}
        }
        self.start(&endpoint, cancel).await
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}
