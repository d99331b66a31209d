//! WebSocket client for the assistant message source.
//!
//! Connection lifecycle:
//! 1. `connect()` opens the socket and spawns a reader and a writer task
//! 2. The reader decodes each text frame and posts a `TransportEvent`
//! 3. `send()` hands a serialized frame to the writer through a bounded channel
//! 4. `close()` drops the writer channel (writer flushes, sends Close) and
//!    aborts the reader. Safe to call any number of times.
//!
//! There is no reconnection. A dropped connection surfaces as
//! `TransportEvent::Closed` and stays closed.

use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message as WsMessage;

use super::frame::{decode_inbound, OutboundFrame};
use super::{TransportError, TransportEvent};

/// Outgoing frames queued ahead of the writer.
const OUTGOING_BUFFER: usize = 64;

pub struct SocketTransport {
    url: String,
    outgoing: Option<mpsc::Sender<String>>,
    reader: Option<JoinHandle<()>>,
}

impl SocketTransport {
    /// Open a connection to `url` and start forwarding events to `events`.
    pub async fn connect<E>(
        url: &str,
        events: mpsc::UnboundedSender<E>,
    ) -> Result<Self, TransportError>
    where
        E: From<TransportEvent> + Send + 'static,
    {
        let (socket, _response) =
            tokio_tungstenite::connect_async(url)
                .await
                .map_err(|e| TransportError::Connect {
                    url: url.to_string(),
                    reason: e.to_string(),
                })?;

        tracing::info!(url = %url, "Connected to message source");

        let (ws_sink, ws_stream) = socket.split();
        let (tx, rx) = mpsc::channel::<String>(OUTGOING_BUFFER);

        // Writer: channel -> socket. Ends when every sender is dropped.
        tokio::spawn(async move {
            let mut sink = ws_sink;
            let mut rx = rx;
            while let Some(text) = rx.recv().await {
                if let Err(e) = sink.send(WsMessage::Text(text)).await {
                    tracing::warn!(error = %e, "WebSocket send failed");
                    break;
                }
            }
            let _ = sink.close().await;
        });

        let reader = tokio::spawn(read_loop(url.to_string(), ws_stream, events));

        Ok(Self {
            url: url.to_string(),
            outgoing: Some(tx),
            reader: Some(reader),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Whether the writer is still accepting frames.
    pub fn is_connected(&self) -> bool {
        self.outgoing.as_ref().is_some_and(|tx| !tx.is_closed())
    }

    /// Queue a frame for sending. Fails without blocking when closed or full.
    pub fn send(&self, frame: &OutboundFrame) -> Result<(), TransportError> {
        let tx = self.outgoing.as_ref().ok_or(TransportError::NotConnected)?;
        let json = frame.to_json()?;
        tx.try_send(json).map_err(|e| match e {
            TrySendError::Full(_) => TransportError::Backpressure,
            TrySendError::Closed(_) => TransportError::NotConnected,
        })
    }

    /// Release the connection. Returns `true` only on the call that released it.
    pub fn close(&mut self) -> bool {
        let had_writer = self.outgoing.take().is_some();
        let had_reader = match self.reader.take() {
            Some(reader) => {
                reader.abort();
                true
            }
            None => false,
        };

        let released = had_writer || had_reader;
        if released {
            tracing::info!(url = %self.url, "Closed connection to message source");
        }
        released
    }
}

impl Drop for SocketTransport {
    fn drop(&mut self) {
        self.close();
    }
}

async fn read_loop<S, E>(url: String, mut stream: S, events: mpsc::UnboundedSender<E>)
where
    S: futures_util::Stream<Item = Result<WsMessage, tokio_tungstenite::tungstenite::Error>>
        + Unpin,
    E: From<TransportEvent>,
{
    while let Some(msg) = stream.next().await {
        let event = match msg {
            Ok(WsMessage::Text(text)) => match decode_inbound(&text) {
                Ok(message) => {
                    tracing::debug!(id = %message.id, role = %message.role, "Frame received");
                    TransportEvent::Message(message)
                }
                Err(e) => {
                    tracing::error!(error = %e, "Error processing inbound frame");
                    TransportEvent::FrameRejected(e.to_string())
                }
            },
            Ok(WsMessage::Close(_)) => break,
            Ok(_) => continue, // Ping/Pong handled by tungstenite, binary unused
            Err(e) => {
                tracing::error!(url = %url, error = %e, "WebSocket encountered an error");
                let _ = events.send(TransportEvent::Error(e.to_string()).into());
                break;
            }
        };

        if events.send(event.into()).is_err() {
            // Session gone, nobody is listening.
            return;
        }
    }

    tracing::info!(url = %url, "Disconnected from message source");
    let _ = events.send(TransportEvent::Closed.into());
}
