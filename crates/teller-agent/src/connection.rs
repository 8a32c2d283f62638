//! The realtime agent connection: one duplex WebSocket per call.

use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use crate::config::AgentConfig;
use crate::error::AgentError;
use crate::events::{AgentEvent, ClientEvent};

type AgentSink =
    futures_util::stream::SplitSink<WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>, Message>;

/// Capacity of the inbound event channel. Events are applied one at a time
/// by the owning call session; beyond this the reader applies backpressure.
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// A live connection to the speech agent for one call.
///
/// The connection is owned exclusively by the call session that created it
/// and is never reused across calls. A spawned reader task parses inbound
/// frames into [`AgentEvent`]s; unparseable frames are logged and discarded
/// without closing the connection. When the transport closes or errors, the
/// event channel drains to `None`, which the session treats as the agent
/// leg going down.
pub struct AgentConnection {
    sink: AgentSink,
    events: Option<mpsc::Receiver<AgentEvent>>,
    reader: JoinHandle<()>,
}

impl AgentConnection {
    /// Opens the realtime WebSocket using an ephemeral credential.
    pub async fn connect(
        config: &AgentConfig,
        model: &str,
        client_secret: &str,
    ) -> Result<Self, AgentError> {
        let url = format!("{}/v1/realtime?model={}", ws_base(&config.base_url), model);
        let mut request = url
            .as_str()
            .into_client_request()
            .map_err(AgentError::Transport)?;

        let auth = HeaderValue::from_str(&format!("Bearer {client_secret}"))
            .map_err(|_| AgentError::InvalidCredential)?;
        let headers = request.headers_mut();
        headers.insert("Authorization", auth);
        headers.insert("OpenAI-Beta", HeaderValue::from_static("realtime=v1"));

        let (stream, _response) = connect_async(request).await?;
        tracing::debug!(%url, "agent connection open");

        let (sink, mut source) = stream.split();
        let (tx, events) = mpsc::channel(EVENT_CHANNEL_CAPACITY);

        let reader = tokio::spawn(async move {
            while let Some(frame) = source.next().await {
                match frame {
                    Ok(Message::Text(text)) => {
                        match serde_json::from_str::<AgentEvent>(text.as_str()) {
                            Ok(event) => {
                                if tx.send(event).await.is_err() {
                                    break;
                                }
                            }
                            Err(e) => {
                                tracing::warn!("discarding unparseable agent frame: {}", e);
                            }
                        }
                    }
                    Ok(Message::Close(_)) => break,
                    Ok(_) => {}
                    Err(e) => {
                        tracing::warn!("agent transport error: {}", e);
                        break;
                    }
                }
            }
            // Dropping `tx` here is what signals closure to the session.
        });

        Ok(Self {
            sink,
            events: Some(events),
            reader,
        })
    }

    /// Sends one event to the agent.
    pub async fn send(&mut self, event: &ClientEvent) -> Result<(), AgentError> {
        let text = serde_json::to_string(event)?;
        self.sink.send(Message::Text(text.into())).await?;
        Ok(())
    }

    /// Receives the next agent event, or `None` once the transport is down
    /// (or after the event stream has been moved out with [`take_events`]).
    ///
    /// [`take_events`]: AgentConnection::take_events
    pub async fn next_event(&mut self) -> Option<AgentEvent> {
        match self.events.as_mut() {
            Some(events) => events.recv().await,
            None => None,
        }
    }

    /// Moves the inbound event stream out of the connection so a consumer
    /// task can drain it while the sender half stays with the owner.
    pub fn take_events(&mut self) -> Option<mpsc::Receiver<AgentEvent>> {
        self.events.take()
    }

    /// Closes the connection. Safe to call when the transport is already
    /// gone; a failed close frame is ignored.
    pub async fn close(&mut self) {
        let _ = self.sink.send(Message::Close(None)).await;
        self.reader.abort();
    }
}

/// Maps an HTTP base URL onto its WebSocket scheme.
fn ws_base(base_url: &str) -> String {
    if let Some(rest) = base_url.strip_prefix("https://") {
        format!("wss://{rest}")
    } else if let Some(rest) = base_url.strip_prefix("http://") {
        format!("ws://{rest}")
    } else {
        base_url.to_string()
    }
}
