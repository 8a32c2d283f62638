//! Telephony media-relay bridge.
//!
//! One [`CallSession`] per carrier WebSocket connection. The session owns
//! both legs of the call — the carrier socket and the agent connection —
//! and mediates events between them.
//!
//! All inputs (carrier frames, agent events, the negotiation result) funnel
//! into one queue consumed by a single task per session, so session state is
//! mutated one event at a time in arrival order and needs no locks. State
//! transitions are computed by pure `apply_*` methods that return
//! [`BridgeAction`]s; the event loop is the only place that touches sockets.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use axum::extract::ws::{Message as CarrierMessage, WebSocket, WebSocketUpgrade};
use axum::response::IntoResponse;
use axum::Extension;
use chrono::{DateTime, Utc};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use teller_agent::{
    AgentConnection, AgentError, AgentEvent, ClientEvent, ConversationItem, SessionConfig,
    SessionSpec,
};
use teller_types::{render_transcript, script, SpeakerRole, Utterance};
use tokio::sync::mpsc;

use crate::dispatcher;
use crate::AppState;

/// Capacity of the per-session input queue. Inputs are applied one at a
/// time; producers (carrier reader, agent forwarder) block past this.
const INPUT_QUEUE_CAPACITY: usize = 256;

// ── Carrier wire events ──────────────────────────────────────────────

/// Events arriving on the carrier media-stream socket.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "event")]
pub enum CarrierEvent {
    #[serde(rename = "start")]
    Start { start: StreamStart },

    #[serde(rename = "media")]
    Media { media: MediaPayload },

    #[serde(rename = "stop")]
    Stop,

    /// Any event kind the relay does not react to (marks, DTMF, etc.).
    #[serde(other)]
    Unrecognized,
}

/// The carrier's stream-start descriptor.
#[derive(Debug, Clone, Deserialize)]
pub struct StreamStart {
    #[serde(rename = "streamSid")]
    pub stream_sid: String,
    #[serde(rename = "callSid")]
    pub call_sid: String,
    /// Parameters passed through from the voice webhook (callSid, from).
    #[serde(default, rename = "customParameters")]
    pub custom_parameters: HashMap<String, String>,
}

/// One inbound audio frame, base64 over JSON.
#[derive(Debug, Clone, Deserialize)]
pub struct MediaPayload {
    pub payload: String,
}

/// Renders an outbound carrier media frame, keyed by the stream identifier
/// captured at start.
fn carrier_media_frame(stream_sid: &str, payload: &str) -> String {
    serde_json::json!({
        "event": "media",
        "streamSid": stream_sid,
        "media": { "payload": payload }
    })
    .to_string()
}

// ── Session state machine ────────────────────────────────────────────

/// Lifecycle of one relay session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Connected, waiting for the carrier's start event.
    AwaitingStart,
    /// Requesting an ephemeral credential and opening the agent leg.
    Negotiating,
    /// Both legs live, audio flowing.
    Active,
    /// Teardown in progress.
    Closing,
    /// Both legs closed. Terminal.
    Closed,
    /// Negotiation failed before any audio was exchanged. Terminal.
    Failed,
}

impl SessionState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Closed | Self::Failed)
    }
}

/// Side effects requested by the state machine, executed by the event loop.
#[derive(Debug)]
pub enum BridgeAction {
    /// Start negotiating the agent leg.
    Negotiate,
    /// Send an event on the agent connection.
    ForwardToAgent(ClientEvent),
    /// Send a serialized frame on the carrier socket.
    ForwardToCarrier(String),
    /// Run a tool invocation and report its result into the conversation.
    ExecuteTool {
        name: String,
        call_id: String,
        arguments: String,
    },
    /// Upsert the call record from the current transcript.
    PersistTranscript,
    /// Close the agent leg if open.
    CloseAgent,
    /// Close the carrier leg.
    CloseCarrier,
}

/// Relay state for one telephony call.
#[derive(Debug)]
pub struct CallSession {
    state: SessionState,
    stream_sid: Option<String>,
    call_sid: Option<String>,
    caller: Option<String>,
    agent_ready: bool,
    utterances: Vec<Utterance>,
    account_number: Option<String>,
}

impl CallSession {
    pub fn new() -> Self {
        Self {
            state: SessionState::AwaitingStart,
            stream_sid: None,
            call_sid: None,
            caller: None,
            agent_ready: false,
            utterances: Vec::new(),
            account_number: None,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn stream_sid(&self) -> Option<&str> {
        self.stream_sid.as_deref()
    }

    pub fn call_sid(&self) -> Option<&str> {
        self.call_sid.as_deref()
    }

    pub fn caller(&self) -> Option<&str> {
        self.caller.as_deref()
    }

    pub fn account_number(&self) -> Option<&str> {
        self.account_number.as_deref()
    }

    /// Full transcript text, rendered for persistence.
    pub fn transcript_text(&self) -> String {
        render_transcript(&self.utterances)
    }

    pub fn has_transcript(&self) -> bool {
        !self.utterances.is_empty()
    }

    /// Applies one carrier event.
    pub fn apply_carrier(&mut self, event: CarrierEvent) -> Vec<BridgeAction> {
        match event {
            CarrierEvent::Start { start } => {
                if self.state != SessionState::AwaitingStart {
                    tracing::warn!(
                        stream_sid = %start.stream_sid,
                        state = ?self.state,
                        "ignoring duplicate stream start"
                    );
                    return Vec::new();
                }
                tracing::info!(
                    stream_sid = %start.stream_sid,
                    call_sid = %start.call_sid,
                    "stream started"
                );
                self.stream_sid = Some(start.stream_sid);
                self.call_sid = Some(start.call_sid);
                self.caller = start.custom_parameters.get("from").cloned();
                self.state = SessionState::Negotiating;
                vec![BridgeAction::Negotiate]
            }
            CarrierEvent::Media { media } => {
                // Frames arriving before the agent session is ready are
                // dropped, not queued: the agent cannot consume them yet and
                // buffering would grow without bound during a slow
                // negotiation.
                if self.state == SessionState::Active && self.agent_ready {
                    vec![BridgeAction::ForwardToAgent(ClientEvent::InputAudioAppend {
                        audio: media.payload,
                    })]
                } else {
                    tracing::trace!(state = ?self.state, "dropping media frame before agent ready");
                    Vec::new()
                }
            }
            CarrierEvent::Stop => {
                tracing::info!(
                    stream_sid = self.stream_sid.as_deref().unwrap_or("-"),
                    "stream stopped"
                );
                self.begin_close()
            }
            CarrierEvent::Unrecognized => Vec::new(),
        }
    }

    /// Applies one agent event.
    pub fn apply_agent(&mut self, event: AgentEvent) -> Vec<BridgeAction> {
        match event {
            AgentEvent::SessionCreated | AgentEvent::SessionUpdated => {
                tracing::debug!("agent session ready");
                Vec::new()
            }
            AgentEvent::AudioDelta { delta: Some(delta) } => match &self.stream_sid {
                Some(stream_sid) => vec![BridgeAction::ForwardToCarrier(carrier_media_frame(
                    stream_sid, &delta,
                ))],
                None => Vec::new(),
            },
            AgentEvent::AudioDelta { delta: None } => Vec::new(),
            AgentEvent::AudioTranscriptDelta { delta } => {
                if let Some(delta) = delta {
                    tracing::debug!(%delta, "agent transcript delta");
                }
                Vec::new()
            }
            AgentEvent::AudioTranscriptDone { transcript } => {
                self.record_utterance(SpeakerRole::Agent, transcript)
            }
            AgentEvent::InputTranscriptionCompleted { transcript } => {
                self.record_utterance(SpeakerRole::Caller, transcript)
            }
            AgentEvent::FunctionCallArgumentsDone {
                name,
                call_id,
                arguments,
            } => {
                tracing::info!(%name, %call_id, "agent requested tool call");
                vec![BridgeAction::ExecuteTool {
                    name,
                    call_id,
                    arguments,
                }]
            }
            AgentEvent::Error { error } => {
                // The platform may recover from its own errors; only a
                // transport-level close tears the call down.
                tracing::warn!(error = ?error, "agent reported an error");
                Vec::new()
            }
            AgentEvent::Unrecognized => Vec::new(),
        }
    }

    /// The configuration event to send once the agent leg is open.
    pub fn agent_session_config(&self) -> ClientEvent {
        ClientEvent::SessionUpdate {
            session: SessionConfig::telephony(),
        }
    }

    /// Marks the session active after the configuration message was sent.
    pub fn mark_active(&mut self) {
        self.state = SessionState::Active;
        self.agent_ready = true;
    }

    /// Records a negotiation failure: the call attempt is over and the
    /// carrier leg is closed. No audio was exchanged, so no further
    /// cleanup is needed.
    pub fn negotiation_failed(&mut self) -> Vec<BridgeAction> {
        if self.state.is_terminal() {
            return Vec::new();
        }
        self.state = SessionState::Failed;
        vec![BridgeAction::CloseCarrier]
    }

    /// Starts the teardown cascade. Idempotent: once the session is
    /// closing or terminal, further calls are no-ops, so the cascade is
    /// safe to trigger from either leg.
    pub fn begin_close(&mut self) -> Vec<BridgeAction> {
        match self.state {
            SessionState::Closing | SessionState::Closed | SessionState::Failed => Vec::new(),
            _ => {
                self.state = SessionState::Closing;
                vec![BridgeAction::CloseAgent, BridgeAction::CloseCarrier]
            }
        }
    }

    /// Completes the teardown. Only ever transitions from Closing.
    pub fn mark_closed(&mut self) {
        if self.state == SessionState::Closing {
            self.state = SessionState::Closed;
        }
    }

    /// Appends a filtered utterance and requests persistence.
    ///
    /// Utterances in a disallowed script are dropped entirely — neither
    /// stored nor persisted (a known transcription quirk, see
    /// `teller_types::script`).
    fn record_utterance(&mut self, role: SpeakerRole, text: Option<String>) -> Vec<BridgeAction> {
        let Some(text) = text.filter(|t| !t.is_empty()) else {
            return Vec::new();
        };
        if script::contains_disallowed_script(&text) {
            tracing::debug!(role = ?role, "dropping utterance in disallowed script");
            return Vec::new();
        }

        let now_ms = Utc::now().timestamp_millis();
        let timestamp_ms = match self.utterances.last() {
            Some(last) if last.timestamp_ms >= now_ms => last.timestamp_ms + 1,
            _ => now_ms,
        };
        self.utterances.push(Utterance::new(role, text, timestamp_ms));
        vec![BridgeAction::PersistTranscript]
    }
}

impl Default for CallSession {
    fn default() -> Self {
        Self::new()
    }
}

// ── Session registry ─────────────────────────────────────────────────

/// An active relay session, as seen from outside the bridge.
#[derive(Debug, Clone)]
pub struct RegisteredCall {
    pub call_sid: String,
    pub started_at: DateTime<Utc>,
}

/// Registry of active sessions keyed by carrier stream identifier.
///
/// Sessions register on stream start and deregister on close; there is no
/// ambient global state. Uses a sync `RwLock`: all operations are brief map
/// accesses that never span `.await` points.
#[derive(Clone, Default)]
pub struct SessionRegistry {
    inner: Arc<RwLock<HashMap<String, RegisteredCall>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, stream_sid: &str, call_sid: &str) {
        let mut inner = self.inner.write().expect("session registry lock poisoned");
        inner.insert(
            stream_sid.to_string(),
            RegisteredCall {
                call_sid: call_sid.to_string(),
                started_at: Utc::now(),
            },
        );
    }

    pub fn remove(&self, stream_sid: &str) {
        let mut inner = self.inner.write().expect("session registry lock poisoned");
        inner.remove(stream_sid);
    }

    pub fn get(&self, stream_sid: &str) -> Option<RegisteredCall> {
        self.inner
            .read()
            .expect("session registry lock poisoned")
            .get(stream_sid)
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.inner
            .read()
            .expect("session registry lock poisoned")
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ── Event loop ───────────────────────────────────────────────────────

/// Everything that can wake a session: inputs from both legs plus the
/// negotiation result. One queue, one consumer, per-source ordering
/// preserved by construction.
enum SessionInput {
    Carrier(CarrierEvent),
    CarrierClosed,
    Agent(AgentEvent),
    AgentClosed,
    Negotiated(Result<AgentConnection, AgentError>),
}

/// WebSocket handler: `GET /twilio/media-stream`.
pub async fn media_stream_handler(
    Extension(state): Extension<Arc<AppState>>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_stream(socket, state))
}

/// Drives one relay session from carrier connect to teardown.
async fn handle_stream(socket: WebSocket, state: Arc<AppState>) {
    tracing::info!("carrier connected to media stream");

    let (mut carrier_tx, mut carrier_rx) = socket.split();
    let (input_tx, mut inputs) = mpsc::channel::<SessionInput>(INPUT_QUEUE_CAPACITY);

    // Carrier reader: parses frames into typed events. Malformed JSON is
    // logged and discarded without closing the connection.
    let carrier_input = input_tx.clone();
    let carrier_reader = tokio::spawn(async move {
        while let Some(frame) = carrier_rx.next().await {
            match frame {
                Ok(CarrierMessage::Text(text)) => {
                    match serde_json::from_str::<CarrierEvent>(text.as_str()) {
                        Ok(event) => {
                            if carrier_input.send(SessionInput::Carrier(event)).await.is_err() {
                                return;
                            }
                        }
                        Err(e) => {
                            tracing::warn!("discarding unparseable carrier frame: {}", e);
                        }
                    }
                }
                Ok(CarrierMessage::Close(_)) => break,
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!("carrier transport error: {}", e);
                    break;
                }
            }
        }
        let _ = carrier_input.send(SessionInput::CarrierClosed).await;
    });

    let mut session = CallSession::new();
    let mut agent: Option<AgentConnection> = None;

    while let Some(input) = inputs.recv().await {
        let actions = match input {
            SessionInput::Carrier(event) => session.apply_carrier(event),
            SessionInput::CarrierClosed => session.begin_close(),
            SessionInput::Agent(event) => session.apply_agent(event),
            SessionInput::AgentClosed => session.begin_close(),
            SessionInput::Negotiated(Ok(connection)) => {
                attach_agent(&mut session, &mut agent, connection, &input_tx).await
            }
            SessionInput::Negotiated(Err(e)) => {
                tracing::error!("agent negotiation failed: {}", e);
                session.negotiation_failed()
            }
        };

        run_actions(
            actions,
            &mut session,
            &mut agent,
            &mut carrier_tx,
            &state,
            &input_tx,
        )
        .await;

        if session.state().is_terminal() {
            break;
        }
    }

    // Teardown is idempotent: whichever leg initiated it, both get closed
    // exactly once here if the loop exited without finishing the cascade.
    if let Some(mut connection) = agent.take() {
        connection.close().await;
    }
    let _ = carrier_tx.close().await;
    carrier_reader.abort();

    if session.has_transcript() {
        persist_transcript(&session, &state).await;
    }
    if let Some(stream_sid) = session.stream_sid() {
        state.registry.remove(stream_sid);
    }
    tracing::info!(
        stream_sid = session.stream_sid().unwrap_or("-"),
        state = ?session.state(),
        "relay session ended"
    );
}

/// Wires a freshly negotiated agent connection into the session: spawns the
/// event forwarder, sends the session configuration, and only then marks
/// the session active.
async fn attach_agent(
    session: &mut CallSession,
    agent: &mut Option<AgentConnection>,
    mut connection: AgentConnection,
    input_tx: &mpsc::Sender<SessionInput>,
) -> Vec<BridgeAction> {
    if session.state() != SessionState::Negotiating {
        // The carrier hung up while negotiation was in flight; the
        // connection is surplus and closed immediately.
        connection.close().await;
        return Vec::new();
    }

    if let Some(mut events) = connection.take_events() {
        let agent_input = input_tx.clone();
        tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                if agent_input.send(SessionInput::Agent(event)).await.is_err() {
                    return;
                }
            }
            let _ = agent_input.send(SessionInput::AgentClosed).await;
        });
    }

    let config_event = session.agent_session_config();
    match connection.send(&config_event).await {
        Ok(()) => {
            session.mark_active();
            *agent = Some(connection);
            tracing::info!(
                call_sid = session.call_sid().unwrap_or("-"),
                caller = session.caller().unwrap_or("unknown"),
                "agent session configured, relay active"
            );
            Vec::new()
        }
        Err(e) => {
            tracing::error!("failed to send agent session config: {}", e);
            connection.close().await;
            session.negotiation_failed()
        }
    }
}

/// Executes the actions produced by one event application, in order.
async fn run_actions(
    actions: Vec<BridgeAction>,
    session: &mut CallSession,
    agent: &mut Option<AgentConnection>,
    carrier_tx: &mut (impl SinkExt<CarrierMessage> + Unpin),
    state: &Arc<AppState>,
    input_tx: &mpsc::Sender<SessionInput>,
) {
    let mut queue: std::collections::VecDeque<BridgeAction> = actions.into();

    while let Some(action) = queue.pop_front() {
        match action {
            BridgeAction::Negotiate => {
                if let (Some(stream_sid), Some(call_sid)) =
                    (session.stream_sid(), session.call_sid())
                {
                    state.registry.register(stream_sid, call_sid);
                }
                let client = state.session_client.clone();
                let tx = input_tx.clone();
                tokio::spawn(async move {
                    let result = negotiate_agent(client).await;
                    let _ = tx.send(SessionInput::Negotiated(result)).await;
                });
            }
            BridgeAction::ForwardToAgent(event) => {
                if let Some(connection) = agent.as_mut() {
                    if let Err(e) = connection.send(&event).await {
                        tracing::warn!("agent send failed, closing call: {}", e);
                        queue.extend(session.begin_close());
                    }
                }
            }
            BridgeAction::ForwardToCarrier(frame) => {
                if carrier_tx
                    .send(CarrierMessage::Text(frame.into()))
                    .await
                    .is_err()
                {
                    tracing::warn!("carrier send failed, closing call");
                    queue.extend(session.begin_close());
                }
            }
            BridgeAction::ExecuteTool {
                name,
                call_id,
                arguments,
            } => {
                // The invocation result must reach the agent before the
                // conversation continues, so this awaits inline: it
                // suspends only this session's event loop.
                let outcome = dispatcher::dispatch(&state.activation, &name, &arguments).await;
                let output = match serde_json::to_string(&outcome) {
                    Ok(output) => output,
                    Err(e) => {
                        tracing::error!("tool outcome serialization failed: {}", e);
                        r#"{"success":false,"message":"internal error"}"#.to_string()
                    }
                };
                queue.push_front(BridgeAction::ForwardToAgent(ClientEvent::ResponseCreate));
                queue.push_front(BridgeAction::ForwardToAgent(
                    ClientEvent::ConversationItemCreate {
                        item: ConversationItem::FunctionCallOutput { call_id, output },
                    },
                ));
            }
            BridgeAction::PersistTranscript => {
                persist_transcript(session, state).await;
            }
            BridgeAction::CloseAgent => {
                if let Some(mut connection) = agent.take() {
                    connection.close().await;
                }
            }
            BridgeAction::CloseCarrier => {
                let _ = carrier_tx.close().await;
            }
        }
    }

    // A completed close cascade is the session's single Closing → Closed
    // transition.
    if session.state() == SessionState::Closing {
        session.mark_closed();
    }
}

/// Negotiates the agent leg: mints an ephemeral credential with the tool
/// catalog declared, then opens the realtime connection with it.
async fn negotiate_agent(
    client: teller_agent::SessionClient,
) -> Result<AgentConnection, AgentError> {
    let spec = SessionSpec::from_config(client.config()).with_tools(teller_agent::tool_catalog());
    let session = client.create_session(&spec).await?;
    let model = session
        .model
        .clone()
        .unwrap_or_else(|| client.config().realtime_model.clone());
    AgentConnection::connect(client.config(), &model, session.client_secret.value()).await
}

/// Upserts the call record from the session's current transcript.
async fn persist_transcript(session: &CallSession, state: &Arc<AppState>) {
    let Some(call_sid) = session.call_sid() else {
        return;
    };
    if let Err(e) = state
        .store
        .save_call(
            call_sid,
            session.account_number().map(|s| s.to_string()),
            session.transcript_text(),
        )
        .await
    {
        tracing::warn!(%call_sid, "failed to persist call record: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn started_session() -> CallSession {
        let mut session = CallSession::new();
        let actions = session.apply_carrier(CarrierEvent::Start {
            start: StreamStart {
                stream_sid: "MZ123".to_string(),
                call_sid: "CA123".to_string(),
                custom_parameters: HashMap::from([(
                    "from".to_string(),
                    "+15550001111".to_string(),
                )]),
            },
        });
        assert!(matches!(actions.as_slice(), [BridgeAction::Negotiate]));
        session
    }

    fn active_session() -> CallSession {
        let mut session = started_session();
        session.mark_active();
        session
    }

    #[test]
    fn carrier_events_parse_by_tag() {
        let event: CarrierEvent = serde_json::from_str(
            r#"{"event":"start","start":{"streamSid":"MZ1","callSid":"CA1"}}"#,
        )
        .expect("should parse");
        assert!(matches!(event, CarrierEvent::Start { .. }));

        let event: CarrierEvent =
            serde_json::from_str(r#"{"event":"media","media":{"payload":"AAAA"}}"#)
                .expect("should parse");
        assert!(matches!(event, CarrierEvent::Media { .. }));

        let event: CarrierEvent = serde_json::from_str(r#"{"event":"stop"}"#)
            .expect("should parse");
        assert!(matches!(event, CarrierEvent::Stop));

        let event: CarrierEvent =
            serde_json::from_str(r#"{"event":"dtmf","dtmf":{"digit":"5"}}"#)
                .expect("unknown kinds must parse to the fallback");
        assert!(matches!(event, CarrierEvent::Unrecognized));
    }

    #[test]
    fn start_captures_identifiers_and_negotiates() {
        let session = started_session();
        assert_eq!(session.state(), SessionState::Negotiating);
        assert_eq!(session.stream_sid(), Some("MZ123"));
        assert_eq!(session.call_sid(), Some("CA123"));
    }

    #[test]
    fn duplicate_start_is_ignored() {
        let mut session = started_session();
        let actions = session.apply_carrier(CarrierEvent::Start {
            start: StreamStart {
                stream_sid: "MZ999".to_string(),
                call_sid: "CA999".to_string(),
                custom_parameters: HashMap::new(),
            },
        });
        assert!(actions.is_empty());
        assert_eq!(session.stream_sid(), Some("MZ123"));
    }

    #[test]
    fn media_before_ready_is_dropped_not_queued() {
        let mut session = started_session();
        for _ in 0..3 {
            let actions = session.apply_carrier(CarrierEvent::Media {
                media: MediaPayload {
                    payload: "AAAA".to_string(),
                },
            });
            assert!(actions.is_empty(), "pre-ready frames must be dropped");
        }
        // Becoming active later must not replay the dropped frames.
        session.mark_active();
        let actions = session.apply_carrier(CarrierEvent::Media {
            media: MediaPayload {
                payload: "BBBB".to_string(),
            },
        });
        assert_eq!(actions.len(), 1);
    }

    #[test]
    fn media_frames_forward_in_order_once_active() {
        let mut session = active_session();
        let payloads = ["one", "two", "three"];
        let mut forwarded = Vec::new();
        for p in payloads {
            for action in session.apply_carrier(CarrierEvent::Media {
                media: MediaPayload {
                    payload: p.to_string(),
                },
            }) {
                match action {
                    BridgeAction::ForwardToAgent(ClientEvent::InputAudioAppend { audio }) => {
                        forwarded.push(audio)
                    }
                    other => panic!("unexpected action: {other:?}"),
                }
            }
        }
        assert_eq!(forwarded, ["one", "two", "three"]);
    }

    #[test]
    fn audio_delta_forwards_with_stream_sid_from_start() {
        let mut session = active_session();
        let actions = session.apply_agent(AgentEvent::AudioDelta {
            delta: Some("UklGR".to_string()),
        });
        match actions.as_slice() {
            [BridgeAction::ForwardToCarrier(frame)] => {
                let v: serde_json::Value =
                    serde_json::from_str(frame).expect("frame should be JSON");
                assert_eq!(v["event"], "media");
                assert_eq!(v["streamSid"], "MZ123");
                assert_eq!(v["media"]["payload"], "UklGR");
            }
            other => panic!("unexpected actions: {other:?}"),
        }
    }

    #[test]
    fn function_call_routes_to_dispatcher_with_call_id() {
        let mut session = active_session();
        let actions = session.apply_agent(AgentEvent::FunctionCallArgumentsDone {
            name: "activate_debit_card".to_string(),
            call_id: "call_7".to_string(),
            arguments: r#"{"card_last4":"1155","expiry_mmyy":"0626"}"#.to_string(),
        });
        match actions.as_slice() {
            [BridgeAction::ExecuteTool { name, call_id, .. }] => {
                assert_eq!(name, "activate_debit_card");
                assert_eq!(call_id, "call_7");
            }
            other => panic!("unexpected actions: {other:?}"),
        }
    }

    #[test]
    fn agent_error_event_does_not_close_the_call() {
        let mut session = active_session();
        let actions = session.apply_agent(AgentEvent::Error {
            error: Some(serde_json::json!({"message": "transient"})),
        });
        assert!(actions.is_empty());
        assert_eq!(session.state(), SessionState::Active);
    }

    #[test]
    fn unrecognized_agent_event_is_ignored() {
        let mut session = active_session();
        assert!(session.apply_agent(AgentEvent::Unrecognized).is_empty());
        assert_eq!(session.state(), SessionState::Active);
    }

    #[test]
    fn stop_triggers_close_cascade_exactly_once() {
        let mut session = active_session();
        let actions = session.apply_carrier(CarrierEvent::Stop);
        assert!(matches!(
            actions.as_slice(),
            [BridgeAction::CloseAgent, BridgeAction::CloseCarrier]
        ));
        assert_eq!(session.state(), SessionState::Closing);

        // Second trigger from either direction is a no-op.
        assert!(session.begin_close().is_empty());
        assert!(session.apply_carrier(CarrierEvent::Stop).is_empty());

        session.mark_closed();
        assert_eq!(session.state(), SessionState::Closed);
        assert!(session.begin_close().is_empty());
    }

    #[test]
    fn negotiation_failure_is_terminal_and_closes_carrier() {
        let mut session = started_session();
        let actions = session.negotiation_failed();
        assert!(matches!(actions.as_slice(), [BridgeAction::CloseCarrier]));
        assert_eq!(session.state(), SessionState::Failed);
        assert!(session.state().is_terminal());

        // No second terminal transition.
        assert!(session.negotiation_failed().is_empty());
        assert!(session.begin_close().is_empty());
    }

    #[test]
    fn session_config_is_sent_before_active() {
        let mut session = started_session();
        assert_eq!(session.state(), SessionState::Negotiating);
        let config = session.agent_session_config();
        let json = serde_json::to_value(&config).expect("should serialize");
        assert_eq!(json["type"], "session.update");
        assert_eq!(json["session"]["input_audio_format"], "g711_ulaw");
        // mark_active is only called after the config send succeeds.
        session.mark_active();
        assert_eq!(session.state(), SessionState::Active);
    }

    #[test]
    fn disallowed_script_utterance_is_never_recorded() {
        let mut session = active_session();
        let actions = session.apply_agent(AgentEvent::InputTranscriptionCompleted {
            transcript: Some("यह टेस्ट".to_string()),
        });
        assert!(actions.is_empty());
        assert!(!session.has_transcript());

        let actions = session.apply_agent(AgentEvent::InputTranscriptionCompleted {
            transcript: Some("یہ ٹیسٹ".to_string()),
        });
        assert!(matches!(actions.as_slice(), [BridgeAction::PersistTranscript]));
        assert_eq!(session.transcript_text(), "Customer: یہ ٹیسٹ");
    }

    #[test]
    fn transcript_records_both_roles_in_order() {
        let mut session = active_session();
        session.apply_agent(AgentEvent::InputTranscriptionCompleted {
            transcript: Some("I want to activate my card".to_string()),
        });
        session.apply_agent(AgentEvent::AudioTranscriptDone {
            transcript: Some("Sure, what are the last four digits?".to_string()),
        });
        assert_eq!(
            session.transcript_text(),
            "Customer: I want to activate my card\nAgent: Sure, what are the last four digits?"
        );
    }

    #[test]
    fn empty_transcript_event_is_ignored() {
        let mut session = active_session();
        assert!(session
            .apply_agent(AgentEvent::AudioTranscriptDone {
                transcript: Some(String::new()),
            })
            .is_empty());
        assert!(session
            .apply_agent(AgentEvent::AudioTranscriptDone { transcript: None })
            .is_empty());
    }

    #[test]
    fn registry_tracks_sessions_by_stream_sid() {
        let registry = SessionRegistry::new();
        assert!(registry.is_empty());

        registry.register("MZ1", "CA1");
        registry.register("MZ2", "CA2");
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.get("MZ1").expect("should exist").call_sid, "CA1");

        registry.remove("MZ1");
        assert!(registry.get("MZ1").is_none());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn utterance_timestamps_are_monotonic() {
        let mut session = active_session();
        for i in 0..5 {
            session.apply_agent(AgentEvent::AudioTranscriptDone {
                transcript: Some(format!("line {i}")),
            });
        }
        let text = session.transcript_text();
        assert_eq!(text.lines().count(), 5);
    }
}
