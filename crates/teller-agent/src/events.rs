//! Wire events for the realtime agent connection.
//!
//! Both directions are closed tagged unions: every event kind the relay
//! reacts to has a variant, and anything else lands in an explicit
//! unrecognized fallback instead of being probed as loose JSON.

use serde::{Deserialize, Serialize};

use crate::session::TurnDetection;

/// Events the relay sends to the agent.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum ClientEvent {
    /// Declares the session configuration after the connection opens.
    #[serde(rename = "session.update")]
    SessionUpdate { session: SessionConfig },

    /// Appends one base64 audio frame to the input buffer. Server VAD
    /// commits turns; no manual commit is sent.
    #[serde(rename = "input_audio_buffer.append")]
    InputAudioAppend { audio: String },

    /// Injects an item (here: a tool result) into the conversation.
    #[serde(rename = "conversation.item.create")]
    ConversationItemCreate { item: ConversationItem },

    /// Asks the agent to continue responding, e.g. after a tool result.
    #[serde(rename = "response.create")]
    ResponseCreate,
}

/// Conversation items the relay creates.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum ConversationItem {
    /// The JSON-encoded output of a completed tool invocation, correlated
    /// to the invocation by `call_id`.
    #[serde(rename = "function_call_output")]
    FunctionCallOutput { call_id: String, output: String },
}

/// The session configuration carried by a `session.update` event.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SessionConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_audio_format: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_audio_format: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_audio_transcription: Option<TranscriptionConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub turn_detection: Option<TurnDetection>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<serde_json::Value>>,
}

/// Input transcription settings.
#[derive(Debug, Clone, Serialize)]
pub struct TranscriptionConfig {
    pub model: &'static str,
}

impl SessionConfig {
    /// The configuration sent on every telephony call: carrier-native
    /// narrowband audio both ways, transcription on, telephony-tuned server
    /// VAD, and the activation tool catalog.
    pub fn telephony() -> Self {
        Self {
            input_audio_format: Some("g711_ulaw"),
            output_audio_format: Some("g711_ulaw"),
            input_audio_transcription: Some(TranscriptionConfig { model: "whisper-1" }),
            turn_detection: Some(TurnDetection::telephony()),
            tools: Some(crate::tools::tool_catalog()),
        }
    }
}

/// Events the agent sends to the relay.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub enum AgentEvent {
    #[serde(rename = "session.created")]
    SessionCreated,

    #[serde(rename = "session.updated")]
    SessionUpdated,

    /// One chunk of base64 output audio.
    #[serde(rename = "response.audio.delta")]
    AudioDelta {
        #[serde(default)]
        delta: Option<String>,
    },

    /// Streaming text of what the agent is saying.
    #[serde(rename = "response.audio_transcript.delta")]
    AudioTranscriptDelta {
        #[serde(default)]
        delta: Option<String>,
    },

    /// The agent finished an utterance; `transcript` is its full text.
    #[serde(rename = "response.audio_transcript.done")]
    AudioTranscriptDone {
        #[serde(default)]
        transcript: Option<String>,
    },

    /// The caller's speech was transcribed.
    #[serde(rename = "conversation.item.input_audio_transcription.completed")]
    InputTranscriptionCompleted {
        #[serde(default)]
        transcript: Option<String>,
    },

    /// The agent wants a tool executed.
    #[serde(rename = "response.function_call_arguments.done")]
    FunctionCallArgumentsDone {
        name: String,
        call_id: String,
        #[serde(default)]
        arguments: String,
    },

    /// A platform-level error report. The platform may recover; this never
    /// closes the call by itself.
    #[serde(rename = "error")]
    Error {
        #[serde(default)]
        error: Option<serde_json::Value>,
    },

    /// Any event kind the relay does not react to.
    #[serde(other)]
    Unrecognized,
}
