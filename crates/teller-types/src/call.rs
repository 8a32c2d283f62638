//! Call record and transcript types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Who produced an utterance in a call transcript.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpeakerRole {
    /// The customer on the phone.
    Caller,
    /// The speech agent.
    Agent,
}

impl SpeakerRole {
    /// Returns the display label used when rendering a transcript.
    pub fn label(self) -> &'static str {
        match self {
            Self::Caller => "Customer",
            Self::Agent => "Agent",
        }
    }
}

/// One utterance in a call transcript.
///
/// Utterances are appended in arrival order and never mutated; `timestamp_ms`
/// is milliseconds since the Unix epoch and is monotonic within a call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Utterance {
    pub role: SpeakerRole,
    pub text: String,
    pub timestamp_ms: i64,
}

impl Utterance {
    pub fn new(role: SpeakerRole, text: impl Into<String>, timestamp_ms: i64) -> Self {
        Self {
            role,
            text: text.into(),
            timestamp_ms,
        }
    }
}

/// Durable projection of a call's metadata.
///
/// At most one record exists per `call_sid`; every meaningful update
/// overwrites the previous record (upsert by identifier).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallRecord {
    /// The carrier's call identifier (e.g. a Twilio CallSid).
    pub call_sid: String,
    /// Verified account number, once the caller has provided one.
    pub account_number: Option<String>,
    /// Full transcript text, one utterance per line.
    pub transcript: String,
    /// When this record was last written.
    pub last_update: DateTime<Utc>,
}

impl CallRecord {
    pub fn new(call_sid: impl Into<String>) -> Self {
        Self {
            call_sid: call_sid.into(),
            account_number: None,
            transcript: String::new(),
            last_update: Utc::now(),
        }
    }
}

/// Renders an utterance sequence as the flat transcript text stored in a
/// [`CallRecord`].
pub fn render_transcript(utterances: &[Utterance]) -> String {
    let mut out = String::new();
    for u in utterances {
        if !out.is_empty() {
            out.push('\n');
        }
        out.push_str(u.role.label());
        out.push_str(": ");
        out.push_str(&u.text);
    }
    out
}
