//! Speech-agent platform client for the Teller voice relay.
//!
//! Wraps the agent platform's three surfaces:
//!
//! - **Session negotiation**: minting short-lived credentials with a declared
//!   session configuration, and accepting inbound SIP calls
//!   ([`SessionClient`]).
//! - **Realtime connection**: the duplex WebSocket leg the relay bridges
//!   carrier audio into ([`AgentConnection`]), with closed tagged-union event
//!   types in both directions ([`AgentEvent`], [`ClientEvent`]).
//! - **Call summarization**: a chat-completion call that turns a finished
//!   transcript into a narrative summary ([`SummaryClient`]).
//!
//! The transcription and turn-detection engine behind the connection is a
//! black box; this crate only speaks its wire protocol.

pub mod config;
pub mod connection;
pub mod error;
pub mod events;
pub mod session;
pub mod summary;
pub mod tools;

pub use config::AgentConfig;
pub use connection::AgentConnection;
pub use error::AgentError;
pub use events::{AgentEvent, ClientEvent, ConversationItem, SessionConfig};
pub use session::{EphemeralSession, PromptRef, SessionClient, SessionSpec, TurnDetection};
pub use summary::{SummaryClient, SummaryMessage};
pub use tools::{tool_catalog, ACTIVATE_DEBIT_CARD};
