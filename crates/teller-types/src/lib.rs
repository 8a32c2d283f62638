//! Shared types and constants for the Teller voice relay.
//!
//! This crate provides the foundational types used across all Teller crates:
//! the persisted call record, transcript utterances, and the transcript
//! script filter.
//!
//! No crate in the workspace depends on anything *except* `teller-types` for
//! cross-cutting type definitions. This keeps the dependency graph clean and
//! prevents circular dependencies.

mod call;
pub mod script;

pub use call::{render_transcript, CallRecord, SpeakerRole, Utterance};
