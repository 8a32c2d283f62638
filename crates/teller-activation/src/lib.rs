//! Debit-card activation client for the bank backend.
//!
//! Builds the masked-card activation request, stamps it with per-request
//! idempotency/audit keys (reference id, STAN, transaction date/time), and
//! maps the backend's response shape to a normalized [`ActivationOutcome`].
//!
//! The client never returns an error past its boundary: transport failures
//! and backend rejections both become failure outcomes, so callers can relay
//! them into the conversation without a separate error path. There is no
//! retry at any level — an activation must not be re-attempted without the
//! caller's explicit re-confirmation.

mod client;
mod config;

pub use client::{ActivationAttempt, ActivationClient, ActivationOutcome};
pub use config::ActivationConfig;
