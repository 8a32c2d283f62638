//! Call state persistence for the Teller voice relay.
//!
//! Keeps one [`teller_types::CallRecord`] per call identifier in an
//! in-memory index mirrored to disk, so transcript continuity survives a
//! process restart mid-call.
//!
//! # Design decisions
//!
//! - **One JSON file per call**: records are independent and small; a file
//!   per call identifier gives atomic per-record replacement (write to a
//!   temp file, then rename) without a database process.
//! - **Sync `RwLock` around the index**: all lock acquisitions are brief
//!   HashMap operations that never span `.await` points, making a
//!   synchronous lock safe. File writes happen after the lock is released.
//! - **Last-writer-wins per identifier**: concurrent upserts from
//!   independent call sessions need no cross-record coordination.

mod error;
mod store;

pub use error::StoreError;
pub use store::CallStore;

#[cfg(test)]
mod tests;
