//! Port definitions (traits implemented by adapter crates)
//!
//! - [`RemoteStore`] - cloud storage operations (`skydir-disk`)
//! - [`RecordStore`] - reconciliation record persistence (`skydir-store`)
//! - [`Fingerprinter`] - content fingerprint computation (`skydir-engine`)

pub mod fingerprint;
pub mod record_store;
pub mod remote_store;

pub use fingerprint::Fingerprinter;
pub use record_store::RecordStore;
pub use remote_store::{RemoteEntry, RemoteError, RemoteStore};
