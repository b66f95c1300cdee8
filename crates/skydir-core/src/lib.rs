//! SkyDir Core - Domain model and port definitions
//!
//! This crate contains the dependency-free heart of SkyDir:
//! - **Domain types** - `Snapshot`, `FileEntry`, `ReconciliationRecord`,
//!   `SyncAction`, directory-pair configuration
//! - **Ports** - traits implemented by the adapter crates:
//!   [`RemoteStore`](ports::RemoteStore), [`RecordStore`](ports::RecordStore),
//!   [`Fingerprinter`](ports::Fingerprinter)
//! - **Configuration** - typed YAML configuration with validation
//!
//! # Architecture
//!
//! SkyDir follows the ports & adapters pattern. The reconciliation engine
//! (`skydir-engine`) depends only on the traits defined here; the concrete
//! cloud transport (`skydir-disk`) and the SQLite record store
//! (`skydir-store`) plug in behind them.

pub mod config;
pub mod domain;
pub mod ports;
