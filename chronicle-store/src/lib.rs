//! Stream storage for Chronicle
//!
//! This crate provides the append-only stream store with optimistic
//! concurrency, plus the optional snapshot cache.
//!
//! ## Features
//!
//! - **Optimistic concurrency** - Expected-version check and insert under one atomic section
//! - **Gapless versions** - The store exclusively owns version assignment
//! - **Range reads** - Per-stream windows, per-type and per-correlation queries
//! - **Global positions** - Insertion-ordered cursor for chunked replay
//! - **Snapshots** - Optional per-stream state cache, never required for correctness
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use chronicle_store::{EventStreamStore, InMemoryStreamStore, ReadStreamOptions};
//!
//! let store = InMemoryStreamStore::new();
//! store.append("order-123", vec![envelope], None).await?;
//! store.append("order-123", vec![next], Some(1)).await?;
//! let records = store.read_stream("order-123", ReadStreamOptions::all()).await?;
//! ```

mod log;

pub mod jsonl;
pub mod memory;
pub mod record;
pub mod snapshot;
pub mod store;

pub use jsonl::{JsonlStoreConfig, JsonlStreamStore};
pub use memory::InMemoryStreamStore;
pub use record::{StreamRecord, StreamStats};
pub use snapshot::{InMemorySnapshotStore, Snapshot, SnapshotStore};
pub use store::{EventStreamStore, ReadAllOptions, ReadStreamOptions, StoreError};
