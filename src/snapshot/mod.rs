//! Schema Snapshot Module
//!
//! Caller-side persistence of analysed snapshots: the engine itself is
//! stateless, the service remembers the last result per connection.

pub mod store;

pub use store::{SnapshotMetadata, SnapshotStore, StoredSnapshot};
