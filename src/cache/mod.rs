//! Shared in-memory stores
//!
//! Both stores are explicitly constructed and shared through `Arc`. They live
//! for the whole process and keep nothing on disk.
//!
//! - [`ExpiringCache`]: fixed time-to-live per entry, lazy expiry on read.
//!   Used for notification throttle counters.
//! - [`SnapshotCache`]: no expiry. Used for the registered symbol sets and
//!   the last seen constituent snapshots.
//!
//! Both use a multiple-reader/single-writer lock internally, so callers never
//! need their own locking.

pub mod expiring;
pub mod snapshot;

pub use expiring::ExpiringCache;
pub use snapshot::SnapshotCache;
