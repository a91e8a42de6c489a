//! Backing stores: the content store archives are captured into, the live
//! relational store rows are replayed into, and the live bucket store blobs
//! are reconciled into.

pub mod buckets;
pub mod content;
pub mod live;

pub use buckets::{BucketStore, ObjectMeta};
pub use content::{ContentStore, FsContentStore};
pub use live::LiveStore;
