//! Round-robin timeslice and consolidated-data value types.
//!
//! A [`Timeslice`] maps an absolute timestamp onto a fixed-width bucket that
//! wraps around after a fixed number of buckets. The bucket shape
//! (`slice_len` seconds × `bucket_count` buckets) is registered once in a
//! [`ShapeRegistry`] and referred to by a small [`ShapeId`] afterwards.
//!
//! # Example
//!
//! ```
//! use rrslice::compare::{compare, sequence_eq};
//! use rrslice::registry::{CatalogRegistry, MemoryShapeStore, ShapeRegistry};
//! use rrslice::Timeslice;
//!
//! let registry = CatalogRegistry::new(MemoryShapeStore::new());
//! let five_minutes = registry.register_shape(60, 5)?;
//!
//! let a = Timeslice::parse("2012-05-01 10:00:30", five_minutes, &registry)?;
//! let b = Timeslice::parse("2012-05-01 10:05:30", five_minutes, &registry)?;
//! assert_eq!(a.format(&registry)?, "(2012-05-01 10:00:00+00, 2012-05-01 10:01:00+00] #1/5");
//! assert!(compare(Some(&a), Some(&b), &registry)?.code() < 0);
//! assert!(sequence_eq(Some(&a), Some(&b), &registry)?);
//! # Ok::<(), rrslice::Error>(())
//! ```

pub mod bucket;
pub mod cdata;
pub mod compare;
pub mod config;
pub mod error;
pub mod registry;
pub mod shape;
pub mod timeslice;
pub mod timestamp;

pub use bucket::{apply_shape, Bucket};
pub use cdata::{ConsolidatedData, ConsolidationFunction};
pub use config::RegistryConfig;
pub use error::{Error, Result, StoreError};
pub use registry::{CatalogRegistry, ShapeRegistry, ShapeStore};
pub use shape::{Shape, ShapeId};
pub use timeslice::Timeslice;
pub use timestamp::Timestamp;

/// Human-readable library version banner.
pub fn version() -> String {
    format!(
        "Round-Robin Timeslice library, version {}",
        env!("CARGO_PKG_VERSION")
    )
}
