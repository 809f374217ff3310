//! Shape registry: maps `(slice_len, bucket_count)` to a stable small id.
//!
//! # Design
//!
//! - **`ShapeRegistry`**: what the value types consume. Idempotent
//!   registration and fallible-by-absence lookup.
//! - **`ShapeStore`**: the storage collaborator. Exactly three queries plus
//!   an id sequence; inserts are guarded by a uniqueness constraint on the
//!   shape and report a lost race as `StoreError::Conflict`.
//! - **`CatalogRegistry`**: the registration protocol on top of any store.
//!   A conflicting insert is retried by re-reading the winner's id.
//!
//! Shapes are immutable once registered and never deleted, so both
//! mappings can be cached freely (see [`CachedRegistry`]).

mod cache;
#[cfg(unix)]
mod file;
#[cfg(unix)]
mod lock;
mod memory;

use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::shape::{Shape, ShapeId};
use crate::{Error, Result};

pub use cache::CachedRegistry;
#[cfg(unix)]
pub use file::FileShapeStore;
pub use memory::MemoryShapeStore;

const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// A registered shape together with its id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShapeRecord {
    pub id: ShapeId,
    pub shape: Shape,
}

/// Persistent storage for shape records.
pub trait ShapeStore: Send + Sync {
    fn find_by_shape(&self, shape: Shape) -> std::result::Result<Option<ShapeId>, StoreError>;

    /// Allocate the next id from a monotonically increasing sequence.
    fn next_id(&self) -> std::result::Result<ShapeId, StoreError>;

    /// Persist a record. Must fail with `StoreError::Conflict` when either
    /// the id or the shape is already present.
    fn insert(&self, record: ShapeRecord) -> std::result::Result<(), StoreError>;

    fn find_by_id(&self, id: ShapeId) -> std::result::Result<Option<Shape>, StoreError>;
}

/// Resolves shapes to ids and back.
pub trait ShapeRegistry: Send + Sync {
    /// Return the id of `shape`, allocating one on first use.
    fn register(&self, shape: Shape) -> Result<ShapeId>;

    /// `Ok(None)` for unspecified or unknown ids.
    fn lookup_shape(&self, id: ShapeId) -> Result<Option<Shape>>;

    /// # Errors
    ///
    /// - `Error::InvalidArgument`: `slice_len` or `bucket_count` not positive
    /// - `Error::Storage`: the store failed
    fn register_shape(&self, slice_len: i32, bucket_count: i32) -> Result<ShapeId> {
        self.register(Shape::new(slice_len, bucket_count)?)
    }

    /// Like `lookup_shape`, but absence of a specified id is an error.
    fn resolve(&self, id: ShapeId) -> Result<Shape> {
        self.lookup_shape(id)?.ok_or(Error::UnknownShape(id))
    }
}

impl<R: ShapeRegistry + ?Sized> ShapeRegistry for &R {
    fn register(&self, shape: Shape) -> Result<ShapeId> {
        (**self).register(shape)
    }

    fn lookup_shape(&self, id: ShapeId) -> Result<Option<Shape>> {
        (**self).lookup_shape(id)
    }
}

impl<R: ShapeRegistry + ?Sized> ShapeRegistry for Box<R> {
    fn register(&self, shape: Shape) -> Result<ShapeId> {
        (**self).register(shape)
    }

    fn lookup_shape(&self, id: ShapeId) -> Result<Option<Shape>> {
        (**self).lookup_shape(id)
    }
}

/// Registration protocol over a [`ShapeStore`].
#[derive(Debug)]
pub struct CatalogRegistry<S> {
    store: S,
    max_attempts: u32,
}

impl<S: ShapeStore> CatalogRegistry<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }

    /// Number of lookup/insert rounds before a persistent conflict is
    /// reported. Clamped to at least one.
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }
}

impl<S: ShapeStore> ShapeRegistry for CatalogRegistry<S> {
    fn register(&self, shape: Shape) -> Result<ShapeId> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            if let Some(id) = self.store.find_by_shape(shape)? {
                return Ok(id);
            }

            let id = self.store.next_id()?;
            if !id.is_specified() {
                return Err(StoreError::Corrupt(format!("id sequence returned {id}")).into());
            }

            match self.store.insert(ShapeRecord { id, shape }) {
                Ok(()) => {
                    log::info!("registered shape {shape} as id {id}");
                    return Ok(id);
                }
                Err(StoreError::Conflict(what)) if attempt < self.max_attempts => {
                    log::warn!(
                        "insert of shape {shape} as id {id} lost on {what}, re-reading (attempt {attempt})"
                    );
                }
                Err(err) => return Err(err.into()),
            }
        }
    }

    fn lookup_shape(&self, id: ShapeId) -> Result<Option<Shape>> {
        if !id.is_specified() {
            return Ok(None);
        }
        Ok(self.store.find_by_id(id)?)
    }
}
