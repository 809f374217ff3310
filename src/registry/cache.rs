use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::registry::ShapeRegistry;
use crate::shape::{Shape, ShapeId};
use crate::Result;

/// Memoizes both registry mappings.
///
/// Only positive answers are cached: an id that is unknown now may be
/// registered by another process later.
#[derive(Debug)]
pub struct CachedRegistry<R> {
    inner: R,
    maps: RwLock<CacheMaps>,
}

#[derive(Debug, Default)]
struct CacheMaps {
    by_shape: HashMap<Shape, ShapeId>,
    by_id: HashMap<ShapeId, Shape>,
}

impl CacheMaps {
    fn remember(&mut self, id: ShapeId, shape: Shape) {
        self.by_shape.insert(shape, id);
        self.by_id.insert(id, shape);
    }
}

impl<R: ShapeRegistry> CachedRegistry<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            maps: RwLock::new(CacheMaps::default()),
        }
    }

    pub fn inner(&self) -> &R {
        &self.inner
    }

    pub fn cached_len(&self) -> usize {
        self.read().by_id.len()
    }

    fn read(&self) -> RwLockReadGuard<'_, CacheMaps> {
        self.maps.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, CacheMaps> {
        self.maps.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl<R: ShapeRegistry> ShapeRegistry for CachedRegistry<R> {
    fn register(&self, shape: Shape) -> Result<ShapeId> {
        if let Some(&id) = self.read().by_shape.get(&shape) {
            log::debug!("shape {shape} served from cache as id {id}");
            return Ok(id);
        }
        let id = self.inner.register(shape)?;
        self.write().remember(id, shape);
        Ok(id)
    }

    fn lookup_shape(&self, id: ShapeId) -> Result<Option<Shape>> {
        if !id.is_specified() {
            return Ok(None);
        }
        if let Some(&shape) = self.read().by_id.get(&id) {
            return Ok(Some(shape));
        }
        let shape = self.inner.lookup_shape(id)?;
        if let Some(shape) = shape {
            self.write().remember(id, shape);
        }
        Ok(shape)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{CatalogRegistry, MemoryShapeStore, ShapeRecord, ShapeStore};

    #[test]
    fn caches_registrations_and_lookups() {
        let registry = CachedRegistry::new(CatalogRegistry::new(MemoryShapeStore::new()));
        let id = registry.register_shape(60, 5).unwrap();
        assert_eq!(registry.cached_len(), 1);
        assert_eq!(registry.register_shape(60, 5).unwrap(), id);
        assert_eq!(
            registry.lookup_shape(id).unwrap(),
            Some(Shape::new(60, 5).unwrap())
        );
    }

    #[test]
    fn misses_are_not_cached() {
        let registry = CachedRegistry::new(CatalogRegistry::new(MemoryShapeStore::new()));
        let id = ShapeId::new(7);
        assert_eq!(registry.lookup_shape(id).unwrap(), None);

        // Registered behind the cache's back, e.g. by another process.
        let shape = Shape::new(30, 10).unwrap();
        registry
            .inner()
            .store()
            .insert(ShapeRecord { id, shape })
            .unwrap();
        assert_eq!(registry.lookup_shape(id).unwrap(), Some(shape));
    }
}
