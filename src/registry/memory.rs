use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};

use crate::error::StoreError;
use crate::registry::{ShapeRecord, ShapeStore};
use crate::shape::{Shape, ShapeId};

/// Process-local shape store. Enforces the same uniqueness constraints as a
/// persistent catalog, which makes it a faithful stand-in for tests.
#[derive(Debug, Default)]
pub struct MemoryShapeStore {
    state: Mutex<MemoryState>,
}

#[derive(Debug, Default)]
struct MemoryState {
    by_id: BTreeMap<ShapeId, Shape>,
    by_shape: HashMap<Shape, ShapeId>,
    last_id: i32,
}

impl MemoryShapeStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.state().by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn records(&self) -> Vec<ShapeRecord> {
        self.state()
            .by_id
            .iter()
            .map(|(&id, &shape)| ShapeRecord { id, shape })
            .collect()
    }

    fn state(&self) -> MutexGuard<'_, MemoryState> {
        // Every mutation completes before the guard drops, so a poisoned
        // lock still holds consistent maps.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl ShapeStore for MemoryShapeStore {
    fn find_by_shape(&self, shape: Shape) -> Result<Option<ShapeId>, StoreError> {
        Ok(self.state().by_shape.get(&shape).copied())
    }

    fn next_id(&self) -> Result<ShapeId, StoreError> {
        let mut state = self.state();
        state.last_id = state
            .last_id
            .checked_add(1)
            .ok_or_else(|| StoreError::Corrupt("shape id sequence exhausted".to_string()))?;
        Ok(ShapeId::new(state.last_id))
    }

    fn insert(&self, record: ShapeRecord) -> Result<(), StoreError> {
        let mut state = self.state();
        if state.by_id.contains_key(&record.id) {
            return Err(StoreError::Conflict("id"));
        }
        if state.by_shape.contains_key(&record.shape) {
            return Err(StoreError::Conflict("shape"));
        }
        state.by_id.insert(record.id, record.shape);
        state.by_shape.insert(record.shape, record.id);
        Ok(())
    }

    fn find_by_id(&self, id: ShapeId) -> Result<Option<Shape>, StoreError> {
        Ok(self.state().by_id.get(&id).copied())
    }
}
