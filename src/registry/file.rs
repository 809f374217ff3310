//! File-backed shape catalog.
//!
//! Layout under the catalog directory:
//!
//! - `shapes.json`: versioned list of `{id, shape}` records
//! - `shapes.seq`: last id handed out by the sequence
//! - `shapes.lock`: `flock` target serializing writers across processes
//!
//! Every write goes to a temporary file that is synced and renamed over
//! the original, so readers never observe a torn catalog.

use std::collections::HashSet;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::registry::lock::{CatalogLock, LockMode};
use crate::registry::{ShapeRecord, ShapeStore};
use crate::shape::{Shape, ShapeId};

const CATALOG_VERSION: u32 = 1;
const CATALOG_FILENAME: &str = "shapes.json";
const SEQUENCE_FILENAME: &str = "shapes.seq";
const LOCK_FILENAME: &str = "shapes.lock";

#[derive(Debug, Serialize, Deserialize)]
struct CatalogFile {
    version: u32,
    shapes: Vec<ShapeRecord>,
}

impl Default for CatalogFile {
    fn default() -> Self {
        Self {
            version: CATALOG_VERSION,
            shapes: Vec::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct FileShapeStore {
    dir: PathBuf,
}

impl FileShapeStore {
    /// Open (creating if needed) the catalog in `dir`.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// All records, ordered by id.
    pub fn records(&self) -> Result<Vec<ShapeRecord>, StoreError> {
        let _lock = self.lock(LockMode::Shared)?;
        let mut shapes = self.load()?.shapes;
        shapes.sort_by_key(|record| record.id);
        Ok(shapes)
    }

    fn lock(&self, mode: LockMode) -> Result<CatalogLock, StoreError> {
        Ok(CatalogLock::acquire(&self.dir.join(LOCK_FILENAME), mode)?)
    }

    fn load(&self) -> Result<CatalogFile, StoreError> {
        let path = self.dir.join(CATALOG_FILENAME);
        if !path.exists() {
            return Ok(CatalogFile::default());
        }
        let json = fs::read_to_string(&path)?;
        let catalog: CatalogFile = serde_json::from_str(&json)?;
        if catalog.version != CATALOG_VERSION {
            return Err(StoreError::Corrupt(format!(
                "unsupported catalog version {}",
                catalog.version
            )));
        }
        let mut ids = HashSet::new();
        let mut shapes = HashSet::new();
        for record in &catalog.shapes {
            if !record.id.is_specified() {
                return Err(StoreError::Corrupt(format!("invalid shape id {}", record.id)));
            }
            if !ids.insert(record.id) || !shapes.insert(record.shape) {
                return Err(StoreError::Corrupt(format!(
                    "duplicate record for id {} / shape {}",
                    record.id, record.shape
                )));
            }
        }
        Ok(catalog)
    }

    fn save(&self, catalog: &CatalogFile) -> Result<(), StoreError> {
        let data = serde_json::to_vec_pretty(catalog)?;
        write_atomic(&self.dir.join(CATALOG_FILENAME), &data)
    }

    fn load_sequence(&self) -> Result<i32, StoreError> {
        let path = self.dir.join(SEQUENCE_FILENAME);
        if !path.exists() {
            return Ok(0);
        }
        let text = fs::read_to_string(&path)?;
        text.trim()
            .parse::<i32>()
            .map_err(|_| StoreError::Corrupt(format!("invalid sequence value {:?}", text.trim())))
    }
}

impl ShapeStore for FileShapeStore {
    fn find_by_shape(&self, shape: Shape) -> Result<Option<ShapeId>, StoreError> {
        let _lock = self.lock(LockMode::Shared)?;
        Ok(self
            .load()?
            .shapes
            .iter()
            .find(|record| record.shape == shape)
            .map(|record| record.id))
    }

    fn next_id(&self) -> Result<ShapeId, StoreError> {
        let _lock = self.lock(LockMode::Exclusive)?;
        let next = self
            .load_sequence()?
            .checked_add(1)
            .ok_or_else(|| StoreError::Corrupt("shape id sequence exhausted".to_string()))?;
        write_atomic(&self.dir.join(SEQUENCE_FILENAME), format!("{next}\n").as_bytes())?;
        Ok(ShapeId::new(next))
    }

    fn insert(&self, record: ShapeRecord) -> Result<(), StoreError> {
        let _lock = self.lock(LockMode::Exclusive)?;
        let mut catalog = self.load()?;
        if catalog.shapes.iter().any(|r| r.id == record.id) {
            return Err(StoreError::Conflict("id"));
        }
        if catalog.shapes.iter().any(|r| r.shape == record.shape) {
            return Err(StoreError::Conflict("shape"));
        }
        catalog.shapes.push(record);
        self.save(&catalog)?;
        log::debug!(
            "catalog {} now holds {} shapes",
            self.dir.display(),
            catalog.shapes.len()
        );
        Ok(())
    }

    fn find_by_id(&self, id: ShapeId) -> Result<Option<Shape>, StoreError> {
        let _lock = self.lock(LockMode::Shared)?;
        Ok(self
            .load()?
            .shapes
            .iter()
            .find(|record| record.id == id)
            .map(|record| record.shape))
    }
}

fn write_atomic(path: &Path, data: &[u8]) -> Result<(), StoreError> {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    let mut file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(&tmp)?;
    file.write_all(data)?;
    file.sync_all()?;
    fs::rename(tmp, path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn shape(len: i32, count: i32) -> Shape {
        Shape::new(len, count).unwrap()
    }

    #[test]
    fn empty_catalog_has_no_records() {
        let dir = TempDir::new().unwrap();
        let store = FileShapeStore::open(dir.path()).unwrap();
        assert_eq!(store.find_by_shape(shape(60, 5)).unwrap(), None);
        assert_eq!(store.find_by_id(ShapeId::new(1)).unwrap(), None);
        assert!(store.records().unwrap().is_empty());
    }

    #[test]
    fn records_survive_reopen() {
        let dir = TempDir::new().unwrap();
        let store = FileShapeStore::open(dir.path()).unwrap();
        let id = store.next_id().unwrap();
        store.insert(ShapeRecord { id, shape: shape(60, 5) }).unwrap();
        drop(store);

        let reopened = FileShapeStore::open(dir.path()).unwrap();
        assert_eq!(reopened.find_by_shape(shape(60, 5)).unwrap(), Some(id));
        assert_eq!(reopened.find_by_id(id).unwrap(), Some(shape(60, 5)));
        assert!(reopened.next_id().unwrap() > id);
    }

    #[test]
    fn insert_enforces_uniqueness() {
        let dir = TempDir::new().unwrap();
        let store = FileShapeStore::open(dir.path()).unwrap();
        let id = store.next_id().unwrap();
        store.insert(ShapeRecord { id, shape: shape(60, 5) }).unwrap();

        let next = store.next_id().unwrap();
        assert!(matches!(
            store.insert(ShapeRecord { id: next, shape: shape(60, 5) }),
            Err(StoreError::Conflict("shape"))
        ));
        assert!(matches!(
            store.insert(ShapeRecord { id, shape: shape(30, 10) }),
            Err(StoreError::Conflict("id"))
        ));
        assert_eq!(store.records().unwrap().len(), 1);
    }

    #[test]
    fn corrupt_catalog_is_reported() {
        let dir = TempDir::new().unwrap();
        let store = FileShapeStore::open(dir.path()).unwrap();
        fs::write(
            dir.path().join(CATALOG_FILENAME),
            r#"{"version":1,"shapes":[{"id":1,"shape":{"slice_len":0,"bucket_count":5}}]}"#,
        )
        .unwrap();
        assert!(matches!(
            store.find_by_id(ShapeId::new(1)),
            Err(StoreError::Serialization(_))
        ));

        fs::write(dir.path().join(CATALOG_FILENAME), r#"{"version":9,"shapes":[]}"#).unwrap();
        assert!(matches!(
            store.find_by_id(ShapeId::new(1)),
            Err(StoreError::Corrupt(_))
        ));
    }
}
