//! Round-robin timeslice values.
//!
//! A timeslice either carries no shape, in which case it is just the raw
//! timestamp, or it carries a shape id and then holds the upper boundary
//! of its bucket plus the bucket's slot in the wrap-around cycle. Values
//! hold only the id; shapes are looked up afresh on every operation that
//! needs them.

use crate::bucket::{apply_shape, Bucket};
use crate::registry::ShapeRegistry;
use crate::shape::{Shape, ShapeId};
use crate::timestamp::{parse_timestamp, Timestamp};
use crate::{Error, Result};

const UNRESOLVED_BOUND: &str = "ERR";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeslice {
    timestamp: Timestamp,
    shape_id: ShapeId,
    sequence: u32,
}

impl Timeslice {
    /// A value with no shape applied.
    pub const fn unsliced(timestamp: Timestamp) -> Self {
        Self {
            timestamp,
            shape_id: ShapeId::UNSPECIFIED,
            sequence: 0,
        }
    }

    /// Bucket `timestamp` with an already resolved shape.
    pub fn with_shape(timestamp: Timestamp, shape_id: ShapeId, shape: Shape) -> Result<Self> {
        if !shape_id.is_specified() {
            return Ok(Self::unsliced(timestamp));
        }
        let bucket = apply_shape(timestamp, shape)?;
        Ok(Self {
            timestamp: bucket.upper,
            shape_id,
            sequence: bucket.sequence,
        })
    }

    /// Build a value from a raw timestamp, bucketing it when `shape_id` is
    /// specified.
    ///
    /// # Errors
    ///
    /// - `Error::UnknownShape`: `shape_id` is not registered
    /// - `Error::TimestampOutOfRange`: the bucket boundary is not representable
    /// - `Error::Storage`: the registry could not be read
    pub fn from_timestamp<R>(timestamp: Timestamp, shape_id: ShapeId, registry: &R) -> Result<Self>
    where
        R: ShapeRegistry + ?Sized,
    {
        if !shape_id.is_specified() {
            return Ok(Self::unsliced(timestamp));
        }
        let shape = registry.resolve(shape_id)?;
        Self::with_shape(timestamp, shape_id, shape)
    }

    /// Parse the textual input form: an absolute timestamp or `epoch`.
    ///
    /// # Errors
    ///
    /// - `Error::InvalidFormat`: the text is not a single timestamp token
    /// - anything [`Timeslice::from_timestamp`] reports
    pub fn parse<R>(text: &str, shape_id: ShapeId, registry: &R) -> Result<Self>
    where
        R: ShapeRegistry + ?Sized,
    {
        let timestamp = parse_timestamp(text)?;
        Self::from_timestamp(timestamp, shape_id, registry)
    }

    /// Apply a shape to a value that has none yet.
    ///
    /// An unspecified `shape_id` leaves the value untouched.
    ///
    /// # Errors
    ///
    /// - `Error::IncompatibleShape`: the value is already sliced
    pub fn rebind<R>(self, shape_id: ShapeId, registry: &R) -> Result<Self>
    where
        R: ShapeRegistry + ?Sized,
    {
        if !shape_id.is_specified() {
            return Ok(self);
        }
        if self.is_sliced() || self.sequence != 0 {
            return Err(Error::IncompatibleShape);
        }
        Self::from_timestamp(self.timestamp, shape_id, registry)
    }

    /// Render the value.
    ///
    /// Unsliced values render as the bare timestamp; sliced values as
    /// `(<lower>, <upper>] #<sequence>/<bucket_count>`. If the shape cannot be
    /// resolved the lower bound renders as `ERR` and the count as `0`.
    ///
    /// # Errors
    ///
    /// - `Error::TimestampOutOfRange`: the lower bound is not representable
    pub fn format<R>(&self, registry: &R) -> Result<String>
    where
        R: ShapeRegistry + ?Sized,
    {
        if !self.is_sliced() {
            return Ok(self.timestamp.to_string());
        }
        let (lower, count) = match registry.lookup_shape(self.shape_id) {
            Ok(Some(shape)) => {
                let bucket = Bucket {
                    upper: self.timestamp,
                    sequence: self.sequence,
                };
                let lower = bucket.lower(shape)?;
                (lower.to_string(), shape.bucket_count())
            }
            Ok(None) => {
                log::warn!("formatting timeslice with unregistered shape id {}", self.shape_id);
                (UNRESOLVED_BOUND.to_string(), 0)
            }
            Err(err) => {
                log::warn!("formatting timeslice without shape {}: {err}", self.shape_id);
                (UNRESOLVED_BOUND.to_string(), 0)
            }
        };
        Ok(format!(
            "({lower}, {}] #{}/{count}",
            self.timestamp, self.sequence
        ))
    }

    /// The bucket's upper boundary, or the raw input for unsliced values.
    pub const fn timestamp(&self) -> Timestamp {
        self.timestamp
    }

    pub const fn shape_id(&self) -> ShapeId {
        self.shape_id
    }

    pub const fn sequence(&self) -> u32 {
        self.sequence
    }

    pub const fn is_sliced(&self) -> bool {
        self.shape_id.is_specified()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{CatalogRegistry, MemoryShapeStore};

    fn registry() -> CatalogRegistry<MemoryShapeStore> {
        CatalogRegistry::new(MemoryShapeStore::new())
    }

    fn ts(seconds: i64) -> Timestamp {
        Timestamp::from_unix_seconds(seconds).unwrap()
    }

    #[test]
    fn unspecified_shape_keeps_raw_timestamp() {
        let registry = registry();
        let value = Timeslice::from_timestamp(ts(601), ShapeId::UNSPECIFIED, &registry).unwrap();
        assert_eq!(value.timestamp(), ts(601));
        assert_eq!(value.sequence(), 0);
        assert!(!value.is_sliced());

        let negative = Timeslice::from_timestamp(ts(601), ShapeId::new(-1), &registry).unwrap();
        assert_eq!(negative, value);
    }

    #[test]
    fn specified_shape_buckets() {
        let registry = registry();
        let id = registry.register_shape(60, 5).unwrap();
        let value = Timeslice::from_timestamp(ts(601), id, &registry).unwrap();
        assert_eq!(value.timestamp(), ts(660));
        assert_eq!(value.sequence(), 1);
        assert_eq!(value.shape_id(), id);
    }

    #[test]
    fn unknown_shape_is_an_error() {
        let registry = registry();
        let err = Timeslice::from_timestamp(ts(0), ShapeId::new(42), &registry).unwrap_err();
        assert!(matches!(err, Error::UnknownShape(id) if id == ShapeId::new(42)));
    }

    #[test]
    fn parse_and_format_sliced() {
        let registry = registry();
        let id = registry.register_shape(60, 5).unwrap();
        let value = Timeslice::parse("2012-05-01 10:00:30+00", id, &registry).unwrap();
        assert_eq!(
            value.format(&registry).unwrap(),
            "(2012-05-01 10:00:00+00, 2012-05-01 10:01:00+00] #1/5"
        );
    }

    #[test]
    fn parse_rejects_bad_text() {
        let registry = registry();
        for text in ["yesterday", "2012-05-01 10:00:00 ", "2012-05-01 10:00:00x"] {
            assert!(matches!(
                Timeslice::parse(text, ShapeId::UNSPECIFIED, &registry),
                Err(Error::InvalidFormat(_))
            ));
        }
    }

    #[test]
    fn format_unsliced_is_bare_timestamp() {
        let registry = registry();
        let value = Timeslice::parse("epoch", ShapeId::UNSPECIFIED, &registry).unwrap();
        assert_eq!(value.format(&registry).unwrap(), "1970-01-01 00:00:00+00");
    }

    #[test]
    fn format_with_unresolvable_shape_is_soft() {
        let registry = registry();
        let id = registry.register_shape(60, 5).unwrap();
        let value = Timeslice::from_timestamp(ts(120), id, &registry).unwrap();

        let empty = self::registry();
        assert_eq!(
            value.format(&empty).unwrap(),
            "(ERR, 1970-01-01 00:02:00+00] #2/0"
        );
    }

    #[test]
    fn format_fails_when_lower_bound_underflows() {
        let shape = Shape::new(86_400, 2).unwrap();
        let registry = registry();
        let id = registry.register(shape).unwrap();
        let value = Timeslice::with_shape(Timestamp::MIN, id, shape).unwrap();
        assert!(matches!(value.format(&registry), Err(Error::TimestampOutOfRange)));
    }

    #[test]
    fn rebind_only_applies_to_unsliced_values() {
        let registry = registry();
        let id = registry.register_shape(60, 5).unwrap();
        let raw = Timeslice::unsliced(ts(601));

        let rebound = raw.rebind(id, &registry).unwrap();
        assert_eq!(rebound, Timeslice::from_timestamp(ts(601), id, &registry).unwrap());

        assert!(matches!(rebound.rebind(id, &registry), Err(Error::IncompatibleShape)));
        let other = registry.register_shape(30, 10).unwrap();
        assert!(matches!(rebound.rebind(other, &registry), Err(Error::IncompatibleShape)));

        assert_eq!(rebound.rebind(ShapeId::UNSPECIFIED, &registry).unwrap(), rebound);
    }
}
