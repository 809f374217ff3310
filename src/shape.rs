//! Bucket shapes and their registry identifiers.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::registry::ShapeRegistry;
use crate::timestamp::{format_interval, MICROS_PER_SEC};
use crate::{Error, Result};

/// Registry identifier of a [`Shape`]. Zero or negative means "no shape".
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ShapeId(i32);

impl ShapeId {
    pub const UNSPECIFIED: ShapeId = ShapeId(0);

    pub const fn new(raw: i32) -> Self {
        Self(raw)
    }

    pub const fn get(self) -> i32 {
        self.0
    }

    pub const fn is_specified(self) -> bool {
        self.0 > 0
    }
}

impl fmt::Display for ShapeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A round-robin bucketing scheme: `bucket_count` slices of
/// `slice_len` seconds each, repeating forever.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawShape", into = "RawShape")]
pub struct Shape {
    slice_len: i32,
    bucket_count: i32,
}

#[derive(Serialize, Deserialize)]
struct RawShape {
    slice_len: i32,
    bucket_count: i32,
}

impl TryFrom<RawShape> for Shape {
    type Error = Error;

    fn try_from(raw: RawShape) -> Result<Self> {
        Shape::new(raw.slice_len, raw.bucket_count)
    }
}

impl From<Shape> for RawShape {
    fn from(shape: Shape) -> Self {
        Self {
            slice_len: shape.slice_len,
            bucket_count: shape.bucket_count,
        }
    }
}

impl Shape {
    /// # Errors
    ///
    /// - `Error::InvalidArgument`: either field is zero or negative
    pub fn new(slice_len: i32, bucket_count: i32) -> Result<Self> {
        if slice_len <= 0 || bucket_count <= 0 {
            return Err(Error::InvalidArgument(format!(
                "shape ({slice_len}, {bucket_count}): length/count must be greater than zero"
            )));
        }
        Ok(Self {
            slice_len,
            bucket_count,
        })
    }

    /// Slice length in seconds.
    pub const fn slice_len(self) -> i32 {
        self.slice_len
    }

    pub const fn bucket_count(self) -> i32 {
        self.bucket_count
    }

    pub fn slice_micros(self) -> i64 {
        i64::from(self.slice_len) * MICROS_PER_SEC
    }

    /// Length of one full wrap-around, in microseconds. Can exceed `i64`.
    pub fn cycle_micros(self) -> i128 {
        i128::from(self.slice_micros()) * i128::from(self.bucket_count)
    }

    /// The slice length rendered as an interval, e.g. `00:05:00`.
    pub fn slice_interval(self) -> String {
        format_interval(i64::from(self.slice_len))
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.slice_len, self.bucket_count)
    }
}

/// Parse a shape descriptor literal: `[slice_len_seconds, bucket_count]`.
///
/// # Errors
///
/// - `Error::InvalidParameter`: not a two-element list of positive integers
pub fn parse_descriptor(text: &str) -> Result<Shape> {
    let invalid = |why: &str| {
        Error::InvalidParameter(format!(
            "invalid shape descriptor {text:?}: {why} (usage: [<slice_len>, <num>])"
        ))
    };
    let inner = text
        .trim()
        .strip_prefix('[')
        .and_then(|rest| rest.strip_suffix(']'))
        .ok_or_else(|| invalid("expected a bracketed list"))?;
    let elems = inner
        .split(',')
        .map(|elem| elem.trim().parse::<i32>())
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|_| invalid("elements must be integers"))?;
    let [slice_len, bucket_count] = elems[..] else {
        return Err(invalid("expected exactly two elements"));
    };
    Shape::new(slice_len, bucket_count).map_err(|_| invalid("elements must be greater than zero"))
}

/// Register the shape named by a descriptor literal and return its id.
pub fn register_descriptor<R>(registry: &R, text: &str) -> Result<ShapeId>
where
    R: ShapeRegistry + ?Sized,
{
    let shape = parse_descriptor(text)?;
    registry.register(shape)
}

/// Text form of a shape modifier: `(len, count)` when the id resolves,
/// nothing for an unspecified id, `(#ERR, #ERR)` when resolution fails.
pub fn modifier_text<R>(registry: &R, id: ShapeId) -> String
where
    R: ShapeRegistry + ?Sized,
{
    match registry.lookup_shape(id) {
        Ok(Some(shape)) => shape.to_string(),
        Ok(None) if !id.is_specified() => String::new(),
        Ok(None) => {
            log::warn!("shape id {id} is not registered");
            "(#ERR, #ERR)".to_string()
        }
        Err(err) => {
            log::warn!("failed to resolve shape id {id}: {err}");
            "(#ERR, #ERR)".to_string()
        }
    }
}
