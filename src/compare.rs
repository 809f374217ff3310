//! Ordering of timeslices.
//!
//! Two orderings exist. The absolute ordering follows the timestamps and
//! additionally reports whether both values share a slot. The sequence
//! ordering looks at the slot only, which groups values by storage slot
//! regardless of cycle. Both first unify the operands: a value without a
//! shape takes the shape of the other side; two different shapes cannot be
//! compared. Missing values (`None`) sort before everything else.

use std::cmp::Ordering;

use crate::registry::ShapeRegistry;
use crate::timeslice::Timeslice;
use crate::{Error, Result};

/// Presence of the two operands of a comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NullOrder {
    BothNull,
    LeftNull,
    RightNull,
    NeitherNull,
}

impl NullOrder {
    pub fn of<T>(left: Option<&T>, right: Option<&T>) -> Self {
        match (left, right) {
            (None, None) => NullOrder::BothNull,
            (None, Some(_)) => NullOrder::LeftNull,
            (Some(_), None) => NullOrder::RightNull,
            (Some(_), Some(_)) => NullOrder::NeitherNull,
        }
    }

    /// Nulls-sort-low ordering, or `None` when both sides are present.
    pub fn ordering(self) -> Option<Ordering> {
        match self {
            NullOrder::BothNull => Some(Ordering::Equal),
            NullOrder::LeftNull => Some(Ordering::Less),
            NullOrder::RightNull => Some(Ordering::Greater),
            NullOrder::NeitherNull => None,
        }
    }
}

/// How far apart two unequal timeslices are.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Distance {
    /// Same slot, different cycle.
    SameSequence,
    /// Different slots.
    OtherSequence,
    /// One side is missing.
    Null,
}

/// Result of the absolute comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SliceOrdering {
    Less(Distance),
    Equal,
    Greater(Distance),
}

impl SliceOrdering {
    /// Integer code: `0` for equal, `±1` for same slot or a null side, `±2`
    /// for different slots. Only the sign is meant to be relied upon.
    pub fn code(self) -> i32 {
        let magnitude = |distance| match distance {
            Distance::SameSequence | Distance::Null => 1,
            Distance::OtherSequence => 2,
        };
        match self {
            SliceOrdering::Less(distance) => -magnitude(distance),
            SliceOrdering::Equal => 0,
            SliceOrdering::Greater(distance) => magnitude(distance),
        }
    }

    pub fn ordering(self) -> Ordering {
        match self {
            SliceOrdering::Less(_) => Ordering::Less,
            SliceOrdering::Equal => Ordering::Equal,
            SliceOrdering::Greater(_) => Ordering::Greater,
        }
    }
}

impl From<SliceOrdering> for Ordering {
    fn from(value: SliceOrdering) -> Self {
        value.ordering()
    }
}

/// Give a shape-less operand the shape of the other one.
///
/// Only the shape-less side is modified.
///
/// # Errors
///
/// - `Error::IncomparableShapes`: both sides carry different shapes
/// - `Error::UnknownShape`: the shape to propagate is not registered
pub fn unify<R>(left: &mut Timeslice, right: &mut Timeslice, registry: &R) -> Result<()>
where
    R: ShapeRegistry + ?Sized,
{
    match (left.is_sliced(), right.is_sliced()) {
        (false, false) => Ok(()),
        (true, false) => {
            *right = Timeslice::from_timestamp(right.timestamp(), left.shape_id(), registry)?;
            Ok(())
        }
        (false, true) => {
            *left = Timeslice::from_timestamp(left.timestamp(), right.shape_id(), registry)?;
            Ok(())
        }
        (true, true) if left.shape_id() == right.shape_id() => Ok(()),
        (true, true) => Err(Error::IncomparableShapes {
            left: left.shape_id(),
            right: right.shape_id(),
        }),
    }
}

fn unified<R>(
    left: &Timeslice,
    right: &Timeslice,
    registry: &R,
) -> Result<(Timeslice, Timeslice)>
where
    R: ShapeRegistry + ?Sized,
{
    let (mut left, mut right) = (*left, *right);
    unify(&mut left, &mut right, registry)?;
    Ok((left, right))
}

/// Absolute (chronological) comparison.
pub fn compare<R>(
    left: Option<&Timeslice>,
    right: Option<&Timeslice>,
    registry: &R,
) -> Result<SliceOrdering>
where
    R: ShapeRegistry + ?Sized,
{
    let (left, right) = match (left, right) {
        (Some(left), Some(right)) => unified(left, right, registry)?,
        (left, right) => {
            return Ok(match NullOrder::of(left, right).ordering() {
                Some(Ordering::Less) => SliceOrdering::Less(Distance::Null),
                Some(Ordering::Greater) => SliceOrdering::Greater(Distance::Null),
                _ => SliceOrdering::Equal,
            })
        }
    };

    let distance = if left.sequence() == right.sequence() {
        Distance::SameSequence
    } else {
        Distance::OtherSequence
    };
    Ok(match left.timestamp().cmp(&right.timestamp()) {
        Ordering::Equal => SliceOrdering::Equal,
        Ordering::Less => SliceOrdering::Less(distance),
        Ordering::Greater => SliceOrdering::Greater(distance),
    })
}

/// Slot-only comparison. Values in different cycles but the same slot are
/// equal.
pub fn compare_sequence<R>(
    left: Option<&Timeslice>,
    right: Option<&Timeslice>,
    registry: &R,
) -> Result<Ordering>
where
    R: ShapeRegistry + ?Sized,
{
    match (left, right) {
        (Some(left), Some(right)) => {
            let (left, right) = unified(left, right, registry)?;
            Ok(left.sequence().cmp(&right.sequence()))
        }
        (left, right) => Ok(NullOrder::of(left, right)
            .ordering()
            .unwrap_or(Ordering::Equal)),
    }
}

macro_rules! sequence_predicates {
    ($($(#[$doc:meta])* $name:ident => $test:expr;)*) => {
        $(
            $(#[$doc])*
            pub fn $name<R>(
                left: Option<&Timeslice>,
                right: Option<&Timeslice>,
                registry: &R,
            ) -> Result<bool>
            where
                R: ShapeRegistry + ?Sized,
            {
                let test: fn(Ordering) -> bool = $test;
                compare_sequence(left, right, registry).map(test)
            }
        )*
    };
}

sequence_predicates! {
    /// Same slot.
    sequence_eq => Ordering::is_eq;
    sequence_ne => Ordering::is_ne;
    sequence_lt => Ordering::is_lt;
    sequence_le => Ordering::is_le;
    sequence_gt => Ordering::is_gt;
    sequence_ge => Ordering::is_ge;
}

/// Hash of the slot number alone, consistent with [`sequence_eq`] for
/// values that share a shape.
pub fn hash_sequence(value: &Timeslice) -> u32 {
    crc32fast::hash(&value.sequence().to_le_bytes())
}

/// Hashable grouping key for slot-based aggregation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct SequenceKey(u32);

impl SequenceKey {
    /// Key of `value` once unified with `reference`, so that shape-less
    /// values land in the reference's slots.
    pub fn unified<R>(value: &Timeslice, reference: &Timeslice, registry: &R) -> Result<Self>
    where
        R: ShapeRegistry + ?Sized,
    {
        let (value, _) = unified(value, reference, registry)?;
        Ok(Self(value.sequence()))
    }

    pub fn sequence(self) -> u32 {
        self.0
    }
}

impl From<&Timeslice> for SequenceKey {
    fn from(value: &Timeslice) -> Self {
        Self(value.sequence())
    }
}

impl std::hash::Hash for SequenceKey {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        state.write_u32(crc32fast::hash(&self.0.to_le_bytes()));
    }
}
