//! Round-robin bucket arithmetic.
//!
//! A bucket is identified by its upper boundary. Boundaries are exact
//! multiples of the slice length counted from 2000-01-01 00:00:00 UTC; a
//! timestamp lying on a boundary belongs to the bucket ending there
//! (right-closed, left-open). The sequence number is the bucket's slot
//! within the wrap-around cycle of `bucket_count` buckets and doubles as the
//! storage slot index, so this module must stay bit-for-bit reproducible.

use crate::shape::Shape;
use crate::timestamp::{Timestamp, MICROS_PER_SEC};
use crate::{Error, Result};

/// 2000-01-01 00:00:00 UTC in microseconds since the Unix epoch.
const ALIGNMENT_EPOCH_MICROS: i64 = 946_684_800 * MICROS_PER_SEC;

/// Result of placing a timestamp into a shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bucket {
    /// Upper boundary of the bucket containing the input.
    pub upper: Timestamp,
    /// Slot within the cycle, in `[0, bucket_count)`.
    pub sequence: u32,
}

impl Bucket {
    /// Lower (exclusive) boundary of the bucket.
    pub fn lower(&self, shape: Shape) -> Result<Timestamp> {
        self.upper.checked_add_micros(-shape.slice_micros())
    }
}

/// Place `raw` into its bucket for `shape`.
///
/// # Errors
///
/// - `Error::TimestampOutOfRange`: the bucket boundary is not representable
pub fn apply_shape(raw: Timestamp, shape: Shape) -> Result<Bucket> {
    let slice = i128::from(shape.slice_micros());
    let cycle = shape.cycle_micros();
    let count = i128::from(shape.bucket_count());

    let ts = i128::from(raw.as_micros()) - i128::from(ALIGNMENT_EPOCH_MICROS);
    let rem = ts.rem_euclid(slice);
    let upper = if rem == 0 { ts } else { ts - rem + slice };

    let sequence = upper.rem_euclid(cycle) / slice;
    // Already in range; reduce again so a rounding slip at the wrap can never
    // escape the slot space.
    let sequence = sequence.rem_euclid(count);

    let upper = i64::try_from(upper + i128::from(ALIGNMENT_EPOCH_MICROS))
        .map_err(|_| Error::TimestampOutOfRange)?;
    let sequence = u32::try_from(sequence).map_err(|_| Error::TimestampOutOfRange)?;
    Ok(Bucket {
        upper: Timestamp::from_micros(upper)?,
        sequence,
    })
}
