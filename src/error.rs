use thiserror::Error;

use crate::shape::ShapeId;

/// Failures reported by the shape store backing a registry.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The insert lost against a record with the same shape or id.
    #[error("uniqueness conflict on {0}")]
    Conflict(&'static str),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("corrupt catalog: {0}")]
    Corrupt(String),
    #[error("catalog serialization: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
    #[error("invalid input syntax: {0:?}")]
    InvalidFormat(String),
    #[error("timestamp out of range")]
    TimestampOutOfRange,
    #[error("unknown shape id {0}")]
    UnknownShape(ShapeId),
    #[error("cannot change the shape of an already-sliced value")]
    IncompatibleShape,
    #[error("cannot compare timeslices with different shapes ({left} vs {right})")]
    IncomparableShapes { left: ShapeId, right: ShapeId },
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("storage failure: {0}")]
    Storage(#[from] StoreError),
}

pub type Result<T> = std::result::Result<T, Error>;
