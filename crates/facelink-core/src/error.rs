//! Error types for FaceLink

use thiserror::Error;

/// Core FaceLink errors
#[derive(Error, Debug)]
pub enum FaceLinkError {
    // Decode errors
    #[error("malformed packet: expected exactly one '=' separator")]
    MalformedPacket,

    #[error("malformed blendshape entry: {0:?}")]
    MalformedBlendshape(String),

    #[error("malformed vector payload: {0} components is not a multiple of 3")]
    MalformedVector(usize),

    #[error("invalid number: {0:?}")]
    InvalidNumber(String),

    #[error("unexpected extra vector group in transform payload")]
    UnexpectedExtraVector,

    // Transport errors
    #[error("transport error: {0}")]
    Transport(String),
}

/// Result type for FaceLink operations
pub type FaceLinkResult<T> = Result<T, FaceLinkError>;
