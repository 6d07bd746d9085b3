//! FaceLink Core - Fundamental types and primitives
//!
//! This crate defines the core types used throughout FaceLink:
//! - The motion data model (Frame, Pose, Blendshape)
//! - The error taxonomy
//! - The FrameSink seam between the network producer and its consumer

pub mod error;
pub mod motion;
pub mod sink;

pub use error::*;
pub use motion::*;
pub use sink::*;
