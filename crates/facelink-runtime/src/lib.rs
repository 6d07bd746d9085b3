//! FaceLink Runtime - frame hand-off and dispatch
//!
//! This crate provides:
//! - The single-producer/single-consumer hand-off queue
//! - The subscriber dispatcher with per-callback failure isolation
//! - The service facade tying receiver, queue, and dispatch tick
//!   together

pub mod dispatch;
pub mod queue;
pub mod service;

pub use dispatch::*;
pub use queue::*;
pub use service::*;
