//! FaceLink Transport Layer - UDP link to the capture app
//!
//! This crate provides:
//! - The UDP receiver and its background receive loop
//! - The connection handshake state machine
//! - Backoff recovery after socket failures

pub mod udp;

pub use udp::*;
