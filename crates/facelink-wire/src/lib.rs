//! FaceLink Wire - iFacialMocap text wire format
//!
//! Inbound datagrams are delimited ASCII text:
//! `<blendshape-section>=<transform-section>`, with `|`-separated
//! entries, `-`-separated blendshape tuples, and `#`-separated bone
//! vector groups.

pub mod codec;

pub use codec::*;
