//! parley-core — shared codec, wire framing, config, and credential store.
//! All other Parley crates depend on this one.

pub mod cipher;
pub mod config;
pub mod credentials;
pub mod frame;

pub use frame::{Frame, FrameError, FrameReader};
