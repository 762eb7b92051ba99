//! Rune frames: variant transitions and timeline animation for Rune Draw frames.
//!
//! Re-exports the motion core and its configuration crate so applications can
//! depend on a single package.

pub use rune_config as config;
pub use rune_motion::*;
