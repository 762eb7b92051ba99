//! Error types for the motion core.
//!
//! Dispatch and playback never surface these: unknown frames, guard
//! mismatches and malformed timeline labels degrade to no-ops. They are
//! returned by the parsing helpers those paths are built on.

use thiserror::Error;

/// Result type for motion operations.
pub type Result<T> = std::result::Result<T, MotionError>;

/// Errors produced by the motion parsing helpers.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MotionError {
    /// A timeline anchor label was not of the form `@<number>(s|ms)?`.
    #[error("invalid time label `{0}`")]
    InvalidTimeLabel(String),

    /// An easing name did not match a known curve.
    #[error("unknown easing `{0}`")]
    UnknownEasing(String),

    /// Cubic bezier x control points must lie in [0, 1].
    #[error("bezier x values must be in [0, 1], got ({x1}, {x2})")]
    InvalidBezier { x1: f32, x2: f32 },

    /// Stepped easing needs at least one step.
    #[error("steps must be at least 1")]
    InvalidSteps,

    /// A property value string could not be parsed.
    #[error("invalid property value `{0}`")]
    InvalidPropertyValue(String),

    /// A color string was not `#rgb`, `#rrggbb` or `#rrggbbaa`.
    #[error("invalid color `{0}`")]
    InvalidColor(String),

    /// A variant catalog document could not be decoded.
    #[error("invalid variant catalog: {0}")]
    InvalidCatalog(String),
}
