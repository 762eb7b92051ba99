//! Interpolation between property sets.
//!
//! This module provides the `Interpolate` trait and the leaf rules used to
//! blend two sparse property sets:
//! - numbers blend linearly
//! - dimensions blend their numeric part and keep the start value's unit
//! - colors blend per channel
//! - anything else switches from start to end at the eased midpoint
//! - a leaf present on only one side passes through unchanged

use crate::easing::EasingFunction;
use crate::property::{PropertySet, PropertyValue};

/// Trait for types that can be interpolated between two values.
///
/// `t` is already eased: 0.0 yields `self`, 1.0 yields `to`.
pub trait Interpolate: Sized {
    fn interpolate(&self, to: &Self, t: f32) -> Self;
}

#[inline]
fn lerp_f64(from: f64, to: f64, t: f32) -> f64 {
    from + (to - from) * t as f64
}

#[inline]
fn lerp_f32(from: f32, to: f32, t: f32) -> f32 {
    from + (to - from) * t
}

impl Interpolate for f64 {
    fn interpolate(&self, to: &Self, t: f32) -> Self {
        lerp_f64(*self, *to, t)
    }
}

impl Interpolate for f32 {
    fn interpolate(&self, to: &Self, t: f32) -> Self {
        lerp_f32(*self, *to, t)
    }
}

impl Interpolate for [f32; 4] {
    /// Per-channel RGBA interpolation.
    fn interpolate(&self, to: &Self, t: f32) -> Self {
        [
            lerp_f32(self[0], to[0], t),
            lerp_f32(self[1], to[1], t),
            lerp_f32(self[2], to[2], t),
            lerp_f32(self[3], to[3], t),
        ]
    }
}

impl Interpolate for PropertyValue {
    fn interpolate(&self, to: &Self, t: f32) -> Self {
        match (self, to) {
            (Self::Number(from), Self::Number(to_val)) => Self::Number(from.interpolate(to_val, t)),
            (
                Self::Dimension { value: from, unit },
                Self::Dimension { value: to_val, .. },
            ) => Self::Dimension {
                value: from.interpolate(to_val, t),
                unit: unit.clone(),
            },
            (Self::Color(from), Self::Color(to_val)) => Self::Color(from.interpolate(to_val, t)),
            // Not blendable: hard switch at the midpoint.
            _ => {
                if t < 0.5 {
                    self.clone()
                } else {
                    to.clone()
                }
            }
        }
    }
}

/// Interpolate an optional leaf.
///
/// Present on both sides blends; present on one side passes that value
/// through at every `t`; absent on both stays absent.
pub fn interpolate_leaf<T: Interpolate + Clone>(
    from: &Option<T>,
    to: &Option<T>,
    t: f32,
) -> Option<T> {
    match (from, to) {
        (Some(f), Some(t_val)) => Some(f.interpolate(t_val, t)),
        (Some(only), None) | (None, Some(only)) => Some(only.clone()),
        (None, None) => None,
    }
}

/// Blend two property sets at `progress` shaped by `easing`.
pub fn interpolate(
    start: &PropertySet,
    end: &PropertySet,
    progress: f32,
    easing: EasingFunction,
) -> PropertySet {
    let eased = easing.evaluate(progress);
    start.interpolate(end, eased)
}

/// Sample `steps + 1` evenly spaced frames from `start` to `end`, inclusive.
///
/// `steps == 0` yields the end set only.
pub fn sample_frames(
    start: &PropertySet,
    end: &PropertySet,
    steps: usize,
    easing: EasingFunction,
) -> Vec<PropertySet> {
    if steps == 0 {
        return vec![interpolate(start, end, 1.0, easing)];
    }
    (0..=steps)
        .map(|i| interpolate(start, end, i as f32 / steps as f32, easing))
        .collect()
}
