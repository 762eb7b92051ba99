//! Timelines and the keyframe parser.
//!
//! A `Timeline` maps time labels (`"@0s"`, `"@1.2s"`, `"@350ms"`) to the
//! property set a frame should show at that moment. `parse_timeline`
//! normalizes it into an ordered keyframe list:
//! - offsets are `time / total_duration`, clamped to [0, 1]
//! - a missing start anchor is synthesized as an empty set at offset 0
//! - a last anchor short of 1.0 is stretched to 1.0 (holding its value)
//!
//! # Example
//!
//! ```
//! use rune_motion::property::{PropertyKey, PropertySet};
//! use rune_motion::timeline::{Timeline, parse_timeline};
//!
//! let timeline = Timeline::new()
//!     .at("@0.5s", PropertySet::new().with(PropertyKey::Opacity, 0.5))
//!     .at("@1s", PropertySet::new().with(PropertyKey::Opacity, 1.0));
//!
//! let keyframes = parse_timeline(&timeline, 1000.0);
//! assert_eq!(keyframes.len(), 3);
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::easing::EasingFunction;
use crate::error::{MotionError, Result};
use crate::interpolate::Interpolate;
use crate::property::{PropertyKey, PropertySet};

/// Time-labeled anchors of a multi-step animation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timeline {
    anchors: BTreeMap<String, PropertySet>,
}

impl Timeline {
    /// Create an empty timeline.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add (or replace) the anchor at `label`.
    pub fn at(mut self, label: impl Into<String>, properties: PropertySet) -> Self {
        self.anchors.insert(label.into(), properties);
        self
    }

    pub fn insert(&mut self, label: impl Into<String>, properties: PropertySet) {
        self.anchors.insert(label.into(), properties);
    }

    /// Number of anchors as written, before any start/end synthesis.
    pub fn anchor_count(&self) -> usize {
        self.anchors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.anchors.is_empty()
    }

    /// Iterate over `(label, properties)` pairs in label order.
    pub fn anchors(&self) -> impl Iterator<Item = (&str, &PropertySet)> {
        self.anchors.iter().map(|(label, props)| (label.as_str(), props))
    }

    /// Anchor times in milliseconds. Unparseable labels read as 0.
    pub fn anchor_times(&self) -> Vec<f64> {
        self.anchors.keys().map(|label| time_or_zero(label)).collect()
    }

    /// Latest anchor time in milliseconds.
    pub fn duration_ms(&self) -> f64 {
        self.anchor_times().into_iter().fold(0.0, f64::max)
    }

    /// Returns true if some anchor sits at time 0.
    pub fn has_anchor_at_start(&self) -> bool {
        self.anchor_times().iter().any(|t| *t <= 0.0)
    }

    /// Every property key touched by any anchor, sorted and de-duplicated.
    pub fn touched_keys(&self) -> Vec<PropertyKey> {
        let mut keys: Vec<PropertyKey> = self.anchors.values().flat_map(|p| p.keys()).collect();
        keys.sort();
        keys.dedup();
        keys
    }
}

/// A normalized anchor of a timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Keyframe {
    /// Position in the timeline (0.0 to 1.0).
    pub offset: f32,
    /// Absolute time in milliseconds (`offset * total_duration`).
    pub time_ms: f64,
    /// Target presentation at this offset.
    pub properties: PropertySet,
    /// Source label; `None` for the synthesized start anchor.
    pub label: Option<String>,
}

impl Keyframe {
    /// Create a new keyframe at the given offset.
    pub fn new(offset: f32, total_duration_ms: f64, properties: PropertySet) -> Self {
        let offset = offset.clamp(0.0, 1.0);
        Self {
            offset,
            time_ms: offset as f64 * total_duration_ms.max(0.0),
            properties,
            label: None,
        }
    }
}

/// Parse a time label of the form `@<number>(s|ms)?` into milliseconds.
///
/// The unit defaults to seconds.
pub fn parse_time_label(label: &str) -> Result<f64> {
    let invalid = || MotionError::InvalidTimeLabel(label.to_string());
    let body = label.trim().strip_prefix('@').ok_or_else(invalid)?;

    let (number, scale) = if let Some(n) = body.strip_suffix("ms") {
        (n, 1.0)
    } else if let Some(n) = body.strip_suffix('s') {
        (n, 1000.0)
    } else {
        (body, 1000.0)
    };

    let value: f64 = number.trim().parse().map_err(|_| invalid())?;
    if !value.is_finite() || value < 0.0 {
        return Err(invalid());
    }
    Ok(value * scale)
}

fn time_or_zero(label: &str) -> f64 {
    parse_time_label(label).unwrap_or_else(|err| {
        tracing::warn!(%err, "timeline label reads as 0ms");
        0.0
    })
}

/// Normalize a timeline into ordered keyframes against `total_duration_ms`.
pub fn parse_timeline(timeline: &Timeline, total_duration_ms: f64) -> Vec<Keyframe> {
    let total = total_duration_ms.max(0.0);

    let mut keyframes: Vec<Keyframe> = timeline
        .anchors()
        .map(|(label, properties)| {
            let time = time_or_zero(label);
            let offset = if total > 0.0 {
                (time / total).clamp(0.0, 1.0)
            } else if time > 0.0 {
                1.0
            } else {
                0.0
            };
            Keyframe {
                offset: offset as f32,
                time_ms: offset * total,
                properties: properties.clone(),
                label: Some(label.to_string()),
            }
        })
        .collect();

    keyframes.sort_by(|a, b| {
        a.offset
            .partial_cmp(&b.offset)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    if keyframes.first().is_none_or(|first| first.offset > 0.0) {
        keyframes.insert(0, Keyframe::new(0.0, total, PropertySet::new()));
    }

    // A lone start anchor stays at 0; anything later holds its value to the end.
    if keyframes.len() > 1 {
        if let Some(last) = keyframes.last_mut().filter(|last| last.offset < 1.0) {
            last.offset = 1.0;
            last.time_ms = total;
        }
    }

    keyframes
}

/// Find the keyframes surrounding a given offset.
///
/// Returns (from_keyframe, to_keyframe, local_progress) where local_progress
/// is 0.0-1.0 between the two keyframes.
pub fn find_keyframes(keyframes: &[Keyframe], offset: f32) -> Option<(&Keyframe, &Keyframe, f32)> {
    if keyframes.is_empty() {
        return None;
    }

    let offset = offset.clamp(0.0, 1.0);

    let mut from_idx = 0;
    let mut to_idx = 0;

    for (i, kf) in keyframes.iter().enumerate() {
        if kf.offset <= offset {
            from_idx = i;
        }
        if kf.offset >= offset {
            to_idx = i;
            break;
        }
        to_idx = i;
    }

    let from_kf = &keyframes[from_idx];
    let to_kf = &keyframes[to_idx];

    let local_progress = if from_idx == to_idx {
        0.0
    } else {
        let range = to_kf.offset - from_kf.offset;
        if range > 0.0 {
            (offset - from_kf.offset) / range
        } else {
            0.0
        }
    };

    Some((from_kf, to_kf, local_progress))
}

/// The interpolated property set at `offset` across a keyframe list.
pub fn value_at(
    keyframes: &[Keyframe],
    offset: f32,
    easing: EasingFunction,
) -> Option<PropertySet> {
    let (from_kf, to_kf, local_progress) = find_keyframes(keyframes, offset)?;
    let eased_progress = easing.evaluate(local_progress);
    Some(from_kf.properties.interpolate(&to_kf.properties, eased_progress))
}
