//! Change notifications emitted by the registry and animation sessions.
//!
//! The registry records every variant change as a `VariantChange`; sessions
//! record playback lifecycle as `SessionEvent`. Both are collected in an
//! `EventQueue` and polled by the host after dispatching or ticking.
//!
//! # Usage
//!
//! ```
//! use rune_motion::registry::TransitionRegistry;
//! use rune_motion::rule::{EventKind, TransitionRule};
//!
//! let mut registry = TransitionRegistry::new();
//! registry.register_frame("card", "idle");
//! registry.register_transitions([TransitionRule::on(EventKind::Click)
//!     .source("card")
//!     .to("open")
//!     .shared()]);
//!
//! registry.emit("card", EventKind::Click);
//! for change in registry.drain_changes() {
//!     println!("{} -> {:?}", change.frame_id, change.current);
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use crate::rule::TransitionTiming;
use crate::session::PlaybackId;
use crate::strategy::AnimationStrategy;

/// Which half of a frame's state changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VariantLayer {
    /// The durable variant set by non-hover events.
    Logical,
    /// The transient hover overlay.
    Visual,
}

/// A frame moved from one variant to another.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariantChange {
    pub frame_id: String,
    pub layer: VariantLayer,
    /// `None` on the visual layer means no overlay was set.
    pub previous: Option<String>,
    /// `None` on the visual layer means the overlay was cleared.
    pub current: Option<String>,
    /// Renderer hints from the rule that caused the change.
    pub timing: TransitionTiming,
}

impl VariantChange {
    pub fn logical(
        frame_id: &str,
        previous: &str,
        current: &str,
        timing: TransitionTiming,
    ) -> Self {
        Self {
            frame_id: frame_id.to_string(),
            layer: VariantLayer::Logical,
            previous: Some(previous.to_string()),
            current: Some(current.to_string()),
            timing,
        }
    }

    pub fn visual(
        frame_id: &str,
        previous: Option<String>,
        current: Option<String>,
        timing: TransitionTiming,
    ) -> Self {
        Self {
            frame_id: frame_id.to_string(),
            layer: VariantLayer::Visual,
            previous,
            current,
            timing,
        }
    }

    pub fn is_logical(&self) -> bool {
        self.layer == VariantLayer::Logical
    }
}

/// Lifecycle of a timeline playback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    /// The start delay elapsed and the first styles were committed.
    Started {
        playback: PlaybackId,
        trigger: String,
        target: String,
        strategy: AnimationStrategy,
    },
    /// A keyframe (or manual sample) was committed.
    KeyframeApplied {
        playback: PlaybackId,
        target: String,
        index: usize,
    },
    /// Playback finished. `recovered` is set when the fallback deadline
    /// fired instead of a transition-end notification.
    Completed {
        playback: PlaybackId,
        trigger: String,
        target: String,
        recovered: bool,
    },
    /// Playback was torn down before finishing.
    Cancelled { playback: PlaybackId, target: String },
}

impl SessionEvent {
    pub fn playback(&self) -> PlaybackId {
        match self {
            Self::Started { playback, .. }
            | Self::KeyframeApplied { playback, .. }
            | Self::Completed { playback, .. }
            | Self::Cancelled { playback, .. } => *playback,
        }
    }

    pub fn target(&self) -> &str {
        match self {
            Self::Started { target, .. }
            | Self::KeyframeApplied { target, .. }
            | Self::Completed { target, .. }
            | Self::Cancelled { target, .. } => target,
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed { .. })
    }
}

/// Events that carry the id of the frame they concern.
pub trait FrameEvent {
    fn frame_id(&self) -> &str;
}

impl FrameEvent for VariantChange {
    fn frame_id(&self) -> &str {
        &self.frame_id
    }
}

impl FrameEvent for SessionEvent {
    fn frame_id(&self) -> &str {
        self.target()
    }
}

/// FIFO queue for collecting events between polls.
#[derive(Debug)]
pub struct EventQueue<E> {
    events: VecDeque<E>,
}

impl<E> Default for EventQueue<E> {
    fn default() -> Self {
        Self {
            events: VecDeque::new(),
        }
    }
}

impl<E> EventQueue<E> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, event: E) {
        self.events.push_back(event);
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn pop(&mut self) -> Option<E> {
        self.events.pop_front()
    }

    /// Drain all events in arrival order.
    pub fn drain(&mut self) -> impl Iterator<Item = E> + '_ {
        self.events.drain(..)
    }

    pub fn peek(&self) -> Option<&E> {
        self.events.front()
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = &E> {
        self.events.iter()
    }
}

impl<E: FrameEvent> EventQueue<E> {
    /// Pending events for a specific frame.
    pub fn events_for_frame(&self, frame_id: &str) -> Vec<&E> {
        self.events.iter().filter(|e| e.frame_id() == frame_id).collect()
    }
}
