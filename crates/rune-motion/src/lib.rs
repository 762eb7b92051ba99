//! Variant transitions and timeline animation for frames.
//!
//! This crate provides:
//! - **Transition registry**: per-frame logical variants with a hover
//!   overlay, driven by declarative rules reacting to interaction events
//! - **Timelines**: time-labeled anchors normalized into keyframes
//! - **Interpolation**: sparse property-set blending shaped by easing curves
//! - **Strategy analysis**: direct transition, keyframes or manual stepping,
//!   plus advisory performance scoring
//! - **Animation sessions**: trigger-based timeline playback
//!
//! # Architecture
//!
//! ```text
//! TransitionRegistry
//!   ├── frames (logical + visual variant)
//!   ├── rules (Rc<TransitionRule>, removed by identity)
//!   ├── Scheduler (listen cascades, delayed hover, delay events)
//!   └── EventQueue<VariantChange> ──> VariantCatalog ──> StyleRenderer
//!
//! AnimationSession
//!   ├── TimelineAnimation per trigger
//!   ├── plan_animation (parse_timeline + choose_strategy)
//!   └── Scheduler (start delay, segment waits, fallback deadline)
//! ```

pub mod catalog;
pub mod dispatch;
pub mod easing;
pub mod error;
pub mod events;
pub mod interpolate;
pub mod property;
pub mod registry;
pub mod render;
pub mod rule;
pub mod scheduler;
pub mod session;
pub mod strategy;
pub mod timeline;

pub use catalog::VariantCatalog;
pub use dispatch::{DispatchEvent, DispatchOutcome, EventData};
pub use easing::{EasingFunction, StepPosition};
pub use error::{MotionError, Result};
pub use events::{EventQueue, SessionEvent, VariantChange, VariantLayer};
pub use interpolate::{Interpolate, interpolate, sample_frames};
pub use property::{PropertyCategory, PropertyKey, PropertySet, PropertyValue};
pub use registry::{TransitionRegistry, VariantState};
pub use render::StyleRenderer;
pub use rule::{CustomEvent, EventKind, RuleAction, RuleEvent, TransitionRule, TransitionTiming};
pub use scheduler::{Scheduler, TimerId};
pub use session::{AnimationSession, PlaybackContext, PlaybackId, TimelineAnimation};
pub use strategy::{
    AnimationPlan, AnimationStrategy, ImpactKind, PerformanceReport, PerformanceWarning,
    TimedFrame, analyze_performance_impact, choose_strategy, plan_animation,
};
pub use timeline::{Keyframe, Timeline, parse_time_label, parse_timeline};

pub use rune_config::MotionConfig;
