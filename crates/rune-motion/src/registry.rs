//! Frame variant state and the transition rule set.
//!
//! This module provides `TransitionRegistry`, the explicit context object that
//! owns:
//! - per-frame variant state (a durable logical variant plus an optional
//!   hover overlay)
//! - the registered transition rules
//! - the virtual-clock scheduler for deferred work (listen cascades,
//!   delayed hover overlays, `delay` events)
//! - the queue of committed variant changes
//!
//! Event dispatch lives in `dispatch`.
//!
//! # Usage
//!
//! ```
//! use rune_motion::registry::TransitionRegistry;
//! use rune_motion::rule::{EventKind, TransitionRule};
//!
//! let mut registry = TransitionRegistry::new();
//! registry.register_frame("menu", "closed");
//! registry.register_transitions([TransitionRule::on(EventKind::MouseEnter)
//!     .source("menu")
//!     .to("peek")
//!     .shared()]);
//!
//! registry.emit("menu", EventKind::MouseEnter);
//! assert_eq!(registry.variant("menu"), "closed");
//! assert_eq!(registry.visual_variant("menu"), "peek");
//! ```

use rune_config::MotionConfig;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use crate::dispatch::{DispatchEvent, EventData};
use crate::events::{EventQueue, VariantChange};
use crate::rule::{EventKind, TransitionRule, TransitionTiming};
use crate::scheduler::{DueTask, Scheduler, TimerId};

/// Variant state of one frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantState {
    pub logical: String,
    pub visual: Option<String>,
}

impl VariantState {
    pub fn new(logical: impl Into<String>) -> Self {
        Self {
            logical: logical.into(),
            visual: None,
        }
    }

    /// The overlay if present, otherwise the logical variant.
    pub fn current(&self) -> &str {
        self.visual.as_deref().unwrap_or(&self.logical)
    }
}

/// Deferred registry work.
#[derive(Debug)]
pub(crate) enum RegistryTask {
    Emit {
        source: String,
        event: DispatchEvent,
        data: EventData,
    },
    ApplyVisual {
        target: String,
        variant: Option<String>,
        timing: TransitionTiming,
    },
    /// A registered `delay` rule whose wait elapsed.
    FireRule {
        rule: Rc<TransitionRule>,
        source: String,
    },
}

/// Context object for the variant transition state machine.
#[derive(Debug, Default)]
pub struct TransitionRegistry {
    pub(crate) config: MotionConfig,
    pub(crate) frames: HashMap<String, VariantState>,
    pub(crate) rules: Vec<Rc<TransitionRule>>,
    pub(crate) animating: HashSet<String>,
    /// Latest delayed hover timer per target.
    pub(crate) pending_hover: HashMap<String, TimerId>,
    pub(crate) scheduler: Scheduler<RegistryTask>,
    pub(crate) changes: EventQueue<VariantChange>,
}

impl TransitionRegistry {
    /// Create a registry with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: MotionConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn config(&self) -> &MotionConfig {
        &self.config
    }

    // ========================================================================
    // Frames
    // ========================================================================

    /// Register a frame. Re-registering an existing id keeps its state.
    pub fn register_frame(&mut self, frame_id: &str, initial_variant: &str) {
        if self.frames.contains_key(frame_id) {
            tracing::trace!(frame_id, "frame already registered");
            return;
        }
        tracing::debug!(frame_id, initial_variant, "frame registered");
        self.frames
            .insert(frame_id.to_string(), VariantState::new(initial_variant));
    }

    /// Drop all state for a frame. Rules that mention it stop matching.
    pub fn unregister_frame(&mut self, frame_id: &str) {
        if self.frames.remove(frame_id).is_some() {
            tracing::debug!(frame_id, "frame unregistered");
        }
        self.animating.remove(frame_id);
        self.cancel_pending_hover(frame_id);
    }

    pub fn is_registered(&self, frame_id: &str) -> bool {
        self.frames.contains_key(frame_id)
    }

    /// Logical variant, or `""` for unknown frames.
    pub fn variant(&self, frame_id: &str) -> &str {
        self.frames
            .get(frame_id)
            .map(|s| s.logical.as_str())
            .unwrap_or("")
    }

    /// Overlay if present, else the logical variant, else `""`.
    pub fn visual_variant(&self, frame_id: &str) -> &str {
        self.frames.get(frame_id).map(VariantState::current).unwrap_or("")
    }

    pub fn frame_state(&self, frame_id: &str) -> Option<&VariantState> {
        self.frames.get(frame_id)
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    /// Commit a logical variant as if an applied rule had produced it.
    ///
    /// Returns false for unknown frames or when the value is unchanged.
    pub fn set_variant(&mut self, frame_id: &str, variant: &str) -> bool {
        self.commit_logical(frame_id, variant.to_string(), TransitionTiming::default())
    }

    /// Mark a frame as running a layout animation. Cleared on `mouseLeave`.
    pub fn set_animating(&mut self, frame_id: &str, animating: bool) {
        if animating {
            self.animating.insert(frame_id.to_string());
        } else {
            self.animating.remove(frame_id);
        }
    }

    pub fn is_animating(&self, frame_id: &str) -> bool {
        self.animating.contains(frame_id)
    }

    // ========================================================================
    // Rules
    // ========================================================================

    /// Add rules to the shared set.
    ///
    /// `delay` rules with a source schedule their own `delay` event.
    pub fn register_transitions(&mut self, rules: impl IntoIterator<Item = Rc<TransitionRule>>) {
        for rule in rules {
            if rule.event_kind() == Some(EventKind::Delay) {
                if let Some(source) = rule.source_id.clone() {
                    let delay = rule.timing.delay_ms.unwrap_or(0.0);
                    tracing::trace!(source = %source, delay, "delay rule scheduled");
                    self.scheduler.schedule(
                        delay,
                        RegistryTask::FireRule {
                            rule: rule.clone(),
                            source,
                        },
                    );
                }
            }
            self.rules.push(rule);
        }
        tracing::debug!(total = self.rules.len(), "transitions registered");
    }

    /// Remove rules by identity. Structurally equal copies are kept.
    pub fn unregister_transitions(&mut self, rules: &[Rc<TransitionRule>]) {
        let before = self.rules.len();
        self.rules
            .retain(|existing| !rules.iter().any(|r| Rc::ptr_eq(r, existing)));
        tracing::debug!(removed = before - self.rules.len(), "transitions unregistered");
    }

    pub fn rules(&self) -> &[Rc<TransitionRule>] {
        &self.rules
    }

    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    pub fn is_rule_registered(&self, rule: &Rc<TransitionRule>) -> bool {
        self.rules.iter().any(|r| Rc::ptr_eq(r, rule))
    }

    // ========================================================================
    // Scheduling
    // ========================================================================

    /// Current virtual time in milliseconds.
    pub fn now_ms(&self) -> f64 {
        self.scheduler.now_ms()
    }

    /// Returns true when no deferred work is waiting.
    pub fn is_idle(&self) -> bool {
        self.scheduler.is_idle()
    }

    /// Drain the next-tick queue, including the listen events it produces.
    ///
    /// Work queued by a pass runs in the following pass; after
    /// `max_listen_cascade` passes the rest stays queued for the next call.
    /// Returns the number of tasks run.
    pub fn run_pending(&mut self) -> usize {
        let mut passes = 0;
        let mut ran = 0;
        while self.scheduler.pending_microtasks() > 0 {
            if passes >= self.config.max_listen_cascade {
                tracing::warn!(
                    remaining = self.scheduler.pending_microtasks(),
                    passes,
                    "listen cascade limit reached"
                );
                break;
            }
            passes += 1;
            for _ in 0..self.scheduler.pending_microtasks() {
                if let Some(task) = self.scheduler.pop_microtask() {
                    self.run_task(task);
                    ran += 1;
                }
            }
        }
        ran
    }

    /// Move the clock forward, firing due timers in order.
    pub fn advance(&mut self, delta_ms: f64) {
        let until = self.scheduler.now_ms() + delta_ms.max(0.0);
        self.run_pending();
        while let Some(due) = self.scheduler.pop_due(until) {
            self.run_timer(due);
            self.run_pending();
        }
        self.scheduler.advance_to(until);
    }

    fn run_timer(&mut self, due: DueTask<RegistryTask>) {
        if let RegistryTask::ApplyVisual { target, .. } = &due.task {
            if self.pending_hover.get(target) == Some(&due.id) {
                self.pending_hover.remove(target);
            }
        }
        self.run_task(due.task);
    }

    fn run_task(&mut self, task: RegistryTask) {
        match task {
            RegistryTask::Emit {
                source,
                event,
                data,
            } => {
                self.emit_event(&source, event, &data);
            }
            RegistryTask::ApplyVisual {
                target,
                variant,
                timing,
            } => {
                tracing::trace!(frame_id = %target, ?variant, "delayed overlay applied");
                self.commit_visual(&target, variant, timing);
            }
            RegistryTask::FireRule { rule, source } => {
                if self.is_rule_registered(&rule) {
                    self.fire_rule(&rule, &source);
                } else {
                    tracing::trace!(source = %source, "delay rule was unregistered");
                }
            }
        }
    }

    pub(crate) fn cancel_pending_hover(&mut self, frame_id: &str) {
        if let Some(id) = self.pending_hover.remove(frame_id) {
            if self.scheduler.cancel(id) {
                tracing::trace!(frame_id, "superseded hover timer cancelled");
            }
        }
    }

    // ========================================================================
    // Commit
    // ========================================================================

    /// Set the logical variant, clearing any overlay. A real change queues a
    /// `listen` event for the next tick.
    pub(crate) fn commit_logical(
        &mut self,
        frame_id: &str,
        next: String,
        timing: TransitionTiming,
    ) -> bool {
        let Some(state) = self.frames.get_mut(frame_id) else {
            tracing::trace!(frame_id, "commit on unknown frame ignored");
            return false;
        };

        if let Some(overlay) = state.visual.take() {
            self.changes
                .push(VariantChange::visual(frame_id, Some(overlay), None, timing));
        }
        if state.logical == next {
            return false;
        }

        let previous = std::mem::replace(&mut state.logical, next.clone());
        tracing::debug!(frame_id, from = %previous, to = %next, "logical variant changed");
        self.changes
            .push(VariantChange::logical(frame_id, &previous, &next, timing));
        self.scheduler.defer(RegistryTask::Emit {
            source: frame_id.to_string(),
            event: DispatchEvent::Named(EventKind::Listen),
            data: EventData::listen(frame_id, &next),
        });
        true
    }

    /// Set or clear the hover overlay.
    pub(crate) fn commit_visual(
        &mut self,
        frame_id: &str,
        next: Option<String>,
        timing: TransitionTiming,
    ) -> bool {
        let Some(state) = self.frames.get_mut(frame_id) else {
            return false;
        };
        if state.visual == next {
            return false;
        }
        let previous = std::mem::replace(&mut state.visual, next.clone());
        tracing::trace!(frame_id, ?previous, ?next, "overlay changed");
        self.changes
            .push(VariantChange::visual(frame_id, previous, next, timing));
        true
    }

    // ========================================================================
    // Changes
    // ========================================================================

    /// Committed changes not yet drained.
    pub fn changes(&self) -> &EventQueue<VariantChange> {
        &self.changes
    }

    /// Drain committed changes in commit order.
    pub fn drain_changes(&mut self) -> impl Iterator<Item = VariantChange> + '_ {
        self.changes.drain()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::VariantLayer;

    #[test]
    fn test_register_frame_is_idempotent() {
        let mut registry = TransitionRegistry::new();
        registry.register_frame("a", "idle");
        registry.set_variant("a", "busy");
        registry.register_frame("a", "idle");

        assert_eq!(registry.variant("a"), "busy");
        assert_eq!(registry.frame_count(), 1);
    }

    #[test]
    fn test_unknown_frames_read_empty() {
        let mut registry = TransitionRegistry::new();
        assert_eq!(registry.variant("ghost"), "");
        assert_eq!(registry.visual_variant("ghost"), "");
        assert!(!registry.set_variant("ghost", "x"));

        registry.register_frame("a", "idle");
        registry.unregister_frame("a");
        assert!(!registry.is_registered("a"));
        assert_eq!(registry.variant("a"), "");
    }

    #[test]
    fn test_unregister_by_identity() {
        let mut registry = TransitionRegistry::new();
        let rule = TransitionRule::on(EventKind::Click).source("a").to("b").shared();
        let twin = Rc::new((*rule).clone());

        registry.register_transitions([rule.clone(), twin.clone()]);
        assert_eq!(registry.rule_count(), 2);

        registry.unregister_transitions(&[rule.clone()]);
        assert_eq!(registry.rule_count(), 1);
        assert!(registry.is_rule_registered(&twin));
        assert!(!registry.is_rule_registered(&rule));
    }

    #[test]
    fn test_set_variant_records_change_and_clears_overlay() {
        let mut registry = TransitionRegistry::new();
        registry.register_frame("a", "idle");
        registry.commit_visual("a", Some("hover".into()), TransitionTiming::default());
        registry.drain_changes().for_each(drop);

        assert!(registry.set_variant("a", "busy"));
        assert_eq!(registry.visual_variant("a"), "busy");

        let changes: Vec<_> = registry.drain_changes().collect();
        assert_eq!(changes.len(), 2);
        assert_eq!(changes[0].layer, VariantLayer::Visual);
        assert_eq!(changes[0].current, None);
        assert_eq!(changes[1].layer, VariantLayer::Logical);
        assert_eq!(changes[1].previous.as_deref(), Some("idle"));

        // Same value: no logical change, no listen.
        registry.run_pending();
        assert!(!registry.set_variant("a", "busy"));
        assert!(registry.is_idle());
    }

    #[test]
    fn test_animating_flag() {
        let mut registry = TransitionRegistry::new();
        registry.set_animating("a", true);
        assert!(registry.is_animating("a"));
        registry.set_animating("a", false);
        assert!(!registry.is_animating("a"));
    }

    #[test]
    fn test_listen_cascade_is_bounded() {
        let config = MotionConfig {
            max_listen_cascade: 2,
            ..MotionConfig::default()
        };
        let mut registry = TransitionRegistry::with_config(config);
        registry.register_frame("a", "0");
        // "a" listens to itself and keeps toggling.
        registry.register_transitions([
            TransitionRule::on_listen("a", "1").source("a").to("0").shared(),
            TransitionRule::on_listen("a", "0").source("a").to("1").shared(),
        ]);

        registry.set_variant("a", "1");
        assert_eq!(registry.run_pending(), 2);
        assert!(!registry.is_idle());
        assert_eq!(registry.variant("a"), "1");
    }
}
