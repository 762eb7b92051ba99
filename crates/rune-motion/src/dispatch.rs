//! Event dispatch and rule matching.
//!
//! `emit_event` resolves an event from a source frame into the rules that
//! apply, grouped by target frame:
//! - hover-class events apply the first rule per target whose guard matches
//!   the target's overlay-or-logical variant, touching only the overlay
//! - other events apply every explicit rule whose guard matches, falling
//!   back to toggle rules when none applied for that target
//! - guards are checked against the target's live variant, so each rule
//!   sees what the rules before it committed
//!
//! Unknown frames and failed guards are never errors; they simply apply
//! nothing.

use serde::{Deserialize, Serialize};
use std::rc::Rc;

use crate::events::VariantChange;
use crate::registry::{RegistryTask, TransitionRegistry};
use crate::rule::{EventKind, RuleEvent, TransitionRule, TransitionTiming};

/// An event reported to the registry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DispatchEvent {
    Named(EventKind),
    /// Fires rules built with `TransitionRule::custom` under this name.
    Custom(String),
}

impl DispatchEvent {
    pub fn custom(name: impl Into<String>) -> Self {
        Self::Custom(name.into())
    }
}

impl From<EventKind> for DispatchEvent {
    fn from(kind: EventKind) -> Self {
        Self::Named(kind)
    }
}

/// Payload accompanying an event.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub listen_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub listen_variant: Option<String>,
}

impl EventData {
    pub fn key(key: impl Into<String>) -> Self {
        Self {
            key: Some(key.into()),
            ..Self::default()
        }
    }

    pub fn listen(frame_id: impl Into<String>, variant: impl Into<String>) -> Self {
        Self {
            listen_id: Some(frame_id.into()),
            listen_variant: Some(variant.into()),
            ..Self::default()
        }
    }
}

/// What a single dispatch did.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DispatchOutcome {
    /// Rules that passed event, source and key filtering.
    pub matched: usize,
    /// Rules whose guard passed and were applied immediately.
    pub applied: usize,
    /// Hover rules whose overlay waits on a delay.
    pub scheduled: usize,
    /// Changes committed by this dispatch, in order.
    pub changes: Vec<VariantChange>,
}

impl DispatchOutcome {
    pub fn is_noop(&self) -> bool {
        self.applied == 0 && self.scheduled == 0
    }
}

type TargetGroup = (String, Vec<Rc<TransitionRule>>);

/// Group rules by resolved target, keeping first-seen target order and
/// registration order within each group.
fn group_by_target(rules: Vec<Rc<TransitionRule>>, source_id: &str) -> Vec<TargetGroup> {
    let mut groups: Vec<TargetGroup> = Vec::new();
    for rule in rules {
        let target = rule.resolve_target(source_id).to_string();
        match groups.iter_mut().find(|(t, _)| *t == target) {
            Some((_, group)) => group.push(rule),
            None => groups.push((target, vec![rule])),
        }
    }
    groups
}

fn kind_matches(rule: &TransitionRule, kind: EventKind) -> bool {
    rule.event_kind().map(EventKind::normalized) == Some(kind)
}

/// Key guard for `key` and `hotKey` events. A rule without keys matches no key.
fn key_matches(rule: &TransitionRule, kind: EventKind, key: Option<&str>) -> bool {
    match kind {
        EventKind::Key => key.is_some_and(|key| rule.key.as_deref() == Some(key)),
        EventKind::HotKey => key.is_some_and(|key| {
            rule.key.as_deref() == Some(key) || rule.hot_key.as_deref() == Some(key)
        }),
        _ => true,
    }
}

impl TransitionRegistry {
    /// Dispatch an event from `source_id`.
    pub fn emit_event(
        &mut self,
        source_id: &str,
        event: impl Into<DispatchEvent>,
        data: &EventData,
    ) -> DispatchOutcome {
        let event = event.into();
        let mark = self.changes.len();
        let mut outcome = DispatchOutcome::default();

        match &event {
            DispatchEvent::Named(kind) => match kind.normalized() {
                kind if kind.is_hover_class() => self.dispatch_hover(source_id, kind, &mut outcome),
                EventKind::Listen => self.dispatch_listen(source_id, data, &mut outcome),
                kind => self.dispatch_logical(source_id, kind, data, &mut outcome),
            },
            DispatchEvent::Custom(name) => self.dispatch_custom(source_id, name, &mut outcome),
        }

        outcome.changes = self.changes.iter().skip(mark).cloned().collect();
        tracing::debug!(
            source_id,
            ?event,
            matched = outcome.matched,
            applied = outcome.applied,
            scheduled = outcome.scheduled,
            "event dispatched"
        );
        outcome
    }

    /// Dispatch a named event with no payload.
    pub fn emit(&mut self, source_id: &str, kind: EventKind) -> DispatchOutcome {
        self.emit_event(source_id, kind, &EventData::default())
    }

    /// Dispatch a `key` event carrying `key`.
    pub fn emit_key(&mut self, source_id: &str, key: &str) -> DispatchOutcome {
        self.emit_event(source_id, EventKind::Key, &EventData::key(key))
    }

    /// Evaluate every `hotKey` rule against a global key press, regardless
    /// of source or focus.
    pub fn emit_hotkey(&mut self, key: &str) -> DispatchOutcome {
        let mark = self.changes.len();
        let mut outcome = DispatchOutcome::default();

        let rules = self.collect_rules(|r| {
            kind_matches(r, EventKind::HotKey) && key_matches(r, EventKind::HotKey, Some(key))
        });
        outcome.matched = rules.len();
        for (target, candidates) in group_by_target(rules, "") {
            self.apply_logical_group(&target, candidates, &mut outcome);
        }

        outcome.changes = self.changes.iter().skip(mark).cloned().collect();
        tracing::debug!(key, applied = outcome.applied, "hot key dispatched");
        outcome
    }

    fn collect_rules(&self, filter: impl Fn(&TransitionRule) -> bool) -> Vec<Rc<TransitionRule>> {
        self.rules.iter().filter(|r| filter(r)).cloned().collect()
    }

    fn dispatch_hover(&mut self, source_id: &str, kind: EventKind, outcome: &mut DispatchOutcome) {
        let rules = self.collect_rules(|r| kind_matches(r, kind) && r.accepts_source(source_id));
        outcome.matched = rules.len();

        if kind == EventKind::MouseLeave {
            self.animating.remove(source_id);
            if self.config.cancel_superseded_hover {
                self.cancel_pending_hover(source_id);
            }
            self.commit_visual(source_id, None, TransitionTiming::default());
        }

        for (target, candidates) in group_by_target(rules, source_id) {
            for rule in candidates {
                if self.apply_hover_rule(&rule, &target, kind, outcome) {
                    break;
                }
            }
        }
    }

    fn dispatch_listen(
        &mut self,
        source_id: &str,
        data: &EventData,
        outcome: &mut DispatchOutcome,
    ) {
        let (Some(listen_id), Some(listen_variant)) =
            (data.listen_id.as_deref(), data.listen_variant.as_deref())
        else {
            tracing::trace!(source_id, "listen event without payload");
            return;
        };

        let rules = self.collect_rules(|r| {
            kind_matches(r, EventKind::Listen)
                && r.listen_id.as_deref() == Some(listen_id)
                && r.listen_variant.as_deref() == Some(listen_variant)
        });
        outcome.matched = rules.len();
        for (target, candidates) in group_by_target(rules, source_id) {
            self.apply_logical_group(&target, candidates, outcome);
        }
    }

    fn dispatch_logical(
        &mut self,
        source_id: &str,
        kind: EventKind,
        data: &EventData,
        outcome: &mut DispatchOutcome,
    ) {
        let key = data.key.as_deref();
        let rules = self.collect_rules(|r| {
            kind_matches(r, kind) && r.accepts_source(source_id) && key_matches(r, kind, key)
        });
        outcome.matched = rules.len();
        for (target, candidates) in group_by_target(rules, source_id) {
            self.apply_logical_group(&target, candidates, outcome);
        }
    }

    fn dispatch_custom(&mut self, source_id: &str, name: &str, outcome: &mut DispatchOutcome) {
        let rules = self.collect_rules(|r| {
            matches!(&r.event, RuleEvent::Custom(custom) if custom.name == name)
                && r.accepts_source(source_id)
        });
        outcome.matched = rules.len();

        for rule in &rules {
            if let RuleEvent::Custom(custom) = &rule.event {
                custom.invoke(source_id);
            }
        }
        for (target, candidates) in group_by_target(rules, source_id) {
            self.apply_logical_group(&target, candidates, outcome);
        }
    }

    /// Apply a `delay` rule whose timer fired.
    pub(crate) fn fire_rule(&mut self, rule: &Rc<TransitionRule>, source_id: &str) {
        let target = rule.resolve_target(source_id).to_string();
        let mut outcome = DispatchOutcome::default();
        self.apply_logical_group(&target, vec![rule.clone()], &mut outcome);
        tracing::debug!(
            source_id,
            frame_id = %target,
            applied = outcome.applied,
            "delay rule fired"
        );
    }

    /// Explicit rules first, all of them; toggles only if none applied.
    ///
    /// Each guard sees the target's variant as left by the rules before it.
    fn apply_logical_group(
        &mut self,
        target: &str,
        candidates: Vec<Rc<TransitionRule>>,
        outcome: &mut DispatchOutcome,
    ) {
        if !self.frames.contains_key(target) {
            tracing::trace!(frame_id = target, "rules target an unknown frame");
            return;
        }

        let (toggles, explicit): (Vec<_>, Vec<_>) =
            candidates.into_iter().partition(|r| r.is_toggle());

        let mut applied_explicit = false;
        for rule in &explicit {
            applied_explicit |= self.apply_logical_rule(rule, target, outcome);
        }
        if !applied_explicit {
            for rule in &toggles {
                self.apply_logical_rule(rule, target, outcome);
            }
        }
    }

    fn apply_logical_rule(
        &mut self,
        rule: &TransitionRule,
        target: &str,
        outcome: &mut DispatchOutcome,
    ) -> bool {
        let Some(current) = self.frames.get(target).map(|s| s.logical.clone()) else {
            return false;
        };
        if !rule.guard_allows(&current) {
            tracing::trace!(
                frame_id = target,
                guard = ?rule.from_variant,
                current = %current,
                "guard rejected rule"
            );
            return false;
        }

        let next = rule.action.resolve(&current);
        outcome.applied += 1;
        self.commit_logical(target, next, rule.timing);
        true
    }

    fn apply_hover_rule(
        &mut self,
        rule: &TransitionRule,
        target: &str,
        kind: EventKind,
        outcome: &mut DispatchOutcome,
    ) -> bool {
        let Some(state) = self.frames.get(target) else {
            tracing::trace!(frame_id = target, "hover rule targets an unknown frame");
            return false;
        };
        if !rule.guard_allows(state.current()) {
            return false;
        }

        let variant = match kind {
            EventKind::MouseLeave => None,
            _ => Some(rule.action.resolve(state.current())),
        };

        if self.config.cancel_superseded_hover {
            self.cancel_pending_hover(target);
        }

        match rule.timing.effective_delay_ms() {
            Some(delay) => {
                let id = self.scheduler.schedule(
                    delay,
                    RegistryTask::ApplyVisual {
                        target: target.to_string(),
                        variant,
                        timing: rule.timing,
                    },
                );
                self.pending_hover.insert(target.to_string(), id);
                outcome.scheduled += 1;
            }
            None => {
                self.commit_visual(target, variant, rule.timing);
                outcome.applied += 1;
            }
        }
        true
    }
}
