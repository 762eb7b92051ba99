//! Declarative transition rules.
//!
//! This module provides:
//! - `EventKind`: the closed set of interaction events a rule can react to
//! - `RuleEvent`: a named event or a custom callback trigger
//! - `RuleAction`: direct set or cyclic toggle
//! - `TransitionTiming`: renderer hints carried along with a variant change
//! - `TransitionRule`: the rule itself, built with chained setters
//!
//! # Example
//!
//! ```
//! use rune_motion::rule::{EventKind, TransitionRule};
//!
//! // Clicking "button" toggles it between idle and pressed over 200ms.
//! let rule = TransitionRule::on(EventKind::Click)
//!     .source("button")
//!     .toggle(["idle", "pressed"])
//!     .with_duration(200.0);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::rc::Rc;

use crate::easing::EasingFunction;

/// Interaction events understood by the dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EventKind {
    Click,
    Hover,
    MouseEnter,
    MouseLeave,
    MouseDown,
    MouseUp,
    /// Treated as `MouseDown` by the dispatcher.
    Grab,
    Key,
    HotKey,
    Delay,
    Close,
    /// Synthetic: another frame's logical variant changed.
    Listen,
}

impl EventKind {
    /// Hover-class events only ever touch the visual overlay.
    pub fn is_hover_class(&self) -> bool {
        matches!(self, Self::Hover | Self::MouseEnter | Self::MouseLeave)
    }

    /// Map aliases onto the event the dispatcher actually matches.
    pub fn normalized(self) -> Self {
        match self {
            Self::Grab => Self::MouseDown,
            other => other,
        }
    }
}

/// Callback invoked when a custom-triggered rule is dispatched.
#[derive(Clone)]
pub struct CustomEvent {
    pub name: String,
    callback: Rc<dyn Fn(&str)>,
}

impl CustomEvent {
    pub fn new(name: impl Into<String>, callback: impl Fn(&str) + 'static) -> Self {
        Self {
            name: name.into(),
            callback: Rc::new(callback),
        }
    }

    /// Run the callback with the id of the frame that fired the event.
    pub fn invoke(&self, source_id: &str) {
        (self.callback)(source_id)
    }
}

impl fmt::Debug for CustomEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustomEvent").field("name", &self.name).finish_non_exhaustive()
    }
}

/// What a rule reacts to.
#[derive(Debug, Clone)]
pub enum RuleEvent {
    Named(EventKind),
    Custom(CustomEvent),
}

impl RuleEvent {
    pub fn kind(&self) -> Option<EventKind> {
        match self {
            Self::Named(kind) => Some(*kind),
            Self::Custom(_) => None,
        }
    }
}

/// The state change a rule performs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RuleAction {
    /// Set the variant directly.
    Set { variant: String },
    /// Advance one step through the cycle.
    Toggle { variants: Vec<String> },
}

impl RuleAction {
    pub fn is_toggle(&self) -> bool {
        matches!(self, Self::Toggle { .. })
    }

    /// The variant this action produces from `current`.
    ///
    /// Toggles step to the entry after `current`, wrapping around; a value
    /// outside the cycle jumps to the first entry. An empty cycle keeps
    /// `current`.
    pub fn resolve(&self, current: &str) -> String {
        match self {
            Self::Set { variant } => variant.clone(),
            Self::Toggle { variants } => {
                let next = match variants.iter().position(|v| v == current) {
                    Some(idx) => variants.get((idx + 1) % variants.len()),
                    None => variants.first(),
                };
                next.cloned().unwrap_or_else(|| current.to_string())
            }
        }
    }
}

/// Timing hints handed to the renderer with a variant change.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct TransitionTiming {
    /// Duration of the visual transition in milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<f64>,
    /// Delay before the change; hover overlays wait this long before committing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delay_ms: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub curve: Option<EasingFunction>,
}

impl TransitionTiming {
    pub fn new(duration_ms: f64, curve: EasingFunction) -> Self {
        Self {
            duration_ms: Some(duration_ms),
            delay_ms: None,
            curve: Some(curve),
        }
    }

    /// Positive delay, if any.
    pub fn effective_delay_ms(&self) -> Option<f64> {
        self.delay_ms.filter(|d| *d > 0.0)
    }
}

/// A declarative mapping from an event to a variant change.
///
/// Rules are shared as `Rc<TransitionRule>` and never mutated once
/// registered; the registry removes them by identity.
#[derive(Debug, Clone)]
pub struct TransitionRule {
    pub event: RuleEvent,
    /// Only events from this frame match. Any source when `None`.
    pub source_id: Option<String>,
    /// Frame that changes; defaults to the source.
    pub target_id: Option<String>,
    pub action: RuleAction,
    /// Guard on the target's current variant.
    pub from_variant: Option<String>,
    pub timing: TransitionTiming,
    pub key: Option<String>,
    pub hot_key: Option<String>,
    pub listen_id: Option<String>,
    pub listen_variant: Option<String>,
}

impl TransitionRule {
    /// Start a rule for a named event. The action defaults to an empty toggle
    /// until `to` or `toggle` is called.
    pub fn on(event: EventKind) -> Self {
        Self::with_event(RuleEvent::Named(event))
    }

    /// Start a rule fired by `DispatchEvent::Custom(name)`.
    pub fn custom(name: impl Into<String>, callback: impl Fn(&str) + 'static) -> Self {
        Self::with_event(RuleEvent::Custom(CustomEvent::new(name, callback)))
    }

    /// Start a rule reacting to `frame_id` entering `variant`.
    pub fn on_listen(frame_id: impl Into<String>, variant: impl Into<String>) -> Self {
        let mut rule = Self::on(EventKind::Listen);
        rule.listen_id = Some(frame_id.into());
        rule.listen_variant = Some(variant.into());
        rule
    }

    fn with_event(event: RuleEvent) -> Self {
        Self {
            event,
            source_id: None,
            target_id: None,
            action: RuleAction::Toggle {
                variants: Vec::new(),
            },
            from_variant: None,
            timing: TransitionTiming::default(),
            key: None,
            hot_key: None,
            listen_id: None,
            listen_variant: None,
        }
    }

    pub fn source(mut self, source_id: impl Into<String>) -> Self {
        self.source_id = Some(source_id.into());
        self
    }

    pub fn target(mut self, target_id: impl Into<String>) -> Self {
        self.target_id = Some(target_id.into());
        self
    }

    /// Set the target variant directly.
    pub fn to(mut self, variant: impl Into<String>) -> Self {
        self.action = RuleAction::Set {
            variant: variant.into(),
        };
        self
    }

    /// Cycle through `variants` on each application.
    pub fn toggle<I, S>(mut self, variants: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.action = RuleAction::Toggle {
            variants: variants.into_iter().map(Into::into).collect(),
        };
        self
    }

    /// Only apply while the target is in `variant`.
    pub fn when(mut self, variant: impl Into<String>) -> Self {
        self.from_variant = Some(variant.into());
        self
    }

    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn hot_key(mut self, key: impl Into<String>) -> Self {
        self.hot_key = Some(key.into());
        self
    }

    pub fn with_duration(mut self, duration_ms: f64) -> Self {
        self.timing.duration_ms = Some(duration_ms);
        self
    }

    pub fn with_delay(mut self, delay_ms: f64) -> Self {
        self.timing.delay_ms = Some(delay_ms);
        self
    }

    pub fn with_curve(mut self, curve: EasingFunction) -> Self {
        self.timing.curve = Some(curve);
        self
    }

    /// Wrap in an `Rc` for registration.
    pub fn shared(self) -> Rc<Self> {
        Rc::new(self)
    }

    /// The named event, or `None` for custom triggers.
    pub fn event_kind(&self) -> Option<EventKind> {
        self.event.kind()
    }

    pub fn is_hover_class(&self) -> bool {
        self.event_kind().is_some_and(|k| k.is_hover_class())
    }

    pub fn is_toggle(&self) -> bool {
        self.action.is_toggle()
    }

    /// Frame this rule changes when fired by `source_id`.
    pub fn resolve_target<'a>(&'a self, source_id: &'a str) -> &'a str {
        self.target_id
            .as_deref()
            .or(self.source_id.as_deref())
            .unwrap_or(source_id)
    }

    /// Returns true if events from `source_id` can fire this rule.
    pub fn accepts_source(&self, source_id: &str) -> bool {
        self.source_id.as_deref().is_none_or(|s| s == source_id)
    }

    /// Returns true if the guard allows a target currently in `current`.
    pub fn guard_allows(&self, current: &str) -> bool {
        self.from_variant.as_deref().is_none_or(|v| v == current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[test]
    fn test_toggle_cycles_and_wraps() {
        let action = RuleAction::Toggle {
            variants: vec!["a".into(), "b".into(), "c".into()],
        };
        assert_eq!(action.resolve("a"), "b");
        assert_eq!(action.resolve("b"), "c");
        assert_eq!(action.resolve("c"), "a");
        assert_eq!(action.resolve("zzz"), "a");

        let empty = RuleAction::Toggle { variants: vec![] };
        assert_eq!(empty.resolve("x"), "x");
    }

    #[test]
    fn test_builder() {
        let rule = TransitionRule::on(EventKind::Click)
            .source("a")
            .target("b")
            .to("open")
            .when("closed")
            .with_duration(150.0)
            .with_delay(20.0)
            .with_curve(EasingFunction::EaseOut);

        assert_eq!(rule.event_kind(), Some(EventKind::Click));
        assert_eq!(rule.resolve_target("a"), "b");
        assert!(!rule.is_toggle());
        assert!(rule.guard_allows("closed"));
        assert!(!rule.guard_allows("open"));
        assert!(rule.accepts_source("a"));
        assert!(!rule.accepts_source("c"));
        assert_eq!(rule.timing.effective_delay_ms(), Some(20.0));
    }

    #[test]
    fn test_target_defaults() {
        let sourced = TransitionRule::on(EventKind::Click).source("a").to("x");
        assert_eq!(sourced.resolve_target("anything"), "a");

        let open = TransitionRule::on(EventKind::Click).to("x");
        assert_eq!(open.resolve_target("caller"), "caller");
        assert!(open.accepts_source("caller"));
    }

    #[test]
    fn test_event_kinds() {
        assert!(EventKind::MouseEnter.is_hover_class());
        assert!(EventKind::Hover.is_hover_class());
        assert!(!EventKind::Click.is_hover_class());
        assert_eq!(EventKind::Grab.normalized(), EventKind::MouseDown);
        assert_eq!(EventKind::Key.normalized(), EventKind::Key);
    }

    #[test]
    fn test_custom_event_invokes_callback() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        let rule = TransitionRule::custom("swipe", move |source| {
            sink.borrow_mut().push(source.to_string());
        })
        .to("swiped");

        let RuleEvent::Custom(custom) = &rule.event else {
            panic!("expected a custom trigger");
        };
        custom.invoke("card");
        assert_eq!(custom.name, "swipe");
        assert_eq!(*seen.borrow(), vec!["card".to_string()]);
        assert_eq!(rule.event_kind(), None);
    }

    #[test]
    fn test_timing_serde() {
        let timing = TransitionTiming::new(300.0, EasingFunction::Linear);
        let json = serde_json::to_value(timing).unwrap();
        assert_eq!(json["duration_ms"], 300.0);
        assert!(json.get("delay_ms").is_none());

        let back: TransitionTiming = serde_json::from_value(json).unwrap();
        assert_eq!(back, timing);
    }
}
