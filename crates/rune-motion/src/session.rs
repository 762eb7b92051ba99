//! Trigger-based timeline playback.
//!
//! An `AnimationSession` holds timelines registered under trigger names and
//! plays them on request. Playback runs on the session's virtual clock:
//! 1. `play` checks the trigger and its condition, then waits out the delay
//! 2. the timeline is planned with the strategy analyzer
//! 3. direct plans snap to the start style and hand one transition to the
//!    renderer, completing on `notify_transition_end`
//! 4. keyframe plans transition segment by segment, waiting each segment's
//!    duration, and complete once the last keyframe is committed
//! 5. manual plans commit sampled frames at their timestamps
//!
//! Every playback also arms a fallback deadline of
//! `delay + duration + fallback_padding_ms`, so it always completes even if
//! the renderer never reports the end of a transition.
//!
//! # Usage
//!
//! ```ignore
//! let mut session = AnimationSession::new();
//! session.register("open", TimelineAnimation::new(timeline).with_delay(50.0));
//!
//! let id = session.play("open", "panel", &PlaybackContext::default());
//! session.update(16.0, &mut renderer);
//! for event in session.drain_events() {
//!     // SessionEvent::Started / KeyframeApplied / Completed
//! }
//! ```

use rune_config::MotionConfig;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::easing::EasingFunction;
use crate::events::{EventQueue, SessionEvent};
use crate::property::PropertySet;
use crate::registry::TransitionRegistry;
use crate::render::StyleRenderer;
use crate::rule::TransitionTiming;
use crate::scheduler::{Scheduler, TimerId};
use crate::strategy::{AnimationPlan, plan_animation};
use crate::timeline::Timeline;

/// Unique identifier for a playback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlaybackId(pub u64);

impl PlaybackId {
    /// Generate a new unique playback ID.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for PlaybackId {
    fn default() -> Self {
        Self::new()
    }
}

/// What a playback condition can see about its target.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlaybackContext {
    pub variant: String,
    pub visual_variant: String,
    pub animating: bool,
}

impl PlaybackContext {
    /// Snapshot a frame's state. `None` for unknown frames.
    pub fn from_registry(registry: &TransitionRegistry, frame_id: &str) -> Option<Self> {
        registry.frame_state(frame_id).map(|state| Self {
            variant: state.logical.clone(),
            visual_variant: state.current().to_string(),
            animating: registry.is_animating(frame_id),
        })
    }
}

/// Gate evaluated with the target id before playback starts.
pub type Condition = Rc<dyn Fn(&str, &PlaybackContext) -> bool>;

/// A timeline registered under a trigger name.
#[derive(Clone)]
pub struct TimelineAnimation {
    pub timeline: Timeline,
    /// Total duration; the latest anchor time when `None`.
    pub duration_ms: Option<f64>,
    pub delay_ms: f64,
    /// Curve for every segment; the configured default easing when `None`.
    pub easing: Option<EasingFunction>,
    condition: Option<Condition>,
}

impl TimelineAnimation {
    pub fn new(timeline: Timeline) -> Self {
        Self {
            timeline,
            duration_ms: None,
            delay_ms: 0.0,
            easing: None,
            condition: None,
        }
    }

    pub fn with_duration(mut self, duration_ms: f64) -> Self {
        self.duration_ms = Some(duration_ms);
        self
    }

    pub fn with_delay(mut self, delay_ms: f64) -> Self {
        self.delay_ms = delay_ms;
        self
    }

    pub fn with_easing(mut self, easing: EasingFunction) -> Self {
        self.easing = Some(easing);
        self
    }

    /// Resolve an easing by name, falling back to the configured default.
    pub fn with_easing_name(mut self, name: &str, config: &MotionConfig) -> Self {
        self.easing = Some(EasingFunction::from_name_or(name, default_easing(config)));
        self
    }

    /// The curve playback uses under `config`.
    pub fn easing_with(&self, config: &MotionConfig) -> EasingFunction {
        self.easing.unwrap_or_else(|| default_easing(config))
    }

    /// Only play when `condition(target, context)` holds.
    pub fn when(mut self, condition: impl Fn(&str, &PlaybackContext) -> bool + 'static) -> Self {
        self.condition = Some(Rc::new(condition));
        self
    }

    pub fn total_duration_ms(&self) -> f64 {
        self.duration_ms
            .unwrap_or_else(|| self.timeline.duration_ms())
            .max(0.0)
    }

    pub fn allows(&self, target: &str, context: &PlaybackContext) -> bool {
        self.condition.as_ref().is_none_or(|c| c(target, context))
    }
}

impl fmt::Debug for TimelineAnimation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimelineAnimation")
            .field("timeline", &self.timeline)
            .field("duration_ms", &self.duration_ms)
            .field("delay_ms", &self.delay_ms)
            .field("easing", &self.easing)
            .field("conditional", &self.condition.is_some())
            .finish()
    }
}

#[derive(Debug, Clone, Copy)]
enum SessionTask {
    Start(PlaybackId),
    Step { playback: PlaybackId, index: usize },
    Fallback(PlaybackId),
}

#[derive(Debug)]
struct Playback {
    trigger: String,
    target: String,
    plan: AnimationPlan,
    started: bool,
    /// Pending start or step timer.
    timer: Option<TimerId>,
    fallback: Option<TimerId>,
}

/// Plays registered timelines against a renderer.
#[derive(Debug, Default)]
pub struct AnimationSession {
    config: MotionConfig,
    timelines: HashMap<String, TimelineAnimation>,
    playbacks: HashMap<PlaybackId, Playback>,
    scheduler: Scheduler<SessionTask>,
    events: EventQueue<SessionEvent>,
}

impl AnimationSession {
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

    /// Register (or replace) the timeline played for `trigger`.
    pub fn register(&mut self, trigger: impl Into<String>, animation: TimelineAnimation) {
        self.timelines.insert(trigger.into(), animation);
    }

    pub fn unregister(&mut self, trigger: &str) -> Option<TimelineAnimation> {
        self.timelines.remove(trigger)
    }

    pub fn has_timeline(&self, trigger: &str) -> bool {
        self.timelines.contains_key(trigger)
    }

    pub fn timeline_count(&self) -> usize {
        self.timelines.len()
    }

    /// Start playing the timeline for `trigger` on `target`.
    ///
    /// Returns `None` when no timeline is registered for the trigger or its
    /// condition rejects the target. Nothing is rendered until the next
    /// `update`.
    pub fn play(
        &mut self,
        trigger: &str,
        target: &str,
        context: &PlaybackContext,
    ) -> Option<PlaybackId> {
        let Some(animation) = self.timelines.get(trigger) else {
            tracing::debug!(trigger, target, "no timeline registered for trigger");
            return None;
        };
        if !animation.allows(target, context) {
            tracing::debug!(trigger, target, "playback condition rejected target");
            return None;
        }

        let duration = animation.total_duration_ms();
        let delay = animation.delay_ms.max(0.0);
        let easing = animation.easing_with(&self.config);
        let plan = plan_animation(&animation.timeline, duration, easing, &self.config);

        let id = PlaybackId::new();
        let timer = if delay > 0.0 {
            Some(self.scheduler.schedule(delay, SessionTask::Start(id)))
        } else {
            self.scheduler.defer(SessionTask::Start(id));
            None
        };
        let fallback = self.scheduler.schedule(
            delay + duration + self.config.fallback_padding_ms,
            SessionTask::Fallback(id),
        );

        tracing::debug!(
            trigger,
            target,
            ?id,
            strategy = ?plan.strategy(),
            duration,
            delay,
            "playback queued"
        );
        self.playbacks.insert(
            id,
            Playback {
                trigger: trigger.to_string(),
                target: target.to_string(),
                plan,
                started: false,
                timer,
                fallback: Some(fallback),
            },
        );
        Some(id)
    }

    /// Play on a registered frame, building the condition context from the
    /// registry. Unknown frames are a no-op.
    pub fn play_on(
        &mut self,
        registry: &TransitionRegistry,
        trigger: &str,
        frame_id: &str,
    ) -> Option<PlaybackId> {
        let Some(context) = PlaybackContext::from_registry(registry, frame_id) else {
            tracing::trace!(trigger, frame_id, "playback on unknown frame ignored");
            return None;
        };
        self.play(trigger, frame_id, &context)
    }

    /// Advance the clock by `delta_ms`, running due playback steps.
    pub fn update<R: StyleRenderer>(&mut self, delta_ms: f64, renderer: &mut R) {
        let until = self.scheduler.now_ms() + delta_ms.max(0.0);
        self.run_microtasks(renderer);
        while let Some(due) = self.scheduler.pop_due(until) {
            self.run_task(due.task, renderer);
            self.run_microtasks(renderer);
        }
        self.scheduler.advance_to(until);
    }

    /// Run work queued for the current tick without moving the clock.
    pub fn run_pending<R: StyleRenderer>(&mut self, renderer: &mut R) {
        self.update(0.0, renderer);
    }

    /// Report that the renderer finished a direct transition.
    ///
    /// Returns false if the playback is unknown, not started yet, or not a
    /// direct transition.
    pub fn notify_transition_end(&mut self, id: PlaybackId) -> bool {
        let is_direct = self
            .playbacks
            .get(&id)
            .is_some_and(|p| p.started && matches!(p.plan, AnimationPlan::Direct { .. }));
        if is_direct {
            self.complete(id, false);
        }
        is_direct
    }

    /// Stop a playback. Returns false if it was not active.
    pub fn cancel(&mut self, id: PlaybackId) -> bool {
        let Some(playback) = self.playbacks.remove(&id) else {
            return false;
        };
        self.release_timers(&playback);
        self.events.push(SessionEvent::Cancelled {
            playback: id,
            target: playback.target,
        });
        true
    }

    /// Cancel every playback and forget all registered timelines.
    pub fn cleanup(&mut self) {
        let mut ids: Vec<PlaybackId> = self.playbacks.keys().copied().collect();
        ids.sort_by_key(|id| id.0);
        for id in ids {
            self.cancel(id);
        }
        self.scheduler.clear();
        self.timelines.clear();
        tracing::debug!("animation session cleaned up");
    }

    pub fn is_playing(&self, id: PlaybackId) -> bool {
        self.playbacks.contains_key(&id)
    }

    pub fn active_count(&self) -> usize {
        self.playbacks.len()
    }

    pub fn now_ms(&self) -> f64 {
        self.scheduler.now_ms()
    }

    pub fn events(&self) -> &EventQueue<SessionEvent> {
        &self.events
    }

    pub fn drain_events(&mut self) -> impl Iterator<Item = SessionEvent> + '_ {
        self.events.drain()
    }

    fn run_microtasks<R: StyleRenderer>(&mut self, renderer: &mut R) {
        while let Some(task) = self.scheduler.pop_microtask() {
            self.run_task(task, renderer);
        }
    }

    fn run_task<R: StyleRenderer>(&mut self, task: SessionTask, renderer: &mut R) {
        match task {
            SessionTask::Start(id) => self.start(id, renderer),
            SessionTask::Step { playback, index } => self.step(playback, index, renderer),
            SessionTask::Fallback(id) => {
                if self.playbacks.contains_key(&id) {
                    tracing::warn!(?id, "transition end never reported; completing by fallback");
                    self.complete(id, true);
                }
            }
        }
    }

    fn start<R: StyleRenderer>(&mut self, id: PlaybackId, renderer: &mut R) {
        let Some(playback) = self.playbacks.get_mut(&id) else {
            return;
        };
        playback.started = true;
        playback.timer = None;
        self.events.push(SessionEvent::Started {
            playback: id,
            trigger: playback.trigger.clone(),
            target: playback.target.clone(),
            strategy: playback.plan.strategy(),
        });

        let target = playback.target.clone();
        let first = match &playback.plan {
            AnimationPlan::Direct { from, to, timing } => {
                snap(renderer, &target, from);
                let style = renderer.properties_to_style(to);
                renderer.apply_transition(&target, style, timing);
                return;
            }
            AnimationPlan::Keyframes { keyframes, .. } => keyframes.first().map(|k| &k.properties),
            AnimationPlan::Manual { frames } => frames.first().map(|f| &f.properties),
        };

        match first {
            Some(properties) => {
                snap(renderer, &target, properties);
                self.events.push(SessionEvent::KeyframeApplied {
                    playback: id,
                    target,
                    index: 0,
                });
                self.step(id, 1, renderer);
            }
            None => self.complete(id, false),
        }
    }

    /// Commit entry `index` of a keyframe or manual plan, then wait for the
    /// next one or complete.
    fn step<R: StyleRenderer>(&mut self, id: PlaybackId, index: usize, renderer: &mut R) {
        let Some(playback) = self.playbacks.get_mut(&id) else {
            return;
        };
        playback.timer = None;

        let wait = match &playback.plan {
            AnimationPlan::Keyframes { keyframes, easing } => {
                let (Some(prev), Some(next)) =
                    (keyframes.get(index.wrapping_sub(1)), keyframes.get(index))
                else {
                    self.complete(id, false);
                    return;
                };
                let segment = (next.time_ms - prev.time_ms).max(0.0);
                let style = renderer.properties_to_style(&next.properties);
                let timing = TransitionTiming::new(segment, *easing);
                renderer.apply_transition(&playback.target, style, &timing);
                // Wait out this segment unless it ends the timeline.
                (index + 1 < keyframes.len()).then_some(segment)
            }
            AnimationPlan::Manual { frames } => {
                let Some(frame) = frames.get(index) else {
                    self.complete(id, false);
                    return;
                };
                snap(renderer, &playback.target, &frame.properties);
                frames
                    .get(index + 1)
                    .map(|after| (after.time_ms - frame.time_ms).max(0.0))
            }
            AnimationPlan::Direct { .. } => return,
        };

        self.events.push(SessionEvent::KeyframeApplied {
            playback: id,
            target: playback.target.clone(),
            index,
        });

        match wait {
            Some(wait) => {
                let timer = self.scheduler.schedule(
                    wait,
                    SessionTask::Step {
                        playback: id,
                        index: index + 1,
                    },
                );
                playback.timer = Some(timer);
            }
            None => self.complete(id, false),
        }
    }

    fn complete(&mut self, id: PlaybackId, recovered: bool) {
        let Some(playback) = self.playbacks.remove(&id) else {
            return;
        };
        self.release_timers(&playback);
        tracing::debug!(?id, trigger = %playback.trigger, recovered, "playback completed");
        self.events.push(SessionEvent::Completed {
            playback: id,
            trigger: playback.trigger,
            target: playback.target,
            recovered,
        });
    }

    fn release_timers(&mut self, playback: &Playback) {
        for timer in [playback.timer, playback.fallback].into_iter().flatten() {
            self.scheduler.cancel(timer);
        }
    }
}

fn default_easing(config: &MotionConfig) -> EasingFunction {
    EasingFunction::from_name_or(&config.default_easing, EasingFunction::Ease)
}

fn snap<R: StyleRenderer>(renderer: &mut R, target: &str, properties: &PropertySet) {
    let style = renderer.properties_to_style(properties);
    renderer.apply_style(target, style);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::property::PropertyKey;

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        Style(f64),
        Transition(f64, f64),
    }

    #[derive(Default)]
    struct OpacityRenderer {
        calls: Vec<Call>,
    }

    impl StyleRenderer for OpacityRenderer {
        type Style = f64;

        fn properties_to_style(&self, properties: &PropertySet) -> f64 {
            properties
                .get(PropertyKey::Opacity)
                .and_then(|v| v.as_f64())
                .unwrap_or(-1.0)
        }

        fn apply_style(&mut self, _frame_id: &str, style: f64) {
            self.calls.push(Call::Style(style));
        }

        fn apply_transition(&mut self, _frame_id: &str, style: f64, timing: &TransitionTiming) {
            self.calls
                .push(Call::Transition(style, timing.duration_ms.unwrap_or_default()));
        }
    }

    fn fade(labels: &[(&str, f64)]) -> Timeline {
        labels.iter().fold(Timeline::new(), |t, (label, opacity)| {
            t.at(*label, PropertySet::new().with(PropertyKey::Opacity, *opacity))
        })
    }

    #[test]
    fn test_play_unknown_trigger() {
        let mut session = AnimationSession::new();
        assert!(session.play("nope", "a", &PlaybackContext::default()).is_none());
        assert_eq!(session.active_count(), 0);
    }

    #[test]
    fn test_condition_blocks_playback() {
        let mut session = AnimationSession::new();
        session.register(
            "open",
            TimelineAnimation::new(fade(&[("@0s", 0.0), ("@1s", 1.0)]))
                .when(|_, ctx| ctx.variant == "closed"),
        );

        let open = PlaybackContext {
            variant: "open".into(),
            ..PlaybackContext::default()
        };
        assert!(session.play("open", "a", &open).is_none());

        let closed = PlaybackContext {
            variant: "closed".into(),
            ..PlaybackContext::default()
        };
        assert!(session.play("open", "a", &closed).is_some());
    }

    #[test]
    fn test_direct_completes_on_notify() {
        let mut session = AnimationSession::new();
        let mut renderer = OpacityRenderer::default();
        session.register("fade", TimelineAnimation::new(fade(&[("@0s", 0.0), ("@300ms", 1.0)])));

        let id = session.play("fade", "a", &PlaybackContext::default()).unwrap();
        assert!(!session.notify_transition_end(id));

        session.run_pending(&mut renderer);
        assert_eq!(renderer.calls, vec![Call::Style(0.0), Call::Transition(1.0, 300.0)]);

        assert!(session.notify_transition_end(id));
        assert!(!session.is_playing(id));
        let events: Vec<_> = session.drain_events().collect();
        assert!(matches!(events.last(), Some(SessionEvent::Completed { recovered: false, .. })));
    }

    #[test]
    fn test_direct_recovers_by_fallback() {
        let mut session = AnimationSession::new();
        let mut renderer = OpacityRenderer::default();
        session.register(
            "fade",
            TimelineAnimation::new(fade(&[("@0s", 0.0), ("@300ms", 1.0)])).with_delay(50.0),
        );

        let id = session.play("fade", "a", &PlaybackContext::default()).unwrap();
        session.update(449.0, &mut renderer);
        assert!(session.is_playing(id));

        session.update(1.0, &mut renderer);
        assert!(!session.is_playing(id));
        let events: Vec<_> = session.drain_events().collect();
        assert!(matches!(events.last(), Some(SessionEvent::Completed { recovered: true, .. })));
    }

    #[test]
    fn test_keyframes_step_through_segments() {
        let mut session = AnimationSession::new();
        let mut renderer = OpacityRenderer::default();
        session.register(
            "pulse",
            TimelineAnimation::new(fade(&[("@0s", 0.0), ("@100ms", 1.0), ("@300ms", 0.5)]))
                .with_easing(EasingFunction::Linear),
        );

        let id = session.play("pulse", "a", &PlaybackContext::default()).unwrap();
        session.run_pending(&mut renderer);
        assert_eq!(renderer.calls, vec![Call::Style(0.0), Call::Transition(1.0, 100.0)]);

        session.update(99.0, &mut renderer);
        assert_eq!(renderer.calls.len(), 2);

        session.update(1.0, &mut renderer);
        assert_eq!(renderer.calls[2], Call::Transition(0.5, 200.0));
        assert!(!session.is_playing(id));

        let indices: Vec<usize> = session
            .drain_events()
            .filter_map(|e| match e {
                SessionEvent::KeyframeApplied { index, .. } => Some(index),
                _ => None,
            })
            .collect();
        assert_eq!(indices, vec![0, 1, 2]);
    }

    #[test]
    fn test_cleanup_cancels_and_forgets() {
        let mut session = AnimationSession::new();
        let mut renderer = OpacityRenderer::default();
        session.register(
            "pulse",
            TimelineAnimation::new(fade(&[("@0s", 0.0), ("@100ms", 1.0), ("@300ms", 0.5)])),
        );

        let id = session.play("pulse", "a", &PlaybackContext::default()).unwrap();
        session.run_pending(&mut renderer);
        session.cleanup();

        assert!(!session.is_playing(id));
        assert!(!session.has_timeline("pulse"));
        session.update(1000.0, &mut renderer);
        assert_eq!(renderer.calls.len(), 2);
        assert!(matches!(
            session.drain_events().last(),
            Some(SessionEvent::Cancelled { .. })
        ));
    }

    #[test]
    fn test_easing_name_falls_back_to_default() {
        let config = MotionConfig {
            default_easing: "ease-out".into(),
            ..MotionConfig::default()
        };
        let animation = TimelineAnimation::new(Timeline::new()).with_easing_name("wobble", &config);
        assert_eq!(animation.easing, Some(EasingFunction::EaseOut));

        let named = TimelineAnimation::new(Timeline::new()).with_easing_name("linear", &config);
        assert_eq!(named.easing, Some(EasingFunction::Linear));
    }

    #[test]
    fn test_unset_easing_uses_configured_default() {
        let config = MotionConfig {
            default_easing: "linear".into(),
            ..MotionConfig::default()
        };
        let mut session = AnimationSession::with_config(config);
        let mut renderer = OpacityRenderer::default();
        session.register("fade", TimelineAnimation::new(fade(&[("@0s", 0.0), ("@200ms", 1.0)])));

        session.play("fade", "a", &PlaybackContext::default()).unwrap();
        session.run_pending(&mut renderer);

        let plan = &session.playbacks.values().next().unwrap().plan;
        assert!(matches!(
            plan,
            AnimationPlan::Direct { timing, .. } if timing.curve == Some(EasingFunction::Linear)
        ));
        assert_eq!(
            TimelineAnimation::new(Timeline::new()).easing_with(&MotionConfig::default()),
            EasingFunction::Ease
        );
    }
}
