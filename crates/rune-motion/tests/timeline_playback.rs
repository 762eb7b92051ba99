use anyhow::Result;
use rune_motion::{
    AnimationPlan, AnimationSession, AnimationStrategy, EasingFunction, MotionConfig,
    PlaybackContext, PropertyKey, PropertySet, PropertyValue, SessionEvent, StyleRenderer,
    Timeline, TimelineAnimation, TransitionRegistry, TransitionTiming, analyze_performance_impact,
    choose_strategy, interpolate, parse_timeline, plan_animation,
};

fn opacity_of(set: &PropertySet) -> Option<f64> {
    set.get(PropertyKey::Opacity).and_then(PropertyValue::as_f64)
}

#[test]
fn timeline_normalizes_against_total_duration() -> Result<()> {
    let timeline: Timeline = serde_json::from_str(
        r#"{
            "@0.5s": {"appearance": {"opacity": 0.5}},
            "@1s":   {"appearance": {"opacity": 1}}
        }"#,
    )?;

    let keyframes = parse_timeline(&timeline, 1000.0);
    let offsets: Vec<f32> = keyframes.iter().map(|k| k.offset).collect();
    assert_eq!(offsets, vec![0.0, 0.5, 1.0]);
    assert!(keyframes[0].properties.is_empty());
    assert_eq!(opacity_of(&keyframes[2].properties), Some(1.0));
    Ok(())
}

#[test]
fn short_timeline_holds_last_value_to_the_end() -> Result<()> {
    let timeline: Timeline = serde_json::from_str(
        r#"{"@0s": {"size": {"width": "10px"}}, "@400ms": {"size": {"width": "20px"}}}"#,
    )?;

    let keyframes = parse_timeline(&timeline, 1000.0);
    assert_eq!(keyframes.len(), 2);
    assert_eq!(keyframes[1].offset, 1.0);
    assert_eq!(keyframes[1].time_ms, 1000.0);
    assert_eq!(
        keyframes[1].properties.get(PropertyKey::Width),
        Some(&PropertyValue::dimension(20.0, "px"))
    );
    Ok(())
}

#[test]
fn unparseable_labels_collapse_to_start() -> Result<()> {
    let timeline: Timeline = serde_json::from_str(
        r#"{"soon": {"appearance": {"opacity": 0.2}}, "@1s": {"appearance": {"opacity": 1}}}"#,
    )?;

    let keyframes = parse_timeline(&timeline, 1000.0);
    assert_eq!(keyframes.len(), 2);
    assert_eq!(keyframes[0].offset, 0.0);
    assert_eq!(keyframes[0].label.as_deref(), Some("soon"));
    Ok(())
}

#[test]
fn interpolation_hits_endpoints_and_midpoint() {
    let a = PropertySet::new()
        .with(PropertyKey::PositionX, 0.0)
        .with(PropertyKey::Opacity, 0.5);
    let b = PropertySet::new()
        .with(PropertyKey::PositionX, 10.0)
        .with(PropertyKey::Opacity, 1.0);

    assert_eq!(interpolate(&a, &b, 0.0, EasingFunction::Linear), a);
    assert_eq!(interpolate(&a, &b, 1.0, EasingFunction::Linear), b);

    let mid = interpolate(&a, &b, 0.5, EasingFunction::Linear);
    assert_eq!(mid.get(PropertyKey::PositionX), Some(&PropertyValue::Number(5.0)));
}

#[test]
fn interpolation_keeps_units_and_switches_keywords() -> Result<()> {
    let a: PropertySet = serde_json::from_str(
        r#"{"size": {"padding": "8px"}, "typography": {"fontWeight": "normal"}}"#,
    )?;
    let b: PropertySet = serde_json::from_str(
        r#"{"size": {"padding": "16rem"}, "typography": {"fontWeight": "bold"}}"#,
    )?;

    let quarter = interpolate(&a, &b, 0.25, EasingFunction::Linear);
    assert_eq!(quarter.get(PropertyKey::Padding), Some(&PropertyValue::dimension(10.0, "px")));
    assert_eq!(quarter.get(PropertyKey::FontWeight), Some(&PropertyValue::keyword("normal")));

    let late = interpolate(&a, &b, 0.75, EasingFunction::Linear);
    assert_eq!(late.get(PropertyKey::FontWeight), Some(&PropertyValue::keyword("bold")));
    Ok(())
}

fn anchors(count: usize) -> Timeline {
    (0..count).fold(Timeline::new(), |timeline, i| {
        timeline.at(
            format!("@{}ms", i * 50),
            PropertySet::new().with(PropertyKey::Opacity, 1.0),
        )
    })
}

#[test]
fn strategy_follows_timeline_shape() {
    assert_eq!(choose_strategy(&anchors(2)), AnimationStrategy::DirectTransition);
    assert_eq!(choose_strategy(&anchors(5)), AnimationStrategy::Keyframe);
    assert_eq!(choose_strategy(&anchors(11)), AnimationStrategy::ManualInterpolation);
}

#[test]
fn performance_report_flags_layout_and_paint() -> Result<()> {
    let timeline: Timeline = serde_json::from_str(
        r##"{
            "@0s":   {"size": {"height": 40}, "effects": {"shadowBlur": 0}},
            "@0.3s": {
                "size": {"height": 80},
                "effects": {"shadowBlur": 12},
                "fill": {"color": "#123456"}
            }
        }"##,
    )?;

    let report = analyze_performance_impact(&timeline);
    assert_eq!(report.score, 60);
    assert_eq!(report.warnings.len(), 3);
    assert_eq!(choose_strategy(&timeline), AnimationStrategy::DirectTransition);
    Ok(())
}

#[derive(Debug, Clone, PartialEq)]
enum Op {
    Snap(String, Option<f64>),
    Transition(String, Option<f64>, TransitionTiming),
}

#[derive(Default)]
struct RecordingRenderer {
    ops: Vec<Op>,
}

impl StyleRenderer for RecordingRenderer {
    type Style = Option<f64>;

    fn properties_to_style(&self, properties: &PropertySet) -> Option<f64> {
        opacity_of(properties)
    }

    fn apply_style(&mut self, frame_id: &str, style: Option<f64>) {
        self.ops.push(Op::Snap(frame_id.to_string(), style));
    }

    fn apply_transition(&mut self, frame_id: &str, style: Option<f64>, timing: &TransitionTiming) {
        self.ops.push(Op::Transition(frame_id.to_string(), style, *timing));
    }
}

#[test]
fn session_waits_for_delay_then_steps_keyframes() -> Result<()> {
    let timeline: Timeline = serde_json::from_str(
        r#"{
            "@0ms":   {"appearance": {"opacity": 0}},
            "@200ms": {"appearance": {"opacity": 1}},
            "@500ms": {"appearance": {"opacity": 0.5}}
        }"#,
    )?;

    let mut session = AnimationSession::new();
    let mut renderer = RecordingRenderer::default();
    session.register(
        "reveal",
        TimelineAnimation::new(timeline)
            .with_delay(100.0)
            .with_easing(EasingFunction::EaseOut),
    );

    let id = session
        .play("reveal", "panel", &PlaybackContext::default())
        .expect("timeline registered");

    session.update(99.0, &mut renderer);
    assert!(renderer.ops.is_empty());

    session.update(1.0, &mut renderer);
    assert_eq!(
        renderer.ops,
        vec![
            Op::Snap("panel".into(), Some(0.0)),
            Op::Transition(
                "panel".into(),
                Some(1.0),
                TransitionTiming::new(200.0, EasingFunction::EaseOut)
            ),
        ]
    );

    session.update(200.0, &mut renderer);
    assert_eq!(
        renderer.ops.last(),
        Some(&Op::Transition(
            "panel".into(),
            Some(0.5),
            TransitionTiming::new(300.0, EasingFunction::EaseOut)
        ))
    );
    assert!(!session.is_playing(id));

    let events: Vec<_> = session.drain_events().collect();
    assert!(matches!(
        events.first(),
        Some(SessionEvent::Started {
            strategy: AnimationStrategy::Keyframe,
            ..
        })
    ));
    assert!(matches!(
        events.last(),
        Some(SessionEvent::Completed { recovered: false, .. })
    ));
    Ok(())
}

#[test]
fn manual_playback_commits_sampled_frames() {
    let config = MotionConfig {
        keyframe_anchor_limit: 2,
        frame_interval_ms: 25.0,
        ..MotionConfig::default()
    };
    let timeline = Timeline::new()
        .at("@0ms", PropertySet::new().with(PropertyKey::Opacity, 0.0))
        .at("@50ms", PropertySet::new().with(PropertyKey::Opacity, 1.0))
        .at("@100ms", PropertySet::new().with(PropertyKey::Opacity, 0.0));

    let plan = plan_animation(&timeline, 100.0, EasingFunction::Linear, &config);
    assert!(matches!(&plan, AnimationPlan::Manual { frames } if frames.len() == 5));

    let mut session = AnimationSession::with_config(config);
    let mut renderer = RecordingRenderer::default();
    session.register("blink", TimelineAnimation::new(timeline).with_easing(EasingFunction::Linear));
    let id = session
        .play("blink", "dot", &PlaybackContext::default())
        .expect("timeline registered");

    session.update(100.0, &mut renderer);
    let snaps: Vec<Option<f64>> = renderer
        .ops
        .iter()
        .filter_map(|op| match op {
            Op::Snap(_, style) => Some(*style),
            Op::Transition(..) => None,
        })
        .collect();
    assert_eq!(snaps, vec![Some(0.0), Some(0.5), Some(1.0), Some(0.5), Some(0.0)]);
    assert!(!session.is_playing(id));
}

#[test]
fn stalled_direct_transition_completes_by_fallback() {
    let mut session = AnimationSession::new();
    let mut renderer = RecordingRenderer::default();
    session.register(
        "fade",
        TimelineAnimation::new(
            Timeline::new()
                .at("@0s", PropertySet::new().with(PropertyKey::Opacity, 0.0))
                .at("@0.2s", PropertySet::new().with(PropertyKey::Opacity, 1.0)),
        ),
    );

    let id = session
        .play("fade", "toast", &PlaybackContext::default())
        .expect("timeline registered");
    session.update(299.0, &mut renderer);
    assert!(session.is_playing(id));

    session.update(1.0, &mut renderer);
    assert!(!session.is_playing(id));
    assert!(session.drain_events().any(|e| matches!(
        e,
        SessionEvent::Completed { recovered: true, .. }
    )));
}

#[test]
fn playback_on_registry_frames() {
    let mut registry = TransitionRegistry::new();
    registry.register_frame("drawer", "closed");

    let mut session = AnimationSession::new();
    session.register(
        "slide",
        TimelineAnimation::new(anchors(3)).when(|_, ctx| ctx.variant == "open"),
    );

    assert!(session.play_on(&registry, "slide", "ghost").is_none());
    assert!(session.play_on(&registry, "slide", "drawer").is_none());

    registry.set_variant("drawer", "open");
    assert!(session.play_on(&registry, "slide", "drawer").is_some());
}
