//! Strategy selection and performance heuristics for timeline playback.
//!
//! `choose_strategy` looks only at the timeline's shape; the performance
//! report is advisory and never feeds back into the choice.

use rune_config::{MotionConfig, PerformanceConfig};
use serde::{Deserialize, Serialize};

use crate::easing::EasingFunction;
use crate::interpolate::sample_frames;
use crate::property::{PropertyKey, PropertySet};
use crate::rule::TransitionTiming;
use crate::timeline::{Keyframe, Timeline, parse_timeline};

/// How a timeline is executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnimationStrategy {
    /// Two style snapshots and one native property transition.
    DirectTransition,
    /// All anchors as one declarative keyframe animation.
    Keyframe,
    /// Program-driven frame stepping.
    ManualInterpolation,
}

/// Pick a strategy with the default anchor limit.
pub fn choose_strategy(timeline: &Timeline) -> AnimationStrategy {
    choose_strategy_with(timeline, &MotionConfig::default())
}

pub fn choose_strategy_with(timeline: &Timeline, config: &MotionConfig) -> AnimationStrategy {
    let anchors = timeline.anchor_count();
    let strategy = if anchors == 2 && timeline.has_anchor_at_start() {
        AnimationStrategy::DirectTransition
    } else if anchors <= config.keyframe_anchor_limit {
        AnimationStrategy::Keyframe
    } else {
        AnimationStrategy::ManualInterpolation
    };
    tracing::trace!(anchors, ?strategy, "strategy chosen");
    strategy
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImpactKind {
    /// Forces layout recomputation.
    Layout,
    /// Expensive to paint but layout-neutral.
    Paint,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceWarning {
    pub key: PropertyKey,
    pub kind: ImpactKind,
    pub message: String,
    pub recommendation: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceReport {
    /// 100 for a free animation, floored at 0.
    pub score: u32,
    pub warnings: Vec<PerformanceWarning>,
}

impl PerformanceReport {
    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }

    /// Warning and recommendation text, one line per flagged property.
    pub fn messages(&self) -> Vec<String> {
        self.warnings
            .iter()
            .map(|w| format!("{} {}", w.message, w.recommendation))
            .collect()
    }
}

pub fn analyze_performance_impact(timeline: &Timeline) -> PerformanceReport {
    analyze_performance_impact_with(timeline, &PerformanceConfig::default())
}

/// Score a timeline by the properties it animates.
///
/// Each distinct layout-affecting property costs `layout_penalty`, each
/// paint-heavy one `paint_penalty`.
pub fn analyze_performance_impact_with(
    timeline: &Timeline,
    config: &PerformanceConfig,
) -> PerformanceReport {
    let mut score: u32 = 100;
    let mut warnings = Vec::new();

    for key in timeline.touched_keys() {
        let warning = if key.affects_layout() {
            score = score.saturating_sub(config.layout_penalty);
            PerformanceWarning {
                key,
                kind: ImpactKind::Layout,
                message: format!("Animating {key} forces layout on every frame."),
                recommendation: layout_recommendation(key).to_string(),
            }
        } else if key.is_paint_heavy() {
            score = score.saturating_sub(config.paint_penalty);
            PerformanceWarning {
                key,
                kind: ImpactKind::Paint,
                message: format!("Animating {key} is expensive to repaint."),
                recommendation: paint_recommendation(key).to_string(),
            }
        } else {
            continue;
        };
        tracing::debug!(property = %key, kind = ?warning.kind, "performance warning");
        warnings.push(warning);
    }

    PerformanceReport { score, warnings }
}

fn layout_recommendation(key: PropertyKey) -> &'static str {
    match key {
        PropertyKey::PositionX | PropertyKey::PositionY => {
            "Prefer a transform translation over moving the frame."
        }
        PropertyKey::Width | PropertyKey::Height => "Prefer a scale transform over resizing.",
        PropertyKey::FontSize | PropertyKey::LineHeight | PropertyKey::LetterSpacing => {
            "Avoid animating text metrics; cross-fade between variants instead."
        }
        _ => "Keep spacing static while animating.",
    }
}

fn paint_recommendation(key: PropertyKey) -> &'static str {
    match key {
        PropertyKey::ShadowX
        | PropertyKey::ShadowY
        | PropertyKey::ShadowBlur
        | PropertyKey::ShadowColor => "Fade a pre-rendered shadow layer's opacity instead.",
        PropertyKey::Blur => "Keep blur radii static or animate a cached layer.",
        PropertyKey::CornerRadius => "Keep corner radii static during motion.",
        _ => "Animate opacity of an overlay instead of the fill itself.",
    }
}

/// A timed frame of a manual interpolation loop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimedFrame {
    /// Offset from playback start in milliseconds.
    pub time_ms: f64,
    pub properties: PropertySet,
}

/// An executable playback plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum AnimationPlan {
    Direct {
        from: PropertySet,
        to: PropertySet,
        timing: TransitionTiming,
    },
    Keyframes {
        keyframes: Vec<Keyframe>,
        easing: EasingFunction,
    },
    Manual {
        frames: Vec<TimedFrame>,
    },
}

impl AnimationPlan {
    pub fn strategy(&self) -> AnimationStrategy {
        match self {
            Self::Direct { .. } => AnimationStrategy::DirectTransition,
            Self::Keyframes { .. } => AnimationStrategy::Keyframe,
            Self::Manual { .. } => AnimationStrategy::ManualInterpolation,
        }
    }

    /// Property set shown once playback ends.
    pub fn final_properties(&self) -> Option<&PropertySet> {
        match self {
            Self::Direct { to, .. } => Some(to),
            Self::Keyframes { keyframes, .. } => keyframes.last().map(|k| &k.properties),
            Self::Manual { frames } => frames.last().map(|f| &f.properties),
        }
    }
}

/// Turn a timeline into a plan for the strategy `choose_strategy_with` picks.
pub fn plan_animation(
    timeline: &Timeline,
    duration_ms: f64,
    easing: EasingFunction,
    config: &MotionConfig,
) -> AnimationPlan {
    let keyframes = parse_timeline(timeline, duration_ms);

    match choose_strategy_with(timeline, config) {
        AnimationStrategy::DirectTransition => {
            let from = keyframes.first().map(|k| k.properties.clone()).unwrap_or_default();
            let to = keyframes.last().map(|k| k.properties.clone()).unwrap_or_default();
            AnimationPlan::Direct {
                from,
                to,
                timing: TransitionTiming::new(duration_ms.max(0.0), easing),
            }
        }
        AnimationStrategy::Keyframe => AnimationPlan::Keyframes { keyframes, easing },
        AnimationStrategy::ManualInterpolation => AnimationPlan::Manual {
            frames: sample_keyframes(&keyframes, easing, config.frame_interval_ms),
        },
    }
}

/// Sample each keyframe segment at roughly `frame_interval_ms`.
fn sample_keyframes(
    keyframes: &[Keyframe],
    easing: EasingFunction,
    frame_interval_ms: f64,
) -> Vec<TimedFrame> {
    let mut frames: Vec<TimedFrame> = keyframes
        .first()
        .map(|k| TimedFrame {
            time_ms: k.time_ms,
            properties: k.properties.clone(),
        })
        .into_iter()
        .collect();

    for pair in keyframes.windows(2) {
        let (from, to) = (&pair[0], &pair[1]);
        let span = (to.time_ms - from.time_ms).max(0.0);
        let steps = if frame_interval_ms > 0.0 {
            ((span / frame_interval_ms).ceil() as usize).max(1)
        } else {
            1
        };

        // Frame 0 of each segment duplicates the previous segment's last frame.
        let samples = sample_frames(&from.properties, &to.properties, steps, easing);
        for (i, properties) in samples.into_iter().enumerate().skip(1) {
            frames.push(TimedFrame {
                time_ms: from.time_ms + span * i as f64 / steps as f64,
                properties,
            });
        }
    }

    frames
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::property::PropertyValue;

    fn anchors(count: usize) -> Timeline {
        (0..count).fold(Timeline::new(), |timeline, i| {
            timeline.at(
                format!("@{}ms", i * 100),
                PropertySet::new().with(PropertyKey::Opacity, i as f64 / count as f64),
            )
        })
    }

    #[test]
    fn test_strategy_selection() {
        assert_eq!(choose_strategy(&anchors(2)), AnimationStrategy::DirectTransition);
        assert_eq!(choose_strategy(&anchors(5)), AnimationStrategy::Keyframe);
        assert_eq!(choose_strategy(&anchors(10)), AnimationStrategy::Keyframe);
        assert_eq!(choose_strategy(&anchors(11)), AnimationStrategy::ManualInterpolation);
    }

    #[test]
    fn test_two_anchors_without_start_use_keyframes() {
        let timeline = Timeline::new()
            .at("@0.5s", PropertySet::new().with(PropertyKey::Opacity, 0.5))
            .at("@1s", PropertySet::new().with(PropertyKey::Opacity, 1.0));
        assert_eq!(choose_strategy(&timeline), AnimationStrategy::Keyframe);
    }

    #[test]
    fn test_anchor_limit_is_configurable() {
        let config = MotionConfig {
            keyframe_anchor_limit: 3,
            ..MotionConfig::default()
        };
        assert_eq!(
            choose_strategy_with(&anchors(4), &config),
            AnimationStrategy::ManualInterpolation
        );
    }

    #[test]
    fn test_performance_report() {
        let timeline = Timeline::new()
            .at(
                "@0s",
                PropertySet::new()
                    .with(PropertyKey::Width, 10.0)
                    .with(PropertyKey::Opacity, 0.0),
            )
            .at(
                "@1s",
                PropertySet::new()
                    .with(PropertyKey::Width, 20.0)
                    .with(PropertyKey::ShadowBlur, 4.0),
            );

        let report = analyze_performance_impact(&timeline);
        assert_eq!(report.score, 70);
        assert_eq!(report.warnings.len(), 2);
        assert!(
            report
                .warnings
                .iter()
                .any(|w| w.kind == ImpactKind::Layout && w.key == PropertyKey::Width)
        );
        assert!(report.warnings.iter().any(|w| w.kind == ImpactKind::Paint));
        assert!(report.messages()[0].contains("size.width"));
        // Messages use the names written in timeline JSON.
        assert!(report.messages().iter().any(|m| m.contains("effects.shadowBlur")));
    }

    #[test]
    fn test_cheap_timeline_is_clean() {
        let report = analyze_performance_impact(&anchors(3));
        assert_eq!(report.score, 100);
        assert!(report.is_clean());
    }

    #[test]
    fn test_score_floors_at_zero() {
        let heavy = PropertySet::new()
            .with(PropertyKey::PositionX, 1.0)
            .with(PropertyKey::PositionY, 1.0)
            .with(PropertyKey::Width, 1.0)
            .with(PropertyKey::Height, 1.0)
            .with(PropertyKey::Padding, 1.0)
            .with(PropertyKey::Gap, 1.0);
        let report = analyze_performance_impact(&Timeline::new().at("@0s", heavy));
        assert_eq!(report.score, 0);
        assert_eq!(report.warnings.len(), 6);
    }

    #[test]
    fn test_report_does_not_change_strategy() {
        let timeline = Timeline::new()
            .at("@0s", PropertySet::new().with(PropertyKey::Width, 0.0))
            .at("@1s", PropertySet::new().with(PropertyKey::Width, 100.0));
        assert!(!analyze_performance_impact(&timeline).is_clean());
        assert_eq!(choose_strategy(&timeline), AnimationStrategy::DirectTransition);
    }

    #[test]
    fn test_plan_direct() {
        let timeline = Timeline::new()
            .at("@0s", PropertySet::new().with(PropertyKey::Opacity, 0.0))
            .at("@300ms", PropertySet::new().with(PropertyKey::Opacity, 1.0));

        let plan = plan_animation(
            &timeline,
            300.0,
            EasingFunction::EaseOut,
            &MotionConfig::default(),
        );
        let AnimationPlan::Direct { from, to, timing } = plan else {
            panic!("expected a direct plan");
        };
        assert_eq!(from.get(PropertyKey::Opacity), Some(&PropertyValue::Number(0.0)));
        assert_eq!(to.get(PropertyKey::Opacity), Some(&PropertyValue::Number(1.0)));
        assert_eq!(timing.duration_ms, Some(300.0));
        assert_eq!(timing.curve, Some(EasingFunction::EaseOut));
    }

    #[test]
    fn test_plan_manual_samples_every_segment() {
        let config = MotionConfig {
            keyframe_anchor_limit: 1,
            frame_interval_ms: 50.0,
            ..MotionConfig::default()
        };
        let timeline = Timeline::new()
            .at("@0ms", PropertySet::new().with(PropertyKey::PositionX, 0.0))
            .at("@100ms", PropertySet::new().with(PropertyKey::PositionX, 10.0))
            .at("@200ms", PropertySet::new().with(PropertyKey::PositionX, 0.0));

        let plan = plan_animation(&timeline, 200.0, EasingFunction::Linear, &config);
        assert_eq!(plan.strategy(), AnimationStrategy::ManualInterpolation);
        let AnimationPlan::Manual { frames } = &plan else {
            panic!("expected a manual plan");
        };

        let times: Vec<f64> = frames.iter().map(|f| f.time_ms).collect();
        assert_eq!(times, vec![0.0, 50.0, 100.0, 150.0, 200.0]);
        let xs: Vec<f64> = frames
            .iter()
            .filter_map(|f| {
                f.properties
                    .get(PropertyKey::PositionX)
                    .and_then(PropertyValue::as_f64)
            })
            .collect();
        assert_eq!(xs, vec![0.0, 5.0, 10.0, 5.0, 0.0]);
        assert_eq!(
            plan.final_properties().and_then(|p| p.get(PropertyKey::PositionX)),
            Some(&PropertyValue::Number(0.0))
        );
    }
}
