//! Easing functions for animation timing.
//!
//! This module implements the CSS timing functions plus a handful of named
//! polynomial curves:
//! - Linear
//! - Ease, EaseIn, EaseOut, EaseInOut (standard CSS curves)
//! - CubicBezier (custom bezier curves)
//! - Steps (stepped animations)
//! - Quad / Cubic in, out and in-out, BackOut, BounceOut
//!
//! # Usage
//!
//! ```
//! use rune_motion::easing::EasingFunction;
//!
//! let ease = EasingFunction::Ease;
//! let progress = ease.evaluate(0.5);
//!
//! let custom = EasingFunction::from_name("cubic-bezier(0.4, 0, 0.2, 1)").unwrap();
//! let progress = custom.evaluate(0.5);
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{MotionError, Result};

/// Position for stepped animations.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StepPosition {
    /// Jump at the start of each interval (CSS `jump-start` / `start`).
    Start,
    /// Jump at the end of each interval (CSS `jump-end` / `end`).
    #[default]
    End,
    /// Jump at both start and end (CSS `jump-both`).
    Both,
    /// No jump at start or end (CSS `jump-none`).
    None,
}

/// Easing function for animation timing.
///
/// Easing functions map a linear progress value (0.0 to 1.0) to an eased
/// output value, controlling the rate of change over time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EasingFunction {
    /// Linear interpolation (no easing).
    Linear,

    /// CSS `ease`, equivalent to `cubic-bezier(0.25, 0.1, 0.25, 1.0)`.
    #[default]
    Ease,

    /// CSS `ease-in`, equivalent to `cubic-bezier(0.42, 0, 1, 1)`.
    EaseIn,

    /// CSS `ease-out`, equivalent to `cubic-bezier(0, 0, 0.58, 1)`.
    EaseOut,

    /// CSS `ease-in-out`, equivalent to `cubic-bezier(0.42, 0, 0.58, 1)`.
    EaseInOut,

    EaseInQuad,
    EaseOutQuad,
    EaseInOutQuad,
    EaseInCubic,
    EaseOutCubic,
    EaseInOutCubic,

    /// Overshoots the target slightly before settling.
    BackOut,

    /// Bounces against the target like a dropped ball.
    BounceOut,

    /// Custom cubic bezier curve.
    /// x values must be in [0, 1], y values can be any float.
    CubicBezier { x1: f32, y1: f32, x2: f32, y2: f32 },

    /// Stepped animation with discrete jumps.
    Steps { count: u32, position: StepPosition },
}

impl EasingFunction {
    /// Evaluate the easing function at the given progress.
    ///
    /// Input is clamped to [0, 1]. Output may leave that range for
    /// overshooting curves.
    pub fn evaluate(&self, t: f32) -> f32 {
        let t = t.clamp(0.0, 1.0);

        match self {
            Self::Linear => t,
            Self::Ease => cubic_bezier(0.25, 0.1, 0.25, 1.0, t),
            Self::EaseIn => cubic_bezier(0.42, 0.0, 1.0, 1.0, t),
            Self::EaseOut => cubic_bezier(0.0, 0.0, 0.58, 1.0, t),
            Self::EaseInOut => cubic_bezier(0.42, 0.0, 0.58, 1.0, t),
            Self::EaseInQuad => t * t,
            Self::EaseOutQuad => t * (2.0 - t),
            Self::EaseInOutQuad => {
                if t < 0.5 {
                    2.0 * t * t
                } else {
                    -1.0 + (4.0 - 2.0 * t) * t
                }
            }
            Self::EaseInCubic => t * t * t,
            Self::EaseOutCubic => {
                let u = t - 1.0;
                u * u * u + 1.0
            }
            Self::EaseInOutCubic => {
                if t < 0.5 {
                    4.0 * t * t * t
                } else {
                    let u = 2.0 * t - 2.0;
                    0.5 * u * u * u + 1.0
                }
            }
            Self::BackOut => {
                const C1: f32 = 1.70158;
                const C3: f32 = C1 + 1.0;
                let u = t - 1.0;
                1.0 + C3 * u * u * u + C1 * u * u
            }
            Self::BounceOut => bounce_out(t),
            Self::CubicBezier { x1, y1, x2, y2 } => cubic_bezier(*x1, *y1, *x2, *y2, t),
            Self::Steps { count, position } => stepped(*count, *position, t),
        }
    }

    /// Create a custom cubic bezier easing function.
    ///
    /// Fails if x1 or x2 are outside [0, 1].
    pub fn cubic_bezier(x1: f32, y1: f32, x2: f32, y2: f32) -> Result<Self> {
        if !((0.0..=1.0).contains(&x1) && (0.0..=1.0).contains(&x2)) {
            return Err(MotionError::InvalidBezier { x1, x2 });
        }
        Ok(Self::CubicBezier { x1, y1, x2, y2 })
    }

    /// Create a stepped easing function. Fails if `steps` is 0.
    pub fn steps(steps: u32, position: StepPosition) -> Result<Self> {
        if steps == 0 {
            return Err(MotionError::InvalidSteps);
        }
        Ok(Self::Steps {
            count: steps,
            position,
        })
    }

    /// Parse an easing name.
    ///
    /// Accepts kebab-case (`ease-in-out`), camelCase (`easeInOut`),
    /// `cubic-bezier(x1, y1, x2, y2)` and `steps(n[, start|end|both|none])`.
    pub fn from_name(name: &str) -> Result<Self> {
        let trimmed = name.trim();
        let unknown = || MotionError::UnknownEasing(name.to_string());

        if let Some(args) = function_args(trimmed, "cubic-bezier") {
            let values = args
                .iter()
                .map(|a| a.parse::<f32>().map_err(|_| unknown()))
                .collect::<Result<Vec<_>>>()?;
            let [x1, y1, x2, y2] = values[..] else {
                return Err(unknown());
            };
            return Self::cubic_bezier(x1, y1, x2, y2);
        }

        if let Some(args) = function_args(trimmed, "steps") {
            let count = args
                .first()
                .and_then(|a| a.parse::<u32>().ok())
                .ok_or_else(unknown)?;
            let position = match args.get(1).map(|s| s.as_str()) {
                None | Some("end") | Some("jump-end") => StepPosition::End,
                Some("start") | Some("jump-start") => StepPosition::Start,
                Some("jump-both") | Some("both") => StepPosition::Both,
                Some("jump-none") | Some("none") => StepPosition::None,
                Some(_) => return Err(unknown()),
            };
            return Self::steps(count, position);
        }

        let normalized: String = trimmed
            .chars()
            .filter(|c| *c != '-' && *c != '_')
            .flat_map(char::to_lowercase)
            .collect();

        let easing = match normalized.as_str() {
            "linear" => Self::Linear,
            "ease" => Self::Ease,
            "easein" => Self::EaseIn,
            "easeout" => Self::EaseOut,
            "easeinout" => Self::EaseInOut,
            "easeinquad" => Self::EaseInQuad,
            "easeoutquad" => Self::EaseOutQuad,
            "easeinoutquad" => Self::EaseInOutQuad,
            "easeincubic" => Self::EaseInCubic,
            "easeoutcubic" => Self::EaseOutCubic,
            "easeinoutcubic" => Self::EaseInOutCubic,
            "backout" | "easeoutback" => Self::BackOut,
            "bounceout" | "easeoutbounce" => Self::BounceOut,
            _ => return Err(unknown()),
        };
        Ok(easing)
    }

    /// Parse an easing name, falling back to `fallback` when it is unknown.
    pub fn from_name_or(name: &str, fallback: EasingFunction) -> Self {
        Self::from_name(name).unwrap_or_else(|err| {
            tracing::warn!(%err, "falling back to default easing");
            fallback
        })
    }
}

/// Split `name(a, b, c)` into its trimmed arguments.
fn function_args(input: &str, name: &str) -> Option<Vec<String>> {
    let rest = input.strip_prefix(name)?.trim_start();
    let inner = rest.strip_prefix('(')?.strip_suffix(')')?;
    Some(inner.split(',').map(|s| s.trim().to_string()).collect())
}

/// Evaluate a cubic bezier curve at time t.
///
/// Newton-Raphson finds the curve parameter whose x matches the input
/// progress, then the y coordinate at that parameter is returned.
fn cubic_bezier(x1: f32, y1: f32, x2: f32, y2: f32, progress: f32) -> f32 {
    if progress <= 0.0 {
        return 0.0;
    }
    if progress >= 1.0 {
        return 1.0;
    }

    let t = solve_bezier_x(x1, x2, progress);
    bezier_y(y1, y2, t)
}

fn solve_bezier_x(x1: f32, x2: f32, target_x: f32) -> f32 {
    let mut t = target_x;

    for _ in 0..8 {
        let x = bezier_x(x1, x2, t) - target_x;
        if x.abs() < 1e-6 {
            break;
        }

        let dx = bezier_x_derivative(x1, x2, t);
        if dx.abs() < 1e-6 {
            break;
        }

        t -= x / dx;
        t = t.clamp(0.0, 1.0);
    }

    t
}

/// x(t) = 3(1-t)²t·x1 + 3(1-t)t²·x2 + t³
#[inline]
fn bezier_x(x1: f32, x2: f32, t: f32) -> f32 {
    let t2 = t * t;
    let mt = 1.0 - t;
    3.0 * mt * mt * t * x1 + 3.0 * mt * t2 * x2 + t2 * t
}

#[inline]
fn bezier_y(y1: f32, y2: f32, t: f32) -> f32 {
    let t2 = t * t;
    let mt = 1.0 - t;
    3.0 * mt * mt * t * y1 + 3.0 * mt * t2 * y2 + t2 * t
}

/// dx/dt = 3(1-t)²·x1 + 6(1-t)t·(x2-x1) + 3t²·(1-x2)
#[inline]
fn bezier_x_derivative(x1: f32, x2: f32, t: f32) -> f32 {
    let mt = 1.0 - t;
    3.0 * mt * mt * x1 + 6.0 * mt * t * (x2 - x1) + 3.0 * t * t * (1.0 - x2)
}

fn bounce_out(t: f32) -> f32 {
    const N1: f32 = 7.5625;
    const D1: f32 = 2.75;

    if t < 1.0 / D1 {
        N1 * t * t
    } else if t < 2.0 / D1 {
        let u = t - 1.5 / D1;
        N1 * u * u + 0.75
    } else if t < 2.5 / D1 {
        let u = t - 2.25 / D1;
        N1 * u * u + 0.9375
    } else {
        let u = t - 2.625 / D1;
        N1 * u * u + 0.984375
    }
}

fn stepped(steps: u32, position: StepPosition, t: f32) -> f32 {
    if steps == 0 {
        return t;
    }

    let steps_f = steps as f32;

    match position {
        StepPosition::Start => (t * steps_f).ceil() / steps_f,
        StepPosition::End => (t * steps_f).floor() / steps_f,
        StepPosition::Both => {
            let total_steps = steps_f + 1.0;
            ((t * total_steps).floor() / steps_f).min(1.0)
        }
        StepPosition::None => {
            if steps == 1 {
                0.5
            } else {
                let effective_steps = steps_f - 1.0;
                ((t * steps_f).floor() / effective_steps).min(1.0)
            }
        }
    }
}
