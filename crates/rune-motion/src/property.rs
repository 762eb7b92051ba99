//! Presentation property sets.
//!
//! This module defines the data a variant or a timeline anchor carries:
//! - `PropertyValue`: a single leaf (number, unit-bearing dimension, color, keyword)
//! - `PropertyKey`: typed identifier for every known leaf
//! - Category structs (`Position`, `Size`, `Appearance`, `Fill`, `Stroke`,
//!   `Typography`, `Effects`), each holding only the leaves actually specified
//! - `PropertySet`: the sparse union of all categories
//!
//! Unspecified leaves stay `None`. Merging and interpolation never invent
//! defaults for them.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{MotionError, Result};
use crate::interpolate::{Interpolate, interpolate_leaf};

/// A single presentation value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawPropertyValue", into = "RawPropertyValue")]
pub enum PropertyValue {
    /// Plain number (opacity, z-index, font weight).
    Number(f64),
    /// Number with a unit suffix such as `12px`, `50%` or `1.5em`.
    Dimension { value: f64, unit: String },
    /// RGBA color, straight alpha, components in [0, 1].
    Color([f32; 4]),
    /// Discrete value that cannot be blended (`bold`, `solid`, `center`).
    Keyword(String),
}

impl PropertyValue {
    /// Build a dimension value.
    pub fn dimension(value: f64, unit: impl Into<String>) -> Self {
        Self::Dimension {
            value,
            unit: unit.into(),
        }
    }

    /// Build a keyword value.
    pub fn keyword(value: impl Into<String>) -> Self {
        Self::Keyword(value.into())
    }

    /// Parse a string leaf.
    ///
    /// `#...` strings must be valid hex colors. Strings that start with a
    /// number become dimensions. Everything else is a keyword.
    pub fn parse(input: &str) -> Result<Self> {
        let text = input.trim();
        if text.is_empty() {
            return Err(MotionError::InvalidPropertyValue(input.to_string()));
        }
        if text.starts_with('#') {
            return parse_hex_color(text).map(Self::Color);
        }
        if let Some((value, unit)) = split_dimension(text) {
            return Ok(Self::Dimension {
                value,
                unit: unit.to_string(),
            });
        }
        Ok(Self::Keyword(text.to_string()))
    }

    /// The numeric part of a number or dimension.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(v) | Self::Dimension { value: v, .. } => Some(*v),
            _ => None,
        }
    }

    pub fn as_color(&self) -> Option<[f32; 4]> {
        match self {
            Self::Color(rgba) => Some(*rgba),
            _ => None,
        }
    }

    /// Returns true if this value can be blended continuously.
    pub fn is_continuous(&self) -> bool {
        !matches!(self, Self::Keyword(_))
    }
}

impl From<f64> for PropertyValue {
    fn from(v: f64) -> Self {
        Self::Number(v)
    }
}

impl From<[f32; 4]> for PropertyValue {
    fn from(c: [f32; 4]) -> Self {
        Self::Color(c)
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(v) => write!(f, "{}", v),
            Self::Dimension { value, unit } => write!(f, "{}{}", value, unit),
            Self::Color(rgba) => f.write_str(&format_hex_color(*rgba)),
            Self::Keyword(k) => f.write_str(k),
        }
    }
}

/// Wire form of a leaf: JSON/TOML numbers and strings.
#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum RawPropertyValue {
    Number(f64),
    Text(String),
}

impl TryFrom<RawPropertyValue> for PropertyValue {
    type Error = MotionError;

    fn try_from(raw: RawPropertyValue) -> Result<Self> {
        match raw {
            RawPropertyValue::Number(v) if v.is_finite() => Ok(Self::Number(v)),
            RawPropertyValue::Number(v) => Err(MotionError::InvalidPropertyValue(v.to_string())),
            RawPropertyValue::Text(s) => Self::parse(&s),
        }
    }
}

impl From<PropertyValue> for RawPropertyValue {
    fn from(value: PropertyValue) -> Self {
        match value {
            PropertyValue::Number(v) => Self::Number(v),
            other => Self::Text(other.to_string()),
        }
    }
}

/// Split `"12.5px"` into `(12.5, "px")`. The suffix must be alphabetic or `%`.
fn split_dimension(text: &str) -> Option<(f64, &str)> {
    // Keeps `inf`/`nan` style keywords out of the numeric path. Signed forms
    // like `-inf` get past this check and are caught by the finiteness filter.
    let first = text.chars().next()?;
    if !(first.is_ascii_digit() || matches!(first, '.' | '-' | '+')) {
        return None;
    }

    (1..=text.len())
        .rev()
        .filter(|&i| text.is_char_boundary(i))
        .find_map(|i| {
            let (number, unit) = text.split_at(i);
            let value = number.parse::<f64>().ok().filter(|v| v.is_finite())?;
            unit.chars()
                .all(|c| c.is_ascii_alphabetic() || c == '%')
                .then_some((value, unit))
        })
}

fn parse_hex_color(text: &str) -> Result<[f32; 4]> {
    let invalid = || MotionError::InvalidColor(text.to_string());
    let hex = text.strip_prefix('#').ok_or_else(invalid)?;
    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(invalid());
    }

    let expanded: String = match hex.len() {
        3 | 4 => hex.chars().flat_map(|c| [c, c]).collect(),
        6 | 8 => hex.to_string(),
        _ => return Err(invalid()),
    };

    let mut rgba = [0.0, 0.0, 0.0, 1.0];
    for (i, channel) in rgba.iter_mut().enumerate().take(expanded.len() / 2) {
        let byte = u8::from_str_radix(&expanded[i * 2..i * 2 + 2], 16).map_err(|_| invalid())?;
        *channel = byte as f32 / 255.0;
    }
    Ok(rgba)
}

fn format_hex_color(rgba: [f32; 4]) -> String {
    let [r, g, b, a] = rgba.map(|c| (c.clamp(0.0, 1.0) * 255.0).round() as u8);
    if a == 255 {
        format!("#{:02x}{:02x}{:02x}", r, g, b)
    } else {
        format!("#{:02x}{:02x}{:02x}{:02x}", r, g, b, a)
    }
}

/// The presentation categories a property set is divided into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropertyCategory {
    Position,
    Size,
    Appearance,
    Fill,
    Stroke,
    Typography,
    Effects,
}

impl PropertyCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Position => "position",
            Self::Size => "size",
            Self::Appearance => "appearance",
            Self::Fill => "fill",
            Self::Stroke => "stroke",
            Self::Typography => "typography",
            Self::Effects => "effects",
        }
    }
}

/// Typed identifier for every known property leaf.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropertyKey {
    // Position
    PositionX,
    PositionY,
    Rotation,
    Scale,
    ZIndex,

    // Size and spacing
    Width,
    Height,
    Padding,
    Gap,

    // Appearance
    Opacity,
    CornerRadius,
    Visibility,

    // Fill
    FillColor,

    // Stroke
    StrokeColor,
    StrokeWidth,
    StrokeStyle,

    // Typography
    FontSize,
    FontWeight,
    LineHeight,
    LetterSpacing,
    TextColor,
    TextAlign,

    // Effects
    ShadowX,
    ShadowY,
    ShadowBlur,
    ShadowColor,
    Blur,
}

impl PropertyKey {
    /// The category this leaf lives in.
    pub fn category(&self) -> PropertyCategory {
        match self {
            Self::PositionX | Self::PositionY | Self::Rotation | Self::Scale | Self::ZIndex => {
                PropertyCategory::Position
            }
            Self::Width | Self::Height | Self::Padding | Self::Gap => PropertyCategory::Size,
            Self::Opacity | Self::CornerRadius | Self::Visibility => PropertyCategory::Appearance,
            Self::FillColor => PropertyCategory::Fill,
            Self::StrokeColor | Self::StrokeWidth | Self::StrokeStyle => PropertyCategory::Stroke,
            Self::FontSize
            | Self::FontWeight
            | Self::LineHeight
            | Self::LetterSpacing
            | Self::TextColor
            | Self::TextAlign => PropertyCategory::Typography,
            Self::ShadowX | Self::ShadowY | Self::ShadowBlur | Self::ShadowColor | Self::Blur => {
                PropertyCategory::Effects
            }
        }
    }

    /// Returns true if changing this leaf forces layout recomputation.
    pub fn affects_layout(&self) -> bool {
        matches!(
            self,
            Self::PositionX
                | Self::PositionY
                | Self::Width
                | Self::Height
                | Self::Padding
                | Self::Gap
                | Self::FontSize
                | Self::LineHeight
                | Self::LetterSpacing
        )
    }

    /// Returns true if this leaf is visual-only but expensive to repaint.
    pub fn is_paint_heavy(&self) -> bool {
        matches!(
            self,
            Self::CornerRadius
                | Self::FillColor
                | Self::ShadowX
                | Self::ShadowY
                | Self::ShadowBlur
                | Self::ShadowColor
                | Self::Blur
        )
    }

    /// Dotted path in wire spelling, such as `size.width` or `effects.shadowBlur`.
    pub fn path(&self) -> String {
        let field = match self.category() {
            PropertyCategory::Position => Position::field_name(*self),
            PropertyCategory::Size => Size::field_name(*self),
            PropertyCategory::Appearance => Appearance::field_name(*self),
            PropertyCategory::Fill => Fill::field_name(*self),
            PropertyCategory::Stroke => Stroke::field_name(*self),
            PropertyCategory::Typography => Typography::field_name(*self),
            PropertyCategory::Effects => Effects::field_name(*self),
        };
        format!(
            "{}.{}",
            self.category().as_str(),
            camel_case(field.unwrap_or("?"))
        )
    }
}

/// `shadow_blur` to `shadowBlur`, matching the serde field names.
fn camel_case(field: &str) -> String {
    let mut out = String::with_capacity(field.len());
    let mut upper = false;
    for c in field.chars() {
        if c == '_' {
            upper = true;
        } else if upper {
            out.push(c.to_ascii_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    out
}

impl fmt::Display for PropertyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}

/// Declares one property category: a struct of optional leaves with its
/// per-category merge, interpolation and key lookup.
macro_rules! property_category {
    (
        $(#[$meta:meta])*
        $name:ident { $( $(#[$fmeta:meta])* $field:ident => $key:ident ),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
        #[serde(default, rename_all = "camelCase")]
        pub struct $name {
            $(
                $(#[$fmeta])*
                #[serde(skip_serializing_if = "Option::is_none")]
                pub $field: Option<PropertyValue>,
            )+
        }

        impl $name {
            const FIELDS: &'static [(PropertyKey, &'static str)] =
                &[ $( (PropertyKey::$key, stringify!($field)) ),+ ];

            /// Returns true if no leaf is set.
            pub fn is_empty(&self) -> bool {
                true $( && self.$field.is_none() )+
            }

            /// Overlay `other` on `self`; leaves set in `other` win.
            pub fn merge(&self, other: &Self) -> Self {
                Self {
                    $( $field: other.$field.clone().or_else(|| self.$field.clone()), )+
                }
            }

            /// Iterate over the leaves that are set.
            pub fn entries(&self) -> impl Iterator<Item = (PropertyKey, &PropertyValue)> {
                [ $( (PropertyKey::$key, self.$field.as_ref()) ),+ ]
                    .into_iter()
                    .filter_map(|(key, value)| value.map(|v| (key, v)))
            }

            pub fn get(&self, key: PropertyKey) -> Option<&PropertyValue> {
                match key {
                    $( PropertyKey::$key => self.$field.as_ref(), )+
                    #[allow(unreachable_patterns)]
                    _ => None,
                }
            }

            /// Set a leaf. Returns false if the key belongs to another category.
            pub fn set(&mut self, key: PropertyKey, value: PropertyValue) -> bool {
                match key {
                    $( PropertyKey::$key => { self.$field = Some(value); true } )+
                    #[allow(unreachable_patterns)]
                    _ => false,
                }
            }

            fn field_name(key: PropertyKey) -> Option<&'static str> {
                Self::FIELDS.iter().find(|(k, _)| *k == key).map(|(_, name)| *name)
            }
        }

        impl Interpolate for $name {
            fn interpolate(&self, to: &Self, t: f32) -> Self {
                Self {
                    $( $field: interpolate_leaf(&self.$field, &to.$field, t), )+
                }
            }
        }
    };
}

property_category! {
    /// Placement of the frame.
    Position {
        x => PositionX,
        y => PositionY,
        /// Rotation in degrees.
        rotation => Rotation,
        scale => Scale,
        z_index => ZIndex,
    }
}

property_category! {
    /// Box size and spacing.
    Size {
        width => Width,
        height => Height,
        padding => Padding,
        gap => Gap,
    }
}

property_category! {
    Appearance {
        opacity => Opacity,
        corner_radius => CornerRadius,
        visibility => Visibility,
    }
}

property_category! {
    /// Background fill.
    Fill {
        color => FillColor,
    }
}

property_category! {
    /// Border stroke.
    Stroke {
        color => StrokeColor,
        width => StrokeWidth,
        style => StrokeStyle,
    }
}

property_category! {
    Typography {
        font_size => FontSize,
        font_weight => FontWeight,
        line_height => LineHeight,
        letter_spacing => LetterSpacing,
        color => TextColor,
        align => TextAlign,
    }
}

property_category! {
    /// Shadow and filter effects.
    Effects {
        shadow_x => ShadowX,
        shadow_y => ShadowY,
        shadow_blur => ShadowBlur,
        shadow_color => ShadowColor,
        blur => Blur,
    }
}

/// A sparse set of presentation values across all categories.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PropertySet {
    #[serde(skip_serializing_if = "Position::is_empty")]
    pub position: Position,
    #[serde(skip_serializing_if = "Size::is_empty")]
    pub size: Size,
    #[serde(skip_serializing_if = "Appearance::is_empty")]
    pub appearance: Appearance,
    #[serde(skip_serializing_if = "Fill::is_empty")]
    pub fill: Fill,
    #[serde(skip_serializing_if = "Stroke::is_empty")]
    pub stroke: Stroke,
    #[serde(skip_serializing_if = "Typography::is_empty")]
    pub typography: Typography,
    #[serde(skip_serializing_if = "Effects::is_empty")]
    pub effects: Effects,
}

impl PropertySet {
    /// Create an empty property set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style leaf setter.
    pub fn with(mut self, key: PropertyKey, value: impl Into<PropertyValue>) -> Self {
        self.set(key, value.into());
        self
    }

    pub fn set(&mut self, key: PropertyKey, value: PropertyValue) {
        match key.category() {
            PropertyCategory::Position => self.position.set(key, value),
            PropertyCategory::Size => self.size.set(key, value),
            PropertyCategory::Appearance => self.appearance.set(key, value),
            PropertyCategory::Fill => self.fill.set(key, value),
            PropertyCategory::Stroke => self.stroke.set(key, value),
            PropertyCategory::Typography => self.typography.set(key, value),
            PropertyCategory::Effects => self.effects.set(key, value),
        };
    }

    pub fn get(&self, key: PropertyKey) -> Option<&PropertyValue> {
        match key.category() {
            PropertyCategory::Position => self.position.get(key),
            PropertyCategory::Size => self.size.get(key),
            PropertyCategory::Appearance => self.appearance.get(key),
            PropertyCategory::Fill => self.fill.get(key),
            PropertyCategory::Stroke => self.stroke.get(key),
            PropertyCategory::Typography => self.typography.get(key),
            PropertyCategory::Effects => self.effects.get(key),
        }
    }

    /// Returns true if no leaf is set in any category.
    pub fn is_empty(&self) -> bool {
        self.position.is_empty()
            && self.size.is_empty()
            && self.appearance.is_empty()
            && self.fill.is_empty()
            && self.stroke.is_empty()
            && self.typography.is_empty()
            && self.effects.is_empty()
    }

    /// Overlay `other` on `self`, category by category.
    pub fn merge(&self, other: &PropertySet) -> PropertySet {
        PropertySet {
            position: self.position.merge(&other.position),
            size: self.size.merge(&other.size),
            appearance: self.appearance.merge(&other.appearance),
            fill: self.fill.merge(&other.fill),
            stroke: self.stroke.merge(&other.stroke),
            typography: self.typography.merge(&other.typography),
            effects: self.effects.merge(&other.effects),
        }
    }

    /// Iterate over every leaf that is set.
    pub fn entries(&self) -> impl Iterator<Item = (PropertyKey, &PropertyValue)> {
        self.position
            .entries()
            .chain(self.size.entries())
            .chain(self.appearance.entries())
            .chain(self.fill.entries())
            .chain(self.stroke.entries())
            .chain(self.typography.entries())
            .chain(self.effects.entries())
    }

    /// Number of leaves that are set.
    pub fn len(&self) -> usize {
        self.entries().count()
    }

    /// Keys of every leaf that is set.
    pub fn keys(&self) -> Vec<PropertyKey> {
        self.entries().map(|(key, _)| key).collect()
    }

    /// Categories that contain at least one leaf.
    pub fn categories(&self) -> Vec<PropertyCategory> {
        let mut categories: Vec<_> = self.entries().map(|(key, _)| key.category()).collect();
        categories.dedup();
        categories
    }
}

impl Interpolate for PropertySet {
    fn interpolate(&self, to: &Self, t: f32) -> Self {
        PropertySet {
            position: self.position.interpolate(&to.position, t),
            size: self.size.interpolate(&to.size, t),
            appearance: self.appearance.interpolate(&to.appearance, t),
            fill: self.fill.interpolate(&to.fill, t),
            stroke: self.stroke.interpolate(&to.stroke, t),
            typography: self.typography.interpolate(&to.typography, t),
            effects: self.effects.interpolate(&to.effects, t),
        }
    }
}
