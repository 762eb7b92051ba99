//! The boundary to the host renderer.

use crate::property::PropertySet;
use crate::rule::TransitionTiming;

/// Converts property sets into renderable styles and applies them to frames.
///
/// `properties_to_style` must accept partially empty sets; leaves that are
/// absent stay untouched on the frame.
pub trait StyleRenderer {
    type Style;

    fn properties_to_style(&self, properties: &PropertySet) -> Self::Style;

    /// Apply `style` immediately, cancelling any running transition.
    fn apply_style(&mut self, frame_id: &str, style: Self::Style);

    /// Animate from the frame's current style to `style`.
    fn apply_transition(&mut self, frame_id: &str, style: Self::Style, timing: &TransitionTiming);
}
