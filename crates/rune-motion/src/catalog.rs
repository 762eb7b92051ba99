//! Named variant definitions.
//!
//! A `VariantCatalog` maps variant names to the (possibly partial) property
//! set each variant shows. Resolving a frame layers its hover overlay on
//! top of its logical variant, so an overlay only needs to name the leaves
//! it changes.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::{MotionError, Result};
use crate::events::VariantChange;
use crate::property::PropertySet;
use crate::registry::TransitionRegistry;
use crate::render::StyleRenderer;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VariantCatalog {
    variants: BTreeMap<String, PropertySet>,
}

impl VariantCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a catalog from JSON: `{"idle": {...}, "hover": {...}}`.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|err| MotionError::InvalidCatalog(err.to_string()))
    }

    pub fn with(mut self, name: impl Into<String>, properties: PropertySet) -> Self {
        self.variants.insert(name.into(), properties);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, properties: PropertySet) {
        self.variants.insert(name.into(), properties);
    }

    pub fn get(&self, name: &str) -> Option<&PropertySet> {
        self.variants.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.variants.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.variants.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.variants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variants.is_empty()
    }

    /// Logical variant with the overlay merged on top.
    ///
    /// `None` for unknown frames. Variant names missing from the catalog
    /// contribute nothing.
    pub fn resolve(&self, registry: &TransitionRegistry, frame_id: &str) -> Option<PropertySet> {
        let state = registry.frame_state(frame_id)?;
        let base = self.get(&state.logical).cloned().unwrap_or_default();
        Some(match state.visual.as_deref().and_then(|v| self.get(v)) {
            Some(overlay) => base.merge(overlay),
            None => base,
        })
    }

    /// Render-ready style for a frame.
    pub fn style_for<R: StyleRenderer>(
        &self,
        registry: &TransitionRegistry,
        frame_id: &str,
        renderer: &R,
    ) -> Option<R::Style> {
        self.resolve(registry, frame_id)
            .map(|properties| renderer.properties_to_style(&properties))
    }

    /// Apply a batch of drained changes: each touched frame transitions to
    /// its freshly resolved style using the change's timing hints.
    pub fn apply_changes<R: StyleRenderer>(
        &self,
        registry: &TransitionRegistry,
        changes: impl IntoIterator<Item = VariantChange>,
        renderer: &mut R,
    ) -> usize {
        let mut applied = 0;
        for change in changes {
            let Some(properties) = self.resolve(registry, &change.frame_id) else {
                continue;
            };
            let style = renderer.properties_to_style(&properties);
            renderer.apply_transition(&change.frame_id, style, &change.timing);
            applied += 1;
        }
        applied
    }
}
