use std::fmt;

use uuid::Uuid;

/// Stable identity of a layer across all frames.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct LayerId(pub Uuid);

impl LayerId {
    /// Fresh random id.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for LayerId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for LayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Pixel-combination function applied when a layer is composited over its backdrop.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BlendMode {
    /// Plain source-over.
    #[default]
    Normal,
    /// Product of backdrop and source; darkens.
    Multiply,
    /// Inverse of multiplying the inverses; lightens.
    Screen,
    /// Multiply or screen depending on the backdrop.
    Overlay,
    /// Darker of backdrop and source per channel.
    Darken,
    /// Lighter of backdrop and source per channel.
    Lighten,
    /// Brightens the backdrop toward the source.
    ColorDodge,
    /// Darkens the backdrop toward the source.
    ColorBurn,
    /// Multiply or screen depending on the source.
    HardLight,
    /// Softer variant of hard light.
    SoftLight,
    /// Absolute difference of backdrop and source.
    Difference,
    /// Like difference, with lower contrast.
    Exclusion,
}

impl BlendMode {
    /// Every supported mode, in menu order.
    pub fn all() -> &'static [BlendMode] {
        &[
            BlendMode::Normal,
            BlendMode::Multiply,
            BlendMode::Screen,
            BlendMode::Overlay,
            BlendMode::Darken,
            BlendMode::Lighten,
            BlendMode::ColorDodge,
            BlendMode::ColorBurn,
            BlendMode::HardLight,
            BlendMode::SoftLight,
            BlendMode::Difference,
            BlendMode::Exclusion,
        ]
    }
}

/// Layer metadata. Pixels live per frame in the layer store, keyed by [`LayerId`].
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Layer {
    /// Identity.
    pub id: LayerId,
    /// Display name.
    pub name: String,
    /// Hidden layers are skipped by the compositor and reject edits.
    pub visible: bool,
    /// Locked layers reject edits.
    pub locked: bool,
    /// Opacity in `[0, 1]`.
    pub opacity: f32,
    /// Blend mode used when compositing.
    #[serde(default)]
    pub blend_mode: BlendMode,
}

impl Layer {
    /// A visible, unlocked, fully opaque normal layer.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: LayerId::new(),
            name: name.into(),
            visible: true,
            locked: false,
            opacity: 1.0,
            blend_mode: BlendMode::Normal,
        }
    }

    /// Whether drawing, filling, lifting and committing may touch this layer.
    pub fn is_editable(&self) -> bool {
        self.visible && !self.locked
    }
}

#[cfg(test)]
#[path = "../../tests/unit/document/layer.rs"]
mod tests;
