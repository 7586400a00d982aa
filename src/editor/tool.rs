use crate::foundation::core::Rgba8;
use crate::raster::draw::{BrushStyle, ShapeKind};

/// The active editing tool.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Tool {
    /// Freehand paint.
    #[default]
    Pen,
    /// Freehand coverage removal.
    Eraser,
    /// Rectangle / ellipse / line with live preview.
    Shape,
    /// Single-shot flood fill.
    Fill,
    /// Marquee lift and selection transform.
    Select,
    /// Inline text entry rasterized into a selection.
    Text,
    /// Pick the composited color under the pointer.
    Eyedropper,
}

impl Tool {
    /// Tools that paint through a drawing session.
    pub fn is_drawing(self) -> bool {
        matches!(self, Tool::Pen | Tool::Eraser | Tool::Shape)
    }

    /// Tools under which a floating selection stays floating.
    pub fn keeps_selection(self) -> bool {
        matches!(self, Tool::Select | Tool::Text)
    }
}

/// Current color, stroke width and shape options.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ToolSettings {
    /// Paint color.
    pub color: Rgba8,
    /// Stroke width in canvas pixels.
    pub stroke_width: f32,
    /// Shape drawn by [`Tool::Shape`].
    pub shape: ShapeKind,
    /// Fill shapes instead of outlining them.
    pub shape_filled: bool,
}

impl Default for ToolSettings {
    fn default() -> Self {
        Self {
            color: Rgba8::BLACK,
            stroke_width: 4.0,
            shape: ShapeKind::Rectangle,
            shape_filled: false,
        }
    }
}

impl ToolSettings {
    /// Brush for `tool` with these settings.
    pub fn brush(&self, tool: Tool) -> BrushStyle {
        BrushStyle {
            color: self.color,
            width: self.stroke_width,
            erase: tool == Tool::Eraser,
        }
    }
}
