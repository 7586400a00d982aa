//! Text measurement and rasterization for the text tool.

use std::sync::{Arc, OnceLock};

use crate::foundation::core::Rgba8;
use crate::foundation::error::{FlipbookError, FlipbookResult};
use crate::raster::bitmap::Bitmap;

/// Average advance as a fraction of the font size when no font metrics are available.
const FALLBACK_ADVANCE: f64 = 0.6;
/// Line box height as a multiple of the font size.
const LINE_HEIGHT: f64 = 1.3;

/// Measures and rasterizes single-line text.
pub trait TextRenderer: Send + Sync {
    /// Pixel width of `text` at `font_px`.
    fn measure(&self, text: &str, font_px: f32) -> f64;

    /// Render `text` into a tight bitmap whose top-left is the text box origin.
    fn rasterize(&self, text: &str, font_px: f32, color: Rgba8) -> FlipbookResult<Bitmap>;
}

fn fallback_width(text: &str, font_px: f32) -> f64 {
    text.chars().count() as f64 * f64::from(font_px) * FALLBACK_ADVANCE
}

fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            c => out.push(c),
        }
    }
    out
}

/// Renders an SVG `<text>` element with `usvg`/`resvg` against the system fonts.
///
/// The font database is loaded on first use.
pub struct SvgTextRenderer {
    family: String,
    fontdb: OnceLock<Arc<usvg::fontdb::Database>>,
}

impl Default for SvgTextRenderer {
    fn default() -> Self {
        Self::new("sans-serif")
    }
}

impl SvgTextRenderer {
    /// Renderer using the CSS font family `family`.
    pub fn new(family: impl Into<String>) -> Self {
        Self {
            family: family.into(),
            fontdb: OnceLock::new(),
        }
    }

    fn fontdb(&self) -> Arc<usvg::fontdb::Database> {
        let db = self.fontdb.get_or_init(|| {
            let mut db = usvg::fontdb::Database::new();
            db.load_system_fonts();
            tracing::debug!(faces = db.len(), "loaded system fonts");
            Arc::new(db)
        });
        Arc::clone(db)
    }

    fn tree(&self, text: &str, font_px: f32, color: Rgba8, width: u32, height: u32) -> FlipbookResult<usvg::Tree> {
        let svg = format!(
            r##"<svg xmlns="http://www.w3.org/2000/svg" width="{width}" height="{height}"><text x="0" y="{baseline}" font-family="{family}" font-size="{font_px}" fill="#{r:02x}{g:02x}{b:02x}" fill-opacity="{opacity}">{body}</text></svg>"##,
            baseline = f64::from(font_px),
            family = escape_xml(&self.family),
            r = color.r,
            g = color.g,
            b = color.b,
            opacity = f64::from(color.a) / 255.0,
            body = escape_xml(text),
        );
        let opts = usvg::Options {
            fontdb: self.fontdb(),
            ..Default::default()
        };
        usvg::Tree::from_str(&svg, &opts)
            .map_err(|e| FlipbookError::decode(format!("build text svg: {e}")))
    }
}

impl TextRenderer for SvgTextRenderer {
    fn measure(&self, text: &str, font_px: f32) -> f64 {
        let guess = fallback_width(text, font_px);
        let width = (guess * 2.0).ceil().max(1.0) as u32;
        let height = (f64::from(font_px) * LINE_HEIGHT).ceil().max(1.0) as u32;
        match self.tree(text, font_px, Rgba8::BLACK, width, height) {
            Ok(tree) => {
                let bbox = tree.root().bounding_box();
                if bbox.width() > 0.0 {
                    f64::from(bbox.right())
                } else {
                    guess
                }
            }
            Err(_) => guess,
        }
    }

    fn rasterize(&self, text: &str, font_px: f32, color: Rgba8) -> FlipbookResult<Bitmap> {
        let width = self.measure(text, font_px).ceil().max(1.0) as u32;
        let height = (f64::from(font_px) * LINE_HEIGHT).ceil().max(1.0) as u32;
        let tree = self.tree(text, font_px, color, width, height)?;
        let mut pixmap = resvg::tiny_skia::Pixmap::new(width, height)
            .ok_or_else(|| FlipbookError::validation("failed to allocate text pixmap"))?;
        resvg::render(
            &tree,
            resvg::tiny_skia::Transform::identity(),
            &mut pixmap.as_mut(),
        );
        Bitmap::from_premul_rgba8(width, height, pixmap.take())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/editor/text.rs"]
mod tests;
