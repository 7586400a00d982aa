use super::*;

#[test]
fn markup_characters_are_escaped() {
    assert_eq!(escape_xml("a<b & \"c\""), "a&lt;b &amp; &quot;c&quot;");
}

#[test]
fn fallback_width_scales_with_length_and_size() {
    assert_eq!(fallback_width("", 20.0), 0.0);
    assert_eq!(fallback_width("abcd", 10.0), 24.0);
}

#[test]
fn svg_renderer_produces_a_line_box_even_without_fonts() {
    let r = SvgTextRenderer::default();
    let w = r.measure("Hello", 16.0);
    assert!(w > 0.0);
    let bmp = r.rasterize("Hello", 16.0, Rgba8::BLACK).unwrap();
    assert_eq!(bmp.height(), 21);
    assert!(bmp.width() >= 1);
}
