//! Canvas2D software renderer.
//!
//! Walks the retained map scene and draws to an HTML `<canvas>` via
//! `CanvasRenderingContext2d`. Primitives are emitted in scene units under
//! the camera transform, so the browser does the zoom and pan.

use metro_render::{Camera, Layer, MapScene, PathEl, Primitive, Rgba, TextAlign};
use web_sys::{CanvasRenderingContext2d, HtmlImageElement};

const CANVAS_BG: &str = "#FFFFFF";
const LABEL_HALO: &str = "rgba(255,255,255,0.9)";
const LABEL_FONT: &str = "sans-serif";

/// Render every visible layer, bottom to top.
pub fn render_scene(
    ctx: &CanvasRenderingContext2d,
    scene: &MapScene,
    camera: &Camera,
    canvas_width: f64,
    canvas_height: f64,
    background: Option<&HtmlImageElement>,
) {
    // Clear in screen space
    let _ = ctx.set_transform(1.0, 0.0, 0.0, 1.0, 0.0, 0.0);
    ctx.set_fill_style_str(CANVAS_BG);
    ctx.fill_rect(0.0, 0.0, canvas_width, canvas_height);

    let [a, b, c, d, e, f] = camera.transform().as_coeffs();
    let _ = ctx.set_transform(a, b, c, d, e, f);

    for layer in Layer::ALL {
        let content = scene.layer(layer);
        if !content.visible {
            continue;
        }
        for item in &content.items {
            for prim in &item.primitives {
                draw_primitive(ctx, prim, background);
            }
        }
    }

    let _ = ctx.set_transform(1.0, 0.0, 0.0, 1.0, 0.0, 0.0);
}

fn draw_primitive(
    ctx: &CanvasRenderingContext2d,
    prim: &Primitive,
    background: Option<&HtmlImageElement>,
) {
    match prim {
        Primitive::Stroke {
            path,
            width,
            color,
            dash,
        } => {
            ctx.save();
            trace_path(ctx, path.elements());
            ctx.set_stroke_style_str(&color.to_css());
            ctx.set_line_width(*width);
            ctx.set_line_join("round");
            match dash {
                Some([on, off]) => {
                    ctx.set_line_cap("butt");
                    let _ = ctx.set_line_dash(&js_sys::Array::of2(&(*on).into(), &(*off).into()));
                }
                None => ctx.set_line_cap("round"),
            }
            ctx.stroke();
            ctx.restore();
        }

        Primitive::Disc {
            center,
            radius,
            color,
        } => {
            ctx.begin_path();
            let _ = ctx.arc(center.x, center.y, *radius, 0.0, std::f64::consts::TAU);
            ctx.set_fill_style_str(&color.to_css());
            ctx.fill();
        }

        Primitive::Label {
            text,
            at,
            size,
            color,
            align,
        } => draw_label(ctx, text, at.x, at.y, *size, *color, *align),

        Primitive::Image { rect, alpha } => {
            let Some(img) = background else {
                return;
            };
            // Not decoded yet
            if img.natural_width() == 0 {
                return;
            }
            ctx.save();
            ctx.set_global_alpha(alpha.clamp(0.0, 1.0));
            let _ = ctx.draw_image_with_html_image_element_and_dw_and_dh(
                img,
                rect.x0,
                rect.y0,
                rect.width(),
                rect.height(),
            );
            ctx.restore();
        }
    }
}

fn trace_path(ctx: &CanvasRenderingContext2d, elements: &[PathEl]) {
    ctx.begin_path();
    for el in elements {
        match *el {
            PathEl::MoveTo(p) => ctx.move_to(p.x, p.y),
            PathEl::LineTo(p) => ctx.line_to(p.x, p.y),
            PathEl::QuadTo(c, p) => ctx.quadratic_curve_to(c.x, c.y, p.x, p.y),
            PathEl::CurveTo(c1, c2, p) => ctx.bezier_curve_to(c1.x, c1.y, c2.x, c2.y, p.x, p.y),
            PathEl::ClosePath => ctx.close_path(),
        }
    }
}

fn draw_label(
    ctx: &CanvasRenderingContext2d,
    text: &str,
    x: f64,
    y: f64,
    size: f64,
    color: Rgba,
    align: TextAlign,
) {
    ctx.save();
    ctx.set_font(&format!("{size}px {LABEL_FONT}"));
    ctx.set_text_align(css_align(align));
    ctx.set_text_baseline("middle");

    // Halo first, then the fill on top
    ctx.set_line_join("round");
    ctx.set_line_width(size * 0.3);
    ctx.set_stroke_style_str(LABEL_HALO);
    let _ = ctx.stroke_text(text, x, y);

    ctx.set_fill_style_str(&color.to_css());
    let _ = ctx.fill_text(text, x, y);
    ctx.restore();
}

fn css_align(align: TextAlign) -> &'static str {
    match align {
        TextAlign::Start => "left",
        TextAlign::Center => "center",
        TextAlign::End => "right",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn label_alignment_maps_to_css() {
        assert_eq!(css_align(TextAlign::Start), "left");
        assert_eq!(css_align(TextAlign::Center), "center");
        assert_eq!(css_align(TextAlign::End), "right");
    }
}
