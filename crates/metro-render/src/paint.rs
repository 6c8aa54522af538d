//! Map scene → Vello drawing commands.
//!
//! Walks the visible layers bottom to top and emits fills, strokes and the
//! background image, all under the camera transform.

use crate::background::BackgroundImage;
use crate::camera::Camera;
use crate::color::Rgba;
use crate::scene::{Layer, MapScene, Primitive};
use kurbo::{Affine, BezPath, Cap, Circle, Join, Rect, Stroke as KurboStroke};
use peniko::{Blob, Color, Fill, Image, ImageFormat as Format};
use std::sync::Arc;
use vello::Scene;

/// Paint the whole map. Call once per frame with a freshly-cleared `Scene`;
/// the caller presents it.
pub fn paint_scene(
    scene: &mut Scene,
    map: &MapScene,
    camera: &Camera,
    background: Option<&BackgroundImage>,
) {
    let view = camera.transform();
    for layer in Layer::ALL {
        let content = map.layer(layer);
        if !content.visible {
            continue;
        }
        for item in &content.items {
            for prim in &item.primitives {
                paint_primitive(scene, view, prim, background);
            }
        }
    }
}

fn paint_primitive(
    scene: &mut Scene,
    view: Affine,
    prim: &Primitive,
    background: Option<&BackgroundImage>,
) {
    match prim {
        Primitive::Stroke {
            path,
            width,
            color,
            dash,
        } => stroke_path(scene, view, path, *width, *color, *dash),

        Primitive::Disc {
            center,
            radius,
            color,
        } => {
            let shape = Circle::new(*center, *radius);
            scene.fill(Fill::NonZero, view, to_color(*color), None, &shape);
        }

        Primitive::Label { text, at, .. } => {
            // Glyph shaping needs a font context; the Canvas2D bridge draws labels.
            log::trace!("LABEL {text:?} at ({}, {})", at.x, at.y);
        }

        Primitive::Image { rect, alpha } => {
            if let Some(bg) = background {
                paint_image(scene, view, bg, *rect, *alpha);
            }
        }
    }
}

// ─── Painters ────────────────────────────────────────────────────────────

fn stroke_path(
    scene: &mut Scene,
    view: Affine,
    path: &BezPath,
    width: f64,
    color: Rgba,
    dash: Option<[f64; 2]>,
) {
    if path.elements().is_empty() {
        return;
    }
    let mut stroke = KurboStroke {
        width,
        join: Join::Round,
        start_cap: Cap::Round,
        end_cap: Cap::Round,
        ..Default::default()
    };
    if let Some(pattern) = dash {
        stroke = stroke.with_caps(Cap::Butt).with_dashes(0.0, pattern);
    }
    scene.stroke(&stroke, view, to_color(color), None, path);
}

fn paint_image(scene: &mut Scene, view: Affine, bg: &BackgroundImage, rect: Rect, alpha: f64) {
    if bg.width == 0 || bg.height == 0 {
        return;
    }
    let data: Arc<dyn AsRef<[u8]> + Send + Sync> = bg.rgba.clone();
    let image = Image::new(Blob::new(data), Format::Rgba8, bg.width, bg.height)
        .with_alpha(alpha as f32);
    let fit = Affine::translate((rect.x0, rect.y0))
        * Affine::scale_non_uniform(
            rect.width() / bg.width as f64,
            rect.height() / bg.height as f64,
        );
    scene.draw_image(&image, view * fit);
}

// ─── Helpers ─────────────────────────────────────────────────────────────

fn to_color(c: Rgba) -> Color {
    let [r, g, b, a] = c.to_rgba8();
    Color::from_rgba8(r, g, b, a)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn painting_an_empty_scene_is_harmless() {
        let mut scene = Scene::new();
        paint_scene(&mut scene, &MapScene::new(), &Camera::default(), None);
    }
}
