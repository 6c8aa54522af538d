pub mod background;
pub mod camera;
pub mod color;
pub mod hit;
pub mod paint;
pub mod scene;

pub use background::{BackgroundError, BackgroundImage, decode_data_url};
pub use camera::{Camera, MAX_ZOOM, MIN_ZOOM};
pub use color::Rgba;
pub use hit::{HitTarget, hit_test};
pub use paint::paint_scene;
pub use scene::{ItemKey, Layer, MapScene, Primitive, SceneContext, SceneItem, TextAlign};

// Re-export kurbo geometry so downstream crates share one version
pub use kurbo::{BezPath, PathEl, Point, Rect, Size, Vec2};
