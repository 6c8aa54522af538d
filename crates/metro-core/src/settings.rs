//! Per-document view settings persisted under `info.editorSettings`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Smallest and largest allowed grid snap step.
pub const SNAP_STEP_RANGE: (f64, f64) = (1.0, 200.0);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EditorSettings {
    pub show_grid: bool,
    pub show_lines: bool,
    pub show_transfers: bool,
    pub show_stations: bool,
    pub show_labels: bool,
    #[serde(serialize_with = "crate::model::serialize_number")]
    pub snap_step: f64,
    pub canvas_view: CanvasView,
    pub background: Background,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for EditorSettings {
    fn default() -> Self {
        Self {
            show_grid: true,
            show_lines: true,
            show_transfers: true,
            show_stations: true,
            show_labels: true,
            snap_step: 10.0,
            canvas_view: CanvasView::default(),
            background: Background::default(),
            extra: Map::new(),
        }
    }
}

impl EditorSettings {
    /// Snap step clamped into [`SNAP_STEP_RANGE`]; non-finite values fall
    /// back to the default.
    pub fn clamped_snap_step(&self) -> f64 {
        clamp_snap_step(self.snap_step)
    }
}

pub fn clamp_snap_step(step: f64) -> f64 {
    if step.is_finite() {
        step.clamp(SNAP_STEP_RANGE.0, SNAP_STEP_RANGE.1)
    } else {
        10.0
    }
}

/// Saved camera: zoom and pan.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CanvasView {
    #[serde(serialize_with = "crate::model::serialize_number")]
    pub scale: f64,
    #[serde(serialize_with = "crate::model::serialize_number")]
    pub pos_x: f64,
    #[serde(serialize_with = "crate::model::serialize_number")]
    pub pos_y: f64,
}

impl Default for CanvasView {
    fn default() -> Self {
        Self {
            scale: 1.0,
            pos_x: 0.0,
            pos_y: 0.0,
        }
    }
}

/// Reference image traced under the map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Background {
    pub url: String,
    #[serde(serialize_with = "crate::model::serialize_number")]
    pub x: f64,
    #[serde(serialize_with = "crate::model::serialize_number")]
    pub y: f64,
    #[serde(serialize_with = "crate::model::serialize_number")]
    pub w: f64,
    #[serde(serialize_with = "crate::model::serialize_number")]
    pub h: f64,
    #[serde(serialize_with = "crate::model::serialize_number")]
    pub alpha: f64,
}

impl Default for Background {
    fn default() -> Self {
        Self {
            url: String::new(),
            x: 0.0,
            y: 0.0,
            w: 1000.0,
            h: 700.0,
            alpha: 0.4,
        }
    }
}

impl Background {
    pub fn is_visible(&self) -> bool {
        !self.url.is_empty()
    }

    pub fn clamped_alpha(&self) -> f64 {
        if self.alpha.is_finite() {
            self.alpha.clamp(0.0, 1.0)
        } else {
            1.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn partial_settings_fill_defaults() {
        let s: EditorSettings =
            serde_json::from_str(r#"{ "showGrid": false, "canvasView": { "scale": 2 } }"#).unwrap();
        assert!(!s.show_grid);
        assert!(s.show_lines);
        assert_eq!(s.snap_step, 10.0);
        assert_eq!(s.canvas_view.scale, 2.0);
        assert_eq!(s.canvas_view.pos_x, 0.0);
        assert_eq!(s.background.alpha, 0.4);
    }

    #[test]
    fn unknown_keys_are_kept() {
        let raw = serde_json::json!({ "theme": "dark" });
        let s: EditorSettings = serde_json::from_value(raw).unwrap();
        let out = serde_json::to_value(&s).unwrap();
        assert_eq!(out["theme"], "dark");
        assert_eq!(out["snapStep"], 10);
    }

    #[test]
    fn alpha_and_step_clamp() {
        let bg = Background {
            alpha: 3.0,
            ..Background::default()
        };
        assert_eq!(bg.clamped_alpha(), 1.0);
        assert_eq!(clamp_snap_step(0.0), 1.0);
        assert_eq!(clamp_snap_step(500.0), 200.0);
        assert_eq!(clamp_snap_step(f64::NAN), 10.0);
    }
}
