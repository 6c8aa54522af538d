use crate::engine::DEFAULT_SAVE_QUIET_MS;
use crate::history::DEFAULT_HISTORY_DEPTH;
use metro_core::DEFAULT_NEIGHBOR_TIME;
use metro_core::settings::clamp_snap_step;
use metro_render::Size;

// ─── Config ───────────────────────────────────────────────────────────────

/// Runtime knobs of an [`Editor`](crate::Editor).
///
/// Persisted view state (layer toggles, snap step, camera, background)
/// lives in the document's `EditorSettings`; these are the session-level
/// defaults around it.
#[derive(Debug, Clone)]
pub struct EditorConfig {
    /// Snap dragged stations to the grid. Default: **true**.
    pub snap_to_grid: bool,

    /// Grid step used when the document carries no settings. Clamped to
    /// `[1, 200]`. Default: **10**.
    pub snap_step: f64,

    /// Logical → scene multiplier, in `(0, 5]`. Default: **1**.
    pub coordinate_scale: f64,

    /// Travel time for new and regenerated neighbor links. Default: **3**.
    pub default_neighbor_time: f64,

    /// Regenerate adjacency on export. Default: **true**.
    pub auto_neighbors_on_save: bool,

    /// Undo snapshots kept. Default: **50**.
    pub history_depth: usize,

    /// Quiet period before a change is handed to the sink. Default: **500 ms**.
    pub save_quiet_ms: f64,

    /// Canvas size in CSS pixels.
    pub viewport: Size,

    /// Margin around content for fit-to-content.
    pub fit_padding: f64,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            snap_to_grid: true,
            snap_step: 10.0,
            coordinate_scale: 1.0,
            default_neighbor_time: DEFAULT_NEIGHBOR_TIME,
            auto_neighbors_on_save: true,
            history_depth: DEFAULT_HISTORY_DEPTH,
            save_quiet_ms: DEFAULT_SAVE_QUIET_MS,
            viewport: Size::new(1000.0, 700.0),
            fit_padding: 20.0,
        }
    }
}

impl EditorConfig {
    pub fn clamped_snap_step(&self) -> f64 {
        clamp_snap_step(self.snap_step)
    }
}
