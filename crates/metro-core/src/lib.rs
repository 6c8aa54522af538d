pub mod error;
pub mod export;
pub mod id;
pub mod lint;
pub mod model;
pub mod neighbors;
pub mod network;
pub mod normalize;
pub mod selection;
pub mod settings;
pub mod transform;

pub use error::MapError;
pub use export::{ExportOptions, export_document, export_file_name};
pub use id::{Id, LineId, StationId, TransferId};
pub use lint::{LintDiagnostic, LintSeverity, lint_document};
pub use model::*;
pub use neighbors::{
    DEFAULT_NEIGHBOR_TIME, ensure_neighbor_lists, regenerate_document, regenerate_line,
    regenerate_section,
};
pub use normalize::{LoadOutcome, load_document, parse_document};
pub use selection::{SegmentRef, Selection};
pub use settings::{Background, CanvasView, EditorSettings};
