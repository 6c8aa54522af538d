//! Export a document as pretty JSON plus a suggested download name.

use crate::error::Result;
use crate::model::MapDocument;
use crate::neighbors::{DEFAULT_NEIGHBOR_TIME, ensure_neighbor_lists, regenerate_document};

/// Export knobs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExportOptions {
    /// Rebuild adjacency from line order before writing.
    pub auto_neighbors: bool,
    /// Travel time for regenerated links.
    pub default_time: f64,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            auto_neighbors: true,
            default_time: DEFAULT_NEIGHBOR_TIME,
        }
    }
}

/// Serialize a copy of `doc`; the input is left untouched. Every station
/// in the output carries a `neighbors` array.
pub fn export_document(doc: &MapDocument, opts: &ExportOptions) -> Result<String> {
    let mut out = doc.clone();
    if opts.auto_neighbors {
        let time = if opts.default_time.is_finite() {
            opts.default_time
        } else {
            0.0
        };
        regenerate_document(&mut out, time);
    }
    ensure_neighbor_lists(&mut out);
    let json = serde_json::to_string_pretty(&out)?;
    log::debug!("exported {} bytes", json.len());
    Ok(json)
}

/// `info.name` with every run of characters outside `[A-Za-z0-9_-]`
/// replaced by `_`, falling back to `map`, plus `.json`.
pub fn export_file_name(doc: &MapDocument) -> String {
    let name = doc.info.name.as_deref().unwrap_or("");
    let mut base = String::with_capacity(name.len());
    let mut in_run = false;
    for c in name.chars() {
        if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
            base.push(c);
            in_run = false;
        } else if !in_run {
            base.push('_');
            in_run = true;
        }
    }
    if base.is_empty() {
        base.push_str("map");
    }
    format!("{base}.json")
}
