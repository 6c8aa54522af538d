use thiserror::Error;

/// Faults raised while loading or exporting a map document.
#[derive(Debug, Error)]
pub enum MapError {
    /// No recognised shape: no section key, no root `lines`, no legacy
    /// alias and no nested object carrying `lines`.
    #[error("unsupported map format: {0}")]
    UnsupportedFormat(String),

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T, E = MapError> = std::result::Result<T, E>;
