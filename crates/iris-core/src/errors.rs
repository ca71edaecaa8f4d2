use crate::paginate::Unsplittable;

/// Core error type.
///
/// Adapter crates map their platform errors into this type so command handlers
/// can treat failures uniformly (user-facing reply vs. log and move on).
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid pattern: {0}")]
    Regex(#[from] regex::Error),

    #[error("pagination failed: {0}")]
    Pagination(#[from] Unsplittable),

    /// The platform no longer knows about the target (already deleted, too old).
    #[error("stale data: {0}")]
    Stale(String),

    #[error("external error: {0}")]
    External(String),
}

pub type Result<T> = std::result::Result<T, Error>;
