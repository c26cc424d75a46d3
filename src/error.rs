//! Errors raised by pagination

/// Fatal configuration and input-contract errors.
///
/// Degenerate geometry (spacing taller than a page, rows taller than a page)
/// and inconsistent cell data are recovered locally and never reach this type.
#[derive(thiserror::Error, Debug)]
pub enum LayoutError {
    #[error(
        "blocks and measures must have the same length (got {blocks} blocks, {measures} measures)"
    )]
    MeasureCountMismatch { blocks: usize, measures: usize },

    #[error("block {block_id} at index {index} requires a {expected} measure")]
    MeasureKindMismatch {
        index: usize,
        block_id: String,
        expected: &'static str,
    },

    #[error("margins leave a non-positive content area ({width}x{height})")]
    InvalidContentArea { width: f32, height: f32 },

    #[error("header/footer width must be positive (got {0})")]
    InvalidHeaderFooterWidth(f32),

    #[error("invalid layout request: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, LayoutError>;
