use thiserror::Error;

/// Domain failures of the visual calendar path.
///
/// Orchestration code wraps these in `anyhow::Error`; callers that need to
/// route on the kind (for example to switch to a text-based parser) recover
/// it with `downcast_ref::<CalendarError>()`.
#[derive(Debug, Error)]
pub enum CalendarError {
    #[error("calendar grid not found on page {page_idx}: {reason}")]
    GridNotFound { page_idx: usize, reason: String },

    #[error("visual recognition engines unavailable: {0}")]
    EngineUnavailable(String),

    #[error("cell r{row}c{col} could not be decoded: {reason}")]
    CellDecode { row: usize, col: usize, reason: String },

    #[error("page {page_idx} cancelled before all cells were classified")]
    Cancelled { page_idx: usize },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("invalid month context {year}-{month:02}")]
    InvalidMonth { year: i32, month: u32 },

    #[error("month could not be determined for page {page_idx}")]
    MonthUnknown { page_idx: usize },
}

impl CalendarError {
    pub fn is_grid_not_found(&self) -> bool {
        matches!(self, CalendarError::GridNotFound { .. })
    }
}

/// True when `err` (or anything it wraps) is a [`CalendarError::GridNotFound`].
pub fn is_grid_not_found(err: &anyhow::Error) -> bool {
    err.chain()
        .filter_map(|cause| cause.downcast_ref::<CalendarError>())
        .any(CalendarError::is_grid_not_found)
}
