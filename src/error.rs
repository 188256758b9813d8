/// Error types for level loading and record persistence.
///
/// Resource-exhaustion actions (using an empty ability, re-arming an active
/// dampener) are *not* errors; they surface as `Rejection` values and
/// `GameEvent::ActionRejected`.

use thiserror::Error;

use crate::domain::grid::Pos;

/// Errors that make a level definition unusable.
#[derive(Debug, Error)]
pub enum LevelError {
    #[error("level `{0}` has no grid rows")]
    EmptyGrid(String),

    #[error("level `{level}`: row {row} is {found} tiles wide, expected {expected}")]
    RaggedRow {
        level: String,
        row: usize,
        expected: usize,
        found: usize,
    },

    #[error("level `{level}` has no `{marker}` marker")]
    MissingMarker { level: String, marker: char },

    #[error("level `{level}` has a second `{marker}` marker at {second} (first at {first})")]
    DuplicateMarker {
        level: String,
        marker: char,
        first: Pos,
        second: Pos,
    },

    #[error("level `{level}`: bad metadata `{entry}`")]
    BadMetadata { level: String, entry: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors writing the best-record file. Reading never fails (see `records`).
#[derive(Debug, Error)]
pub enum RecordError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialize(#[from] toml::ser::Error),
}
