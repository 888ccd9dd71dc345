//! Error types for the plotting pipeline.

use std::fmt;
use std::io;
use std::process::ExitStatus;

use thiserror::Error;

use crate::data::{Direction, Metric};

/// Errors that can occur while turning interval records into plots.
#[derive(Debug, Error)]
pub enum Error {
    /// An interval entry does not have the expected shape.
    #[error("malformed entry {entry}: {reason}")]
    MalformedInput {
        entry: EntryRef,
        reason: MalformedReason,
    },

    /// No plottable data points exist for a metric/direction.
    #[error("no data points for {metric} ({direction})")]
    EmptySeries { metric: Metric, direction: Direction },

    /// The rendering configuration is structurally invalid.
    #[error("invalid render configuration: {0}")]
    InvalidRenderConfig(String),

    /// The render backend failed.
    #[error(transparent)]
    Render(#[from] RenderError),
}

/// Location of a raw entry in the input document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryRef {
    /// Direction of the entry, if it could be classified.
    pub direction: Option<Direction>,
    /// Position among the entries of that direction (or among all
    /// entries when the direction is unknown).
    pub index: usize,
    /// Index of the enclosing interval.
    pub interval: usize,
}

impl fmt::Display for EntryRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.direction {
            Some(direction) => write!(
                f,
                "#{} of {} (interval {})",
                self.index, direction, self.interval
            ),
            None => write!(f, "#{} (interval {})", self.index, self.interval),
        }
    }
}

/// Why an entry was rejected.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MalformedReason {
    #[error("entry is not an object")]
    NotAnObject,

    #[error("interval has no stream list")]
    MissingStreams,

    #[error("missing field `{0}`")]
    MissingField(&'static str),

    #[error("field `{field}` is not {expected}")]
    WrongType {
        field: &'static str,
        expected: &'static str,
    },

    #[error("interval end {end} is not after start {start}")]
    InvalidBounds { start: f64, end: f64 },

    #[error("{lost} packets lost out of {sent} sent")]
    LossExceedsSent { lost: u64, sent: u64 },
}

/// Errors reported by a render backend.
#[derive(Debug, Error)]
pub enum RenderError {
    /// Nothing to draw.
    #[error("degenerate render request: {0}")]
    Degenerate(String),

    /// The external renderer could not be started.
    #[error("failed to spawn renderer: {0}")]
    Spawn(#[source] io::Error),

    /// The external renderer exited unsuccessfully.
    #[error("renderer exited with {status}: {stderr}")]
    Failed { status: ExitStatus, stderr: String },

    /// I/O with the renderer failed.
    #[error("renderer I/O failed: {0}")]
    Io(#[from] io::Error),
}

/// Convenience alias for pipeline results.
pub type Result<T, E = Error> = std::result::Result<T, E>;
