//! Error types for frame synchronization

use crate::frames::FrameId;
use chrono::{DateTime, Utc};
use thiserror::Error;

/// Transform lookup error
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TransformError {
    /// Frame is not known to the transform tree
    #[error("unknown frame: {0}")]
    UnknownFrame(FrameId),

    /// Frame is known but has no transform data at the requested time
    #[error("no transform data for frame {frame} at {stamp}")]
    NoDataAtTime {
        /// Frame being looked up
        frame: FrameId,
        /// Requested time
        stamp: DateTime<Utc>,
    },
}
