//! Transform buffer abstraction
//!
//! The actual transform engine (tree maintenance, interpolation) lives
//! outside this crate. Displays only need to ask whether a frame is
//! resolvable at a given time, and occasionally fetch the transform itself
//! for their own geometry.

use crate::error::TransformError;
use crate::frames::FrameId;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::HashMap;

/// Rigid transform between two frames
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    /// Translation (x, y, z)
    pub translation: [f64; 3],

    /// Rotation as a unit quaternion (x, y, z, w)
    pub rotation: [f64; 4],
}

impl Transform {
    /// Identity transform
    pub fn identity() -> Self {
        Self {
            translation: [0.0, 0.0, 0.0],
            rotation: [0.0, 0.0, 0.0, 1.0],
        }
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::identity()
    }
}

/// Time-varying coordinate-transform buffer
///
/// Implemented by the host's transform engine. `FrameFilter` only calls
/// `can_transform`; `lookup` is for concrete displays that need the
/// transform to position their geometry.
pub trait TransformBuffer: Send + Sync {
    /// Whether `source` can be resolved into `target` at `stamp`
    fn can_transform(&self, target: &FrameId, source: &FrameId, stamp: DateTime<Utc>) -> bool;

    /// Resolve the transform taking data in `source` into `target` at `stamp`
    fn lookup(
        &self,
        target: &FrameId,
        source: &FrameId,
        stamp: DateTime<Utc>,
    ) -> Result<Transform, TransformError>;
}

/// Static transform buffer backed by a frame map
///
/// Stand-in for the real engine in tests and demos: every registered frame
/// resolves at any time, with a fixed transform.
#[derive(Default)]
pub struct FrameSetBuffer {
    frames: RwLock<HashMap<FrameId, Transform>>,
}

impl FrameSetBuffer {
    /// Create an empty buffer
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a frame with the identity transform
    pub fn add_frame(&self, frame: impl Into<FrameId>) {
        self.add_frame_with(frame, Transform::identity());
    }

    /// Register a frame with a fixed transform
    pub fn add_frame_with(&self, frame: impl Into<FrameId>, transform: Transform) {
        self.frames.write().insert(frame.into(), transform);
    }

    /// Remove a frame
    pub fn remove_frame(&self, frame: &FrameId) {
        self.frames.write().remove(frame);
    }
}

impl TransformBuffer for FrameSetBuffer {
    fn can_transform(&self, target: &FrameId, source: &FrameId, _stamp: DateTime<Utc>) -> bool {
        let frames = self.frames.read();
        frames.contains_key(target) && frames.contains_key(source)
    }

    fn lookup(
        &self,
        target: &FrameId,
        source: &FrameId,
        _stamp: DateTime<Utc>,
    ) -> Result<Transform, TransformError> {
        let frames = self.frames.read();
        if !frames.contains_key(target) {
            return Err(TransformError::UnknownFrame(target.clone()));
        }
        frames
            .get(source)
            .copied()
            .ok_or_else(|| TransformError::UnknownFrame(source.clone()))
    }
}
