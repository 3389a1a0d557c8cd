//! Frame identifiers and stamped-item traits

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Name of a reference frame in the transform tree
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FrameId(String);

impl FrameId {
    /// Create a frame id
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Frame name as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True for the empty frame id, which no transform can resolve
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for FrameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for FrameId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for FrameId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Per-item frame and time declaration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Header {
    /// Frame the item's data is expressed in
    pub frame_id: FrameId,

    /// Acquisition time of the item
    pub stamp: DateTime<Utc>,
}

impl Header {
    /// Create a header
    pub fn new(frame_id: impl Into<FrameId>, stamp: DateTime<Utc>) -> Self {
        Self {
            frame_id: frame_id.into(),
            stamp,
        }
    }
}

/// Items that declare a coordinate frame and a timestamp
pub trait Stamped {
    /// Frame the item's data is expressed in
    fn frame_id(&self) -> &FrameId;

    /// Acquisition time of the item
    fn stamp(&self) -> DateTime<Utc>;
}

impl Stamped for Header {
    fn frame_id(&self) -> &FrameId {
        &self.frame_id
    }

    fn stamp(&self) -> DateTime<Utc> {
        self.stamp
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_id_display() {
        let frame = FrameId::from("base_link");
        assert_eq!(frame.to_string(), "base_link");
        assert!(!frame.is_empty());
        assert!(FrameId::from("").is_empty());
    }

    #[test]
    fn test_header_serde() {
        let header = Header::new("map", Utc::now());
        let json = serde_json::to_string(&header).unwrap();
        let back: Header = serde_json::from_str(&json).unwrap();
        assert_eq!(header, back);
    }
}
