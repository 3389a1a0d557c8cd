//! Coordinate-frame synchronization for display plugins
//!
//! Provides the pieces a display needs to hold incoming items until their
//! coordinate frame is resolvable:
//! - Frame identifiers and stamped-item traits
//! - A `TransformBuffer` abstraction over the external transform engine
//! - `FrameFilter`, a bounded buffer that releases items once their frame
//!   transform becomes available

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

pub mod error;
pub mod filter;
pub mod frames;
pub mod transform;

pub use error::TransformError;
pub use filter::FrameFilter;
pub use frames::{FrameId, Header, Stamped};
pub use transform::{FrameSetBuffer, Transform, TransformBuffer};
