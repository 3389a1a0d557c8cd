//! Display plugin base for channel-driven visualizations
//!
//! Provides the glue a rendering plugin needs to consume a typed data
//! channel:
//! - Channel bus abstraction with transport-reliability selection
//! - In-process bus for tests and embedding, NATS-backed bus for deployments
//! - Property widgets and status-line reporting for the plugin panel
//! - `ChannelDisplay`, the lifecycle adapter that subscribes, synchronizes
//!   items with the transform tree, and forwards them to the concrete
//!   visualization

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

pub mod channel;
pub mod config;
pub mod display;
pub mod error;
pub mod local;
pub mod metrics;
pub mod nats;
pub mod properties;

pub use channel::{ChannelBus, RawDelivery, Subscription, SubscriptionHandle, Transport};
pub use config::DisplayConfig;
pub use display::{ChannelDisplay, Display, ItemHandler, StreamItem};
pub use error::{Error, Result};
pub use local::LocalBus;
pub use nats::NatsBus;
pub use properties::{Property, StatusBoard, StatusLevel};
