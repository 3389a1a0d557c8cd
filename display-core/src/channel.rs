//! Channel bus abstraction
//!
//! A channel is a named pub/sub data stream. The bus hands raw payload bytes
//! to a delivery closure on whatever thread the transport chooses; typed
//! decoding happens in the display layer.

use crate::error::{Error, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Transport reliability preference for a subscription
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Transport {
    /// Guaranteed delivery
    #[default]
    Reliable,
    /// At-most-once delivery, lower latency
    BestEffort,
}

/// Byte-level delivery sink driven by the bus on item arrival
pub type RawDelivery = Arc<dyn Fn(&[u8]) + Send + Sync>;

/// An open subscription
pub trait Subscription: Send + Sync {
    /// Channel this subscription is attached to
    fn channel(&self) -> &str;

    /// Stop delivery and release transport resources
    fn close(&self);
}

/// Owning handle for a subscription; closes on drop
pub struct SubscriptionHandle {
    inner: Box<dyn Subscription>,
}

impl SubscriptionHandle {
    /// Wrap a subscription
    pub fn new(inner: Box<dyn Subscription>) -> Self {
        Self { inner }
    }

    /// Channel this subscription is attached to
    pub fn channel(&self) -> &str {
        self.inner.channel()
    }
}

impl Drop for SubscriptionHandle {
    fn drop(&mut self) {
        self.inner.close();
    }
}

/// Named, typed pub/sub messaging API
#[async_trait]
pub trait ChannelBus: Send + Sync {
    /// Open a subscription to `channel` with the requested transport
    ///
    /// `delivery` is invoked once per incoming payload, on a thread of the
    /// transport's choosing.
    async fn subscribe(
        &self,
        channel: &str,
        transport: Transport,
        delivery: RawDelivery,
    ) -> Result<SubscriptionHandle>;
}

/// Reject empty channel names before they reach a transport
pub(crate) fn validate_channel(channel: &str) -> Result<()> {
    if channel.trim().is_empty() {
        return Err(Error::InvalidChannel("empty channel name".to_string()));
    }
    Ok(())
}
