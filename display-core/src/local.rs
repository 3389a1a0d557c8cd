//! In-process channel bus
//!
//! Broker-free `ChannelBus` for tests, demos, and hosts that feed displays
//! directly. Publishing delivers synchronously on the caller's thread. The
//! counters exist so wiring behavior (exactly one subscription open, and so
//! on) can be asserted.

use crate::channel::{
    validate_channel, ChannelBus, RawDelivery, Subscription, SubscriptionHandle, Transport,
};
use crate::error::Result;
use async_trait::async_trait;
use parking_lot::RwLock;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;

#[derive(Default)]
struct LocalBusState {
    sinks: RwLock<HashMap<String, Vec<(u64, RawDelivery)>>>,
    next_id: AtomicU64,
    subscribe_count: AtomicU64,
}

/// In-process pub/sub bus
#[derive(Clone, Default)]
pub struct LocalBus {
    state: Arc<LocalBusState>,
}

impl LocalBus {
    /// Create an empty bus
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliver a raw payload to every subscriber of `channel`
    pub fn publish(&self, channel: &str, payload: &[u8]) {
        let sinks: Vec<RawDelivery> = {
            let map = self.state.sinks.read();
            match map.get(channel) {
                Some(entries) => entries.iter().map(|(_, sink)| sink.clone()).collect(),
                None => return,
            }
        };
        for sink in sinks {
            sink(payload);
        }
    }

    /// Serialize `value` as JSON and publish it
    pub fn publish_json<T: Serialize>(&self, channel: &str, value: &T) -> Result<()> {
        let payload = serde_json::to_vec(value)?;
        self.publish(channel, &payload);
        Ok(())
    }

    /// Number of open subscriptions on `channel`
    pub fn subscriber_count(&self, channel: &str) -> usize {
        self.state
            .sinks
            .read()
            .get(channel)
            .map_or(0, |entries| entries.len())
    }

    /// Total successful subscribe calls since creation
    pub fn subscribe_count(&self) -> u64 {
        self.state.subscribe_count.load(Ordering::Relaxed)
    }
}

struct LocalSubscription {
    state: Arc<LocalBusState>,
    channel: String,
    id: u64,
}

impl Subscription for LocalSubscription {
    fn channel(&self) -> &str {
        &self.channel
    }

    fn close(&self) {
        let mut map = self.state.sinks.write();
        if let Some(entries) = map.get_mut(&self.channel) {
            entries.retain(|(id, _)| *id != self.id);
            if entries.is_empty() {
                map.remove(&self.channel);
            }
        }
        debug!(channel = %self.channel, "local subscription closed");
    }
}

#[async_trait]
impl ChannelBus for LocalBus {
    async fn subscribe(
        &self,
        channel: &str,
        _transport: Transport,
        delivery: RawDelivery,
    ) -> Result<SubscriptionHandle> {
        validate_channel(channel)?;

        let id = self.state.next_id.fetch_add(1, Ordering::Relaxed);
        self.state
            .sinks
            .write()
            .entry(channel.to_string())
            .or_default()
            .push((id, delivery));
        self.state.subscribe_count.fetch_add(1, Ordering::Relaxed);

        debug!(channel, "local subscription opened");
        Ok(SubscriptionHandle::new(Box::new(LocalSubscription {
            state: self.state.clone(),
            channel: channel.to_string(),
            id,
        })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    fn recording_sink() -> (RawDelivery, Arc<Mutex<Vec<Vec<u8>>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let delivery: RawDelivery = Arc::new(move |payload: &[u8]| {
            sink.lock().push(payload.to_vec());
        });
        (delivery, seen)
    }

    #[tokio::test]
    async fn test_publish_reaches_subscriber() {
        let bus = LocalBus::new();
        let (delivery, seen) = recording_sink();

        let _sub = bus
            .subscribe("scan", Transport::Reliable, delivery)
            .await
            .unwrap();
        assert_eq!(bus.subscriber_count("scan"), 1);

        bus.publish("scan", b"{\"x\":1}");
        bus.publish("other", b"ignored");

        let seen = seen.lock();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0], b"{\"x\":1}");
    }

    #[tokio::test]
    async fn test_drop_closes_subscription() {
        let bus = LocalBus::new();
        let (delivery, seen) = recording_sink();

        let sub = bus
            .subscribe("scan", Transport::BestEffort, delivery)
            .await
            .unwrap();
        assert_eq!(sub.channel(), "scan");
        drop(sub);

        assert_eq!(bus.subscriber_count("scan"), 0);
        bus.publish("scan", b"late");
        assert!(seen.lock().is_empty());
    }

    #[tokio::test]
    async fn test_empty_channel_rejected() {
        let bus = LocalBus::new();
        let (delivery, _seen) = recording_sink();
        let err = bus.subscribe("", Transport::Reliable, delivery).await;
        assert!(err.is_err());
        assert_eq!(bus.subscribe_count(), 0);
    }
}
