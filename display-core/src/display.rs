//! Channel display adapter
//!
//! `ChannelDisplay` brings together the pieces most channel-driven displays
//! need: it subscribes and unsubscribes as the display is enabled or
//! disabled, runs every incoming item through a `FrameFilter`, and hands
//! frame-resolvable items to the concrete visualization's `ItemHandler`.

use crate::channel::{ChannelBus, RawDelivery, SubscriptionHandle, Transport};
use crate::config::DisplayConfig;
use crate::metrics::{DISPLAY_ITEMS_TOTAL, DISPLAY_SUBSCRIBE_TOTAL};
use crate::properties::{Property, StatusBoard, StatusLevel};
use async_trait::async_trait;
use frame_sync::{FrameFilter, FrameId, Stamped, TransformBuffer};
use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

const STATUS_CHANNEL: &str = "Channel";
const STATUS_ITEM: &str = "Item";

/// Items a channel display can carry
pub trait StreamItem: DeserializeOwned + Stamped + Send + Sync + 'static {}

impl<T> StreamItem for T where T: DeserializeOwned + Stamped + Send + Sync + 'static {}

/// Per-item processing hook implemented by the concrete visualization
///
/// Called once per frame-resolvable item, on whichever thread the transport
/// or the host update loop delivers on.
pub trait ItemHandler<T>: Send + Sync {
    /// Process one item
    fn process_item(&self, item: &T);
}

/// Plugin lifecycle hooks called by the host framework
#[async_trait]
pub trait Display: Send {
    /// Called once after construction, before any other hook
    fn on_initialize(&mut self);

    /// Display was switched on
    async fn on_enable(&mut self);

    /// Display was switched off
    async fn on_disable(&mut self);

    /// Discard accumulated state
    fn reset(&mut self);

    /// The reference frame changed
    fn fixed_frame_changed(&mut self, frame: &FrameId);

    /// Apply pending property edits
    async fn properties_changed(&mut self);

    /// Per-tick update from the host render loop
    async fn update(&mut self, dt: Duration);
}

struct DeliveryState<T> {
    handler: Box<dyn ItemHandler<T>>,
    received: AtomicU64,
    status: StatusBoard,
    // Channel the open subscription is on, for metric labels.
    channel: RwLock<String>,
}

/// Display adapter for a typed data channel
///
/// Generic over the item type; the concrete visualization supplies an
/// [`ItemHandler`] and the host supplies the bus and transform buffer.
pub struct ChannelDisplay<T: StreamItem> {
    bus: Arc<dyn ChannelBus>,
    filter: Arc<FrameFilter<T>>,
    state: Arc<DeliveryState<T>>,
    channel_property: Property<String>,
    unreliable_property: Property<bool>,
    subscription: Option<SubscriptionHandle>,
    enabled: bool,
}

impl<T: StreamItem> ChannelDisplay<T> {
    /// Create a display wired to `bus` and `transforms`
    pub fn new(
        bus: Arc<dyn ChannelBus>,
        transforms: Arc<dyn TransformBuffer>,
        handler: Box<dyn ItemHandler<T>>,
        config: &DisplayConfig,
    ) -> Self {
        let filter = Arc::new(FrameFilter::new(
            transforms,
            config.fixed_frame.as_str(),
            config.queue_depth,
        ));

        Self {
            bus,
            filter,
            state: Arc::new(DeliveryState {
                handler,
                received: AtomicU64::new(0),
                status: StatusBoard::new(),
                channel: RwLock::new(config.channel.clone()),
            }),
            channel_property: Property::new(
                "Channel",
                "Channel to subscribe to",
                config.channel.clone(),
            ),
            unreliable_property: Property::new(
                "Unreliable",
                "Prefer best-effort transport",
                config.unreliable,
            ),
            subscription: None,
            enabled: false,
        }
    }

    /// Channel-name property widget
    pub fn channel_property(&self) -> &Property<String> {
        &self.channel_property
    }

    /// Transport-reliability property widget
    pub fn unreliable_property(&self) -> &Property<bool> {
        &self.unreliable_property
    }

    /// Status lines for the plugin panel
    pub fn status(&self) -> &StatusBoard {
        &self.state.status
    }

    /// Items delivered to the handler since the last reset
    pub fn items_received(&self) -> u64 {
        self.state.received.load(Ordering::Relaxed)
    }

    /// Whether a subscription is currently open
    pub fn is_subscribed(&self) -> bool {
        self.subscription.is_some()
    }

    /// Whether the display is enabled
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// The frame filter, for introspection
    pub fn filter(&self) -> &FrameFilter<T> {
        &self.filter
    }

    async fn subscribe(&mut self) {
        if !self.enabled {
            return;
        }

        let channel = self.channel_property.get();
        if channel.trim().is_empty() {
            self.state
                .status
                .set(StatusLevel::Warn, STATUS_CHANNEL, "No channel configured");
            return;
        }

        let transport = if self.unreliable_property.get() {
            Transport::BestEffort
        } else {
            Transport::Reliable
        };
        *self.state.channel.write() = channel.clone();

        let delivery = self.make_delivery(channel.clone());
        match self.bus.subscribe(&channel, transport, delivery).await {
            Ok(handle) => {
                DISPLAY_SUBSCRIBE_TOTAL
                    .with_label_values(&[&channel, "ok"])
                    .inc();
                self.subscription = Some(handle);
                self.state.status.set(StatusLevel::Ok, STATUS_CHANNEL, "OK");
            }
            Err(e) => {
                DISPLAY_SUBSCRIBE_TOTAL
                    .with_label_values(&[&channel, "error"])
                    .inc();
                self.state.status.set(
                    StatusLevel::Error,
                    STATUS_CHANNEL,
                    format!("Error subscribing: {}", e),
                );
            }
        }
    }

    fn unsubscribe(&mut self) {
        if let Some(subscription) = self.subscription.take() {
            debug!(channel = subscription.channel(), "unsubscribing");
        }
    }

    fn make_delivery(&self, channel: String) -> RawDelivery {
        let filter = self.filter.clone();
        let state = self.state.clone();
        Arc::new(move |payload: &[u8]| {
            // Absent items: nothing to count, nothing to process.
            if payload.is_empty() || payload == &b"null"[..] {
                DISPLAY_ITEMS_TOTAL
                    .with_label_values(&[&channel, "ignored"])
                    .inc();
                return;
            }
            match serde_json::from_slice::<T>(payload) {
                Ok(item) => filter.push(item),
                Err(e) => {
                    DISPLAY_ITEMS_TOTAL
                        .with_label_values(&[&channel, "parse_error"])
                        .inc();
                    state.status.set(
                        StatusLevel::Error,
                        STATUS_ITEM,
                        format!("Undecodable item: {}", e),
                    );
                }
            }
        })
    }

    fn apply_reset(&mut self) {
        self.filter.clear();
        self.state.received.store(0, Ordering::Relaxed);
        self.state.status.clear_all();
    }
}

#[async_trait]
impl<T: StreamItem> Display for ChannelDisplay<T> {
    fn on_initialize(&mut self) {
        let state = self.state.clone();
        self.filter.connect(move |item: T| {
            let received = state.received.fetch_add(1, Ordering::Relaxed) + 1;
            let channel = state.channel.read().clone();
            DISPLAY_ITEMS_TOTAL
                .with_label_values(&[&channel, "delivered"])
                .inc();
            state.status.set(
                StatusLevel::Ok,
                STATUS_CHANNEL,
                format!("{} items received", received),
            );
            state.handler.process_item(&item);
        });
    }

    async fn on_enable(&mut self) {
        self.enabled = true;
        self.subscribe().await;
    }

    async fn on_disable(&mut self) {
        self.enabled = false;
        self.unsubscribe();
        self.apply_reset();
    }

    fn reset(&mut self) {
        self.apply_reset();
    }

    fn fixed_frame_changed(&mut self, frame: &FrameId) {
        self.filter.set_target_frame(frame.clone());
        self.apply_reset();
    }

    async fn properties_changed(&mut self) {
        let channel_changed = self.channel_property.take_changed();
        let transport_changed = self.unreliable_property.take_changed();
        if channel_changed || transport_changed {
            self.unsubscribe();
            self.apply_reset();
            self.subscribe().await;
        }
    }

    async fn update(&mut self, _dt: Duration) {
        self.properties_changed().await;
        self.filter.poll();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use frame_sync::{FrameSetBuffer, Header};
    use parking_lot::Mutex;
    use serde::Deserialize;

    #[derive(Debug, Clone, Deserialize)]
    struct PointItem {
        header: Header,
        #[allow(dead_code)]
        x: f64,
    }

    impl Stamped for PointItem {
        fn frame_id(&self) -> &FrameId {
            &self.header.frame_id
        }

        fn stamp(&self) -> chrono::DateTime<chrono::Utc> {
            self.header.stamp
        }
    }

    struct CountingHandler {
        seen: Mutex<Vec<f64>>,
    }

    impl ItemHandler<PointItem> for CountingHandler {
        fn process_item(&self, item: &PointItem) {
            self.seen.lock().push(item.x);
        }
    }

    struct FailingBus;

    #[async_trait]
    impl ChannelBus for FailingBus {
        async fn subscribe(
            &self,
            _channel: &str,
            _transport: Transport,
            _delivery: RawDelivery,
        ) -> crate::Result<SubscriptionHandle> {
            Err(Error::Subscribe("broker unreachable".to_string()))
        }
    }

    fn display_over(bus: Arc<dyn ChannelBus>) -> ChannelDisplay<PointItem> {
        let transforms = Arc::new(FrameSetBuffer::new());
        transforms.add_frame("map");
        transforms.add_frame("base_link");
        let config = DisplayConfig {
            channel: "points".to_string(),
            ..Default::default()
        };
        let handler = Box::new(CountingHandler {
            seen: Mutex::new(Vec::new()),
        });
        let mut display = ChannelDisplay::new(bus, transforms, handler, &config);
        display.on_initialize();
        display
    }

    #[tokio::test]
    async fn test_subscribe_failure_is_status_not_panic() {
        let mut display = display_over(Arc::new(FailingBus));
        display.on_enable().await;

        assert!(!display.is_subscribed());
        assert_eq!(display.status().level(STATUS_CHANNEL), Some(StatusLevel::Error));
        assert!(display
            .status()
            .text(STATUS_CHANNEL)
            .unwrap()
            .contains("broker unreachable"));
    }

    #[tokio::test]
    async fn test_empty_channel_is_warn() {
        let mut display = display_over(Arc::new(crate::LocalBus::new()));
        display.channel_property().set(String::new());
        display.channel_property().take_changed();
        display.on_enable().await;

        assert!(!display.is_subscribed());
        assert_eq!(display.status().level(STATUS_CHANNEL), Some(StatusLevel::Warn));
    }

    #[tokio::test]
    async fn test_undecodable_payload_sets_item_status() {
        let bus = Arc::new(crate::LocalBus::new());
        let mut display = display_over(bus.clone());
        display.on_enable().await;

        bus.publish("points", b"not json");
        assert_eq!(display.items_received(), 0);
        assert_eq!(display.status().level(STATUS_ITEM), Some(StatusLevel::Error));
    }
}
