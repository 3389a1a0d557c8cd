//! Channel display demo
//!
//! Wires a `ChannelDisplay` to the in-process bus and a static transform
//! buffer, publishes a few stamped points, and shows the filter holding an
//! item back until its frame appears.

use chrono::{DateTime, Utc};
use display_core::{ChannelDisplay, Display, DisplayConfig, ItemHandler, LocalBus};
use frame_sync::{FrameId, FrameSetBuffer, Header, Stamped};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct PointItem {
    header: Header,
    x: f64,
    y: f64,
    z: f64,
}

impl Stamped for PointItem {
    fn frame_id(&self) -> &FrameId {
        &self.header.frame_id
    }

    fn stamp(&self) -> DateTime<Utc> {
        self.header.stamp
    }
}

struct LoggingHandler;

impl ItemHandler<PointItem> for LoggingHandler {
    fn process_item(&self, item: &PointItem) {
        tracing::info!(
            frame = %item.header.frame_id,
            x = item.x,
            y = item.y,
            z = item.z,
            "rendering point"
        );
    }
}

fn point(frame: &str, x: f64) -> PointItem {
    PointItem {
        header: Header::new(frame, Utc::now()),
        x,
        y: 0.0,
        z: 0.0,
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    tracing::info!("Starting Parallax display demo");

    let bus = Arc::new(LocalBus::new());
    let transforms = Arc::new(FrameSetBuffer::new());
    transforms.add_frame("map");
    transforms.add_frame("base_link");

    let config = DisplayConfig {
        channel: "demo/points".to_string(),
        ..Default::default()
    };

    let mut channel_display =
        ChannelDisplay::new(bus.clone(), transforms.clone(), Box::new(LoggingHandler), &config);
    channel_display.on_initialize();
    channel_display.on_enable().await;

    bus.publish_json("demo/points", &point("base_link", 1.0))?;
    bus.publish_json("demo/points", &point("lidar", 2.0))?;
    tracing::info!(
        delivered = channel_display.items_received(),
        pending = channel_display.filter().pending_len(),
        "after publish: lidar point is waiting for its frame"
    );

    transforms.add_frame("lidar");
    channel_display.update(Duration::from_millis(16)).await;
    tracing::info!(
        delivered = channel_display.items_received(),
        pending = channel_display.filter().pending_len(),
        "after update: lidar frame resolved"
    );

    channel_display.on_disable().await;
    tracing::info!("Display disabled, shutting down");
    Ok(())
}
