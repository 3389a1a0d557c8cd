//! NATS-backed channel bus
//!
//! `Transport::BestEffort` maps to a core NATS subscription (at-most-once),
//! `Transport::Reliable` to a JetStream pull consumer with explicit acks.
//! Each subscription runs its delivery loop on a spawned task that the
//! handle aborts on close.

use crate::channel::{
    validate_channel, ChannelBus, RawDelivery, Subscription, SubscriptionHandle, Transport,
};
use crate::error::{Error, Result};
use async_nats::jetstream::{self, consumer, stream::Config as StreamConfig};
use async_trait::async_trait;
use futures::StreamExt;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

/// Channel bus over a NATS connection
pub struct NatsBus {
    client: async_nats::Client,
    jetstream: jetstream::Context,
}

impl NatsBus {
    /// Connect to a NATS server
    pub async fn connect(url: &str) -> Result<Self> {
        info!("Connecting to NATS at {}", url);
        let client = async_nats::connect(url)
            .await
            .map_err(|e| Error::Connection(e.to_string()))?;
        let jetstream = jetstream::new(client.clone());
        Ok(Self { client, jetstream })
    }

    async fn subscribe_core(&self, channel: &str, delivery: RawDelivery) -> Result<JoinHandle<()>> {
        let mut subscriber = self
            .client
            .subscribe(channel.to_string())
            .await
            .map_err(|e| Error::Subscribe(e.to_string()))?;

        debug!(channel, "core NATS subscription opened");
        Ok(tokio::spawn(async move {
            while let Some(msg) = subscriber.next().await {
                delivery(msg.payload.as_ref());
            }
        }))
    }

    async fn subscribe_jetstream(
        &self,
        channel: &str,
        delivery: RawDelivery,
    ) -> Result<JoinHandle<()>> {
        let stream_name = stream_name(channel);

        let stream = self
            .jetstream
            .get_or_create_stream(StreamConfig {
                name: stream_name.clone(),
                subjects: vec![channel.to_string()],
                ..Default::default()
            })
            .await
            .map_err(|e| Error::Subscribe(e.to_string()))?;

        let consumer = stream
            .create_consumer(consumer::pull::Config {
                filter_subject: channel.to_string(),
                ack_policy: consumer::AckPolicy::Explicit,
                deliver_policy: consumer::DeliverPolicy::New,
                ..Default::default()
            })
            .await
            .map_err(|e| Error::Subscribe(e.to_string()))?;

        let mut messages = consumer
            .messages()
            .await
            .map_err(|e| Error::Subscribe(e.to_string()))?;

        debug!(channel, stream = %stream_name, "JetStream subscription opened");
        let subject = channel.to_string();
        Ok(tokio::spawn(async move {
            while let Some(msg) = messages.next().await {
                let msg = match msg {
                    Ok(msg) => msg,
                    Err(e) => {
                        error!("JetStream delivery error on {}: {}", subject, e);
                        continue;
                    }
                };
                delivery(msg.payload.as_ref());
                if let Err(e) = msg.ack().await {
                    error!("Failed to ack message on {}: {}", subject, e);
                }
            }
        }))
    }
}

#[async_trait]
impl ChannelBus for NatsBus {
    async fn subscribe(
        &self,
        channel: &str,
        transport: Transport,
        delivery: RawDelivery,
    ) -> Result<SubscriptionHandle> {
        validate_channel(channel)?;

        let task = match transport {
            Transport::BestEffort => self.subscribe_core(channel, delivery).await?,
            Transport::Reliable => self.subscribe_jetstream(channel, delivery).await?,
        };

        Ok(SubscriptionHandle::new(Box::new(NatsSubscription {
            channel: channel.to_string(),
            task,
        })))
    }
}

struct NatsSubscription {
    channel: String,
    task: JoinHandle<()>,
}

impl Subscription for NatsSubscription {
    fn channel(&self) -> &str {
        &self.channel
    }

    fn close(&self) {
        self.task.abort();
        debug!(channel = %self.channel, "NATS subscription closed");
    }
}

/// JetStream stream name for a channel
fn stream_name(channel: &str) -> String {
    channel
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_uppercase()
            } else {
                '_'
            }
        })
        .collect()
}
