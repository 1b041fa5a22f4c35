//! Relay client: NATS subjects carrying encrypted game events.
//!
//! The engine publishes per-house state events on
//! `ec4x.game.{game_id}.state.{pubkey}` and drains order uploads from
//! `ec4x.game.{game_id}.orders`. Everything on the wire is a msgpack
//! [`RelayEvent`] whose payload is NIP-44 sealed; the relay itself never
//! sees game data.

use futures::{FutureExt, StreamExt};
use tracing::{debug, info, warn};

use uuid::Uuid;

use crate::codec::{self, RelayEvent};
use crate::error::TransportError;

/// Relay client wrapper for the authoritative engine.
pub struct RelayClient {
    client: async_nats::Client,
}

impl RelayClient {
    /// Connect to a relay server.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Relay`] if the connection fails.
    pub async fn connect(url: &str) -> Result<Self, TransportError> {
        info!(url, "connecting to relay");
        let client = async_nats::connect(url)
            .await
            .map_err(|e| TransportError::Relay(format!("failed to connect to {url}: {e}")))?;
        info!("relay connection established");
        Ok(Self { client })
    }

    /// Publish an outbound state event to its recipient's subject.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Relay`] if serialization or publishing
    /// fails.
    pub async fn publish_state(&self, event: &RelayEvent) -> Result<(), TransportError> {
        let subject = format!("ec4x.game.{}.state.{}", event.game_id, event.pubkey);
        let bytes = codec::encode_event(event)?;
        debug!(subject, kind = event.kind, turn = event.turn, "publishing state event");
        self.client
            .publish(subject, bytes.into())
            .await
            .map_err(|e| TransportError::Relay(format!("publish failed: {e}")))?;
        Ok(())
    }

    /// Subscribe to a game's order-upload subject.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Relay`] if the subscription fails.
    pub async fn subscribe_orders(
        &self,
        game_id: Uuid,
    ) -> Result<OrderSubscription, TransportError> {
        let subject = format!("ec4x.game.{game_id}.orders");
        debug!(subject, "subscribing to order uploads");
        let subscriber = self
            .client
            .subscribe(subject.clone())
            .await
            .map_err(|e| TransportError::Relay(format!("subscribe to {subject} failed: {e}")))?;
        Ok(OrderSubscription { subscriber })
    }

    /// Flush pending publishes.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Relay`] if the flush fails.
    pub async fn flush(&self) -> Result<(), TransportError> {
        self.client
            .flush()
            .await
            .map_err(|e| TransportError::Relay(format!("flush failed: {e}")))
    }
}

/// A stream of inbound order events for one game.
pub struct OrderSubscription {
    subscriber: async_nats::Subscriber,
}

impl OrderSubscription {
    /// The next decodable order event, skipping malformed messages.
    ///
    /// Malformed envelopes are dropped and logged per the transport error
    /// policy; they must never reach resolution.
    pub async fn next_event(&mut self) -> Option<RelayEvent> {
        while let Some(message) = self.subscriber.next().await {
            match codec::decode_event(&message.payload) {
                Ok(event) => return Some(event),
                Err(err) => {
                    warn!(%err, "dropping malformed relay event");
                }
            }
        }
        None
    }

    /// Drain every order event currently buffered, without waiting.
    pub fn drain_buffered(&mut self) -> Vec<RelayEvent> {
        let mut events = Vec::new();
        while let Some(message) = self
            .subscriber
            .next()
            .now_or_never()
            .flatten()
        {
            match codec::decode_event(&message.payload) {
                Ok(event) => events.push(event),
                Err(err) => warn!(%err, "dropping malformed relay event"),
            }
        }
        events
    }
}
