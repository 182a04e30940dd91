//! Per-restaurant change feed for the order list and floor plan.
//!
//! ```text
//! write handler ──publish──▶ LiveOrderHub ──broadcast──▶ WebSocket sessions
//!                              (one sender per restaurant)      │
//!                                                               ▼
//!                                                    page re-fetches its list
//! ```

use std::sync::Arc;

use dashmap::DashMap;
use serde::Serialize;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::entities::order::OrderStatus;

/// Enough to absorb a burst of writes while a page reconnects.
const BROADCAST_CAPACITY: usize = 256;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LiveEvent {
    OrderCreated { order_id: Uuid },
    OrderChanged { order_id: Uuid, status: OrderStatus },
    TableChanged { table_id: Uuid, occupied: bool },
    /// A table was added, edited or removed.
    LayoutChanged { table_id: Uuid },
    TableMoved { table_id: Uuid, x: f64, y: f64 },
}

#[derive(Clone, Default)]
pub struct LiveOrderHub {
    restaurants: Arc<DashMap<Uuid, broadcast::Sender<LiveEvent>>>,
}

impl LiveOrderHub {
    pub fn new() -> Self {
        Self::default()
    }

    fn sender(&self, restaurant_id: Uuid) -> broadcast::Sender<LiveEvent> {
        self.restaurants
            .entry(restaurant_id)
            .or_insert_with(|| broadcast::channel(BROADCAST_CAPACITY).0)
            .clone()
    }

    pub fn subscribe(&self, restaurant_id: Uuid) -> broadcast::Receiver<LiveEvent> {
        self.sender(restaurant_id).subscribe()
    }

    /// Fans the event out to every open page of the restaurant. Having no
    /// listener is normal and not an error.
    pub fn publish(&self, restaurant_id: Uuid, event: LiveEvent) {
        let Some(sender) = self.restaurants.get(&restaurant_id).map(|s| s.clone()) else {
            return;
        };
        match sender.send(event) {
            Ok(receivers) => tracing::debug!(%restaurant_id, receivers, "live event published"),
            Err(_) => tracing::trace!(%restaurant_id, "live event dropped, no subscribers"),
        }
    }

    pub fn subscriber_count(&self, restaurant_id: Uuid) -> usize {
        self.restaurants
            .get(&restaurant_id)
            .map(|s| s.receiver_count())
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscribers_receive_their_restaurants_events_only() {
        let hub = LiveOrderHub::new();
        let ours = Uuid::new_v4();
        let theirs = Uuid::new_v4();
        let mut rx = hub.subscribe(ours);
        let mut other_rx = hub.subscribe(theirs);

        let event = LiveEvent::OrderChanged {
            order_id: Uuid::new_v4(),
            status: OrderStatus::Ready,
        };
        hub.publish(ours, event.clone());

        assert_eq!(rx.recv().await.unwrap(), event);
        assert!(other_rx.try_recv().is_err());
    }

    #[test]
    fn publishing_without_listeners_is_harmless() {
        let hub = LiveOrderHub::new();
        let restaurant = Uuid::new_v4();
        hub.publish(
            restaurant,
            LiveEvent::OrderCreated {
                order_id: Uuid::new_v4(),
            },
        );
        assert_eq!(hub.subscriber_count(restaurant), 0);
    }

    #[test]
    fn events_serialize_with_a_type_tag() {
        let event = LiveEvent::TableChanged {
            table_id: Uuid::nil(),
            occupied: true,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "table_changed");
        assert_eq!(json["occupied"], true);

        let moved = LiveEvent::TableMoved {
            table_id: Uuid::nil(),
            x: 120.0,
            y: 40.5,
        };
        let json = serde_json::to_value(&moved).unwrap();
        assert_eq!(json["type"], "table_moved");
        assert_eq!(json["y"], 40.5);
    }
}
