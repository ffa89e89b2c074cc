//! The typed, synchronous domain event bus described in spec §4.6.
//!
//! Unlike the teacher's `tokio::sync::broadcast` channels (pull-based,
//! consumed from a spawned task per subscriber), this bus calls every
//! subscriber's handler synchronously, in registration order, on the
//! emitting thread — the spec requires strict per-`matchId` ordering across
//! the whole `order:matched -> ... -> settlement:confirmed|failed` sequence,
//! which a fan-out of independently-scheduled broadcast receivers cannot
//! guarantee. Handlers must therefore never block or await; anything that
//! needs I/O offloads it with `tokio::spawn` from inside the handler body.
//!
//! The bus holds its own lock (`DashMap` entries), separate from every
//! domain component's lock — a handler must never call back into a matcher,
//! whitelist, or settlement coordinator method that synchronously acquires
//! its own mutex while the bus's internal map is locked for that tag.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::Mutex;
use tracing::trace;

use crate::models::Event;

pub type SubscriptionId = u64;

type Handler = Arc<dyn Fn(&Event) + Send + Sync>;

#[derive(Default)]
pub struct EventBus {
    by_tag: DashMap<&'static str, Mutex<Vec<(SubscriptionId, Handler)>>>,
    all: Mutex<Vec<(SubscriptionId, Handler)>>,
    next_id: AtomicU64,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe to a single closed-set tag, e.g. `"order:matched"`.
    pub fn subscribe<F>(&self, tag: &'static str, handler: F) -> SubscriptionId
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.by_tag
            .entry(tag)
            .or_default()
            .lock()
            .push((id, Arc::new(handler)));
        id
    }

    /// Subscribe to every event regardless of tag — used by the push-channel
    /// bridge, which routes purely on [`Event::channels`].
    pub fn subscribe_all<F>(&self, handler: F) -> SubscriptionId
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.all.lock().push((id, Arc::new(handler)));
        id
    }

    pub fn unsubscribe(&self, id: SubscriptionId) {
        for entry in self.by_tag.iter() {
            entry.value().lock().retain(|(sub_id, _)| *sub_id != id);
        }
        self.all.lock().retain(|(sub_id, _)| *sub_id != id);
    }

    /// Deliver `event` to every tag-specific subscriber, then every
    /// catch-all subscriber, in registration order. Synchronous: returns
    /// only once every handler has returned.
    pub fn emit(&self, event: Event) {
        let tag = event.tag();
        trace!(tag, channels = ?event.channels(), "emitting domain event");

        if let Some(subs) = self.by_tag.get(tag) {
            let handlers: Vec<Handler> = subs.lock().iter().map(|(_, h)| h.clone()).collect();
            for handler in handlers {
                handler(&event);
            }
        }

        let catch_all: Vec<Handler> = self.all.lock().iter().map(|(_, h)| h.clone()).collect();
        for handler in catch_all {
            handler(&event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::FixedBytes;
    use parking_lot::Mutex as PMutex;

    #[test]
    fn tag_scoped_subscriber_only_sees_its_tag() {
        let bus = EventBus::new();
        let seen = Arc::new(PMutex::new(Vec::new()));
        let seen_clone = seen.clone();
        bus.subscribe("settlement:queued", move |event| {
            seen_clone.lock().push(event.tag().to_string());
        });

        bus.emit(Event::SettlementQueued {
            match_id: FixedBytes::ZERO,
        });
        bus.emit(Event::SignatureComplete {
            match_id: FixedBytes::ZERO,
        });

        assert_eq!(*seen.lock(), vec!["settlement:queued".to_string()]);
    }

    #[test]
    fn handlers_fire_in_registration_order() {
        let bus = EventBus::new();
        let order = Arc::new(PMutex::new(Vec::new()));
        let order_a = order.clone();
        let order_b = order.clone();
        bus.subscribe_all(move |_| order_a.lock().push("a"));
        bus.subscribe_all(move |_| order_b.lock().push("b"));

        bus.emit(Event::SignatureComplete {
            match_id: FixedBytes::ZERO,
        });

        assert_eq!(*order.lock(), vec!["a", "b"]);
    }

    #[test]
    fn unsubscribe_stops_future_delivery() {
        let bus = EventBus::new();
        let count = Arc::new(std::sync::atomic::AtomicU64::new(0));
        let count_clone = count.clone();
        let id = bus.subscribe("settlement:queued", move |_| {
            count_clone.fetch_add(1, Ordering::Relaxed);
        });

        bus.emit(Event::SettlementQueued {
            match_id: FixedBytes::ZERO,
        });
        bus.unsubscribe(id);
        bus.emit(Event::SettlementQueued {
            match_id: FixedBytes::ZERO,
        });

        assert_eq!(count.load(Ordering::Relaxed), 1);
    }
}
