//! Wires the domain event bus to the push channel's session registry: one
//! catch-all subscription, fanning each event out to every channel
//! [`Event::channels`] names for it (spec §4.6/§4.7).

use std::sync::Arc;

use crate::events::EventBus;
use crate::models::Event;
use crate::websocket::frame::ServerFrame;
use crate::websocket::session::SessionRegistry;

pub fn wire(event_bus: &EventBus, registry: Arc<SessionRegistry>) {
    event_bus.subscribe_all(move |event: &Event| {
        let frame = ServerFrame::Event(event.clone());
        for channel in event.channels() {
            registry.publish(&channel, &frame);
        }
    });
}
