use crate::types::{AlertEvent, DetectionEvent, Event};
use log::warn;
use tokio::sync::mpsc::{self, error::TryRecvError, UnboundedReceiver, UnboundedSender};

/// Producer half. Cloned once per pipeline; sending never blocks.
#[derive(Clone)]
pub struct EventSender {
    tx: UnboundedSender<Event>,
}

pub struct EventReceiver {
    rx: UnboundedReceiver<Event>,
}

pub fn event_channel() -> (EventSender, EventReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    (EventSender { tx }, EventReceiver { rx })
}

impl EventSender {
    /// Returns false once the consumer has gone away.
    pub fn send(&self, event: Event) -> bool {
        if self.tx.send(event).is_err() {
            warn!("Event consumer dropped, discarding event");
            return false;
        }
        true
    }

    pub fn detection(&self, event: DetectionEvent) -> bool {
        self.send(Event::Detection(event))
    }

    pub fn alert(&self, event: AlertEvent) -> bool {
        self.send(Event::Alert(event))
    }
}

impl EventReceiver {
    /// Takes everything queued right now without waiting. Events from one
    /// sender come out in the order they were sent.
    pub fn drain(&mut self) -> Vec<Event> {
        let mut events = Vec::new();
        loop {
            match self.rx.try_recv() {
                Ok(event) => events.push(event),
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
        events
    }
}
