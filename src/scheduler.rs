use crate::channel::EventReceiver;
use crate::clock::Clock;
use crate::settings::SettingsStore;
use crate::tracker::{EntitySnapshot, SpatialTracker, TrackerUpdate};
use crate::types::{AlertEvent, Event};
use log::{debug, info, warn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Whatever draws the map and plays the alert.
pub trait PresentationSink: Send {
    fn on_update(&mut self, update: &TrackerUpdate);

    fn on_alert(&mut self, alert: &AlertEvent, volume: u32);
}

/// Sink that only writes to the log.
pub struct LogSink;

impl PresentationSink for LogSink {
    fn on_update(&mut self, update: &TrackerUpdate) {
        match update {
            TrackerUpdate::Created(s) => info!(
                "Map: {} appeared at ({:.0}, {:.0})",
                s.identity, s.position.x, s.position.y
            ),
            TrackerUpdate::Retargeted(s) => debug!(
                "Map: {} heading to ({:.0}, {:.0})",
                s.identity, s.target.x, s.target.y
            ),
            TrackerUpdate::Moved(_) => {}
            TrackerUpdate::Removed(identity) => info!("Map: {} removed", identity),
        }
    }

    fn on_alert(&mut self, alert: &AlertEvent, volume: u32) {
        warn!("ALERT (volume {}%): {}", volume, alert.message);
    }
}

/// The single consumer. Each tick drains the channel into the tracker,
/// expires stale entities and advances animations, in that order, so an
/// entity is never expired on the tick its detection arrived.
pub struct Scheduler<S: PresentationSink> {
    events: EventReceiver,
    tracker: SpatialTracker,
    sink: S,
    settings: Arc<SettingsStore>,
    clock: Arc<dyn Clock>,
    running: Arc<AtomicBool>,
    detection_timeout: f64,
}

impl<S: PresentationSink> Scheduler<S> {
    pub fn new(
        events: EventReceiver,
        tracker: SpatialTracker,
        sink: S,
        settings: Arc<SettingsStore>,
        clock: Arc<dyn Clock>,
        running: Arc<AtomicBool>,
        detection_timeout: f64,
    ) -> Self {
        Scheduler {
            events,
            tracker,
            sink,
            settings,
            clock,
            running,
            detection_timeout,
        }
    }

    pub fn tick(&mut self) {
        let now = self.clock.now();

        for event in self.events.drain() {
            match event {
                Event::Detection(d) => {
                    let update = self.tracker.upsert(
                        &d.plate,
                        d.distance_meters,
                        d.bearing_offset,
                        d.orientation,
                        now,
                    );
                    self.sink.on_update(&update);
                }
                Event::Alert(alert) => {
                    let volume = self.settings.read().volume_level;
                    self.sink.on_alert(&alert, volume);
                }
            }
        }

        for update in self.tracker.expire(now, self.detection_timeout) {
            self.sink.on_update(&update);
        }
        for update in self.tracker.advance() {
            self.sink.on_update(&update);
        }
    }

    pub fn snapshot(&self) -> Vec<EntitySnapshot> {
        self.tracker.snapshot()
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Ticks every `interval` until the running flag clears.
    pub async fn run(mut self, interval: Duration) -> Self {
        let mut ticker = tokio::time::interval(interval);
        while self.running.load(Ordering::SeqCst) {
            ticker.tick().await;
            self.tick();
        }
        // Take whatever the pipelines sent on their way out.
        self.tick();
        info!("Scheduler stopped with {} entities on the map", self.tracker.len());
        self
    }
}
