use crate::alert::AlertGate;
use crate::channel::EventSender;
use crate::clock::Clock;
use crate::consensus::{recognize_all, resolve, Recognizer};
use crate::db::WatchList;
use crate::detector::Detector;
use crate::settings::SettingsStore;
use crate::source::{CameraFeed, Frame, FrameSource, SourceError};
use crate::types::{AlertEvent, DetectionEvent, Orientation};
use image::imageops;
use log::{debug, error, info, trace, warn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Everything the two camera pipelines share.
#[derive(Clone)]
pub struct PipelineContext {
    pub events: EventSender,
    pub running: Arc<AtomicBool>,
    pub alert_gate: Arc<AlertGate>,
    pub watchlist: Arc<WatchList>,
    pub settings: Arc<SettingsStore>,
    pub clock: Arc<dyn Clock>,
    pub alert_message: String,
    /// Used when the frame has no depth reading at the plate.
    pub fallback_distance: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Starting,
    Running,
    Stopping,
    Stopped,
}

/// One camera: frames in, detection and alert events out.
pub struct DetectionPipeline {
    camera_id: String,
    orientation: Orientation,
    feed: CameraFeed,
    detector: Box<dyn Detector>,
    engines: Vec<Box<dyn Recognizer>>,
    ctx: PipelineContext,
    state: PipelineState,
}

impl DetectionPipeline {
    pub fn new(
        camera_id: &str,
        orientation: Orientation,
        feed: CameraFeed,
        detector: Box<dyn Detector>,
        engines: Vec<Box<dyn Recognizer>>,
        ctx: PipelineContext,
    ) -> Self {
        DetectionPipeline {
            camera_id: camera_id.to_string(),
            orientation,
            feed,
            detector,
            engines,
            ctx,
            state: PipelineState::Stopped,
        }
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    /// Runs until the shared running flag clears or the source fails. The
    /// source is stopped on every way out once it has started.
    pub fn run(&mut self) -> Result<(), failure::Error> {
        self.state = PipelineState::Starting;
        info!(
            "Starting {} camera {} ({})",
            self.orientation,
            self.camera_id,
            self.feed.describe()
        );
        if let Err(e) = self.feed.start() {
            error!(
                "Unable to start {} camera {}: {}",
                self.orientation, self.camera_id, e
            );
            self.state = PipelineState::Stopped;
            return Err(format_err!(
                "{} camera {} failed to start: {}",
                self.orientation,
                self.camera_id,
                e
            ));
        }

        self.state = PipelineState::Running;
        let result = self.run_loop();

        self.state = PipelineState::Stopping;
        self.feed.stop();
        self.state = PipelineState::Stopped;
        info!("Stopped {} camera {}", self.orientation, self.camera_id);
        result
    }

    fn run_loop(&mut self) -> Result<(), failure::Error> {
        while self.ctx.running.load(Ordering::SeqCst) {
            let frame = match self.feed.next_frame() {
                Ok(frame) => frame,
                Err(SourceError::TransientMiss) => {
                    trace!("{} camera: incomplete frame", self.orientation);
                    continue;
                }
                Err(SourceError::Fatal(msg)) => {
                    error!(
                        "{} camera {} went offline: {}",
                        self.orientation, self.camera_id, msg
                    );
                    return Err(format_err!(
                        "{} camera {} failed: {}",
                        self.orientation,
                        self.camera_id,
                        msg
                    ));
                }
            };
            self.process_frame(&frame);
        }
        Ok(())
    }

    /// Detects, reads and matches every plate region in `frame`, emitting
    /// one detection per match. Returns the number of matches.
    pub fn process_frame(&mut self, frame: &Frame) -> usize {
        let boxes = match self.detector.detect(&frame.color) {
            Ok(boxes) => boxes,
            Err(e) => {
                warn!("{} camera: detector failed: {}", self.orientation, e);
                return 0;
            }
        };
        if boxes.is_empty() {
            return 0;
        }

        // One settings and watch-list view for every region of this frame,
        // taken from the persisted record so edits made while running apply.
        let settings = self.ctx.settings.reload();
        let watchlist = self.ctx.watchlist.snapshot();
        let (width, height) = frame.color.dimensions();
        let image_center_x = width as f64 / 2.0;

        let mut matches = 0;
        for bbox in boxes {
            let (x, y, w, h) = match bbox.clip(width, height) {
                Some(rect) => rect,
                None => {
                    debug!("Skipping degenerate region {:?}", bbox);
                    continue;
                }
            };
            let crop = imageops::crop_imm(&frame.color, x, y, w, h).to_image();
            let region = imageops::grayscale(&crop);
            let results = recognize_all(&mut self.engines, &region);

            let resolved = match resolve(&results, &watchlist, settings.mismatch_tolerance) {
                Some(resolved) => resolved,
                None => {
                    debug!("No watch-list match for {:?}: {:?}", bbox, results);
                    continue;
                }
            };

            let center_x = x as f64 + w as f64 / 2.0;
            let center_y = y as f64 + h as f64 / 2.0;
            let distance_meters = self.distance_at(frame, center_x as u32, center_y as u32);
            let bearing_offset = (center_x - image_center_x) / 2.0;
            let now = self.ctx.clock.now();

            info!(
                "{} camera matched {} via {} (distance {}) at {:.2}m",
                self.orientation,
                resolved.plate,
                resolved.engine,
                resolved.distance,
                distance_meters
            );
            self.ctx.events.detection(DetectionEvent {
                plate: resolved.plate,
                distance_meters,
                bearing_offset,
                orientation: self.orientation,
                timestamp: now,
            });
            matches += 1;

            if self.ctx.alert_gate.try_fire(now) {
                info!("Raising alert: {}", self.ctx.alert_message);
                self.ctx.events.alert(AlertEvent {
                    message: self.ctx.alert_message.clone(),
                    timestamp: now,
                });
            }
        }
        matches
    }

    fn distance_at(&self, frame: &Frame, x: u32, y: u32) -> f64 {
        match frame.depth_at(x, y) {
            Some(d) if d.is_finite() && d > 0.0 => d,
            _ => self.ctx.fallback_distance,
        }
    }
}

impl Drop for DetectionPipeline {
    fn drop(&mut self) {
        if let PipelineState::Running | PipelineState::Stopping = self.state {
            warn!(
                "{} camera {} dropped while running, releasing source",
                self.orientation, self.camera_id
            );
            self.feed.stop();
            self.state = PipelineState::Stopped;
        }
    }
}
