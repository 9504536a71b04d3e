use image::{GrayImage, RgbImage};
use plate_radar::alert::AlertGate;
use plate_radar::channel::event_channel;
use plate_radar::clock::{Clock, ManualClock};
use plate_radar::consensus::Recognizer;
use plate_radar::db::WatchList;
use plate_radar::detector::Detector;
use plate_radar::pipeline::{DetectionPipeline, PipelineContext, PipelineState};
use plate_radar::scheduler::{PresentationSink, Scheduler};
use plate_radar::settings::SettingsStore;
use plate_radar::source::{CameraFeed, DepthLookup, Frame, FrameSource, SourceError};
use plate_radar::tracker::{MapGeometry, SpatialTracker, TrackerUpdate};
use plate_radar::types::{AlertEvent, BoundingBox, Orientation};
use std::collections::VecDeque;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};
use std::thread;
use tempfile::TempDir;

struct CenterBox;

impl Detector for CenterBox {
    fn detect(&mut self, image: &RgbImage) -> Result<Vec<BoundingBox>, failure::Error> {
        let (w, h) = (image.width() as i32, image.height() as i32);
        Ok(vec![BoundingBox::new(w / 2 - 20, h / 2 - 10, w / 2 + 20, h / 2 + 10)])
    }
}

struct Reads(&'static str, &'static str);

impl Recognizer for Reads {
    fn name(&self) -> &str {
        self.0
    }

    fn recognize(&mut self, _region: &GrayImage) -> Result<String, failure::Error> {
        Ok(self.1.to_string())
    }
}

struct Broken;

impl Recognizer for Broken {
    fn name(&self) -> &str {
        "broken"
    }

    fn recognize(&mut self, _region: &GrayImage) -> Result<String, failure::Error> {
        Err(failure::err_msg("model not loaded"))
    }
}

#[derive(Clone, Default)]
struct SharedSink {
    updates: Arc<Mutex<Vec<TrackerUpdate>>>,
    alerts: Arc<Mutex<Vec<AlertEvent>>>,
}

impl PresentationSink for SharedSink {
    fn on_update(&mut self, update: &TrackerUpdate) {
        self.updates.lock().unwrap().push(update.clone());
    }

    fn on_alert(&mut self, alert: &AlertEvent, _volume: u32) {
        self.alerts.lock().unwrap().push(alert.clone());
    }
}

struct Scripted {
    frames: VecDeque<Frame>,
    fail_start: bool,
}

impl FrameSource for Scripted {
    fn start(&mut self) -> Result<(), SourceError> {
        if self.fail_start {
            Err(SourceError::Fatal("camera not found".to_string()))
        } else {
            Ok(())
        }
    }

    fn next_frame(&mut self) -> Result<Frame, SourceError> {
        self.frames
            .pop_front()
            .ok_or_else(|| SourceError::Fatal("stream ended".to_string()))
    }

    fn stop(&mut self) {}
}

fn frame(distance: f64) -> Frame {
    let depth: DepthLookup = Box::new(move |_x, _y| Some(distance));
    Frame {
        color: RgbImage::new(320, 240),
        depth: Some(depth),
    }
}

struct World {
    _dir: TempDir,
    ctx: PipelineContext,
    clock: Arc<ManualClock>,
    scheduler: Scheduler<SharedSink>,
    sink: SharedSink,
}

fn world(plates: &[&str]) -> World {
    let dir = tempfile::tempdir().unwrap();
    let watchlist = WatchList::open(dir.path().join("plates.txt")).unwrap();
    for plate in plates {
        watchlist.add(plate).unwrap();
    }
    let settings = Arc::new(SettingsStore::open(dir.path().join("settings.json")));
    let clock = Arc::new(ManualClock::new(0.0));
    let running = Arc::new(AtomicBool::new(true));
    let (tx, rx) = event_channel();
    let ctx = PipelineContext {
        events: tx,
        running: running.clone(),
        alert_gate: Arc::new(AlertGate::new(120.0)),
        watchlist: Arc::new(watchlist),
        settings: settings.clone(),
        clock: clock.clone(),
        alert_message: "UWAGA TAJNIAK!".to_string(),
        fallback_distance: 2.0,
    };
    let geometry = MapGeometry {
        pixels_per_meter: 50.0,
        ..MapGeometry::new(800.0, 800.0)
    };
    let sink = SharedSink::default();
    let scheduler = Scheduler::new(
        rx,
        SpatialTracker::new(geometry),
        sink.clone(),
        settings,
        clock.clone(),
        running,
        5.0,
    );
    World {
        _dir: dir,
        ctx,
        clock,
        scheduler,
        sink,
    }
}

#[test]
fn approaching_plate_moves_toward_center_then_expires() {
    let mut w = world(&["ABC1234"]);
    let mut front = DetectionPipeline::new(
        "front",
        Orientation::Front,
        CameraFeed::Live(Box::new(Scripted {
            frames: VecDeque::new(),
            fail_start: false,
        })),
        Box::new(CenterBox),
        vec![
            Box::new(Reads("a", "")) as Box<dyn Recognizer>,
            Box::new(Reads("b", "ABC-1234")),
        ],
        w.ctx.clone(),
    );

    let center_y = 400.0;
    let mut ys = vec![];
    for (t, distance) in [(0.0, 5.0), (1.0, 4.0), (2.0, 3.0)] {
        w.clock.set(t);
        assert_eq!(front.process_frame(&frame(distance)), 1);
        for _ in 0..=20 {
            w.scheduler.tick();
            let snapshot = w.scheduler.snapshot();
            assert_eq!(snapshot.len(), 1);
            assert_eq!(snapshot[0].identity, "ABC1234");
            ys.push(snapshot[0].position.y);
            w.clock.advance(0.025);
        }
    }

    assert_eq!(ys[0], 150.0);
    assert_eq!(*ys.last().unwrap(), 250.0);
    assert!(ys.windows(2).all(|p| p[1] >= p[0]));
    assert!(ys.iter().all(|y| *y < center_y));

    w.clock.set(10.0);
    w.scheduler.tick();
    assert!(w.scheduler.snapshot().is_empty());

    let alerts = w.sink.alerts.lock().unwrap();
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].timestamp, 0.0);
}

#[test]
fn failed_camera_does_not_stop_the_other() {
    let mut w = world(&["ABC1234", "XYZ9876"]);
    let mut front = DetectionPipeline::new(
        "front",
        Orientation::Front,
        CameraFeed::Live(Box::new(Scripted {
            frames: (0..3).map(|_| frame(1.0)).collect(),
            fail_start: false,
        })),
        Box::new(CenterBox),
        vec![
            Box::new(Broken) as Box<dyn Recognizer>,
            Box::new(Reads("b", "ABC1234")),
        ],
        w.ctx.clone(),
    );
    let mut back = DetectionPipeline::new(
        "back",
        Orientation::Back,
        CameraFeed::Live(Box::new(Scripted {
            frames: VecDeque::new(),
            fail_start: true,
        })),
        Box::new(CenterBox),
        vec![Box::new(Reads("a", "XYZ9876")) as Box<dyn Recognizer>],
        w.ctx.clone(),
    );

    let front_handle = thread::spawn(move || {
        let result = front.run();
        (result.is_ok(), front.state())
    });
    let back_handle = thread::spawn(move || {
        let result = back.run();
        (result.is_ok(), back.state())
    });
    assert_eq!(front_handle.join().unwrap(), (false, PipelineState::Stopped));
    assert_eq!(back_handle.join().unwrap(), (false, PipelineState::Stopped));

    w.clock.set(w.clock.now() + 1.0);
    w.scheduler.tick();
    let snapshot = w.scheduler.snapshot();
    assert_eq!(snapshot.len(), 1);
    assert_eq!(snapshot[0].identity, "ABC1234");
    assert_eq!(snapshot[0].orientation, Orientation::Front);

    let created = w
        .sink
        .updates
        .lock()
        .unwrap()
        .iter()
        .filter(|u| matches!(u, TrackerUpdate::Created(_)))
        .count();
    assert_eq!(created, 1);
}
