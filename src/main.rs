use env_logger::Env;
use futures::future::join_all;
use log::{error, info, warn};
use plate_radar::alert::AlertGate;
use plate_radar::channel::event_channel;
use plate_radar::clock::{Clock, SystemClock};
use plate_radar::config::Config;
use plate_radar::consensus::Recognizer;
use plate_radar::db::WatchList;
use plate_radar::detector::WholeFrameDetector;
use plate_radar::pipeline::{DetectionPipeline, PipelineContext};
use plate_radar::scheduler::{LogSink, Scheduler};
use plate_radar::settings::SettingsStore;
use plate_radar::source::{CameraFeed, StillImageSource};
use plate_radar::tracker::SpatialTracker;
use plate_radar::types::Orientation;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
    info!("Starting plate-radar");
    if let Err(e) = run().await {
        error!("Fatal: {}", e);
        std::process::exit(1);
    }
    info!("Exiting main");
}

async fn run() -> Result<(), failure::Error> {
    let config = Config::from_env()?;
    let watchlist = Arc::new(WatchList::open(&config.watchlist_path)?);
    let settings = Arc::new(SettingsStore::open(&config.settings_path));
    info!("Settings: {:?}", settings.read());

    let running = Arc::new(AtomicBool::new(true));
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let (tx, rx) = event_channel();
    let ctx = PipelineContext {
        events: tx,
        running: running.clone(),
        alert_gate: Arc::new(AlertGate::new(config.alert_cooldown)),
        watchlist,
        settings: settings.clone(),
        clock: clock.clone(),
        alert_message: config.alert_message.clone(),
        fallback_distance: config.fallback_distance,
    };

    let cameras = [
        (Orientation::Front, &config.front_camera_serial, &config.front_image),
        (Orientation::Back, &config.back_camera_serial, &config.back_image),
    ];
    let mut pipelines = vec![];
    for (orientation, serial, image) in cameras {
        let image = match image {
            Some(path) => path.clone(),
            None => {
                warn!("No feed configured for {} camera {}", orientation, serial);
                continue;
            }
        };
        let feed = CameraFeed::InjectedStill(StillImageSource::from_path(image, config.frame_interval));
        let mut pipeline = DetectionPipeline::new(
            serial,
            orientation,
            feed,
            Box::new(WholeFrameDetector),
            recognizers(&config)?,
            ctx.clone(),
        );
        pipelines.push(tokio::task::spawn_blocking(move || pipeline.run()));
    }
    drop(ctx);

    let scheduler = Scheduler::new(
        rx,
        SpatialTracker::new(config.map.clone()),
        LogSink,
        settings,
        clock,
        running.clone(),
        config.detection_timeout,
    );
    let scheduler_task = tokio::spawn(scheduler.run(config.tick_interval));

    tokio::signal::ctrl_c().await?;
    info!("Shutting down");
    running.store(false, Ordering::SeqCst);

    for result in join_all(pipelines).await {
        match result {
            Ok(Ok(())) => {}
            Ok(Err(e)) => error!("Pipeline ended with error: {}", e),
            Err(e) => error!("Pipeline task failed: {}", e),
        }
    }
    if let Err(e) = scheduler_task.await {
        error!("Scheduler task failed: {}", e);
    }
    Ok(())
}

#[cfg(feature = "tesseract")]
fn recognizers(config: &Config) -> Result<Vec<Box<dyn Recognizer>>, failure::Error> {
    use plate_radar::tesseract::TesseractRecognizer;

    let engine: Box<dyn Recognizer> = Box::new(TesseractRecognizer::new(
        &config.tessdata_path,
        &config.tesseract_lang,
    )?);
    Ok(vec![engine])
}

#[cfg(not(feature = "tesseract"))]
fn recognizers(_config: &Config) -> Result<Vec<Box<dyn Recognizer>>, failure::Error> {
    warn!("Built without recognition engines, nothing will match");
    Ok(vec![])
}
