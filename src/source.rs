use failure::Fail;
use image::RgbImage;
use log::info;
use std::path::PathBuf;
use std::thread;
use std::time::{Duration, Instant};

/// Distance in meters at a color-image pixel, if the depth stream has one.
pub type DepthLookup = Box<dyn Fn(u32, u32) -> Option<f64> + Send>;

pub struct Frame {
    pub color: RgbImage,
    /// `None` when the source has no depth stream (injected stills).
    pub depth: Option<DepthLookup>,
}

impl Frame {
    pub fn depth_at(&self, x: u32, y: u32) -> Option<f64> {
        self.depth.as_ref().and_then(|lookup| lookup(x, y))
    }
}

#[derive(Debug, Fail)]
pub enum SourceError {
    /// The frame pair was incomplete; try again next iteration.
    #[fail(display = "frame not ready")]
    TransientMiss,
    #[fail(display = "frame source failed: {}", _0)]
    Fatal(String),
}

/// A camera, or anything that stands in for one.
pub trait FrameSource: Send {
    fn start(&mut self) -> Result<(), SourceError>;

    fn next_frame(&mut self) -> Result<Frame, SourceError>;

    fn stop(&mut self);
}

enum Still {
    Loaded(RgbImage),
    Path(PathBuf),
}

/// Replays one still image at a fixed rate, without depth.
pub struct StillImageSource {
    still: Still,
    image: Option<RgbImage>,
    frame_interval: Duration,
    last_frame: Option<Instant>,
}

impl StillImageSource {
    pub fn new(image: RgbImage, frame_interval: Duration) -> Self {
        StillImageSource {
            still: Still::Loaded(image),
            image: None,
            frame_interval,
            last_frame: None,
        }
    }

    /// The file is read on `start`, so a bad path fails the pipeline start.
    pub fn from_path<P: Into<PathBuf>>(path: P, frame_interval: Duration) -> Self {
        StillImageSource {
            still: Still::Path(path.into()),
            image: None,
            frame_interval,
            last_frame: None,
        }
    }
}

impl FrameSource for StillImageSource {
    fn start(&mut self) -> Result<(), SourceError> {
        let image = match &self.still {
            Still::Loaded(image) => image.clone(),
            Still::Path(path) => {
                let image = image::open(path)
                    .map_err(|e| SourceError::Fatal(format!("{:?}: {}", path, e)))?
                    .to_rgb8();
                info!(
                    "Loaded still {:?} ({}x{})",
                    path,
                    image.width(),
                    image.height()
                );
                image
            }
        };
        self.image = Some(image);
        self.last_frame = None;
        Ok(())
    }

    fn next_frame(&mut self) -> Result<Frame, SourceError> {
        let image = self
            .image
            .as_ref()
            .ok_or_else(|| SourceError::Fatal("still source not started".to_string()))?;

        if let Some(last) = self.last_frame {
            let elapsed = last.elapsed();
            if self.frame_interval > elapsed {
                thread::sleep(self.frame_interval - elapsed);
            }
        }
        self.last_frame = Some(Instant::now());

        Ok(Frame {
            color: image.clone(),
            depth: None,
        })
    }

    fn stop(&mut self) {
        self.image = None;
    }
}

/// What a camera slot is fed from. The pipeline treats both the same.
pub enum CameraFeed {
    Live(Box<dyn FrameSource>),
    InjectedStill(StillImageSource),
}

impl CameraFeed {
    pub fn describe(&self) -> &'static str {
        match self {
            CameraFeed::Live(_) => "live",
            CameraFeed::InjectedStill(_) => "injected still",
        }
    }

    fn inner(&mut self) -> &mut dyn FrameSource {
        match self {
            CameraFeed::Live(source) => source.as_mut(),
            CameraFeed::InjectedStill(source) => source,
        }
    }
}

impl FrameSource for CameraFeed {
    fn start(&mut self) -> Result<(), SourceError> {
        self.inner().start()
    }

    fn next_frame(&mut self) -> Result<Frame, SourceError> {
        self.inner().next_frame()
    }

    fn stop(&mut self) {
        self.inner().stop()
    }
}
