use crate::types::BoundingBox;
use image::RgbImage;

/// Plate-region detector. An empty result is a normal frame.
pub trait Detector: Send {
    fn detect(&mut self, image: &RgbImage) -> Result<Vec<BoundingBox>, failure::Error>;
}

/// Reports the whole frame as one plate region. Meant for injected stills
/// that are already cropped to a plate.
pub struct WholeFrameDetector;

impl Detector for WholeFrameDetector {
    fn detect(&mut self, image: &RgbImage) -> Result<Vec<BoundingBox>, failure::Error> {
        if image.width() == 0 || image.height() == 0 {
            return Ok(vec![]);
        }
        Ok(vec![BoundingBox::new(
            0,
            0,
            image.width() as i32,
            image.height() as i32,
        )])
    }
}
