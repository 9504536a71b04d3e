use std::fmt;

/// Which physical camera produced a detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Orientation {
    Front,
    Back,
}

impl fmt::Display for Orientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Orientation::Front => write!(f, "front"),
            Orientation::Back => write!(f, "back"),
        }
    }
}

/// Pixel rectangle as reported by the detector. Coordinates are not trusted:
/// detectors may hand back inverted or out-of-frame boxes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundingBox {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
}

impl BoundingBox {
    pub fn new(x1: i32, y1: i32, x2: i32, y2: i32) -> Self {
        BoundingBox { x1, y1, x2, y2 }
    }

    pub fn center(&self) -> (f64, f64) {
        (
            (self.x1 as f64 + self.x2 as f64) / 2.0,
            (self.y1 as f64 + self.y2 as f64) / 2.0,
        )
    }

    /// Intersects the box with a `width` x `height` image. Returns
    /// `(x, y, w, h)` or `None` when nothing of positive area is left.
    pub fn clip(&self, width: u32, height: u32) -> Option<(u32, u32, u32, u32)> {
        let x1 = self.x1.max(0) as i64;
        let y1 = self.y1.max(0) as i64;
        let x2 = (self.x2 as i64).min(width as i64);
        let y2 = (self.y2 as i64).min(height as i64);
        if x2 <= x1 || y2 <= y1 {
            return None;
        }
        Some((x1 as u32, y1 as u32, (x2 - x1) as u32, (y2 - y1) as u32))
    }
}

/// One matched plate region in one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct DetectionEvent {
    pub plate: String,
    pub distance_meters: f64,
    pub bearing_offset: f64,
    pub orientation: Orientation,
    pub timestamp: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AlertEvent {
    pub message: String,
    pub timestamp: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Detection(DetectionEvent),
    Alert(AlertEvent),
}
