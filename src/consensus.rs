use crate::matcher::{find_match, Match};
use crate::plate::normalize;
use image::GrayImage;
use log::{debug, warn};
use std::collections::BTreeSet;

/// A text recognition engine. Each pipeline owns its own engines, listed in
/// priority order.
pub trait Recognizer: Send {
    fn name(&self) -> &str;

    fn recognize(&mut self, region: &GrayImage) -> Result<String, failure::Error>;
}

/// Normalized text one engine produced for one region.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecognitionResult {
    pub engine: String,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    pub engine: String,
    pub plate: String,
    pub distance: u32,
}

/// Runs every engine over `region`. An engine that fails contributes empty
/// text; it never aborts the region.
pub fn recognize_all(
    engines: &mut [Box<dyn Recognizer>],
    region: &GrayImage,
) -> Vec<RecognitionResult> {
    engines
        .iter_mut()
        .map(|engine| {
            let raw = match engine.recognize(region) {
                Ok(raw) => raw,
                Err(e) => {
                    warn!("Recognizer {} failed: {}", engine.name(), e);
                    String::new()
                }
            };
            let text = normalize(&raw);
            debug!("{}: {:?} -> {:?}", engine.name(), raw.trim(), text);
            RecognitionResult {
                engine: engine.name().to_string(),
                text,
            }
        })
        .collect()
}

/// First engine, in the given order, whose non-empty text hits the
/// watch-list. Later engines are not consulted once one hits.
pub fn resolve(
    results: &[RecognitionResult],
    watchlist: &BTreeSet<String>,
    tolerance: u32,
) -> Option<Resolved> {
    results
        .iter()
        .filter(|r| !r.text.is_empty())
        .find_map(|r| {
            find_match(&r.text, watchlist, tolerance).map(|Match { plate, distance }| Resolved {
                engine: r.engine.clone(),
                plate,
                distance,
            })
        })
}
