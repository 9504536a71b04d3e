use crate::tracker::MapGeometry;
use std::env;
use std::fmt::Display;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Process configuration, read from the environment.
#[derive(Debug, Clone)]
pub struct Config {
    pub watchlist_path: PathBuf,
    pub settings_path: PathBuf,
    pub front_image: Option<PathBuf>,
    pub back_image: Option<PathBuf>,
    pub front_camera_serial: String,
    pub back_camera_serial: String,
    pub alert_cooldown: f64,
    pub alert_message: String,
    pub detection_timeout: f64,
    pub fallback_distance: f64,
    pub tick_interval: Duration,
    pub frame_interval: Duration,
    pub map: MapGeometry,
    pub tessdata_path: String,
    pub tesseract_lang: String,
}

impl Config {
    pub fn from_env() -> Result<Self, failure::Error> {
        Config::from_lookup(|key| env::var(key).ok())
    }

    /// Same as `from_env` with an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, failure::Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let string = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let width: f64 = parse(&lookup, "MAP_WIDTH", 800.0)?;
        let height: f64 = parse(&lookup, "MAP_HEIGHT", 600.0)?;
        let icon_fraction: f64 = parse(&lookup, "ICON_FRACTION", 0.25)?;
        let map = MapGeometry {
            pixels_per_meter: parse(&lookup, "PIXELS_PER_METER", 1000.0)?,
            lateral_scale: parse(&lookup, "LATERAL_SCALE", 10.0)?,
            ..MapGeometry::with_icon_fraction(width, height, icon_fraction)
        };
        if !(map.width > 0.0 && map.height > 0.0) {
            return Err(format_err!("Map must have a positive size, got {}x{}", width, height));
        }

        let alert_cooldown: f64 = parse(&lookup, "ALERT_COOLDOWN_SECS", 120.0)?;
        let detection_timeout: f64 = parse(&lookup, "DETECTION_TIMEOUT_SECS", 5.0)?;
        for (key, value) in &[
            ("ALERT_COOLDOWN_SECS", alert_cooldown),
            ("DETECTION_TIMEOUT_SECS", detection_timeout),
        ] {
            if !(value.is_finite() && *value > 0.0) {
                return Err(format_err!("{} must be positive, got {}", key, value));
            }
        }
        // tokio's interval panics on a zero period.
        let tick_millis: u64 = parse(&lookup, "TICK_MILLIS", 25)?;
        if tick_millis == 0 {
            return Err(format_err!("TICK_MILLIS must be at least 1"));
        }

        Ok(Config {
            watchlist_path: string("WATCHLIST_PATH", "license_plate_database.txt").into(),
            settings_path: string("SETTINGS_PATH", "app_settings.json").into(),
            front_image: lookup("FRONT_IMAGE").map(PathBuf::from),
            back_image: lookup("BACK_IMAGE").map(PathBuf::from),
            front_camera_serial: string("FRONT_CAMERA_SERIAL", "112322077965"),
            back_camera_serial: string("BACK_CAMERA_SERIAL", "109622072518"),
            alert_cooldown,
            alert_message: string("ALERT_MESSAGE", "UWAGA TAJNIAK!"),
            detection_timeout,
            fallback_distance: parse(&lookup, "FALLBACK_DISTANCE_METERS", 2.0)?,
            tick_interval: Duration::from_millis(tick_millis),
            frame_interval: Duration::from_millis(parse(&lookup, "FRAME_MILLIS", 33)?),
            map,
            tessdata_path: string("TESSDATA_PATH", "models"),
            tesseract_lang: string("TESSERACT_LANG", "eng"),
        })
    }
}

fn parse<F, T>(lookup: &F, key: &str, default: T) -> Result<T, failure::Error>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: Display,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| format_err!("Invalid {}={:?}: {}", key, raw, e)),
        None => Ok(default),
    }
}
