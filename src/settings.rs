use crate::db::replace_file;
use log::warn;
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub mismatch_tolerance: u32,
    pub volume_level: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            mismatch_tolerance: 1,
            volume_level: 100,
        }
    }
}

impl Settings {
    fn clamped(self) -> Self {
        Settings {
            volume_level: self.volume_level.min(100),
            ..self
        }
    }
}

/// Settings record shared between the pipelines and whoever edits it.
/// `read` always returns the latest written value.
pub struct SettingsStore {
    path: PathBuf,
    current: RwLock<Settings>,
    write_lock: Mutex<()>,
}

impl SettingsStore {
    /// A missing or unreadable file yields the defaults.
    pub fn open<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref().to_path_buf();
        let current = load(&path);
        SettingsStore {
            path,
            current: RwLock::new(current),
            write_lock: Mutex::new(()),
        }
    }

    pub fn read(&self) -> Settings {
        *self.current.read()
    }

    pub fn write(&self, settings: Settings) -> Result<(), failure::Error> {
        let settings = settings.clamped();
        let _guard = self.write_lock.lock();
        replace_file(&self.path, &serde_json::to_string_pretty(&settings)?)?;
        *self.current.write() = settings;
        Ok(())
    }

    /// Picks up edits made to the file behind the store's back.
    pub fn reload(&self) -> Settings {
        let _guard = self.write_lock.lock();
        let settings = load(&self.path);
        *self.current.write() = settings;
        settings
    }
}

fn load(path: &Path) -> Settings {
    match fs::read_to_string(path) {
        Ok(contents) => match serde_json::from_str::<Settings>(&contents) {
            Ok(settings) => settings.clamped(),
            Err(e) => {
                warn!("Corrupt settings in {:?}, using defaults: {}", path, e);
                Settings::default()
            }
        },
        Err(ref e) if e.kind() == io::ErrorKind::NotFound => Settings::default(),
        Err(e) => {
            warn!("Unable to read settings {:?}, using defaults: {}", path, e);
            Settings::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempdir().unwrap();
        let store = SettingsStore::open(dir.path().join("settings.json"));
        assert_eq!(
            store.read(),
            Settings {
                mismatch_tolerance: 1,
                volume_level: 100
            }
        );
    }

    #[test]
    fn corrupt_file_gives_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, "{ not json").unwrap();
        assert_eq!(SettingsStore::open(&path).read(), Settings::default());
    }

    #[test]
    fn partial_record_fills_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, r#"{"mismatch_tolerance": 3}"#).unwrap();
        assert_eq!(
            SettingsStore::open(&path).read(),
            Settings {
                mismatch_tolerance: 3,
                volume_level: 100
            }
        );
    }

    #[test]
    fn write_is_visible_immediately_and_persisted() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.json");
        let store = SettingsStore::open(&path);
        store
            .write(Settings {
                mismatch_tolerance: 0,
                volume_level: 250,
            })
            .unwrap();
        let expected = Settings {
            mismatch_tolerance: 0,
            volume_level: 100,
        };
        assert_eq!(store.read(), expected);
        assert_eq!(SettingsStore::open(&path).read(), expected);

        let json: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(json["mismatch_tolerance"], 0);
        assert_eq!(json["volume_level"], 100);
    }

    #[test]
    fn reload_sees_external_edits() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.json");
        let store = SettingsStore::open(&path);
        fs::write(&path, r#"{"mismatch_tolerance": 2, "volume_level": 40}"#).unwrap();
        assert_eq!(store.read(), Settings::default());
        assert_eq!(
            store.reload(),
            Settings {
                mismatch_tolerance: 2,
                volume_level: 40
            }
        );
    }
}
