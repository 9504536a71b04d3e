use crate::plate::normalize;
use log::{info, warn};
use parking_lot::{Mutex, RwLock};
use std::collections::BTreeSet;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Plates of interest, persisted one per line, sorted.
///
/// Readers take an `Arc` snapshot, so a matching pass never sees a list that
/// is half way through an update. Writers are serialized by `write_lock`.
pub struct WatchList {
    path: PathBuf,
    entries: RwLock<Arc<BTreeSet<String>>>,
    write_lock: Mutex<()>,
}

impl WatchList {
    /// Loads the list at `path`, creating an empty file if there is none.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, failure::Error> {
        let path = path.as_ref().to_path_buf();
        if !path.exists() {
            info!("Creating empty watch-list at {:?}", path);
            replace_file(&path, "")?;
        }
        let contents = fs::read_to_string(&path)?;
        let entries: BTreeSet<String> = contents
            .lines()
            .map(normalize)
            .filter(|plate| !plate.is_empty())
            .collect();
        info!("Loaded {} watch-list plates from {:?}", entries.len(), path);
        Ok(WatchList {
            path,
            entries: RwLock::new(Arc::new(entries)),
            write_lock: Mutex::new(()),
        })
    }

    pub fn snapshot(&self) -> Arc<BTreeSet<String>> {
        self.entries.read().clone()
    }

    /// Adds `plate` after normalizing it. Returns whether the list changed.
    pub fn add(&self, plate: &str) -> Result<bool, failure::Error> {
        let plate = normalize(plate);
        if plate.is_empty() {
            warn!("Ignoring empty plate");
            return Ok(false);
        }
        self.update(|entries| entries.insert(plate.clone()))
    }

    pub fn remove(&self, plate: &str) -> Result<bool, failure::Error> {
        let plate = normalize(plate);
        self.update(|entries| entries.remove(&plate))
    }

    fn update<F>(&self, change: F) -> Result<bool, failure::Error>
    where
        F: FnOnce(&mut BTreeSet<String>) -> bool,
    {
        let _guard = self.write_lock.lock();
        let mut next = (**self.entries.read()).clone();
        if !change(&mut next) {
            return Ok(false);
        }
        replace_file(&self.path, &render(&next))?;
        *self.entries.write() = Arc::new(next);
        Ok(true)
    }
}

fn render(entries: &BTreeSet<String>) -> String {
    entries.iter().map(|plate| format!("{}\n", plate)).collect()
}

/// Writes `contents` next to `path` and renames it into place, so readers
/// see either the old file or the new one.
pub(crate) fn replace_file(path: &Path, contents: &str) -> Result<(), failure::Error> {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    {
        let mut file = fs::File::create(&tmp)?;
        file.write_all(contents.as_bytes())?;
        file.sync_all()?;
    }
    fs::rename(&tmp, path)?;
    Ok(())
}
