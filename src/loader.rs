use std::fs::{self, File};
use std::io::{BufReader, BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};

use chrono::Local;
use tracing::{info, warn};

use crate::error::{PlannerError, PlannerResult};
use crate::estimate::Estimator;
use crate::model::AuctionRecord;

const SNAPSHOT_FILE: &str = "AHData.json";
const STAMP_FILE: &str = "AHLastUpdate.txt";

/// The downloaded auction feed, kept on disk as one JSON array.
pub struct SnapshotStore {
    dir: PathBuf,
}

impl SnapshotStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        SnapshotStore { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn snapshot_path(&self) -> PathBuf {
        self.dir.join(SNAPSHOT_FILE)
    }

    /// Replaces the stored snapshot and stamps the time.
    pub fn save(&self, records: &[AuctionRecord]) -> PlannerResult<()> {
        fs::create_dir_all(&self.dir)?;

        let mut writer = BufWriter::new(File::create(self.snapshot_path())?);
        serde_json::to_writer(&mut writer, records)?;
        writer.flush()?;

        let stamp = Local::now().format("%a %b %e %H:%M:%S %Y").to_string();
        fs::write(self.dir.join(STAMP_FILE), stamp)?;

        info!(
            auctions = records.len(),
            path = %self.snapshot_path().display(),
            "stored auction snapshot"
        );
        Ok(())
    }

    pub fn load(&self) -> PlannerResult<Vec<AuctionRecord>> {
        let path = self.snapshot_path();
        let file = match File::open(&path) {
            Ok(f) => f,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(PlannerError::SnapshotMissing(path));
            }
            Err(e) => return Err(e.into()),
        };
        Ok(serde_json::from_reader(BufReader::new(file))?)
    }

    /// When the snapshot was last downloaded, if ever.
    pub fn last_update(&self) -> Option<String> {
        fs::read_to_string(self.dir.join(STAMP_FILE))
            .ok()
            .map(|s| s.trim().to_string())
    }
}

/// The stored snapshot, read from disk at most once and replaced by fresh
/// downloads.
pub struct SnapshotCache {
    store: SnapshotStore,
    estimator: Option<Estimator>,
    auction_sample: usize,
    bin_sample: usize,
}

impl SnapshotCache {
    pub fn new(store: SnapshotStore, auction_sample: usize, bin_sample: usize) -> Self {
        SnapshotCache {
            store,
            estimator: None,
            auction_sample,
            bin_sample,
        }
    }

    pub fn store(&self) -> &SnapshotStore {
        &self.store
    }

    /// Persists a fresh download and queries it from now on.
    pub fn replace(&mut self, records: Vec<AuctionRecord>) -> PlannerResult<&Estimator> {
        self.store.save(&records)?;
        let estimator = Estimator::new(records, self.auction_sample, self.bin_sample);
        Ok(self.estimator.insert(estimator))
    }

    pub fn estimator(&mut self) -> PlannerResult<&Estimator> {
        if self.estimator.is_none() {
            let records = self.store.load()?;
            info!(auctions = records.len(), "loaded auction snapshot");
            self.estimator = Some(Estimator::new(records, self.auction_sample, self.bin_sample));
        }
        self.estimator
            .as_ref()
            .ok_or_else(|| PlannerError::SnapshotMissing(self.store.snapshot_path()))
    }

    /// Like [`estimator`](Self::estimator), but a missing or unreadable
    /// snapshot only logs a warning.
    pub fn try_estimator(&mut self) -> Option<&Estimator> {
        if let Err(e) = self.estimator() {
            warn!("prices not sampled: {e}");
            return None;
        }
        self.estimator.as_ref()
    }
}
