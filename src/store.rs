use std::fs::{self, File};
use std::io::{BufReader, BufWriter, ErrorKind, Write};
use std::path::PathBuf;

use tracing::{debug, info};

use crate::error::{PlannerError, PlannerResult};
use crate::model::PlannedItem;

/// Per-user purchase lists, one JSON file each.
pub struct ItemStore {
    dir: PathBuf,
}

impl ItemStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        ItemStore { dir: dir.into() }
    }

    pub fn path_for(&self, user_id: &str) -> PlannerResult<PathBuf> {
        let valid = !user_id.is_empty()
            && !user_id.contains(['/', '\\'])
            && user_id != "."
            && user_id != "..";
        if !valid {
            return Err(PlannerError::InvalidUserId(user_id.to_string()));
        }
        Ok(self.dir.join(format!("items{user_id}.json")))
    }

    /// `None` when the user has never saved anything.
    pub fn load(&self, user_id: &str) -> PlannerResult<Option<Vec<PlannedItem>>> {
        let path = self.path_for(user_id)?;
        let file = match File::open(&path) {
            Ok(f) => f,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let items: Vec<PlannedItem> = serde_json::from_reader(BufReader::new(file))?;
        debug!(user_id, items = items.len(), "loaded item list");
        Ok(Some(items))
    }

    /// Writes an empty list straight away so the id exists even if the
    /// session never saves.
    pub fn create(&self, user_id: &str) -> PlannerResult<Vec<PlannedItem>> {
        self.save(user_id, &[])?;
        info!(user_id, "created new user");
        Ok(Vec::new())
    }

    pub fn save(&self, user_id: &str, items: &[PlannedItem]) -> PlannerResult<()> {
        let path = self.path_for(user_id)?;
        fs::create_dir_all(&self.dir)?;
        let mut writer = BufWriter::new(File::create(&path)?);
        serde_json::to_writer(&mut writer, items)?;
        writer.flush()?;
        debug!(user_id, items = items.len(), "saved item list");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{PriceSample, Priority};
    use tempfile::TempDir;

    #[test]
    fn unknown_user_is_none() {
        let dir = TempDir::new().unwrap();
        let store = ItemStore::new(dir.path());
        assert!(store.load("steve").unwrap().is_none());
    }

    #[test]
    fn create_writes_empty_list() {
        let dir = TempDir::new().unwrap();
        let store = ItemStore::new(dir.path().join("userSaves"));
        store.create("alex").unwrap();
        assert!(dir.path().join("userSaves/itemsalex.json").exists());
        assert_eq!(store.load("alex").unwrap(), Some(vec![]));
    }

    #[test]
    fn save_overwrites() {
        let dir = TempDir::new().unwrap();
        let store = ItemStore::new(dir.path());
        let item = PlannedItem {
            name: "Livid Dagger".into(),
            priority: Priority::try_from(4_i64).unwrap(),
            user_cost: 6_000_000,
            auction: PriceSample::unsampled(),
            bin: PriceSample::unsampled(),
        };
        store.save("u1", &[item.clone(), item.clone()]).unwrap();
        store.save("u1", &[item.clone()]).unwrap();
        assert_eq!(store.load("u1").unwrap(), Some(vec![item]));
    }

    #[test]
    fn rejects_path_like_ids() {
        let store = ItemStore::new("userSaves");
        assert!(store.path_for("").is_err());
        assert!(store.path_for("../etc").is_err());
        assert!(store.path_for("a\\b").is_err());
        assert!(store.path_for("42").is_ok());
    }
}
