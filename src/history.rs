use std::path::Path;

use chrono::{DateTime, Local};
use rusqlite::{params, Connection};
use statrs::statistics::Statistics;

use crate::error::PlannerResult;
use crate::model::{MarketKind, PriceChange, PriceSample};

/// Every price the planner has ever sampled, for spotting trends across
/// snapshot downloads.
pub struct PriceHistory {
    conn: Connection,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HistorySummary {
    pub count: usize,
    pub mean: f64,
    pub std_dev: f64,
    pub min: i64,
    pub max: i64,
    pub latest: i64,
    pub latest_at: String,
}

impl PriceHistory {
    pub fn open(db_path: &Path) -> PlannerResult<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Self::init(Connection::open(db_path)?)
    }

    pub fn in_memory() -> PlannerResult<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> PlannerResult<Self> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS samples (
                id          INTEGER PRIMARY KEY,
                item_name   TEXT NOT NULL,
                kind        TEXT NOT NULL,
                cost        INTEGER NOT NULL,
                recorded_at TEXT NOT NULL
             );
             CREATE INDEX IF NOT EXISTS samples_item ON samples (item_name, kind);",
        )?;
        Ok(PriceHistory { conn })
    }

    /// Untracked samples carry no price and are skipped.
    pub fn record(
        &self,
        item_name: &str,
        kind: MarketKind,
        sample: &PriceSample,
    ) -> PlannerResult<bool> {
        let Some(at) = sample.updated else {
            return Ok(false);
        };
        self.insert(item_name, kind, sample.cost, at)?;
        Ok(true)
    }

    /// Records the price a refresh produced. A refresh that found no usable
    /// data kept the old sample, which is already in the history.
    pub fn record_change(&self, change: &PriceChange, at: DateTime<Local>) -> PlannerResult<bool> {
        let Some(cost) = change.new_cost else {
            return Ok(false);
        };
        self.insert(&change.name, change.kind, cost, at)?;
        Ok(true)
    }

    fn insert(
        &self,
        item_name: &str,
        kind: MarketKind,
        cost: i64,
        at: DateTime<Local>,
    ) -> PlannerResult<()> {
        self.conn.execute(
            "INSERT INTO samples (item_name, kind, cost, recorded_at) VALUES (?1, ?2, ?3, ?4)",
            params![item_name.to_lowercase(), kind.label(), cost, at.to_rfc3339()],
        )?;
        Ok(())
    }

    /// Costs for an item in the order they were recorded.
    pub fn costs(&self, item_name: &str, kind: MarketKind) -> PlannerResult<Vec<(String, i64)>> {
        let mut stmt = self.conn.prepare(
            "SELECT recorded_at, cost
             FROM samples
             WHERE item_name = ?1 AND kind = ?2
             ORDER BY id",
        )?;

        let rows = stmt.query_map(params![item_name.to_lowercase(), kind.label()], |row| {
            Ok((row.get(0)?, row.get(1)?))
        })?;

        let costs: Vec<(String, i64)> = rows.collect::<Result<_, _>>()?;
        Ok(costs)
    }

    pub fn summary(
        &self,
        item_name: &str,
        kind: MarketKind,
    ) -> PlannerResult<Option<HistorySummary>> {
        let rows = self.costs(item_name, kind)?;
        let Some((latest_at, latest)) = rows.last().cloned() else {
            return Ok(None);
        };

        let costs: Vec<f64> = rows.iter().map(|(_, c)| *c as f64).collect();
        let std_dev = if costs.len() > 1 { costs.iter().std_dev() } else { 0.0 };

        Ok(Some(HistorySummary {
            count: rows.len(),
            mean: costs.iter().mean(),
            std_dev,
            min: rows.iter().map(|(_, c)| *c).min().unwrap_or(latest),
            max: rows.iter().map(|(_, c)| *c).max().unwrap_or(latest),
            latest,
            latest_at,
        }))
    }
}
