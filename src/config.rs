//! Settings read from `planner.toml`.
//!
//! Every key is optional; a missing file means all defaults.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{PlannerError, PlannerResult};

pub const DEFAULT_CONFIG_PATH: &str = "planner.toml";
pub const DEFAULT_BASE_URL: &str = "https://api.hypixel.net";

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Marketplace key. The auctions endpoint works without one.
    pub api_key: Option<String>,
    pub use_color: bool,
    /// Master switch for downloading snapshots and sampling prices.
    pub market_search: bool,
    /// Number of soonest-ending auctions to average.
    pub auction_sample: usize,
    /// Number of cheapest BIN listings to average.
    pub bin_sample: usize,
    pub base_url: String,
    pub data_dir: PathBuf,
    pub save_dir: PathBuf,
    /// Pause between page requests.
    pub page_delay_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            api_key: None,
            use_color: true,
            market_search: true,
            auction_sample: 3,
            bin_sample: 6,
            base_url: DEFAULT_BASE_URL.to_string(),
            data_dir: PathBuf::from("auctionHouse"),
            save_dir: PathBuf::from("userSaves"),
            page_delay_ms: 0,
        }
    }
}

impl Config {
    pub fn parse(text: &str, path: &Path) -> PlannerResult<Self> {
        toml::from_str(text).map_err(|e| PlannerError::Config {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Reads `path`, falling back to defaults when it does not exist.
    pub fn load(path: &Path) -> PlannerResult<Self> {
        match std::fs::read_to_string(path) {
            Ok(text) => Self::parse(&text, path),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no config file, using defaults");
                Ok(Self::default())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Gate for anything that downloads a snapshot or samples prices.
    pub fn require_market_search(&self) -> PlannerResult<()> {
        if self.market_search {
            Ok(())
        } else {
            Err(PlannerError::MarketSearchDisabled)
        }
    }
}
