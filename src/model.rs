use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

use crate::error::PlannerError;

/// Cost written to disk when no usable sample exists.
pub const UNSAMPLED: i64 = -1;

/// One listing from the marketplace's auction feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuctionRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uuid: Option<String>,
    pub item_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tier: Option<String>,
    pub starting_bid: i64,
    #[serde(default)]
    pub highest_bid_amount: i64,
    pub end: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bin: Option<bool>,
    /// Feed fields the planner does not read, kept so the stored snapshot
    /// stays a faithful copy.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl AuctionRecord {
    /// The feed only carries a `bin` key on buy-it-now listings.
    pub fn is_bin(&self) -> bool {
        self.bin.is_some()
    }

    /// Case-insensitive substring match on the item name.
    pub fn matches(&self, query: &str) -> bool {
        self.item_name
            .to_lowercase()
            .contains(&query.to_lowercase())
    }
}

/// A single page of `/skyblock/auctions`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuctionPage {
    #[serde(default = "default_success")]
    pub success: bool,
    #[serde(default)]
    pub page: u32,
    #[serde(default)]
    pub total_pages: u32,
    #[serde(default)]
    pub auctions: Vec<AuctionRecord>,
    #[serde(default)]
    pub cause: Option<String>,
}

fn default_success() -> bool {
    true
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MarketKind {
    Auction,
    Bin,
}

impl MarketKind {
    pub fn label(&self) -> &'static str {
        match self {
            MarketKind::Auction => "AH",
            MarketKind::Bin => "BIN",
        }
    }
}

impl fmt::Display for MarketKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.label())
    }
}

/// A sampled market price and when it was taken.
///
/// `updated == None` doubles as the opt-out flag: untracked samples are
/// never refreshed.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceSample {
    pub cost: i64,
    pub updated: Option<DateTime<Local>>,
}

impl PriceSample {
    pub fn unsampled() -> Self {
        PriceSample {
            cost: UNSAMPLED,
            updated: None,
        }
    }

    /// A zero (or negative) average means nothing usable matched.
    pub fn from_average(average: i64, now: DateTime<Local>) -> Self {
        if average <= 0 {
            Self::unsampled()
        } else {
            PriceSample {
                cost: average,
                updated: Some(now),
            }
        }
    }

    pub fn is_tracked(&self) -> bool {
        self.updated.is_some()
    }

    /// The cost, if one was ever sampled.
    pub fn known_cost(&self) -> Option<i64> {
        self.is_tracked().then_some(self.cost)
    }
}

impl Default for PriceSample {
    fn default() -> Self {
        Self::unsampled()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Priority(u8);

impl Priority {
    pub const MAX: u8 = 10;

    pub fn value(&self) -> u8 {
        self.0
    }
}

impl TryFrom<i64> for Priority {
    type Error = PlannerError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        if (0..=Self::MAX as i64).contains(&value) {
            Ok(Priority(value as u8))
        } else {
            Err(PlannerError::InvalidPriority(value))
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// One entry of a user's purchase list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ItemRecord", into = "ItemRecord")]
pub struct PlannedItem {
    pub name: String,
    pub priority: Priority,
    pub user_cost: i64,
    pub auction: PriceSample,
    pub bin: PriceSample,
}

impl PlannedItem {
    pub fn sample(&self, kind: MarketKind) -> &PriceSample {
        match kind {
            MarketKind::Auction => &self.auction,
            MarketKind::Bin => &self.bin,
        }
    }

    pub fn sample_mut(&mut self, kind: MarketKind) -> &mut PriceSample {
        match kind {
            MarketKind::Auction => &mut self.auction,
            MarketKind::Bin => &mut self.bin,
        }
    }

    /// Best guess at what this item will cost: BIN, then auction, then the
    /// user's own estimate.
    pub fn expected_cost(&self) -> i64 {
        self.bin
            .known_cost()
            .or_else(|| self.auction.known_cost())
            .unwrap_or(self.user_cost)
    }
}

/// On-disk layout of a [`PlannedItem`].
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ItemRecord {
    #[serde(rename = "Name")]
    name: String,
    #[serde(rename = "Priority")]
    priority: i64,
    #[serde(rename = "UserCost")]
    user_cost: i64,
    #[serde(rename = "AHCost", default = "unsampled_cost")]
    ah_cost: i64,
    #[serde(rename = "AHUpdateTime", default, with = "update_time")]
    ah_update_time: Option<DateTime<Local>>,
    #[serde(rename = "BINCost", default = "unsampled_cost")]
    bin_cost: i64,
    #[serde(rename = "BINUpdateTime", default, with = "update_time")]
    bin_update_time: Option<DateTime<Local>>,
}

fn unsampled_cost() -> i64 {
    UNSAMPLED
}

impl TryFrom<ItemRecord> for PlannedItem {
    type Error = PlannerError;

    fn try_from(r: ItemRecord) -> Result<Self, Self::Error> {
        Ok(PlannedItem {
            name: r.name,
            priority: Priority::try_from(r.priority)?,
            user_cost: r.user_cost,
            auction: PriceSample {
                cost: r.ah_cost,
                updated: r.ah_update_time,
            },
            bin: PriceSample {
                cost: r.bin_cost,
                updated: r.bin_update_time,
            },
        })
    }
}

impl From<PlannedItem> for ItemRecord {
    fn from(item: PlannedItem) -> Self {
        ItemRecord {
            name: item.name,
            priority: item.priority.value() as i64,
            user_cost: item.user_cost,
            ah_cost: item.auction.cost,
            ah_update_time: item.auction.updated,
            bin_cost: item.bin.cost,
            bin_update_time: item.bin.updated,
        }
    }
}

/// Timestamps are `-1` when unset, otherwise a string. Older saves used
/// `asctime` formatting; new ones are RFC 3339.
mod update_time {
    use chrono::{DateTime, Local, NaiveDateTime, TimeZone};
    use serde::{de, Deserialize, Deserializer, Serializer};

    const ASCTIME: &str = "%a %b %e %H:%M:%S %Y";

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Int(i64),
        Text(String),
    }

    pub fn serialize<S: Serializer>(
        value: &Option<DateTime<Local>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(t) => serializer.serialize_str(&t.to_rfc3339()),
            None => serializer.serialize_i64(super::UNSAMPLED),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<DateTime<Local>>, D::Error> {
        match Raw::deserialize(deserializer)? {
            Raw::Int(_) => Ok(None),
            Raw::Text(s) => parse(&s).map_err(de::Error::custom),
        }
    }

    pub(super) fn parse(s: &str) -> Result<Option<DateTime<Local>>, String> {
        let s = s.trim();
        if s == "-1" {
            return Ok(None);
        }
        if let Ok(t) = DateTime::parse_from_rfc3339(s) {
            return Ok(Some(t.with_timezone(&Local)));
        }
        let naive = NaiveDateTime::parse_from_str(s, ASCTIME)
            .map_err(|e| format!("unrecognised timestamp {s:?}: {e}"))?;
        Local
            .from_local_datetime(&naive)
            .earliest()
            .map(Some)
            .ok_or_else(|| format!("timestamp {s:?} does not exist locally"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    Name,
    Priority,
    UserCost,
    AuctionCost,
    BinCost,
}

impl FromStr for SortKey {
    type Err = PlannerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "name" | "alphabetical" => Ok(SortKey::Name),
            "priority" => Ok(SortKey::Priority),
            "usercost" | "user" => Ok(SortKey::UserCost),
            "ahcost" | "ah" => Ok(SortKey::AuctionCost),
            "bincost" | "bin" => Ok(SortKey::BinCost),
            _ => Err(PlannerError::UnknownSortKey(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Increased,
    Decreased,
}

/// Outcome of re-estimating one tracked price.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceChange {
    pub name: String,
    pub kind: MarketKind,
    pub old_cost: i64,
    /// `None` when the snapshot had no usable data; the old sample is kept.
    pub new_cost: Option<i64>,
}

impl PriceChange {
    pub fn direction(&self) -> Option<Direction> {
        let new = self.new_cost?;
        if self.old_cost - new > 0 {
            Some(Direction::Decreased)
        } else {
            Some(Direction::Increased)
        }
    }

    pub fn difference(&self) -> Option<i64> {
        self.new_cost.map(|new| (self.old_cost - new).abs())
    }
}
