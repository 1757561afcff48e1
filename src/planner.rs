use chrono::{DateTime, Local};
use rayon::prelude::*;
use tracing::{debug, warn};

use crate::estimate::Estimator;
use crate::model::{MarketKind, PlannedItem, PriceChange, PriceSample, Priority, SortKey};

/// What the user typed in for a new item.
#[derive(Debug, Clone)]
pub struct NewItem {
    pub name: String,
    pub priority: Priority,
    pub user_cost: i64,
    pub sample_auction: bool,
    pub sample_bin: bool,
}

/// A loaded purchase list and the operations on it.
pub struct Planner {
    pub user_id: String,
    pub items: Vec<PlannedItem>,
}

impl Planner {
    pub fn new(user_id: impl Into<String>, items: Vec<PlannedItem>) -> Self {
        Planner {
            user_id: user_id.into(),
            items,
        }
    }

    /// Adds an item, sampling the snapshot for whichever prices were asked
    /// for. With no estimator both prices stay unsampled.
    pub fn add(&mut self, new: NewItem, estimator: Option<&Estimator>) -> &PlannedItem {
        self.add_at(new, estimator, Local::now())
    }

    pub fn add_at(
        &mut self,
        new: NewItem,
        estimator: Option<&Estimator>,
        now: DateTime<Local>,
    ) -> &PlannedItem {
        let pick = |wanted: bool, kind: MarketKind| match estimator {
            Some(est) if wanted => {
                let sample = est.sample(kind, &new.name, now);
                if !sample.is_tracked() {
                    warn!(item = %new.name, %kind, "no usable market data, discarding price");
                }
                sample
            }
            _ => PriceSample::unsampled(),
        };

        let auction = pick(new.sample_auction, MarketKind::Auction);
        let bin = pick(new.sample_bin, MarketKind::Bin);

        self.items.push(PlannedItem {
            name: new.name,
            priority: new.priority,
            user_cost: new.user_cost,
            auction,
            bin,
        });
        let added = self.items.len() - 1;
        &self.items[added]
    }

    /// Drops every item whose name contains `query`, ignoring case.
    pub fn remove(&mut self, query: &str) -> Vec<PlannedItem> {
        let query = query.to_lowercase();
        let (removed, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut self.items)
            .into_iter()
            .partition(|item| item.name.to_lowercase().contains(&query));
        self.items = kept;
        removed
    }

    pub fn refresh(&mut self, estimator: &Estimator, kind: MarketKind) -> Vec<PriceChange> {
        self.refresh_at(estimator, kind, Local::now())
    }

    /// Re-estimates every tracked price of `kind`. A zero estimate keeps
    /// the previous sample so the item is not silently opted out.
    pub fn refresh_at(
        &mut self,
        estimator: &Estimator,
        kind: MarketKind,
        now: DateTime<Local>,
    ) -> Vec<PriceChange> {
        self.items
            .par_iter_mut()
            .filter(|item| item.sample(kind).is_tracked())
            .map(|item| {
                let average = estimator.average(kind, &item.name);
                let old_cost = item.sample(kind).cost;

                let new_cost = if average > 0 {
                    *item.sample_mut(kind) = PriceSample {
                        cost: average,
                        updated: Some(now),
                    };
                    Some(average)
                } else {
                    None
                };

                debug!(item = %item.name, %kind, old_cost, ?new_cost, "refreshed price");
                PriceChange {
                    name: item.name.clone(),
                    kind,
                    old_cost,
                    new_cost,
                }
            })
            .collect()
    }

    /// Names of items that were skipped by `refresh` for `kind`.
    pub fn untracked(&self, kind: MarketKind) -> Vec<&str> {
        self.items
            .iter()
            .filter(|item| !item.sample(kind).is_tracked())
            .map(|item| item.name.as_str())
            .collect()
    }

    /// Ascending by `key`; ties keep list order. Unsampled prices (-1)
    /// sort first.
    pub fn sorted(&self, key: SortKey) -> Vec<&PlannedItem> {
        let mut items: Vec<&PlannedItem> = self.items.iter().collect();
        match key {
            SortKey::Name => items.sort_by(|a, b| a.name.cmp(&b.name)),
            SortKey::Priority => items.sort_by_key(|i| i.priority),
            SortKey::UserCost => items.sort_by_key(|i| i.user_cost),
            SortKey::AuctionCost => items.sort_by_key(|i| i.auction.cost),
            SortKey::BinCost => items.sort_by_key(|i| i.bin.cost),
        }
        items
    }

    pub fn total_cost(&self) -> i64 {
        self.items.iter().map(PlannedItem::expected_cost).sum()
    }
}
