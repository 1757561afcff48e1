use chrono::{DateTime, Local};
use crate::model::{AuctionRecord, MarketKind, PriceSample};

/// Bid-style listings for `query`, closest to ending first, at most `sample`.
pub fn matching_auctions<'a>(
    records: &'a [AuctionRecord],
    query: &str,
    sample: usize,
) -> Vec<&'a AuctionRecord> {
    let mut matched: Vec<&AuctionRecord> = records
        .iter()
        .filter(|r| !r.is_bin() && r.matches(query))
        .collect();

    matched.sort_by_key(|r| r.end);
    matched.truncate(sample);
    matched
}

/// Buy-it-now listings for `query`, cheapest first, at most `sample`.
pub fn matching_bins<'a>(
    records: &'a [AuctionRecord],
    query: &str,
    sample: usize,
) -> Vec<&'a AuctionRecord> {
    let mut matched: Vec<&AuctionRecord> = records
        .iter()
        .filter(|r| r.is_bin() && r.matches(query))
        .collect();

    matched.sort_by_key(|r| r.starting_bid);
    matched.truncate(sample);
    matched
}

/// Average highest bid over the `sample` soonest-ending auctions.
///
/// Always divides by `sample`, so a thin market drags the estimate down.
pub fn auction_average(records: &[AuctionRecord], query: &str, sample: usize) -> i64 {
    let total: i64 = matching_auctions(records, query, sample)
        .iter()
        .map(|r| r.highest_bid_amount)
        .sum();
    floor_average(total, sample)
}

/// Average starting price over the `sample` cheapest BIN listings.
pub fn bin_average(records: &[AuctionRecord], query: &str, sample: usize) -> i64 {
    let total: i64 = matching_bins(records, query, sample)
        .iter()
        .map(|r| r.starting_bid)
        .sum();
    floor_average(total, sample)
}

fn floor_average(total: i64, sample: usize) -> i64 {
    if sample == 0 {
        return 0;
    }
    total.div_euclid(sample as i64)
}

/// A loaded snapshot plus the sample sizes to query it with.
pub struct Estimator {
    records: Vec<AuctionRecord>,
    pub auction_sample: usize,
    pub bin_sample: usize,
}

impl Estimator {
    pub fn new(records: Vec<AuctionRecord>, auction_sample: usize, bin_sample: usize) -> Self {
        Estimator {
            records,
            auction_sample,
            bin_sample,
        }
    }

    pub fn records(&self) -> &[AuctionRecord] {
        &self.records
    }

    pub fn average(&self, kind: MarketKind, query: &str) -> i64 {
        match kind {
            MarketKind::Auction => auction_average(&self.records, query, self.auction_sample),
            MarketKind::Bin => bin_average(&self.records, query, self.bin_sample),
        }
    }

    pub fn sample(&self, kind: MarketKind, query: &str, now: DateTime<Local>) -> PriceSample {
        PriceSample::from_average(self.average(kind, query), now)
    }

    pub fn auction(&self, query: &str) -> PriceSample {
        self.sample(MarketKind::Auction, query, Local::now())
    }

    pub fn bin(&self, query: &str) -> PriceSample {
        self.sample(MarketKind::Bin, query, Local::now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn auction(name: &str, end: i64, highest: i64) -> AuctionRecord {
        AuctionRecord {
            uuid: None,
            item_name: name.to_string(),
            tier: None,
            starting_bid: 1,
            highest_bid_amount: highest,
            end,
            bin: None,
            extra: Default::default(),
        }
    }

    fn bin(name: &str, price: i64) -> AuctionRecord {
        AuctionRecord {
            uuid: None,
            item_name: name.to_string(),
            tier: None,
            starting_bid: price,
            highest_bid_amount: 0,
            end: 0,
            bin: Some(true),
            extra: Default::default(),
        }
    }

    #[test]
    fn auctions_skip_bin_listings() {
        let records = vec![bin("Midas Sword", 5), auction("Midas Sword", 1, 90)];
        let matched = matching_auctions(&records, "midas", 3);
        assert_eq!(matched.len(), 1);
        assert_eq!(matched[0].highest_bid_amount, 90);
    }

    #[test]
    fn bins_skip_auctions() {
        let records = vec![bin("Midas Sword", 5), auction("Midas Sword", 1, 90)];
        let matched = matching_bins(&records, "MIDAS", 3);
        assert_eq!(matched.len(), 1);
        assert_eq!(matched[0].starting_bid, 5);
    }

    #[test]
    fn floor_division_by_sample_size() {
        let records = vec![auction("A", 1, 10), auction("A", 2, 11)];
        // (10 + 11) / 3, not / 2
        assert_eq!(auction_average(&records, "a", 3), 7);
        assert_eq!(auction_average(&records, "a", 2), 10);
    }

    #[test]
    fn zero_sample_size_yields_zero() {
        let records = vec![bin("A", 10)];
        assert_eq!(bin_average(&records, "a", 0), 0);
    }

    #[test]
    fn no_matches_is_zero() {
        let records = vec![bin("A", 10)];
        assert_eq!(bin_average(&records, "zzz", 6), 0);
    }

    #[test]
    fn estimator_turns_zero_into_sentinel() {
        let est = Estimator::new(vec![bin("A", 10)], 3, 6);
        assert!(!est.auction("a").is_tracked());
        let s = est.bin("a");
        assert_eq!(s.cost, 1);
        assert!(s.is_tracked());
    }
}
