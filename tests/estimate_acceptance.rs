use skyblock_planner::estimate::{
    auction_average, bin_average, matching_auctions, matching_bins, Estimator,
};
use skyblock_planner::model::AuctionRecord;

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

/// A small market: three kinds of sword, mixed listing styles, out of order.
fn market() -> Vec<AuctionRecord> {
    vec![
        auction("Aspect of the End", 5_000, 400_000),
        bin("Aspect of the End", 350_000),
        auction("Aspect of the Dragons", 1_000, 2_000_000),
        auction("aspect of the end", 2_000, 300_000),
        bin("Aspect of the End", 320_000),
        auction("Aspect of the End", 9_000, 999_999),
        bin("Hyperion", 900_000_000),
        auction("Aspect of the End", 3_000, 310_000),
        bin("Aspect of the End", 500_000),
        bin("ASPECT OF THE END", 330_000),
    ]
}

#[test]
fn auction_average_uses_soonest_ending() {
    let records = market();
    let picked: Vec<i64> = matching_auctions(&records, "Aspect of the End", 3)
        .iter()
        .map(|r| r.end)
        .collect();
    assert_eq!(picked, [2_000, 3_000, 5_000]);
    // (300_000 + 310_000 + 400_000) / 3
    assert_eq!(auction_average(&records, "Aspect of the End", 3), 336_666);
}

#[test]
fn bin_average_uses_cheapest() {
    let records = market();
    let picked: Vec<i64> = matching_bins(&records, "aspect of the end", 6)
        .iter()
        .map(|r| r.starting_bid)
        .collect();
    assert_eq!(picked, [320_000, 330_000, 350_000, 500_000]);
    // Four matches, still divided by six.
    assert_eq!(bin_average(&records, "aspect of the end", 6), 250_000);
}

#[test]
fn substring_matches_across_names() {
    let records = market();
    // "aspect" hits both End and Dragons auctions.
    let picked = matching_auctions(&records, "ASPECT", 3);
    assert_eq!(picked[0].item_name, "Aspect of the Dragons");
    assert_eq!(auction_average(&records, "aspect", 3), 870_000);
}

#[test]
fn bin_only_item_has_no_auction_estimate() {
    let records = market();
    assert_eq!(auction_average(&records, "Hyperion", 3), 0);
    assert_eq!(bin_average(&records, "Hyperion", 6), 150_000_000);

    let est = Estimator::new(records, 3, 6);
    let sample = est.auction("Hyperion");
    assert_eq!(sample.cost, -1);
    assert!(sample.updated.is_none());
}

#[test]
fn ties_keep_snapshot_order() {
    let records = vec![
        auction("Stick", 10, 1),
        auction("Stick", 10, 2),
        auction("Stick", 10, 3),
    ];
    let picked: Vec<i64> = matching_auctions(&records, "stick", 2)
        .iter()
        .map(|r| r.highest_bid_amount)
        .collect();
    assert_eq!(picked, [1, 2]);
    assert_eq!(auction_average(&records, "stick", 2), 1);
}
