use chrono::Local;
use tempfile::TempDir;

use skyblock_planner::estimate::Estimator;
use skyblock_planner::history::PriceHistory;
use skyblock_planner::loader::SnapshotStore;
use skyblock_planner::model::{AuctionRecord, Direction, MarketKind, Priority, SortKey};
use skyblock_planner::planner::{NewItem, Planner};
use skyblock_planner::store::ItemStore;

fn bin(name: &str, price: i64) -> AuctionRecord {
    AuctionRecord {
        uuid: None,
        item_name: name.to_string(),
        tier: Some("LEGENDARY".into()),
        starting_bid: price,
        highest_bid_amount: 0,
        end: 0,
        bin: Some(true),
        extra: Default::default(),
    }
}

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

fn wanted(name: &str, priority: i64, user_cost: i64) -> NewItem {
    NewItem {
        name: name.to_string(),
        priority: Priority::try_from(priority).unwrap(),
        user_cost,
        sample_auction: true,
        sample_bin: true,
    }
}

#[test]
fn plan_save_reload_and_refresh() {
    let dir = TempDir::new().unwrap();
    let snapshots = SnapshotStore::new(dir.path().join("auctionHouse"));
    let store = ItemStore::new(dir.path().join("userSaves"));

    snapshots
        .save(&[
            bin("Shadow Fury", 12_000_000),
            bin("Shadow Fury", 13_000_000),
            auction("Shadow Fury", 100, 11_000_000),
            bin("Livid Dagger", 6_000_000),
        ])
        .unwrap();

    let est = Estimator::new(snapshots.load().unwrap(), 1, 2);
    let history = PriceHistory::open(&dir.path().join("auctionHouse/history.db")).unwrap();

    assert!(store.load("42").unwrap().is_none());
    let mut planner = Planner::new("42", store.create("42").unwrap());
    for (name, priority, cost) in [("Shadow Fury", 8, 15_000_000), ("Livid Dagger", 3, 5_000_000)] {
        let item = planner.add(wanted(name, priority, cost), Some(&est));
        for kind in [MarketKind::Auction, MarketKind::Bin] {
            history.record(&item.name, kind, item.sample(kind)).unwrap();
        }
    }
    store.save("42", &planner.items).unwrap();

    let reloaded = store.load("42").unwrap().unwrap();
    assert_eq!(reloaded.len(), 2);
    assert_eq!(reloaded[0].bin.cost, 12_500_000);
    assert_eq!(reloaded[0].auction.cost, 11_000_000);
    // Livid Dagger: one BIN over a sample of two; no bid auctions.
    assert_eq!(reloaded[1].bin.cost, 3_000_000);
    assert!(!reloaded[1].auction.is_tracked());

    let mut planner = Planner::new("42", reloaded);
    let crashed = Estimator::new(
        vec![bin("Shadow Fury", 8_000_000), bin("Shadow Fury", 9_000_000)],
        1,
        2,
    );
    let now = Local::now();
    let changes = planner.refresh_at(&crashed, MarketKind::Bin, now);
    assert_eq!(changes.len(), 2);
    assert_eq!(changes[0].direction(), Some(Direction::Decreased));
    assert_eq!(changes[0].difference(), Some(4_000_000));
    // No Livid Dagger listings left: price kept.
    assert_eq!(changes[1].new_cost, None);
    assert_eq!(planner.items[1].bin.cost, 3_000_000);

    let by_priority: Vec<&str> = planner
        .sorted(SortKey::Priority)
        .iter()
        .map(|i| i.name.as_str())
        .collect();
    assert_eq!(by_priority, ["Livid Dagger", "Shadow Fury"]);

    let recorded = changes
        .iter()
        .filter(|c| history.record_change(c, now).unwrap())
        .count();
    assert_eq!(recorded, 1);

    let fury = history.summary("Shadow Fury", MarketKind::Bin).unwrap().unwrap();
    assert_eq!((fury.count, fury.latest), (2, 8_500_000));
    let dagger = history.summary("Livid Dagger", MarketKind::Bin).unwrap().unwrap();
    assert_eq!((dagger.count, dagger.latest), (1, 3_000_000));
}

#[test]
fn legacy_save_file_loads() {
    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join("itemsold.json"),
        r#"[{"Name": "Bonzo's Staff", "Priority": 2, "UserCost": 900000,
             "AHCost": -1, "AHUpdateTime": -1,
             "BINCost": 1100000, "BINUpdateTime": "Sat Jun 19 14:02:11 2021"}]"#,
    )
    .unwrap();

    let store = ItemStore::new(dir.path());
    let items = store.load("old").unwrap().unwrap();
    assert_eq!(items[0].name, "Bonzo's Staff");
    assert!(items[0].bin.is_tracked());
    assert_eq!(items[0].expected_cost(), 1_100_000);
}
