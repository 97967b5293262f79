//! Reconciliation behaviour through the public API

use orderbook_sync::feed::{ConnectionEvent, Publication};
use orderbook_sync::orderbook::{BookReconciler, IngestError, PriceLevel, SequenceError, Side, SideBook};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

fn side(levels: &[(Decimal, Decimal)]) -> SideBook {
    let mut book = SideBook::new(Side::Bid);
    let levels: Vec<PriceLevel> = levels
        .iter()
        .map(|(p, s)| PriceLevel::new(*p, *s))
        .collect();
    book.apply(&levels);
    book
}

#[test]
fn test_two_batch_scenario() {
    let mut reconciler = BookReconciler::new("BTC-USD");

    reconciler
        .ingest(&Publication::new(&[("100.5", "2.0"), ("101.0", "1.0")], &[]))
        .unwrap();
    reconciler
        .ingest(&Publication::new(&[("100.5", "0"), ("102.0", "3.0")], &[]))
        .unwrap();

    let snapshot = reconciler.snapshot();
    assert_eq!(
        snapshot.bids_sorted(),
        vec![
            PriceLevel::new(dec!(102), dec!(3)),
            PriceLevel::new(dec!(101), dec!(1)),
        ]
    );
    assert!(snapshot.asks.is_empty());
}

#[test]
fn test_duplicate_price_last_wins() {
    let mut reconciler = BookReconciler::new("BTC-USD");
    reconciler
        .ingest(&Publication::new(&[("50", "1"), ("50", "4")], &[]))
        .unwrap();

    assert_eq!(reconciler.book().bids().len(), 1);
    assert_eq!(reconciler.book().bids().get(dec!(50)), Some(dec!(4)));
}

#[test]
fn test_reapplying_batch_is_idempotent() {
    let batch = [
        PriceLevel::new(dec!(10), dec!(1)),
        PriceLevel::new(dec!(11), dec!(0)),
        PriceLevel::new(dec!(12), dec!(5)),
    ];

    let mut once = side(&[(dec!(11), dec!(2)), (dec!(9), dec!(7))]);
    once.apply(&batch);

    let mut twice = once.clone();
    twice.apply(&batch);

    assert_eq!(once, twice);
}

#[test]
fn test_zero_size_removes_present_price() {
    let mut book = side(&[(dec!(1.25), dec!(3)), (dec!(1.30), dec!(4))]);
    book.apply(&[PriceLevel::new(dec!(1.25), dec!(0))]);

    assert!(!book.contains(dec!(1.25)));
    assert!(book.contains(dec!(1.3)));
}

#[test]
fn test_untouched_levels_keep_their_size() {
    let before = side(&[
        (dec!(100), dec!(1)),
        (dec!(101), dec!(2)),
        (dec!(102), dec!(3)),
    ]);
    let mut after = before.clone();
    after.apply(&[
        PriceLevel::new(dec!(101), dec!(9)),
        PriceLevel::new(dec!(103), dec!(4)),
    ]);

    for price in [dec!(100), dec!(102)] {
        assert_eq!(after.get(price), before.get(price));
    }
}

#[test]
fn test_equal_prices_match_across_scales() {
    let mut reconciler = BookReconciler::new("BTC-USD");
    reconciler
        .ingest(&Publication::new(&[("0.1", "1")], &[]))
        .unwrap();
    reconciler
        .ingest(&Publication::new(&[("0.10", "0")], &[]))
        .unwrap();

    assert!(reconciler.book().bids().is_empty());
}

#[test]
fn test_sequence_monotonicity() {
    let mut reconciler = BookReconciler::new("BTC-USD");

    reconciler
        .ingest(&Publication::new(&[("100", "1")], &[]).with_sequence(5))
        .unwrap();
    let stale = reconciler.ingest(&Publication::new(&[("100", "0"), ("90", "1")], &[]).with_sequence(3));
    reconciler
        .ingest(&Publication::new(&[("101", "2")], &[]).with_sequence(7))
        .unwrap();

    assert_eq!(
        stale,
        Err(IngestError::StaleSequence(SequenceError::Stale {
            last: 5,
            received: 3
        }))
    );

    let bids = reconciler.snapshot().bids_sorted();
    assert_eq!(
        bids,
        vec![
            PriceLevel::new(dec!(101), dec!(2)),
            PriceLevel::new(dec!(100), dec!(1)),
        ]
    );
    assert_eq!(reconciler.sequence(), Some(7));
}

#[test]
fn test_reconnect_empties_book_before_next_batch() {
    let mut reconciler = BookReconciler::new("BTC-USD");
    reconciler
        .ingest(&Publication::new(&[("100", "1")], &[("101", "1")]).with_sequence(40))
        .unwrap();

    assert!(reconciler.on_connection(ConnectionEvent::Reconnected));

    let snapshot = reconciler.snapshot();
    assert!(snapshot.is_empty());
    assert_eq!(snapshot.sequence, None);

    // Lower sequence accepted after resync
    reconciler
        .ingest(&Publication::new(&[("99", "1")], &[]).with_sequence(1))
        .unwrap();
    assert_eq!(reconciler.book().best_bid(), Some(dec!(99)));
}

#[test]
fn test_malformed_level_does_not_block_batch() {
    let mut reconciler = BookReconciler::new("BTC-USD");
    let report = reconciler
        .ingest(&Publication::new(
            &[("abc", "1"), ("100", "2")],
            &[("101", ""), ("102", "3")],
        ))
        .unwrap();

    assert_eq!(report.decode_errors.len(), 2);
    assert_eq!(report.decode_errors[0].0, Side::Bid);
    assert_eq!(report.decode_errors[1].0, Side::Ask);
    assert_eq!(reconciler.book().best_bid(), Some(dec!(100)));
    assert_eq!(reconciler.book().best_ask(), Some(dec!(102)));
}

#[test]
fn test_publication_from_wire_json() {
    let json = r#"{"bids":[["100.5","2.0"],[101,1]],"asks":null,"sequence":3}"#;
    let publication: Publication = serde_json::from_str(json).unwrap();

    let mut reconciler = BookReconciler::new("BTC-USD");
    reconciler.ingest(&publication).unwrap();

    assert_eq!(reconciler.book().bids().len(), 2);
    assert_eq!(reconciler.book().bids().get(dec!(101)), Some(dec!(1)));
    assert_eq!(reconciler.sequence(), Some(3));
}

#[test]
fn test_overly_precise_price_does_not_alias_existing_level() {
    let mut reconciler = BookReconciler::new("BTC-USD");
    reconciler
        .ingest(&Publication::new(&[("100", "5")], &[]))
        .unwrap();

    let report = reconciler
        .ingest(&Publication::new(&[("100.00000000000000000000000000001", "0")], &[]))
        .unwrap();

    assert_eq!(report.decode_errors.len(), 1);
    assert_eq!(report.bids.removed, 0);
    assert_eq!(reconciler.book().bids().get(dec!(100)), Some(dec!(5)));
}
