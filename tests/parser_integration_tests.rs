//! Integration tests for the workshop log parser
//!
//! These tests verify that analyze_log:
//! - Keeps one record per id with the last state-changing line winning
//! - Lets removal lines drop an id entirely
//! - Applies the start-time filter as an inclusive lower bound
//! - Ignores lines for other apps and malformed lines

use proptest::prelude::*;
use wallpaper_extractor::WorkshopRecord;
use wallpaper_extractor::services::{analyze_log, read_log_lines};

fn line(time: &str, phrase: &str, id: &str) -> String {
    format!(
        "[{}] [AppID 431960] Detected workshop change : {} {}",
        time, phrase, id
    )
}

#[test]
fn test_end_to_end_scenario() {
    let lines = vec![
        line("2024-03-01 10:00:00", "added subscribed item", "100"),
        line("2024-03-01 10:01:00", "added subscribed item", "200"),
        line("2024-03-01 10:02:00", "removing unsubscribed item", "100"),
    ];

    let records = analyze_log(&lines, Some("2024-03-01 09:00:00"));

    assert_eq!(
        records,
        vec![
            WorkshopRecord::new("100", "2024-03-01 10:02:00", false),
            WorkshopRecord::new("200", "2024-03-01 10:01:00", true),
        ]
    );
}

#[test]
fn test_last_write_wins() {
    let lines = vec![
        line("2024-03-01 10:00:00", "added subscribed item", "10"),
        line("2024-03-01 10:05:00", "removing unsubscribed item", "10"),
    ];

    let records = analyze_log(&lines, None);

    assert_eq!(records.len(), 1);
    assert_eq!(records[0].id, "10");
    assert!(!records[0].subscribed);
    assert_eq!(records[0].timestamp, "2024-03-01 10:05:00");
}

#[test]
fn test_removal_overrides_presence() {
    let lines = vec![
        line("2024-03-01 10:00:00", "added subscribed item", "20"),
        line("2024-03-01 10:00:01", "removing unused item", "20"),
        line("2024-03-01 10:00:02", "added subscribed item", "21"),
        line("2024-03-01 10:00:03", "removing unknown item", "21"),
    ];

    assert!(analyze_log(&lines, None).is_empty());
}

#[test]
fn test_resubscribe_after_removal() {
    let lines = vec![
        line("2024-03-01 10:00:00", "added subscribed item", "1"),
        line("2024-03-01 10:00:01", "added subscribed item", "2"),
        line("2024-03-01 10:00:02", "removing unused item", "1"),
        line("2024-03-01 10:00:03", "added subscribed item", "1"),
    ];

    let ids: Vec<_> = analyze_log(&lines, None).into_iter().map(|r| r.id).collect();
    assert_eq!(ids, vec!["2", "1"]);
}

#[test]
fn test_filter_boundary_is_inclusive() {
    let lines = vec![
        line("2024-03-01 09:59:59", "added subscribed item", "1"),
        line("2024-03-01 10:00:00", "added subscribed item", "2"),
    ];

    let records = analyze_log(&lines, Some("2024-03-01 10:00:00"));

    assert_eq!(records.len(), 1);
    assert_eq!(records[0].id, "2");
}

#[test]
fn test_filtered_removal_does_not_apply() {
    // The removal happened before the filter, so the later subscription stands
    let lines = vec![
        line("2024-01-01 00:00:00", "removing unused item", "5"),
        line("2024-06-01 00:00:00", "added subscribed item", "5"),
    ];

    assert_eq!(analyze_log(&lines, Some("2024-03-01 00:00:00")).len(), 1);
}

#[test]
fn test_foreign_and_malformed_lines_are_ignored() {
    let lines = vec![
        "[2024-03-01 10:00:00] [AppID 550] Detected workshop change : added subscribed item 1"
            .to_string(),
        "[AppID 431960] Detected workshop change : added subscribed item 2".to_string(),
        "[2024-03-01 10:00:00] [AppID 431960] Detected workshop change : added subscribed item"
            .to_string(),
        "[2024-03-01 10:00:00] [AppID 431960] Download item 3 result : OK".to_string(),
        String::new(),
    ];

    assert!(analyze_log(&lines, None).is_empty());
}

#[test]
fn test_read_missing_log() {
    let temp = tempfile::TempDir::new().unwrap();
    let path = camino::Utf8PathBuf::try_from(temp.path().join("workshop_log.txt")).unwrap();

    assert!(read_log_lines(&path).is_none());

    std::fs::write(&path, "a\r\nb\n").unwrap();
    assert_eq!(read_log_lines(&path).unwrap(), vec!["a", "b"]);
}

fn arb_line() -> impl Strategy<Value = String> {
    let phrase = prop::sample::select(vec![
        "added subscribed item",
        "removing unsubscribed item",
        "removing unused item",
        "removing unknown item",
    ]);
    (0u32..24, 0u32..60, phrase, 1u32..20).prop_map(|(hour, minute, phrase, id)| {
        line(
            &format!("2024-03-01 {:02}:{:02}:00", hour, minute),
            phrase,
            &id.to_string(),
        )
    })
}

proptest! {
    #[test]
    fn prop_parse_is_deterministic(lines in prop::collection::vec(arb_line(), 0..60)) {
        prop_assert_eq!(analyze_log(&lines, None), analyze_log(&lines, None));
    }

    #[test]
    fn prop_one_record_per_id(lines in prop::collection::vec(arb_line(), 0..60)) {
        let records = analyze_log(&lines, None);
        let mut ids: Vec<_> = records.iter().map(|r| r.id.clone()).collect();
        ids.sort();
        ids.dedup();
        prop_assert_eq!(ids.len(), records.len());
    }

    #[test]
    fn prop_filter_only_keeps_later_timestamps(
        lines in prop::collection::vec(arb_line(), 0..60),
        hour in 0u32..24,
    ) {
        let start = format!("2024-03-01 {:02}:00:00", hour);
        for record in analyze_log(&lines, Some(&start)) {
            prop_assert!(record.timestamp.as_str() >= start.as_str());
        }
    }
}
