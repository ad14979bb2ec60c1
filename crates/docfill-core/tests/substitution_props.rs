//! Property-based tests for substitution and reference numbering
//!
//! Test categories:
//! - Structural and run-level substitution against plain string replacement
//! - Serial counters handing out consecutive numbers
//! - Reference number shape for arbitrary dates

use chrono::NaiveDate;
use proptest::prelude::*;

use docfill_core::reference::{format_reference, generate_reference_on};
use docfill_core::serial::{FileSerialCounter, MemorySerialCounter, SerialCounter};
use docfill_core::substitute::{substitute_in_runs, substitute_structural};
use docfill_core::{Paragraph, PlaceholderMap};

const KEY: &str = "<<Name>>";

// Run texts drawn from an alphabet that can spell the marker, so markers
// appear whole, split across runs, or not at all
fn run_texts() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec(
        prop_oneof![
            "[a-zA-Z ]{0,6}",
            Just(KEY.to_string()),
            Just("<<Na".to_string()),
            Just("me>>".to_string()),
        ],
        1..6,
    )
}

fn replacement() -> impl Strategy<Value = String> {
    "[a-z .]{0,10}"
}

fn calendar_date() -> impl Strategy<Value = NaiveDate> {
    (2000i32..2100, 1u32..=12, 1u32..=28)
        .prop_map(|(y, m, d)| NaiveDate::from_ymd_opt(y, m, d).unwrap_or_default())
}

proptest! {
    /// Property: structural substitution equals replacement over the joined text
    #[test]
    fn structural_matches_string_replace(runs in run_texts(), value in replacement()) {
        let paragraph = Paragraph::from_runs(runs.iter().map(String::as_str));
        let map: PlaceholderMap = [(KEY, value.as_str())].into_iter().collect();
        let joined: String = runs.concat();

        let result = substitute_structural(&paragraph, &map);

        if joined.contains(KEY) {
            prop_assert_eq!(result.text(), joined.replace(KEY, &value));
            prop_assert_eq!(result.run_count(), 1);
        } else {
            prop_assert_eq!(result, paragraph);
        }
    }

    /// Property: run-level substitution never changes the number of runs
    #[test]
    fn run_level_keeps_run_boundaries(runs in run_texts(), value in replacement()) {
        let paragraph = Paragraph::from_runs(runs.iter().map(String::as_str));
        let map: PlaceholderMap = [(KEY, value.as_str())].into_iter().collect();

        let result = substitute_in_runs(&paragraph, &map);

        prop_assert_eq!(result.run_count(), paragraph.run_count());
        let expected: String = runs.iter().map(|r| r.replace(KEY, &value)).collect();
        prop_assert_eq!(result.text(), expected);
    }

    /// Property: N calls on a fresh counter yield base..base+N in order
    #[test]
    fn memory_counter_is_consecutive(base in 0u64..100_000, n in 1usize..50) {
        let counter = MemorySerialCounter::new(base);
        let serials: Vec<u64> = (0..n).map(|_| counter.next_serial().unwrap()).collect();
        let expected: Vec<u64> = (base..base + n as u64).collect();
        prop_assert_eq!(serials, expected);
    }

    /// Property: the file counter survives reopening between calls
    #[test]
    fn file_counter_is_consecutive_across_reopen(base in 0u64..100_000, n in 1usize..10) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("serial_data.txt");

        let serials: Vec<u64> = (0..n)
            .map(|_| FileSerialCounter::with_base(&path, base).next_serial().unwrap())
            .collect();

        let expected: Vec<u64> = (base..base + n as u64).collect();
        prop_assert_eq!(serials, expected);
        prop_assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            format!("{},{}", base, n)
        );
    }

    /// Property: references are `<code><MM>-<YYYY>-CR<serial>`
    #[test]
    fn reference_shape(date in calendar_date(), serial in 0u64..10_000_000) {
        let reference = format_reference("BKR", date, serial);
        let re = regex::Regex::new(r"^BKR(\d{2})-(\d{4})-CR(\d+)$").unwrap();
        let caps = re.captures(&reference);
        prop_assert!(caps.is_some(), "malformed reference {}", reference);

        let caps = caps.unwrap();
        prop_assert_eq!(caps[1].parse::<u32>().unwrap(), chrono::Datelike::month(&date));
        prop_assert_eq!(caps[2].parse::<i32>().unwrap(), chrono::Datelike::year(&date));
        prop_assert_eq!(caps[3].parse::<u64>().unwrap(), serial);
    }

    /// Property: same-month references differ only in the serial and increase
    #[test]
    fn same_month_references_increase(date in calendar_date(), n in 2usize..20) {
        let counter = MemorySerialCounter::default();
        let references: Vec<String> = (0..n)
            .map(|_| generate_reference_on(&counter, "BKR", date).unwrap())
            .collect();

        let serial = |r: &String| -> u64 {
            r.rsplit_once("-CR").and_then(|(_, s)| s.parse().ok()).unwrap()
        };
        let prefix = |r: &String| r.rsplit_once("-CR").map(|(p, _)| p.to_string()).unwrap();

        for pair in references.windows(2) {
            prop_assert_eq!(prefix(&pair[0]), prefix(&pair[1]));
            prop_assert!(serial(&pair[1]) > serial(&pair[0]));
        }
    }
}
