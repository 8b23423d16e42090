//! Property tests for spreadsheet numeric parsing

use proptest::prelude::*;
use recruitctl_core::import::{parse_integer, parse_number, parse_percentage, split_list};

proptest! {
    #[test]
    fn thousands_separators_do_not_change_value(n in 0u32..10_000_000) {
        let plain = n.to_string();
        let mut grouped = String::new();
        for (i, c) in plain.chars().enumerate() {
            if i > 0 && (plain.len() - i) % 3 == 0 {
                grouped.push(',');
            }
            grouped.push(c);
        }
        prop_assert_eq!(parse_integer(&grouped), Some(n as i64));
        prop_assert_eq!(parse_number(&format!("${}", grouped)), Some(n as f64));
    }

    #[test]
    fn explicit_percentages_stay_in_range(p in 0u32..=100) {
        let parsed = parse_percentage(&format!("{}%", p));
        prop_assert_eq!(parsed, Some(p as f64));
    }

    #[test]
    fn percentages_above_hundred_are_rejected(p in 101u32..100_000) {
        prop_assert_eq!(parse_percentage(&format!("{}%", p)), None);
    }

    #[test]
    fn parse_number_never_panics(s in "\\PC*") {
        let _ = parse_number(&s);
        let _ = parse_percentage(&s);
    }

    #[test]
    fn split_list_has_no_blank_items(s in "[a-z ,;/|]{0,40}") {
        for item in split_list(&s) {
            prop_assert!(!item.trim().is_empty());
            prop_assert_eq!(item.trim(), item.as_str());
        }
    }
}
