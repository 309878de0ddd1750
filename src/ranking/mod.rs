//! Report-time business rules.
//!
//! Stored tables are already cut at fetch time (change ≥ 2, top five), but the
//! report re-derives its rows from whatever is on disk with stricter limits.

use crate::models::{StockRecord, NOT_AVAILABLE};

pub const MIN_CHANGE: f64 = 2.0;
pub const MIN_VOLUME: i64 = 2000;
pub const MIN_PRICE: f64 = 5.0;
pub const TOP_N: usize = 5;

fn finite_or_zero(x: f64) -> f64 {
    if x.is_finite() { x } else { 0.0 }
}

fn is_displayable(r: &StockRecord) -> bool {
    let name = r.stock_name.trim();
    !name.is_empty() && !name.eq_ignore_ascii_case(NOT_AVAILABLE)
}

fn passes_thresholds(r: &StockRecord) -> bool {
    r.change >= MIN_CHANGE && r.volume >= MIN_VOLUME && r.price >= MIN_PRICE
}

/// Top five rows for a report section: real names only, change ≥ 2,
/// volume ≥ 2000, price ≥ 5, strongest change first. Ties keep input order.
pub fn filter_for_report(records: &[StockRecord]) -> Vec<StockRecord> {
    let mut kept: Vec<StockRecord> = records
        .iter()
        .filter(|r| is_displayable(r))
        .map(|r| StockRecord {
            price: finite_or_zero(r.price),
            change: finite_or_zero(r.change),
            ..r.clone()
        })
        .filter(passes_thresholds)
        .collect();

    kept.sort_by(|a, b| b.change.total_cmp(&a.change));
    kept.truncate(TOP_N);
    kept
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(name: &str, price: f64, change: f64, volume: i64) -> StockRecord {
        StockRecord {
            stock_name: name.to_string(),
            price,
            change,
            volume,
            symbol: name.to_uppercase(),
        }
    }

    fn check_invariants(out: &[StockRecord]) {
        assert!(out.len() <= TOP_N);
        assert!(out.windows(2).all(|w| w[0].change >= w[1].change));
        assert!(out
            .iter()
            .all(|r| r.change >= 2.0 && r.volume >= 2000 && r.price >= 5.0));
    }

    #[test]
    fn test_only_row_above_all_thresholds_survives() {
        let input = vec![
            rec("one", 10.0, 1.0, 5000),
            rec("five", 10.0, 5.0, 5000),
            rec("neg", 10.0, -2.0, 5000),
        ];
        let out = filter_for_report(&input);
        assert_eq!(out, vec![rec("five", 10.0, 5.0, 5000)]);
    }

    #[test]
    fn test_boundaries_are_inclusive() {
        let input = vec![
            rec("edge", 5.0, 2.0, 2000),
            rec("cheap", 4.99, 9.0, 9000),
            rec("thin", 50.0, 9.0, 1999),
        ];
        let out = filter_for_report(&input);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].stock_name, "edge");
    }

    #[test]
    fn test_placeholder_and_blank_names_dropped() {
        let mut sentinel = StockRecord::placeholder();
        sentinel.price = 100.0;
        sentinel.change = 10.0;
        sentinel.volume = 10_000;
        let mut lower = sentinel.clone();
        lower.stock_name = "n/a".into();
        let blank = rec("  ", 100.0, 10.0, 10_000);

        assert!(filter_for_report(&[sentinel, lower, blank]).is_empty());
    }

    #[test]
    fn test_non_finite_values_count_as_zero() {
        let out = filter_for_report(&[
            rec("nan_price", f64::NAN, 5.0, 5000),
            rec("inf_change", 10.0, f64::INFINITY, 5000),
        ]);
        assert!(out.is_empty());
    }

    #[test]
    fn test_top_five_sorted_with_stable_ties() {
        let input: Vec<StockRecord> = vec![
            rec("a", 10.0, 3.0, 5000),
            rec("b", 10.0, 8.0, 5000),
            rec("c", 10.0, 3.0, 5000),
            rec("d", 10.0, 12.0, 5000),
            rec("e", 10.0, 4.0, 5000),
            rec("f", 10.0, 2.5, 5000),
            rec("g", 10.0, 6.0, 5000),
        ];
        let out = filter_for_report(&input);
        check_invariants(&out);
        let names: Vec<&str> = out.iter().map(|r| r.stock_name.as_str()).collect();
        assert_eq!(names, vec!["d", "b", "g", "e", "a"]);
    }

    #[test]
    fn test_idempotent() {
        let input: Vec<StockRecord> = (0..20)
            .map(|i| rec(&format!("s{i}"), (i % 7) as f64 * 3.0, (i % 9) as f64 - 1.0, i * 400))
            .collect();
        let once = filter_for_report(&input);
        check_invariants(&once);
        assert_eq!(filter_for_report(&once), once);
    }
}
