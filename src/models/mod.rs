use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Marker used for every textual field of a placeholder row.
pub const NOT_AVAILABLE: &str = "N/A";

/// Fixed column order of every stored screener table.
pub const COLUMNS: [&str; 5] = ["stock_name", "price", "change", "volume", "symbol"];

// ── Stock record ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StockRecord {
    pub stock_name: String,
    pub price: f64,
    pub change: f64,   // percent
    pub volume: i64,
    pub symbol: String,
}

impl StockRecord {
    /// "No data" row: sentinel text, zeroed numbers.
    pub fn placeholder() -> Self {
        Self {
            stock_name: NOT_AVAILABLE.to_string(),
            price: 0.0,
            change: 0.0,
            volume: 0,
            symbol: NOT_AVAILABLE.to_string(),
        }
    }

    pub fn is_placeholder(&self) -> bool {
        self.stock_name.trim().eq_ignore_ascii_case(NOT_AVAILABLE)
    }
}

/// The record set a fetch falls back to. Always exactly one row.
pub fn placeholder_set() -> Vec<StockRecord> {
    vec![StockRecord::placeholder()]
}

// ── Raw screener row ──────────────────────────────────────────────────────────

/// One element of the screener's `data` array, before normalisation.
/// Numeric fields arrive either as JSON numbers or numeric strings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawScreenerRow {
    pub name: Option<serde_json::Value>,
    pub close: Option<serde_json::Value>,
    pub per_chg: Option<serde_json::Value>,
    pub volume: Option<serde_json::Value>,
    pub nsecode: Option<serde_json::Value>,
}

/// Body returned by the screener processing endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ScreenerResponse {
    #[serde(default)]
    pub data: Vec<RawScreenerRow>,
}

// ── Day key ───────────────────────────────────────────────────────────────────

#[derive(Debug, Error, PartialEq)]
#[error("invalid day {0:?}, expected YYYY_MM_DD")]
pub struct DayKeyError(pub String);

/// Calendar day formatted `YYYY_MM_DD`; string order equals date order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct DayKey(String);

impl DayKey {
    pub fn from_date(date: NaiveDate) -> Self {
        Self(date.format("%Y_%m_%d").to_string())
    }

    pub fn today() -> Self {
        Self::from_date(chrono::Local::now().date_naive())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for DayKey {
    type Err = DayKeyError;

    /// Accepts `2024_05_01` and `2024-05-01`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalised = s.trim().replace('-', "_");
        NaiveDate::parse_from_str(&normalised, "%Y_%m_%d")
            .map(Self::from_date)
            .map_err(|_| DayKeyError(s.to_string()))
    }
}

impl fmt::Display for DayKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_day_key_accepts_both_separators() {
        let a: DayKey = "2024_05_01".parse().unwrap();
        let b: DayKey = "2024-05-01".parse().unwrap();
        assert_eq!(a, b);
        assert_eq!(a.as_str(), "2024_05_01");
        assert_eq!(a, DayKey::from_date(NaiveDate::from_ymd_opt(2024, 5, 1).unwrap()));
    }

    #[test]
    fn test_day_key_rejects_garbage() {
        assert!("latest".parse::<DayKey>().is_err());
        assert!("2024_13_01".parse::<DayKey>().is_err());
        assert!("../etc".parse::<DayKey>().is_err());
    }

    #[test]
    fn test_day_key_orders_like_dates() {
        let mut days: Vec<DayKey> = ["2024_12_31", "2025_01_02", "2024_05_01"]
            .iter()
            .map(|s| s.parse().unwrap())
            .collect();
        days.sort();
        assert_eq!(days.last().unwrap().as_str(), "2025_01_02");
    }

    #[test]
    fn test_placeholder_shape() {
        let p = StockRecord::placeholder();
        assert!(p.is_placeholder());
        assert_eq!(p.symbol, "N/A");
        assert_eq!((p.price, p.change, p.volume), (0.0, 0.0, 0));
    }

    #[test]
    fn test_record_serialises_in_column_order() {
        let json = serde_json::to_string(&StockRecord::placeholder()).unwrap();
        let positions: Vec<usize> = COLUMNS
            .iter()
            .map(|c| json.find(&format!("\"{}\"", c)).unwrap())
            .collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]));
    }
}
