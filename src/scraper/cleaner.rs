use crate::models::{placeholder_set, RawScreenerRow, StockRecord};
use serde_json::Value;
use tracing::debug;

/// Fetch-time cut: rows below this percent change never reach storage.
pub const MIN_FETCH_CHANGE: f64 = 2.0;
pub const MAX_ROWS: usize = 5;

// ── Parsers ───────────────────────────────────────────────────────────────────

/// Parse price: strip everything except digits, dot, minus.
/// "₹ 1,234.56" → 1234.56 | "610.00" → 610.0
pub fn parse_price(s: &str) -> Option<f64> {
    let s = s.trim();
    if s.is_empty() || s == "N/A" || s == "-" || s == "—" {
        return None;
    }
    let cleaned: String = s
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
        .collect();
    cleaned.parse().ok()
}

pub fn parse_pct(s: &str) -> Option<f64> {
    let s = s.trim().replace('%', "").replace(',', "");
    if s.is_empty() || s == "N/A" || s == "-" {
        return None;
    }
    s.parse().ok()
}

/// Parse volume with K/M/B suffixes.
/// "1.2M" → 1,200,000 | "345K" → 345,000 | "12345" → 12345
pub fn parse_volume_shorthand(s: &str) -> Option<i64> {
    let s = s.trim().to_uppercase().replace(',', "");

    if s.is_empty() || s == "N/A" || s == "-" || s == "—" {
        return None;
    }

    let (num_str, multiplier) = if s.ends_with('B') {
        (s.trim_end_matches('B'), 1_000_000_000.0)
    } else if s.ends_with('M') {
        (s.trim_end_matches('M'), 1_000_000.0)
    } else if s.ends_with('K') {
        (s.trim_end_matches('K'), 1_000.0)
    } else {
        (s.as_str(), 1.0)
    };

    let num: f64 = num_str.trim().parse().ok()?;
    Some((num * multiplier) as i64)
}

// ── JSON cells ────────────────────────────────────────────────────────────────

fn text_cell(v: Option<&Value>) -> Option<String> {
    match v? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn number_cell(v: Option<&Value>, parse: fn(&str) -> Option<f64>) -> Option<f64> {
    let n = match v? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().or_else(|| parse(s)),
        _ => None,
    }?;
    n.is_finite().then_some(n)
}

fn volume_cell(v: Option<&Value>) -> Option<i64> {
    match v? {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => parse_volume_shorthand(s),
        _ => None,
    }
}

// ── Raw row → StockRecord ─────────────────────────────────────────────────────

/// Map one screener row onto the canonical five fields. `None` when any of
/// them is missing or unreadable.
pub fn row_to_record(row: &RawScreenerRow) -> Option<StockRecord> {
    Some(StockRecord {
        stock_name: text_cell(row.name.as_ref())?,
        price: number_cell(row.close.as_ref(), parse_price)?,
        change: number_cell(row.per_chg.as_ref(), parse_pct)?,
        volume: volume_cell(row.volume.as_ref())?,
        symbol: text_cell(row.nsecode.as_ref())?,
    })
}

pub fn clean_screener_rows(rows: &[RawScreenerRow]) -> Vec<StockRecord> {
    let records: Vec<StockRecord> = rows.iter().filter_map(row_to_record).collect();
    if records.len() < rows.len() {
        debug!("Skipped {} unmappable rows", rows.len() - records.len());
    }
    records
}

/// Keep rows with change ≥ 2, strongest first, at most five. Never returns an
/// empty set: an empty cut collapses to the placeholder row.
pub fn pre_rank(records: Vec<StockRecord>) -> Vec<StockRecord> {
    let mut kept: Vec<StockRecord> = records
        .into_iter()
        .filter(|r| r.change >= MIN_FETCH_CHANGE)
        .collect();
    kept.sort_by(|a, b| b.change.total_cmp(&a.change));
    kept.truncate(MAX_ROWS);

    if kept.is_empty() {
        placeholder_set()
    } else {
        kept
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw(v: serde_json::Value) -> RawScreenerRow {
        serde_json::from_value(v).unwrap()
    }

    fn rec(name: &str, change: f64) -> StockRecord {
        StockRecord {
            stock_name: name.into(),
            price: 100.0,
            change,
            volume: 10_000,
            symbol: name.into(),
        }
    }

    #[test]
    fn test_parse_volume_shorthand() {
        assert_eq!(parse_volume_shorthand("1.2M"), Some(1_200_000));
        assert_eq!(parse_volume_shorthand("345K"), Some(345_000));
        assert_eq!(parse_volume_shorthand("12,345"), Some(12345));
        assert_eq!(parse_volume_shorthand("-"), None);
    }

    #[test]
    fn test_row_mapping_accepts_numbers_and_strings() {
        let r = row_to_record(&raw(json!({
            "name": "Tata Motors", "close": "1,020.5", "per_chg": 3.25,
            "volume": "12345", "nsecode": "TATAMOTORS"
        })))
        .unwrap();
        assert_eq!(r.stock_name, "Tata Motors");
        assert_eq!(r.price, 1020.5);
        assert_eq!(r.change, 3.25);
        assert_eq!(r.volume, 12345);
        assert_eq!(r.symbol, "TATAMOTORS");
    }

    #[test]
    fn test_row_missing_field_is_skipped() {
        let rows = vec![
            raw(json!({"name": "A", "close": 10, "per_chg": 3, "volume": 5000})),
            raw(json!({"name": "B", "close": 10, "per_chg": "x", "volume": 5000, "nsecode": "B"})),
            raw(json!({"name": "C", "close": 10, "per_chg": 3, "volume": 5000, "nsecode": "C"})),
        ];
        let out = clean_screener_rows(&rows);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].symbol, "C");
    }

    #[test]
    fn test_plain_numeric_strings_parse_exactly() {
        let r = row_to_record(&raw(json!({
            "name": "X", "close": "1e3", "per_chg": " 2.5 ", "volume": 5000, "nsecode": "X"
        })))
        .unwrap();
        assert_eq!(r.price, 1000.0);
        assert_eq!(r.change, 2.5);

        let decorated = row_to_record(&raw(json!({
            "name": "Y", "close": "₹ 1,234.50", "per_chg": "3.1%", "volume": 5000, "nsecode": "Y"
        })))
        .unwrap();
        assert_eq!(decorated.price, 1234.5);
        assert_eq!(decorated.change, 3.1);
    }

    #[test]
    fn test_pre_rank_cuts_sorts_and_limits() {
        let input = vec![
            rec("a", 1.9),
            rec("b", 2.0),
            rec("c", 9.0),
            rec("d", 4.0),
            rec("e", 7.0),
            rec("f", 3.0),
            rec("g", 8.0),
        ];
        let out = pre_rank(input);
        let names: Vec<&str> = out.iter().map(|r| r.stock_name.as_str()).collect();
        assert_eq!(names, vec!["c", "g", "e", "d", "f"]);
    }

    #[test]
    fn test_pre_rank_empty_collapses_to_placeholder() {
        assert_eq!(pre_rank(vec![rec("a", 1.0)]), placeholder_set());
        assert_eq!(pre_rank(vec![]), placeholder_set());
    }
}
