use crate::models::{StockRecord, COLUMNS};
use crate::ranking::filter_for_report;
use crate::storage::ScreenerTables;
use crate::utils::fmt_long_date;
use chrono::NaiveDate;
use html_escape::encode_text;
use serde::Serialize;

/// Report sections in display order: (screener id, heading).
pub const REPORT_SECTIONS: [(&str, &str); 7] = [
    ("bms", "Best Multibagger Stocks"),
    ("lowest_pe", "Top stocks with the lowest Price Earning Ratios(PE)"),
    ("bullish_script", "Bullish Script"),
    ("profit_jump", "Profit jump by 200%"),
    ("sales_jump", "Sales jump by 200%"),
    ("below_book_value", "Stocks below Book value - Undervalued"),
    ("buy_entry_intraday", "Buy entry intraday"),
];

const TABLE_STYLE: &str = "width:100%; border-collapse:collapse; background:#d7ecff;";
const CELL_STYLE: &str = "border:1px solid #000; padding:6px;";

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ReportSection {
    pub id: String,
    pub heading: String,
    pub rows: Vec<StockRecord>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReportDocument {
    pub title: String,
    pub summary: String,
    pub content: String,
    pub sections: Vec<ReportSection>,
}

pub fn report_section_ids() -> Vec<String> {
    REPORT_SECTIONS.iter().map(|(id, _)| id.to_string()).collect()
}

/// Build the report from one day's tables; `None` means nothing is stored yet.
pub fn compose_report(as_of: NaiveDate, tables: Option<&ScreenerTables>) -> ReportDocument {
    let date = fmt_long_date(as_of);
    let title = format!("Technical Analysis Report — {}", date);

    let Some(tables) = tables else {
        return ReportDocument {
            title,
            summary: "No database found for today.".to_string(),
            content: "<p>No data available. Please run update first.</p>".to_string(),
            sections: vec![],
        };
    };

    let sections: Vec<ReportSection> = REPORT_SECTIONS
        .iter()
        .enumerate()
        .map(|(i, (id, heading))| ReportSection {
            id: id.to_string(),
            heading: format!("{}.) {}", i + 1, heading),
            rows: tables
                .get(*id)
                .map(|rows| filter_for_report(rows))
                .unwrap_or_default(),
        })
        .collect();

    let mut content = format!(
        "<h2>{}</h2><p>This report is automatically generated from Chartink screeners.</p><br>",
        encode_text(&title)
    );
    for section in &sections {
        content.push_str(&section_html(section));
    }

    ReportDocument {
        summary: format!("Technical analysis report as on {}.", date),
        title,
        content,
        sections,
    }
}

/// Titled table with the fixed five-column header, rows or not.
fn section_html(section: &ReportSection) -> String {
    let mut html = format!(
        "<h3>{}</h3><table style='{}'><tr>",
        encode_text(&section.heading),
        TABLE_STYLE
    );
    for col in COLUMNS {
        html.push_str(&format!("<th style='{}'>{}</th>", CELL_STYLE, col));
    }
    html.push_str("</tr>");

    for r in &section.rows {
        html.push_str("<tr>");
        let cells = [
            r.stock_name.clone(),
            r.price.to_string(),
            r.change.to_string(),
            r.volume.to_string(),
            r.symbol.clone(),
        ];
        for cell in &cells {
            html.push_str(&format!("<td style='{}'>{}</td>", CELL_STYLE, encode_text(cell)));
        }
        html.push_str("</tr>");
    }

    html.push_str("</table><br>");
    html
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::placeholder_set;

    fn rec(name: &str, change: f64) -> StockRecord {
        StockRecord {
            stock_name: name.into(),
            price: 25.0,
            change,
            volume: 10_000,
            symbol: name.to_uppercase(),
        }
    }

    fn as_of() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 1).unwrap()
    }

    #[test]
    fn test_sections_in_fixed_order_with_numbered_headings() {
        let mut tables = ScreenerTables::new();
        tables.insert("bms".into(), vec![rec("low", 1.0), rec("a&b", 5.0)]);
        tables.insert("lowest_pe".into(), placeholder_set());
        tables.insert("short_term_breakouts".into(), vec![rec("ignored", 9.0)]);

        let doc = compose_report(as_of(), Some(&tables));
        assert_eq!(doc.title, "Technical Analysis Report — 1st May 2024");
        assert_eq!(doc.sections.len(), 7);
        assert_eq!(doc.sections[0].heading, "1.) Best Multibagger Stocks");
        assert_eq!(doc.sections[6].heading, "7.) Buy entry intraday");
        assert_eq!(doc.sections[0].rows, vec![rec("a&b", 5.0)]);
        assert!(doc.sections[1].rows.is_empty());
        assert!(!doc.content.contains("ignored"));
        assert!(doc.content.contains("a&amp;b"));
    }

    #[test]
    fn test_empty_sections_still_render_header() {
        let doc = compose_report(as_of(), Some(&ScreenerTables::new()));
        assert_eq!(doc.content.matches("<table").count(), 7);
        assert_eq!(doc.content.matches(">stock_name</th>").count(), 7);
        assert_eq!(doc.content.matches(">symbol</th>").count(), 7);
        assert!(!doc.content.contains("<td"));
    }

    #[test]
    fn test_no_snapshot_report() {
        let doc = compose_report(as_of(), None);
        assert!(doc.sections.is_empty());
        assert_eq!(doc.summary, "No database found for today.");
        assert!(doc.content.contains("Please run update first"));
    }
}
