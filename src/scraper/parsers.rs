use crate::models::ScreenerResponse;
use scraper::{Html, Selector};

// ── Landing page ──────────────────────────────────────────────────────────────

/// Pull the anti-forgery token out of `<meta name="csrf-token" content="…">`.
pub fn extract_csrf_token(html: &str) -> Option<String> {
    let doc = Html::parse_document(html);
    let sel = Selector::parse("meta[name='csrf-token']").ok()?;

    doc.select(&sel)
        .filter_map(|el| el.value().attr("content"))
        .map(str::trim)
        .find(|t| !t.is_empty())
        .map(str::to_string)
}

// ── Process endpoint ──────────────────────────────────────────────────────────

pub fn parse_screener_body(body: &str) -> serde_json::Result<ScreenerResponse> {
    serde_json::from_str(body)
}
