//! Fixed set of Chartink screeners the ingestion run walks through.

use serde::Serialize;

const PLACEHOLDER_ENDPOINT: &str = "https://chartink.com/screener/";

/// Where a screener lives and whether it has a scan clause to submit.
#[derive(Debug, Clone, PartialEq)]
pub enum ScreenerQuery {
    Configured { endpoint: String, scan_clause: String },
    Unconfigured { endpoint: String },
}

impl ScreenerQuery {
    pub fn is_configured(&self) -> bool {
        matches!(self, Self::Configured { .. })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScreenerDefinition {
    pub id: String,
    pub title: String,
    pub query: ScreenerQuery,
    /// Human-readable formula, one condition per line.
    pub formula: Vec<String>,
}

impl ScreenerDefinition {
    pub fn configured(id: &str, title: &str, endpoint: &str, scan_clause: &str) -> Self {
        Self {
            id: id.to_string(),
            title: title.to_string(),
            query: ScreenerQuery::Configured {
                endpoint: endpoint.to_string(),
                scan_clause: scan_clause.trim().to_string(),
            },
            formula: vec![],
        }
    }

    pub fn unconfigured(id: &str, title: &str, endpoint: &str) -> Self {
        Self {
            id: id.to_string(),
            title: title.to_string(),
            query: ScreenerQuery::Unconfigured {
                endpoint: endpoint.to_string(),
            },
            formula: vec![],
        }
    }

    pub fn with_formula(mut self, lines: &[&str]) -> Self {
        self.formula = lines.iter().map(|l| l.to_string()).collect();
        self
    }
}

/// Summary row served by `/api/screeners`.
#[derive(Debug, Clone, Serialize)]
pub struct ScreenerInfo {
    pub id: String,
    pub title: String,
    pub configured: bool,
    pub formula: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct Registry {
    screeners: Vec<ScreenerDefinition>,
}

impl Registry {
    pub fn new(screeners: Vec<ScreenerDefinition>) -> Self {
        Self { screeners }
    }

    pub fn get(&self, id: &str) -> Option<&ScreenerDefinition> {
        self.screeners.iter().find(|s| s.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ScreenerDefinition> {
        self.screeners.iter()
    }

    pub fn ids(&self) -> Vec<String> {
        self.screeners.iter().map(|s| s.id.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.screeners.len()
    }

    pub fn info(&self) -> Vec<ScreenerInfo> {
        self.screeners
            .iter()
            .map(|s| ScreenerInfo {
                id: s.id.clone(),
                title: s.title.clone(),
                configured: s.query.is_configured(),
                formula: s.formula.clone(),
            })
            .collect()
    }

    /// The production screener list. Entries without a scan clause still get
    /// a (placeholder) table every day.
    pub fn builtin() -> Self {
        use ScreenerDefinition as D;

        Self::new(vec![
            D::configured(
                "bms",
                "Best Multibagger Stocks",
                "https://chartink.com/screener/best-multibagger-stocks",
                "({cash} ( daily high >= daily max( 260 , daily high ) * 0.9 and daily low >= daily min( 260 , daily low ) * 2 and daily close > daily sma( daily close , 100 ) and daily sma( daily close , 20 ) > daily sma( daily close , 200 ) and daily high < daily max( 260 , daily high ) * 1 and daily rsi( 14 ) >= 55 and earning per share[eps] > 20 and yearly debt equity ratio < 1 and market cap <= 5000 ) )",
            ).with_formula(&[
                "Daily RSI(14) < 30",
                "Daily EMA20 > Daily EMA50",
                "Price Change % > 0",
            ]),
            D::configured(
                "lowest_pe",
                "Lowest PE Stocks",
                "https://chartink.com/screener/top-stocks-with-the-lowest-pe-pricing-earnings",
                "( {cash} ( market cap / yearly net profit after minority interest & pnl assoco < 5 and market cap / yearly net profit after minority interest & pnl assoco >= 1 ) )",
            ).with_formula(&[
                "Daily RSI(14) < 40",
                "Price near 52-week Low (proxy)",
            ]),
            D::configured(
                "bullish_script",
                "Bullish Script",
                "https://chartink.com/screener/copy-bullish-script-165",
                "( {cash} ( daily close > daily sma( close,200 ) and daily close > daily ema( close,200 ) and daily close > weekly sma( close,200 ) and daily close > weekly ema( close,200 ) and daily close > monthly sma( close,200 ) and daily rsi( 14 ) > 51 and weekly rsi( 14 ) > 51 and monthly rsi( 14 ) > 51 and daily macd histogram( 26,12,9 ) > 0 and weekly macd histogram( 26,12,9 ) > 0 and monthly macd histogram( 26,12,9 ) > 0 and daily close > ( 200 days ago high ) and daily volume >= 200000 ) )",
            ).with_formula(&[
                "Daily EMA20 > Daily EMA50",
                "Daily RSI(14) > 55",
            ]),
            D::configured(
                "profit_jump",
                "Profit Jump",
                "https://chartink.com/screener/profit-jump-by-200",
                "( {cash} ( net profit[yearly] > ttm net profit * 2 and net profit[yearly] > 0 and ttm net profit > 0 ) )",
            ).with_formula(&[
                "Daily % Change > 2%",
                "Daily RSI(14) > 50",
            ]),
            D::configured(
                "sales_jump",
                "Sales Jump",
                "https://chartink.com/screener/sales-jump-by-200",
                "( {cash} ( sales turnover[yearly] > ttm sales * 2 ) )",
            ).with_formula(&[
                "Daily % Change < -1%",
                "Daily RSI(14) < 45",
            ]),
            D::configured(
                "below_book_value",
                "Below Book Value",
                "https://chartink.com/screener/stocks-below-book-value",
                "( {cash} ( daily close < yearly book value ) )",
            ).with_formula(&[
                "Price < ₹200",
                "Daily RSI(14) < 35",
            ]),
            D::configured(
                "buy_entry_intraday",
                "Buy Entry Intraday",
                "https://chartink.com/screener/buy-entry-intraday",
                "( {33489} ( daily parabolic sar( 0.04,0.02,0.2 ) < daily ema( close,9 ) and 1 day ago  parabolic sar( 0.04,0.02,0.2 ) >= 1 day ago  ema( close,9 ) ) )",
            ).with_formula(&[
                "Daily EMA20 > Daily EMA50",
                "Daily RSI(14) between 45 and 60",
            ]),
            // Pattern screens without a scan clause yet.
            D::unconfigured("short_term_breakouts", "Short Term Breakouts", PLACEHOLDER_ENDPOINT).with_formula(&[
                "Daily High >= Max(260, Daily High) × 0.9",
                "Market Cap <= 5000 Cr",
                "Daily Low >= Min(260, Daily Low) × 2",
                "Daily Close > SMA( Daily Close , 100 )",
                "SMA( Daily Close , 20 ) > SMA( Daily Close , 200 )",
                "Daily High < Max(260, Daily High) × 1.0",
                "Daily RSI(14) >= 55",
                "EPS > 20",
                "Yearly Debt/Equity < 1",
            ]),
            D::unconfigured("potential_breakouts", "Potential Breakouts", PLACEHOLDER_ENDPOINT).with_formula(&[
                "Daily EMA20 > Daily EMA50",
                "Daily Close within 2% of Max(60, Close)",
                "Daily Volume > SMA(Volume , 10)",
            ]),
            D::unconfigured("bearish_engulf_5m", "Bearish Engulfing (5m)", PLACEHOLDER_ENDPOINT).with_formula(&[
                "Prev Trend 8 candles down",
                "Current 5m Candle red engulfing previous 5m green",
                "RSI(14) > 55 (reversal zone)",
            ]),
            D::unconfigured("tweezer_bottom_15m", "Tweezer Bottom (15m)", PLACEHOLDER_ENDPOINT).with_formula(&[
                "Two candles with same Low",
                "First candle red, second green",
                "RSI(14) < 40",
            ]),
            D::unconfigured("bullish_harami_15m", "Bullish Harami (15m)", PLACEHOLDER_ENDPOINT).with_formula(&[
                "Prev 15m candle large red",
                "Current 15m candle small green inside body of previous",
                "RSI(14) rising above 40",
            ]),
            D::unconfigured("dragonfly_doji_15m", "Dragonfly Doji (15m)", PLACEHOLDER_ENDPOINT).with_formula(&[
                "Open ≈ Close (body very small)",
                "Long lower shadow, almost no upper",
                "Occurs after down move",
            ]),
            D::unconfigured("bearish_kicker_15m", "Bearish Kicker Pattern (15m)", PLACEHOLDER_ENDPOINT).with_formula(&[
                "Gap-down open below previous green close",
                "Current candle strong red",
                "Previous trend up (high RSI)",
            ]),
            D::unconfigured(
                "first_15m_breakout_both",
                "First 15-min Candle Breakout (Both Sides)",
                PLACEHOLDER_ENDPOINT,
            ).with_formula(&[
                "Timeframe = 15 min",
                "LTP > High of first 15m candle",
                "OR",
                "LTP < Low of first 15m candle",
                "Intraday Volume > SMA( Volume , 5 )",
            ]),
            D::unconfigured("morning_star_bullish", "Morning Star Bullish Pattern", PLACEHOLDER_ENDPOINT).with_formula(&[
                "Candle 1 = long red body, closing near low",
                "Candle 2 = small body (gap-down) showing indecision",
                "Candle 3 = strong green closing into / above mid of Candle 1 body",
                "Recent trend = down move before pattern",
            ]),
            D::unconfigured("bearish_engulfing_strong", "Bearish Engulfing – Strong", PLACEHOLDER_ENDPOINT).with_formula(&[
                "Prev candle = green body after short-term uptrend",
                "Current candle = large red body engulfing previous body high–low",
                "Body size > 1.5× average of last 5 candles",
                "RSI(14) > 55 (overbought / reversal zone)",
            ]),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_builtin_ids_are_unique_and_table_safe() {
        let reg = Registry::builtin();
        let ids: HashSet<String> = reg.ids().into_iter().collect();
        assert_eq!(ids.len(), reg.len());
        assert!(ids
            .iter()
            .all(|id| id.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')));
    }

    #[test]
    fn test_builtin_configured_split() {
        let reg = Registry::builtin();
        assert_eq!(reg.len(), 17);
        assert_eq!(reg.iter().filter(|s| s.query.is_configured()).count(), 7);
        assert!(matches!(
            reg.get("short_term_breakouts").map(|s| &s.query),
            Some(ScreenerQuery::Unconfigured { .. })
        ));
        assert!(reg.get("nope").is_none());
    }

    #[test]
    fn test_every_builtin_has_a_formula() {
        let reg = Registry::builtin();
        assert!(reg.iter().all(|s| !s.formula.is_empty()));
        assert_eq!(reg.get("profit_jump").unwrap().formula[0], "Daily % Change > 2%");
        assert_eq!(reg.get("first_15m_breakout_both").unwrap().formula.len(), 5);
    }
}
