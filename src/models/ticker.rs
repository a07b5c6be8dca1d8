//! Ticker identity and reference metadata.

use serde::{Deserialize, Serialize};

/// Which exchange/board a ticker trades on, derived from its code prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Market {
    /// 600/601/603/605/688 — Shanghai main board + STAR market.
    Primary,
    /// 000/001/002/003/300 — Shenzhen main board + ChiNext.
    Secondary,
    /// 8xx/4xx — Beijing exchange / NEEQ select tier.
    Tertiary,
}

impl Market {
    /// Derive the market tag from a 6-character ticker code. Returns `None` for
    /// prefixes that don't map to a known board.
    pub fn from_code(code: &str) -> Option<Self> {
        let prefix3 = code.get(0..3)?;
        let prefix1 = code.get(0..1)?;
        match prefix3 {
            "600" | "601" | "603" | "605" | "688" => Some(Market::Primary),
            "000" | "001" | "002" | "003" | "300" => Some(Market::Secondary),
            _ if prefix1 == "8" || prefix1 == "4" => Some(Market::Tertiary),
            _ => None,
        }
    }

    pub fn as_tag(self) -> &'static str {
        match self {
            Market::Primary => "primary",
            Market::Secondary => "secondary",
            Market::Tertiary => "tertiary",
        }
    }
}

/// A stable ticker identity: 6-digit code plus its derived market tag.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Ticker {
    pub code: String,
    pub market: Market,
}

impl Ticker {
    /// Build a `Ticker` from a raw code, deriving the market. Returns `None` if
    /// the code's prefix doesn't match any known board — callers should treat
    /// such codes as unrecognized rather than defaulting to a market.
    pub fn new(code: impl Into<String>) -> Option<Self> {
        let code = code.into();
        let market = Market::from_code(&code)?;
        Some(Self { code, market })
    }
}

/// Roster-level reference metadata for a ticker, as returned by
/// `QuoteProvider::load_reference_universe`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TickerRef {
    pub ticker: Ticker,
    pub name: String,
    pub industry: String,
    pub listing_region: String,
    pub total_market_cap: f64,
    pub free_float_cap: f64,
}

impl TickerRef {
    /// "ST"/"退" name markers used by `UniverseResolver` to drop suspended or
    /// delisting names from the analysis universe.
    pub fn is_suspended_or_delisting(&self) -> bool {
        self.name.contains("ST") || self.name.contains('退')
    }
}
