//! Latest-session quotes and daily OHLCV history.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Latest-session record for one ticker.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct QuoteSnapshot {
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub previous_close: f64,
    pub volume: f64,
    pub turnover_value: f64,
    pub turnover_rate: f64,
    pub session_time: NaiveDateTime,
}

impl QuoteSnapshot {
    /// `(close - previous_close) / previous_close * 100`. `NaN` when
    /// `previous_close` is zero (should not occur for normalized records).
    pub fn percent_change(&self) -> f64 {
        (self.close - self.previous_close) / self.previous_close * 100.0
    }
}

/// A single dated OHLCV bar.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct HistoryBar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// An ordered, gap-free daily history, most recent bar last.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct History {
    pub bars: Vec<HistoryBar>,
}

impl History {
    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.close).collect()
    }

    pub fn latest(&self) -> Option<&HistoryBar> {
        self.bars.last()
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }
}
