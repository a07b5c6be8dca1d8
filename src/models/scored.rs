//! The per-ticker scoring outcome and its letter-grade bucket.

use serde::{Deserialize, Serialize};

use super::indicators::IndicatorSet;
use super::ticker::Market;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Grade {
    S,
    A,
    B,
    C,
    D,
}

impl Grade {
    pub fn from_score(score: f64) -> Self {
        if score >= 90.0 {
            Grade::S
        } else if score >= 80.0 {
            Grade::A
        } else if score >= 70.0 {
            Grade::B
        } else if score >= 60.0 {
            Grade::C
        } else {
            Grade::D
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Grade::S => "S",
            Grade::A => "A",
            Grade::B => "B",
            Grade::C => "C",
            Grade::D => "D",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredStock {
    pub code: String,
    pub market: Market,
    pub name: String,
    pub industry: String,
    pub market_cap: f64,
    pub score: f64,
    pub grade: Grade,
    pub qualified: bool,
    pub reason: String,
    pub satisfied_count: usize,
    pub indicators: IndicatorSet,
    pub close: f64,
    pub percent_change: f64,
    pub source: String,
}
