//! `UniverseResolver`: turns a `UniverseFilter` into a deduplicated,
//! deterministically ordered ticker list (spec §4.4).

use std::collections::HashSet;

use crate::models::{TickerRef, UniverseFilter};

/// Apply the full resolution algorithm from spec §4.4 to an already-fetched
/// reference roster. Fetching + caching the roster is `DataGateway`'s job;
/// this function is the pure filter/dedupe/sort step, kept separate so it's
/// trivially unit-testable without a provider.
pub fn resolve(roster: &[TickerRef], filter: &UniverseFilter) -> Vec<TickerRef> {
    let mut seen = HashSet::new();
    let mut out: Vec<TickerRef> = roster
        .iter()
        .filter(|r| !r.is_suspended_or_delisting())
        .filter(|r| filter.matches_market(r.ticker.market.as_tag()))
        .filter(|r| filter.matches_industry(&r.industry))
        .filter(|r| seen.insert(r.ticker.code.clone()))
        .cloned()
        .collect();
    out.sort_by(|a, b| a.ticker.code.cmp(&b.ticker.code));
    out
}
