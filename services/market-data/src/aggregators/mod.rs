// Merging of per-source quote batches into one answer per instrument
use crate::instruments::Instrument;
use crate::normalizers::validate_quote;
use crate::types::*;
use std::collections::HashMap;
use tracing::warn;

/// Fold a source's batch into `merged`, keeping the first valid quote per instrument.
///
/// Sources are consulted in priority order, so an instrument that already has
/// a quote is never overwritten by a later (lower priority) source.
pub fn merge_batch(merged: &mut HashMap<Instrument, Quote>, batch: Vec<Quote>) -> usize {
    let mut added = 0;
    for quote in batch {
        if merged.contains_key(&quote.instrument) {
            continue;
        }
        match validate_quote(&quote) {
            Ok(()) => {
                merged.insert(quote.instrument, quote);
                added += 1;
            }
            Err(e) => warn!("Dropping quote from {}: {}", quote.source, e),
        }
    }
    added
}

/// Instruments from `wanted` that `merged` still has no quote for, in request order
pub fn missing(wanted: &[Instrument], merged: &HashMap<Instrument, Quote>) -> Vec<Instrument> {
    wanted
        .iter()
        .filter(|i| !merged.contains_key(*i))
        .copied()
        .collect()
}

/// Arrange merged quotes in request order
pub fn in_request_order(wanted: &[Instrument], mut merged: HashMap<Instrument, Quote>) -> Vec<Quote> {
    wanted.iter().filter_map(|i| merged.remove(i)).collect()
}
