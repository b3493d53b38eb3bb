// Sanity checks applied to every quote before it is served or cached
use crate::types::*;
use rust_decimal::Decimal;

/// Reject quotes that cannot be real (non-positive price, absurd moves)
pub fn validate_quote(quote: &Quote) -> Result<()> {
    if quote.price <= Decimal::ZERO {
        return Err(MarketDataError::InvalidResponse(format!(
            "{} price must be positive, got {}",
            quote.instrument, quote.price
        )));
    }

    // Forex pairs do not move 20% between polls; treat it as a bad print
    if !quote.change_percent.is_finite() || quote.change_percent.abs() > 20.0 {
        return Err(MarketDataError::InvalidResponse(format!(
            "{} change of {:.2}% rejected as outlier",
            quote.instrument, quote.change_percent
        )));
    }

    Ok(())
}
