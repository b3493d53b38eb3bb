// Redis cache implementation
use crate::instruments::Instrument;
use crate::types::*;
use redis::AsyncCommands;

/// Shared quote/COT cache so several service instances don't each burn provider quota
#[derive(Clone)]
pub struct RedisCache {
    client: redis::aio::MultiplexedConnection,
    quote_ttl_secs: u64,
}

fn quote_key(instrument: Instrument) -> String {
    format!("quote:{}", instrument.compact())
}

fn cot_key(currency: &str) -> String {
    format!("cot:{}", currency.to_uppercase())
}

fn cache_err(e: impl std::fmt::Display) -> MarketDataError {
    MarketDataError::CacheError(e.to_string())
}

impl RedisCache {
    pub async fn new(redis_url: &str, quote_ttl_secs: u64) -> anyhow::Result<Self> {
        let client = redis::Client::open(redis_url)?;
        let conn = client.get_multiplexed_async_connection().await?;

        Ok(Self {
            client: conn,
            quote_ttl_secs,
        })
    }

    /// Get cached quote
    pub async fn get_quote(&self, instrument: Instrument) -> Result<Option<Quote>> {
        let value: Option<String> = self
            .client
            .clone()
            .get(quote_key(instrument))
            .await
            .map_err(cache_err)?;

        value
            .map(|json| serde_json::from_str(&json).map_err(cache_err))
            .transpose()
    }

    /// Cache quote with TTL
    pub async fn set_quote(&self, quote: &Quote) -> Result<()> {
        let json = serde_json::to_string(quote).map_err(cache_err)?;

        // Explicit type annotation to avoid never type fallback
        let _: () = self
            .client
            .clone()
            .set_ex(quote_key(quote.instrument), json, self.quote_ttl_secs)
            .await
            .map_err(cache_err)?;

        Ok(())
    }

    /// COT reports are weekly; cache for a day
    pub async fn get_cot(&self, currency: &str) -> Result<Option<CotHistory>> {
        let value: Option<String> = self
            .client
            .clone()
            .get(cot_key(currency))
            .await
            .map_err(cache_err)?;

        value
            .map(|json| serde_json::from_str(&json).map_err(cache_err))
            .transpose()
    }

    pub async fn set_cot(&self, history: &CotHistory) -> Result<()> {
        let json = serde_json::to_string(history).map_err(cache_err)?;
        let _: () = self
            .client
            .clone()
            .set_ex(cot_key(&history.currency), json, 86_400)
            .await
            .map_err(cache_err)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keys() {
        let inst = Instrument::parse("EUR/JPY").unwrap();
        assert_eq!(quote_key(inst), "quote:EURJPY");
        assert_eq!(cot_key("eur"), "cot:EUR");
    }
}
