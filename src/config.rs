use serde::Deserialize;

use crate::Result;

/// Runtime settings, layered from defaults and `FUTURESBOT_*`
/// environment variables (dotenv is loaded by the binaries).
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// Postgres connection URL for the bar store; paper sessions fall
    /// back to an in-memory store when unset
    #[serde(default)]
    pub database_url: Option<String>,
    /// Symbols to subscribe at startup
    pub symbols: Vec<String>,
    /// Bounded capacity of each per-symbol feed channel
    pub channel_capacity: usize,
    /// Rolling bars kept in the engine cache per symbol
    pub bar_cache_size: usize,
    /// Daily price band used when replay synthesizes tick limits
    pub limit_ratio: f64,
    /// Reporting bars loaded per strategy at initialization
    pub init_bar_count: usize,
    /// Finest bars per reporting bar
    pub period_multiple: usize,
}

impl Settings {
    pub fn load() -> Result<Self> {
        let settings = config::Config::builder()
            .set_default("symbols", vec!["rb2410"])?
            .set_default("channel_capacity", 256_i64)?
            .set_default("bar_cache_size", 2000_i64)?
            .set_default("limit_ratio", 0.1_f64)?
            .set_default("init_bar_count", 100_i64)?
            .set_default("period_multiple", 15_i64)?
            .add_source(
                config::Environment::with_prefix("FUTURESBOT")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("symbols"),
            )
            .build()?;

        Ok(settings.try_deserialize()?)
    }
}
