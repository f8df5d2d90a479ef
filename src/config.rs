use tracing::warn;

/// Engine-wide pricing and policy knobs.
///
/// One VAT rate for every code path — the rate is configuration, never a
/// per-call literal.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// VAT applied to non-tourist bookings, as a whole percentage.
    pub vat_rate_percent: i64,
    /// Cancelling this many calendar days (or more) before check-in is free;
    /// anything later forfeits the full total.
    pub free_cancellation_days: i64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            vat_rate_percent: 18,
            free_cancellation_days: 3,
        }
    }
}

impl EngineConfig {
    /// Build a config from `INNKEEP_*` environment variables, falling back
    /// to defaults for anything unset or unparsable.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            vat_rate_percent: env_i64("INNKEEP_VAT_RATE_PERCENT", defaults.vat_rate_percent),
            free_cancellation_days: env_i64(
                "INNKEEP_FREE_CANCELLATION_DAYS",
                defaults.free_cancellation_days,
            ),
        }
    }
}

fn env_i64(key: &str, default: i64) -> i64 {
    match std::env::var(key) {
        Ok(s) => s.parse().unwrap_or_else(|_| {
            warn!("ignoring unparsable {key}={s}");
            default
        }),
        Err(_) => default,
    }
}
