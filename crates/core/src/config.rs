use chrono::{NaiveTime, Weekday};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub broker: BrokerConfig,
    pub budgets: BudgetConfig,
    pub execution: ExecutionConfig,
    pub retry: RetryConfig,
    pub trigger: TriggerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

impl ServerConfig {
    /// Socket address string for binding the HTTP listener.
    #[must_use]
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "postgresql://localhost/trade_desk".to_string(),
            max_connections: 10,
        }
    }
}

/// Brokerage endpoints and client tuning. Credentials come from the
/// environment, never from config files.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrokerConfig {
    pub trading_url: String,
    pub data_url: String,
    pub requests_per_minute: u32,
    pub timeout_secs: u64,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            trading_url: "https://paper-api.alpaca.markets".to_string(),
            data_url: "https://data.alpaca.markets".to_string(),
            requests_per_minute: 180,
            timeout_secs: 30,
        }
    }
}

/// Fixed per-run dollar budgets, one per asset class.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BudgetConfig {
    pub equity_usd: Decimal,
    pub spread_usd: Decimal,
}

impl Default for BudgetConfig {
    fn default() -> Self {
        Self {
            equity_usd: Decimal::from(1000),
            spread_usd: Decimal::from(1000),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionConfig {
    /// Delay between order status reads while waiting on an equity order.
    pub equity_poll_interval_ms: u64,
    /// Hard limit on an equity order wait. Exceeding it aborts the run.
    pub equity_timeout_secs: u64,
    pub spread_poll_interval_ms: u64,
    /// Wait window for a freshly submitted spread in the primary run.
    pub spread_wait_secs: u64,
    /// Strike band around spot, in percent.
    pub strike_band_pct: Decimal,
    /// Decimal places kept when flooring a sell quantity.
    pub sell_qty_decimals: u32,
    /// Skip purchase runs while the market is closed.
    pub require_market_open: bool,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            equity_poll_interval_ms: 2_000,
            equity_timeout_secs: 120,
            spread_poll_interval_ms: 2_000,
            spread_wait_secs: 60,
            strike_band_pct: Decimal::from(15),
            sell_qty_decimals: 4,
            require_market_open: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Day of week on which the retry batch is allowed to run.
    pub weekday: Weekday,
    /// Earliest UTC time of day for the retry batch.
    pub not_before_utc: NaiveTime,
    /// Maximum number of pending rows fetched per invocation.
    pub max_rows: u32,
    /// Overall wall-clock budget for one invocation.
    pub time_budget_secs: u64,
    /// Wait window for each re-submitted spread.
    pub wait_secs: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            weekday: Weekday::Mon,
            not_before_utc: NaiveTime::from_hms_opt(14, 30, 0).unwrap_or(NaiveTime::MIN),
            max_rows: 25,
            time_budget_secs: 240,
            wait_secs: 20,
        }
    }
}

/// Shared-secret gate for the HTTP trigger surface.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TriggerConfig {
    pub secret: String,
    pub header: String,
}

impl Default for TriggerConfig {
    fn default() -> Self {
        Self {
            secret: String::new(),
            header: "x-trigger-secret".to_string(),
        }
    }
}

impl std::fmt::Debug for TriggerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TriggerConfig")
            .field("secret", &"<redacted>")
            .field("header", &self.header)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = AppConfig::default();

        assert_eq!(config.server.addr(), "0.0.0.0:8080");
        assert_eq!(config.budgets.equity_usd, Decimal::from(1000));
        assert_eq!(config.execution.equity_timeout_secs, 120);
        assert_eq!(config.execution.strike_band_pct, Decimal::from(15));
        assert_eq!(config.retry.weekday, Weekday::Mon);
        assert_eq!(config.retry.max_rows, 25);
        assert_eq!(config.trigger.header, "x-trigger-secret");
    }

    #[test]
    fn trigger_secret_is_redacted_in_debug_output() {
        let trigger = TriggerConfig {
            secret: "hunter2".to_string(),
            ..TriggerConfig::default()
        };

        let rendered = format!("{trigger:?}");
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("redacted"));
    }
}
