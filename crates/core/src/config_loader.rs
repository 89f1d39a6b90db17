use crate::config::AppConfig;
use anyhow::Result;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

/// Environment variable prefix; nested keys use `__`, e.g.
/// `TRADE_DESK_BUDGETS__EQUITY_USD=2500`.
pub const ENV_PREFIX: &str = "TRADE_DESK_";

pub struct ConfigLoader;

impl ConfigLoader {
    /// Loads application configuration by layering defaults, TOML, and environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration files cannot be read or parsed.
    pub fn load() -> Result<AppConfig> {
        let config: AppConfig = Self::base().extract()?;
        Ok(config)
    }

    /// Loads application configuration with a specific profile overlay.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration files cannot be read or parsed.
    pub fn load_with_profile(profile: &str) -> Result<AppConfig> {
        let config: AppConfig = Figment::from(Serialized::defaults(AppConfig::default()))
            .merge(Toml::file("config/Config.toml"))
            .merge(Toml::file(format!("config/Config.{profile}.toml")))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()?;

        Ok(config)
    }

    fn base() -> Figment {
        Figment::from(Serialized::defaults(AppConfig::default()))
            .merge(Toml::file("config/Config.toml"))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Weekday;
    use rust_decimal_macros::dec;

    #[test]
    fn toml_and_env_layers_override_defaults() {
        figment::Jail::expect_with(|jail| {
            jail.create_dir("config")?;
            jail.create_file(
                "config/Config.toml",
                r#"
                [budgets]
                equity_usd = "2500"

                [retry]
                weekday = "Tue"
                "#,
            )?;
            jail.set_env("TRADE_DESK_BUDGETS__SPREAD_USD", "750");

            let config = ConfigLoader::load().map_err(|e| e.to_string())?;
            assert_eq!(config.budgets.equity_usd, dec!(2500));
            assert_eq!(config.budgets.spread_usd, dec!(750));
            assert_eq!(config.retry.weekday, Weekday::Tue);
            assert_eq!(config.server.port, 8080);
            Ok(())
        });
    }

    #[test]
    fn profile_file_overrides_base_file() {
        figment::Jail::expect_with(|jail| {
            jail.create_dir("config")?;
            jail.create_file("config/Config.toml", "[server]\nport = 9000\n")?;
            jail.create_file("config/Config.live.toml", "[server]\nport = 9100\n")?;

            let config = ConfigLoader::load_with_profile("live").map_err(|e| e.to_string())?;
            assert_eq!(config.server.port, 9100);
            Ok(())
        });
    }
}
