use std::env;

use anyhow::Context;

use crate::settings::SiteSettings;

const DEFAULT_TAX_PERCENT: i32 = 12;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub settings: SiteSettings,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = env::var("DATABASE_URL")?;
        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .ok()
            .and_then(|p| p.parse::<u16>().ok())
            .unwrap_or(3000);
        let tax = match env::var("STORE_TAX_PERCENT") {
            Ok(raw) => raw
                .trim()
                .parse::<i32>()
                .with_context(|| format!("STORE_TAX_PERCENT is not an integer: {raw:?}"))?,
            Err(_) => DEFAULT_TAX_PERCENT,
        };
        let settings = SiteSettings::new(tax).context("invalid STORE_TAX_PERCENT")?;
        Ok(Self {
            port,
            database_url,
            host,
            settings,
        })
    }
}
