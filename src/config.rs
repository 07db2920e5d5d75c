use anyhow::Result;
use std::env;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub environment: String,
    /// Daily overtime hours above this value are reported as anomalies
    /// during overtime review. They still count toward pay.
    pub overtime_daily_cap_hours: u32,
    /// Upper bound on concurrent per-employee fetches during attendance
    /// import.
    pub import_concurrency: usize,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        // Load .env file if it exists
        dotenvy::dotenv().ok();

        Self::from_env_only()
    }

    /// Load configuration from environment variables only (without loading .env files)
    /// This is useful for testing where you want to control the environment directly
    pub fn from_env_only() -> Result<Self> {
        Ok(Config {
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite:payrun.db".to_string()),
            environment: env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),
            overtime_daily_cap_hours: env::var("OVERTIME_DAILY_CAP_HOURS")
                .unwrap_or_else(|_| "4".to_string())
                .parse()
                .unwrap_or(4),
            import_concurrency: env::var("IMPORT_CONCURRENCY")
                .unwrap_or_else(|_| "8".to_string())
                .parse()
                .unwrap_or(8),
        })
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            database_url: "sqlite:payrun.db".to_string(),
            environment: "development".to_string(),
            overtime_daily_cap_hours: 4,
            import_concurrency: 8,
        }
    }
}
