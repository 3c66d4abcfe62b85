use std::env;

#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub base_url: String,
    pub api_key: String,
    pub webhook_secret: Option<String>,
}

impl ProviderConfig {
    fn from_env(prefix: &str, default_base_url: &str) -> Self {
        ProviderConfig {
            base_url: env::var(format!("{}_BASE_URL", prefix))
                .unwrap_or_else(|_| default_base_url.to_string()),
            api_key: env::var(format!("{}_API_KEY", prefix)).unwrap_or_default(),
            webhook_secret: env::var(format!("{}_WEBHOOK_SECRET", prefix))
                .ok()
                .filter(|s| !s.is_empty()),
        }
    }

    pub fn is_configured(&self) -> bool {
        !self.api_key.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub port: u16,
    pub currency: String,
    pub currency_decimals: i64,
    pub default_fee_percent: i64,
    pub avg_speed_kmh: f64,
    pub timezone_offset_hours: i32,
    pub payment_provider_timeout_secs: u64,
    pub notification_retry_delay_ms: u64,
    pub public_base_url: String,
    pub orange_money: ProviderConfig,
    pub mtn_momo: ProviderConfig,
    pub card: ProviderConfig,
    pub cors_origins: Vec<String>,
    pub run_migrations: bool,
}

fn parse_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!("⚠️ {} has an invalid value '{}', using the default", key, raw);
            default
        }),
        Err(_) => default,
    }
}

impl Config {
    pub fn init() -> Config {
        let database_url = env::var("DATABASE_URL").expect("DATABASE_URL must be set");
        let jwt_secret = env::var("JWT_SECRET_KEY").expect("JWT_SECRET_KEY must be set");

        let cors_origins = env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:3000".to_string())
            .split(',')
            .map(|origin| origin.trim().to_string())
            .filter(|origin| !origin.is_empty())
            .collect();

        Config {
            database_url,
            jwt_secret,
            port: parse_or("PORT", 8000),
            currency: env::var("CURRENCY").unwrap_or_else(|_| "XOF".to_string()),
            currency_decimals: parse_or("CURRENCY_DECIMALS", 0),
            default_fee_percent: parse_or("DEFAULT_FEE_PERCENT", 11),
            avg_speed_kmh: parse_or("AVG_SPEED_KMH", 25.0),
            timezone_offset_hours: parse_or("TIMEZONE_OFFSET_HOURS", 0),
            payment_provider_timeout_secs: parse_or("PAYMENT_PROVIDER_TIMEOUT_SECS", 15),
            notification_retry_delay_ms: parse_or("NOTIFICATION_RETRY_DELAY_MS", 10_000),
            public_base_url: env::var("PUBLIC_BASE_URL")
                .unwrap_or_else(|_| "http://localhost:8000".to_string()),
            orange_money: ProviderConfig::from_env("ORANGE_MONEY", "https://api.orange.com/orange-money-webpay/dev/v1"),
            mtn_momo: ProviderConfig::from_env("MTN_MOMO", "https://sandbox.momodeveloper.mtn.com"),
            card: ProviderConfig::from_env("CARD", "https://api.stripe.com"),
            cors_origins,
            run_migrations: parse_or("RUN_MIGRATIONS", false),
        }
    }

    pub fn webhook_secret(&self, provider: &str) -> Option<&str> {
        let provider = match provider {
            "om" => &self.orange_money,
            "mtn" => &self.mtn_momo,
            "card" => &self.card,
            _ => return None,
        };
        provider.webhook_secret.as_deref()
    }
}

#[cfg(test)]
impl Config {
    pub fn for_tests() -> Config {
        let provider = |base_url: &str| ProviderConfig {
            base_url: base_url.to_string(),
            api_key: String::new(),
            webhook_secret: None,
        };

        Config {
            database_url: "postgres://localhost/tratra_test".to_string(),
            jwt_secret: "test-secret".to_string(),
            port: 8000,
            currency: "XOF".to_string(),
            currency_decimals: 0,
            default_fee_percent: 11,
            avg_speed_kmh: 25.0,
            timezone_offset_hours: 0,
            payment_provider_timeout_secs: 1,
            notification_retry_delay_ms: 1,
            public_base_url: "http://localhost:8000".to_string(),
            orange_money: provider("http://localhost:9001"),
            mtn_momo: provider("http://localhost:9002"),
            card: provider("http://localhost:9003"),
            cors_origins: vec![],
            run_migrations: false,
        }
    }
}
