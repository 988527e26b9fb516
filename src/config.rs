use std::env;

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub database_path: String,
    /// Public base URL of this service, used when registering webhook callbacks
    pub base_url: String,
    /// Shared secret for inbound webhook signatures. Deliveries are rejected
    /// with 500 while this is unset.
    pub webhook_shared_secret: Option<String>,
    /// Stripe secret key, required for reconciliation
    pub stripe_secret_key: Option<String>,
    /// Upstream platform credentials, required only for webhook administration
    pub upstream_domain: Option<String>,
    pub upstream_access_token: Option<String>,
    pub upstream_api_version: String,
    /// Interval for the scheduled reconciliation task (0 = disabled)
    pub reconcile_interval_secs: u64,
    /// Retention window for the webhook dedup ledger
    pub dedup_ttl_secs: i64,
    pub dev_mode: bool,
}

impl Config {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let dev_mode = env::var("STORESYNC_ENV")
            .map(|v| v == "dev" || v == "development")
            .unwrap_or(false);

        let host = env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port: u16 = env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(3000);

        let base_url =
            env::var("BASE_URL").unwrap_or_else(|_| format!("http://{}:{}", host, port));

        Self {
            host,
            port,
            database_path: env::var("DATABASE_PATH")
                .unwrap_or_else(|_| "storesync.db".to_string()),
            base_url,
            webhook_shared_secret: env::var("WEBHOOK_SHARED_SECRET").ok(),
            stripe_secret_key: env::var("STRIPE_SECRET_KEY").ok(),
            upstream_domain: env::var("UPSTREAM_DOMAIN").ok(),
            upstream_access_token: env::var("UPSTREAM_ACCESS_TOKEN").ok(),
            upstream_api_version: env::var("UPSTREAM_API_VERSION")
                .unwrap_or_else(|_| "2026-01".to_string()),
            reconcile_interval_secs: env::var("RECONCILE_INTERVAL_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(0),
            dedup_ttl_secs: env::var("DEDUP_TTL_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(crate::dedup::DEFAULT_TTL_SECS),
            dev_mode,
        }
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
