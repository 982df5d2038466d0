use std::env;

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub database_path: String,
    pub base_url: String,
    pub dev_mode: bool,
    /// Base64-encoded 32-byte master key for credential envelope encryption.
    /// Generated ephemerally in dev mode when unset.
    pub master_key: Option<String>,
    /// Per-IP requests per minute on the checkout surface (outbound provider calls)
    pub checkout_rate_limit_rpm: u32,
}

impl Config {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let dev_mode = env::var("COMPTOIR_ENV")
            .map(|v| v == "dev" || v == "development")
            .unwrap_or(false);

        let host = env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port: u16 = env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(3000);

        let base_url =
            env::var("BASE_URL").unwrap_or_else(|_| format!("http://{}:{}", host, port));

        let checkout_rate_limit_rpm: u32 = env::var("RATE_LIMIT_CHECKOUT_RPM")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(10);

        Self {
            host,
            port,
            database_path: env::var("DATABASE_PATH")
                .unwrap_or_else(|_| "comptoir.db".to_string()),
            base_url,
            dev_mode,
            master_key: env::var("MASTER_KEY").ok(),
            checkout_rate_limit_rpm,
        }
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
