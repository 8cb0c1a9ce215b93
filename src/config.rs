use std::env;

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub database_path: String,
    /// Shared secret gating the admin endpoints. Required to serve.
    pub admin_secret: Option<String>,
    /// Upper bound on licenses created per generate call
    pub generate_cap: i64,
    pub dev_mode: bool,
}

impl Config {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let dev_mode = env::var("XOBIKEY_ENV")
            .map(|v| v == "dev" || v == "development")
            .unwrap_or(false);

        let host = env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port: u16 = env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(3000);

        let generate_cap: i64 = env::var("GENERATE_CAP")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(100);

        Self {
            host,
            port,
            database_path: env::var("DATABASE_PATH").unwrap_or_else(|_| "xobikey.db".to_string()),
            admin_secret: env::var("ADMIN_SECRET").ok(),
            generate_cap,
            dev_mode,
        }
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
