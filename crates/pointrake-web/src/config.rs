/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// SQLite database path backing the sheets.
    pub db_path: String,
    /// Listen port.
    pub port: u16,
}

pub const DEFAULT_PORT: u16 = 8391;

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            db_path: "pointrake.db".to_string(),
            port: DEFAULT_PORT,
        }
    }
}

impl ServerConfig {
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            db_path: std::env::var("POINTRAKE_DB").unwrap_or(defaults.db_path),
            port: std::env::var("POINTRAKE_PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.port),
        }
    }
}
