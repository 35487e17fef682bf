/// Configuration for the Redis store backend.
#[derive(Debug, Clone)]
pub struct RedisStoreConfig {
    /// Redis connection URL (e.g. `redis://localhost:6379/0`).
    pub url: String,
    /// Enable keyspace notifications on the server at connect time.
    /// Change feeds depend on them; turn this off when the server is
    /// configured externally or `CONFIG` is not permitted.
    pub configure_notifications: bool,
}

impl Default for RedisStoreConfig {
    fn default() -> Self {
        Self {
            url: "redis://127.0.0.1:6379".to_string(),
            configure_notifications: true,
        }
    }
}
