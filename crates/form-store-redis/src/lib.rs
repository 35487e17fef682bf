mod config;
mod error;
mod store;
mod watcher;

pub use config::RedisStoreConfig;
pub use store::RedisFormStore;
