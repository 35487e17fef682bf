mod state;
mod store;
mod watcher;

pub use store::{ChangeDelivery, MemoryStore, MemoryStoreConfig};
