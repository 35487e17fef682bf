mod error;
mod feed;
mod record;
mod store;

pub use error::StoreError;
pub use feed::{FeedGuard, FeedSubscription};
pub use record::{Record, Snapshot};
pub use store::{ChangeHandler, FormStore, Subscription};
