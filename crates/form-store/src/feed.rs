use async_trait::async_trait;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio_util::sync::CancellationToken;

use crate::error::StoreError;
use crate::store::Subscription;

/// Subscription backed by a cancellation token, for backends that run each
/// change feed as its own task.
///
/// The backend keeps the [`FeedGuard`] inside the feed task. Unsubscribing
/// cancels the token; dropping the guard marks the subscription inactive.
pub struct FeedSubscription {
    token: CancellationToken,
    active: Arc<AtomicBool>,
}

/// Feed-task side of a [`FeedSubscription`].
pub struct FeedGuard {
    token: CancellationToken,
    active: Arc<AtomicBool>,
}

impl FeedSubscription {
    #[must_use]
    pub fn new() -> (Self, FeedGuard) {
        let token = CancellationToken::new();
        let active = Arc::new(AtomicBool::new(true));
        (
            Self {
                token: token.clone(),
                active: active.clone(),
            },
            FeedGuard { token, active },
        )
    }
}

impl FeedGuard {
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

impl Drop for FeedGuard {
    fn drop(&mut self) {
        self.active.store(false, Ordering::Release);
    }
}

#[async_trait]
impl Subscription for FeedSubscription {
    async fn unsubscribe(&self) -> Result<(), StoreError> {
        self.token.cancel();
        self.active.store(false, Ordering::Release);
        Ok(())
    }

    fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire) && !self.token.is_cancelled()
    }
}
