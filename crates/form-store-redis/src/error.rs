use formtrack_store::StoreError;
use redis::{ErrorKind, RedisError};

fn is_transport_failure(e: &RedisError) -> bool {
    e.is_io_error()
        || e.is_connection_dropped()
        || e.is_connection_refusal()
        || e.is_timeout()
        || e.kind() == ErrorKind::AuthenticationFailed
}

/// Transport and auth failures become `Connection`; command failures `Other`.
pub(crate) fn map_redis_err(e: RedisError) -> StoreError {
    if is_transport_failure(&e) {
        StoreError::Connection(e.to_string())
    } else {
        StoreError::Other(e.to_string())
    }
}

/// Like [`map_redis_err`], but command failures while opening a change feed
/// become `Subscribe`.
pub(crate) fn map_subscribe_err(e: RedisError) -> StoreError {
    if is_transport_failure(&e) {
        StoreError::Connection(e.to_string())
    } else {
        StoreError::Subscribe(e.to_string())
    }
}
