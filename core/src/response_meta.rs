//! Per-invocation response metadata side channel.
//!
//! Handlers run transport-agnostically, but an HTTP-exposed action sometimes
//! needs to shape its response (a `201 Created`, a `Location` header). The
//! handler receives a [`ResponseMetaHandle`] through its invocation metadata
//! and may set a status override and headers during execution; the router
//! snapshots the handle after a successful invocation. Values are plain
//! `u16`/strings so this crate carries no HTTP dependency.

use std::sync::{Arc, Mutex, PoisonError};

/// Response shaping collected during one invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResponseMeta {
    /// Status code override; the transport default (200) applies when unset.
    pub status: Option<u16>,
    /// Headers to add to the response, in insertion order.
    pub headers: Vec<(String, String)>,
}

/// Shared handle to one invocation's [`ResponseMeta`].
///
/// Cheap to clone; all clones observe the same metadata.
#[derive(Debug, Clone, Default)]
pub struct ResponseMetaHandle {
    inner: Arc<Mutex<ResponseMeta>>,
}

impl ResponseMetaHandle {
    /// Fresh, empty metadata.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the response status code.
    pub fn set_status(&self, status: u16) {
        self.lock().status = Some(status);
    }

    /// Add a response header.
    pub fn insert_header(&self, name: impl Into<String>, value: impl Into<String>) {
        self.lock().headers.push((name.into(), value.into()));
    }

    /// Copy out the metadata collected so far.
    #[must_use]
    pub fn snapshot(&self) -> ResponseMeta {
        self.lock().clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ResponseMeta> {
        // A poisoned lock only means a panic elsewhere mid-update; response
        // metadata has no invariant that a partial update could break.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_the_same_metadata() {
        let handle = ResponseMetaHandle::new();
        let other = handle.clone();

        other.set_status(201);
        other.insert_header("location", "/posts/42");

        let snap = handle.snapshot();
        assert_eq!(snap.status, Some(201));
        assert_eq!(snap.headers, vec![("location".into(), "/posts/42".into())]);
    }

    #[test]
    fn snapshot_of_untouched_handle_is_empty() {
        let snap = ResponseMetaHandle::new().snapshot();
        assert_eq!(snap, ResponseMeta::default());
    }
}
