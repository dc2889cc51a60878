//! Display-only preview handles
//!
//! The registry hands out `preview://<uuid>` references that a renderer can
//! resolve to image bytes. A [`PreviewHandle`] revokes its reference when
//! dropped, so a handle can never outlive the payload it was derived from and
//! replaced previews never accumulate.

use camera_capture::ImagePayload;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::trace;
use uuid::Uuid;

const SCHEME: &str = "preview://";

/// Image resolved from a preview reference
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreviewImage {
    pub media_type: String,
    pub bytes: Arc<[u8]>,
}

/// Registry of live preview references, shared with the renderer
#[derive(Debug, Clone, Default)]
pub struct PreviewRegistry {
    entries: Arc<Mutex<HashMap<Uuid, PreviewImage>>>,
}

impl PreviewRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a reference for `payload`
    pub fn register(&self, payload: &ImagePayload) -> PreviewHandle {
        let id = Uuid::new_v4();
        self.lock().insert(
            id,
            PreviewImage {
                media_type: payload.media_type().to_string(),
                bytes: payload.shared_bytes(),
            },
        );
        trace!("Preview {} registered ({} bytes)", id, payload.len());

        PreviewHandle {
            id,
            url: format!("{SCHEME}{id}"),
            registry: self.clone(),
        }
    }

    /// Resolve a reference; `None` once its handle has been dropped
    pub fn resolve(&self, url: &str) -> Option<PreviewImage> {
        let id = url.strip_prefix(SCHEME)?.parse::<Uuid>().ok()?;
        self.lock().get(&id).cloned()
    }

    /// Number of references currently alive
    pub fn live_handles(&self) -> usize {
        self.lock().len()
    }

    fn revoke(&self, id: &Uuid) {
        if self.lock().remove(id).is_some() {
            trace!("Preview {} revoked", id);
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<Uuid, PreviewImage>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Scoped preview reference. Not `Clone`: exactly one owner revokes it.
#[derive(Debug)]
pub struct PreviewHandle {
    id: Uuid,
    url: String,
    registry: PreviewRegistry,
}

impl PreviewHandle {
    /// Reference to hand to the renderer
    pub fn url(&self) -> &str {
        &self.url
    }
}

impl Drop for PreviewHandle {
    fn drop(&mut self) {
        self.registry.revoke(&self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(bytes: &[u8]) -> ImagePayload {
        ImagePayload::from_file_bytes(None, "image/jpeg", bytes.to_vec()).unwrap()
    }

    #[test]
    fn test_handle_resolves_until_dropped() {
        let registry = PreviewRegistry::new();
        let handle = registry.register(&payload(b"jpeg"));
        let url = handle.url().to_string();

        let image = registry.resolve(&url).unwrap();
        assert_eq!(image.media_type, "image/jpeg");
        assert_eq!(&*image.bytes, b"jpeg");
        assert_eq!(registry.live_handles(), 1);

        drop(handle);
        assert!(registry.resolve(&url).is_none());
        assert_eq!(registry.live_handles(), 0);
    }

    #[test]
    fn test_handles_are_unique() {
        let registry = PreviewRegistry::new();
        let a = registry.register(&payload(b"a"));
        let b = registry.register(&payload(b"a"));
        assert_ne!(a.url(), b.url());
        assert_eq!(registry.live_handles(), 2);
    }

    #[test]
    fn test_resolve_rejects_foreign_urls() {
        let registry = PreviewRegistry::new();
        let _handle = registry.register(&payload(b"x"));
        assert!(registry.resolve("blob:https://example.com/1").is_none());
        assert!(registry.resolve("preview://not-a-uuid").is_none());
    }
}
