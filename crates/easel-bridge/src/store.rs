//! Persistence seam

use crate::entity::{EntityRef, SavedRecord};
use crate::error::HostError;
use async_trait::async_trait;

/// Stores entity content on behalf of the core.
///
/// Implementations must tolerate being called twice with identical content;
/// the resilience layer leans on that when a retry races a completed save.
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Persist `content` under `entity` and return the stored revision.
    async fn save(&self, entity: &EntityRef, content: &str) -> Result<SavedRecord, HostError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::ArtifactKind;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Arc;

    struct CountingStore {
        revision: AtomicU64,
    }

    #[async_trait]
    impl ContentStore for CountingStore {
        async fn save(&self, entity: &EntityRef, _content: &str) -> Result<SavedRecord, HostError> {
            Ok(SavedRecord {
                id: entity.id,
                revision: self.revision.fetch_add(1, Ordering::SeqCst) + 1,
                saved_at: chrono::Utc::now(),
            })
        }
    }

    #[tokio::test]
    async fn saves_dispatch_through_the_trait_object() {
        let store: Arc<dyn ContentStore> = Arc::new(CountingStore {
            revision: AtomicU64::new(0),
        });
        let entity = EntityRef::new(ArtifactKind::Diagram, "flow");

        let first = store.save(&entity, "A").await.expect("save succeeds");
        let again = store.save(&entity, "A").await.expect("identical resave");
        assert_eq!(first.id, entity.id);
        assert_eq!((first.revision, again.revision), (1, 2));
    }
}
