//! Conversant persistence contract and an in-memory implementation.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;

use chatty_core::{Conversant, ConversantId};

/// Failures reported by a [`ConversantStore`]. The in-memory store never
/// fails; these exist for database-backed implementations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The backing store could not be reached or refused the write.
    #[error("conversant store unavailable: {0}")]
    Unavailable(String),
}

/// Create-or-update access to conversants, keyed by id.
#[async_trait]
pub trait ConversantStore: Send + Sync {
    /// Insert the conversant, or overwrite the stored display name if the id
    /// already exists. Returns the stored record.
    async fn update_or_create(&self, conversant: Conversant) -> Result<Conversant, StoreError>;
}

/// In-memory conversant store.
#[derive(Clone, Default)]
pub struct MemoryConversantStore {
    conversants: Arc<DashMap<ConversantId, Conversant>>,
}

impl MemoryConversantStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: ConversantId) -> Option<Conversant> {
        self.conversants.get(&id).map(|c| c.value().clone())
    }

    pub fn len(&self) -> usize {
        self.conversants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.conversants.is_empty()
    }
}

#[async_trait]
impl ConversantStore for MemoryConversantStore {
    async fn update_or_create(&self, conversant: Conversant) -> Result<Conversant, StoreError> {
        self.conversants.insert(conversant.id, conversant.clone());
        Ok(conversant)
    }
}
