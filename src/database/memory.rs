use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;
use tracing::debug;

use super::adapter::{Adapter, AdapterError, Filter, UserAdapter};
use crate::model::{Entity, Identifier, User};

/// In-memory adapter for any entity.
///
/// New entities get increasing integer ids. Lists come back ordered by id, so
/// entities created through the store keep their insertion order.
pub struct MemoryStore<E: Entity> {
    entries: DashMap<Identifier, E>,
    next_id: AtomicI64,
}

impl<E: Entity> MemoryStore<E> {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
            next_id: AtomicI64::new(1),
        }
    }

    /// Store an entity as is, replacing any entity with the same id
    pub fn insert(&self, entity: E) -> Option<E> {
        if let Some(id) = entity.id().as_int() {
            self.next_id.fetch_max(id.saturating_add(1), Ordering::SeqCst);
        }
        self.entries.insert(entity.id().clone(), entity)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn sorted(&self) -> Vec<E> {
        let mut entities: Vec<E> = self.entries.iter().map(|e| e.value().clone()).collect();
        entities.sort_by(|a, b| a.id().cmp(b.id()));
        entities
    }

    fn generate_id(&self) -> Identifier {
        loop {
            let id = Identifier::Int(self.next_id.fetch_add(1, Ordering::SeqCst));
            if !self.entries.contains_key(&id) {
                return id;
            }
        }
    }
}

impl<E: Entity> Default for MemoryStore<E> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<E: Entity> Adapter<E> for MemoryStore<E> {
    async fn create(&self, draft: E::Draft) -> Result<E, AdapterError> {
        let entity = E::from_draft(self.generate_id(), draft)?;
        debug!("Stored {} {}", E::KIND, entity.id());
        self.entries.insert(entity.id().clone(), entity.clone());
        Ok(entity)
    }

    async fn get_all(&self) -> Result<Vec<E>, AdapterError> {
        Ok(self.sorted())
    }

    async fn get(&self, id: &Identifier) -> Result<Option<E>, AdapterError> {
        Ok(self.entries.get(id).map(|e| e.value().clone()))
    }

    async fn get_by_attr(&self, name: &str, value: &Identifier) -> Result<Option<E>, AdapterError> {
        Ok(self
            .sorted()
            .into_iter()
            .find(|e| e.attr(name).as_ref() == Some(value)))
    }

    /// Deleting a missing id is not an error
    async fn delete(&self, id: &Identifier) -> Result<(), AdapterError> {
        if self.entries.remove(id).is_some() {
            debug!("Removed {} {}", E::KIND, id);
        }
        Ok(())
    }

    async fn save(&self, entity: E) -> Result<E, AdapterError> {
        self.insert(entity.clone());
        Ok(entity)
    }

    async fn filter(&self, filter: &Filter) -> Result<Vec<E>, AdapterError> {
        let mut entities = self.sorted();
        entities.retain(|e| filter.matches(e));
        Ok(entities)
    }
}

#[async_trait]
impl UserAdapter for MemoryStore<User> {
    async fn get_all(&self) -> Result<Vec<User>, AdapterError> {
        Ok(self.sorted())
    }

    async fn get(&self, id: &Identifier) -> Result<Option<User>, AdapterError> {
        Ok(self.entries.get(id).map(|e| e.value().clone()))
    }
}
