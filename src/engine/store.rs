use async_trait::async_trait;
use dashmap::DashMap;

use crate::model::*;

use super::EngineError;

/// Where committed reservations live.
///
/// `append` is the only mutation. Implementations must totally order appends,
/// never lose one, and never expose a record before it is fully committed.
#[async_trait]
pub trait ReservationStore: Send + Sync {
    /// Every committed reservation of a category.
    async fn all_of(&self, category: &str) -> Result<Vec<Reservation>, EngineError>;

    /// Every committed reservation.
    async fn all(&self) -> Result<Vec<Reservation>, EngineError>;

    /// Durably commit one reservation. On error nothing becomes visible.
    async fn append(&self, reservation: Reservation) -> Result<(), EngineError>;
}

/// Committed reservations grouped by category.
#[derive(Default)]
pub struct ReservationIndex {
    by_category: DashMap<String, Vec<Reservation>>,
}

impl ReservationIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, reservation: Reservation) {
        self.by_category
            .entry(reservation.category.clone())
            .or_default()
            .push(reservation);
    }

    pub fn apply(&self, event: &Event) {
        match event {
            Event::ReservationCommitted(r) => self.insert(r.clone()),
        }
    }

    pub fn category(&self, category: &str) -> Vec<Reservation> {
        self.by_category
            .get(category)
            .map(|e| e.value().clone())
            .unwrap_or_default()
    }

    pub fn all(&self) -> Vec<Reservation> {
        self.by_category
            .iter()
            .flat_map(|e| e.value().clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.by_category.iter().map(|e| e.value().len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Process-local store. Nothing survives a restart.
#[derive(Default)]
pub struct MemoryStore {
    index: ReservationIndex,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }
}

#[async_trait]
impl ReservationStore for MemoryStore {
    async fn all_of(&self, category: &str) -> Result<Vec<Reservation>, EngineError> {
        Ok(self.index.category(category))
    }

    async fn all(&self) -> Result<Vec<Reservation>, EngineError> {
        Ok(self.index.all())
    }

    async fn append(&self, reservation: Reservation) -> Result<(), EngineError> {
        self.index.insert(reservation);
        Ok(())
    }
}
