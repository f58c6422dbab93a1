//! In-memory realizations of every repository trait, for use-case tests.
//! Mutations apply immediately; `commit()` is a no-op since there is no
//! real transaction to finalize.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use domain::{Order, ProcessingState};

use crate::dlq::{DlqEntry, DlqRepository};
use crate::error::RepositoryError;
use crate::inbox::InboxRepository;
use crate::orders::OrdersRepository;
use crate::outbox::{OutboxEntry, OutboxRepository};
use crate::states::ProcessingStatesRepository;
use crate::uow::{UnitOfWork, UnitOfWorkFactory};

#[derive(Clone, Default)]
pub struct InMemoryStore {
    orders: Arc<Mutex<HashMap<String, Order>>>,
    states: Arc<Mutex<HashMap<String, ProcessingState>>>,
    outbox: Arc<Mutex<Vec<OutboxEntry>>>,
    next_outbox_id: Arc<Mutex<i32>>,
    inbox: Arc<Mutex<HashSet<String>>>,
    dlq: Arc<Mutex<Vec<DlqEntry>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn outbox_snapshot(&self) -> Vec<OutboxEntry> {
        self.outbox.lock().unwrap().clone()
    }

    pub fn dlq_snapshot(&self) -> Vec<DlqEntry> {
        self.dlq.lock().unwrap().clone()
    }
}

#[async_trait]
impl OrdersRepository for InMemoryStore {
    async fn get(&self, order_id: &str) -> Result<Option<Order>, RepositoryError> {
        Ok(self.orders.lock().unwrap().get(order_id).cloned())
    }

    async fn put(&self, order: &Order) -> Result<(), RepositoryError> {
        self.orders
            .lock()
            .unwrap()
            .insert(order.order_id.clone(), order.clone());
        Ok(())
    }
}

#[async_trait]
impl ProcessingStatesRepository for InMemoryStore {
    async fn get(&self, order_id: &str) -> Result<Option<ProcessingState>, RepositoryError> {
        Ok(self.states.lock().unwrap().get(order_id).cloned())
    }

    async fn upsert(&self, state: &ProcessingState) -> Result<(), RepositoryError> {
        self.states
            .lock()
            .unwrap()
            .insert(state.order_id.clone(), state.clone());
        Ok(())
    }
}

#[async_trait]
impl OutboxRepository for InMemoryStore {
    async fn put(&self, event_type: &str, payload: serde_json::Value) -> Result<(), RepositoryError> {
        let mut id_guard = self.next_outbox_id.lock().unwrap();
        *id_guard += 1;
        let id = *id_guard;
        drop(id_guard);

        self.outbox.lock().unwrap().push(OutboxEntry {
            id,
            event_type: event_type.to_string(),
            payload,
            published_at: None,
            retry_count: 0,
            last_retry_at: None,
        });
        Ok(())
    }

    async fn claim_pending(&self) -> Result<Vec<OutboxEntry>, RepositoryError> {
        let mut pending: Vec<OutboxEntry> = self
            .outbox
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.published_at.is_none())
            .cloned()
            .collect();
        pending.sort_by_key(|e| e.id);
        Ok(pending)
    }

    async fn mark_published(&self, id: i32, published_at: &str) -> Result<(), RepositoryError> {
        let mut outbox = self.outbox.lock().unwrap();
        if let Some(entry) = outbox.iter_mut().find(|e| e.id == id) {
            entry.published_at = Some(published_at.to_string());
        }
        Ok(())
    }

    async fn record_failure(&self, id: i32, last_retry_at: &str) -> Result<(), RepositoryError> {
        let mut outbox = self.outbox.lock().unwrap();
        if let Some(entry) = outbox.iter_mut().find(|e| e.id == id) {
            entry.retry_count += 1;
            entry.last_retry_at = Some(last_retry_at.to_string());
        }
        Ok(())
    }

    async fn move_to_dlq(
        &self,
        entry: &OutboxEntry,
        failure_reason: &str,
        moved_to_dlq_at: &str,
    ) -> Result<(), RepositoryError> {
        self.dlq.lock().unwrap().push(DlqEntry {
            id: entry.id,
            original_event_type: entry.event_type.clone(),
            payload: entry.payload.clone(),
            retry_count: entry.retry_count,
            last_retry_at: entry.last_retry_at.clone(),
            failure_reason: failure_reason.to_string(),
            moved_to_dlq_at: moved_to_dlq_at.to_string(),
        });
        self.outbox.lock().unwrap().retain(|e| e.id != entry.id);
        Ok(())
    }
}

#[async_trait]
impl InboxRepository for InMemoryStore {
    async fn exists(&self, event_key: &str) -> Result<bool, RepositoryError> {
        Ok(self.inbox.lock().unwrap().contains(event_key))
    }

    async fn add(&self, event_key: &str) -> Result<(), RepositoryError> {
        self.inbox.lock().unwrap().insert(event_key.to_string());
        Ok(())
    }
}

#[async_trait]
impl DlqRepository for InMemoryStore {
    async fn list(&self) -> Result<Vec<DlqEntry>, RepositoryError> {
        Ok(self.dlq.lock().unwrap().clone())
    }
}

pub struct InMemoryUnitOfWork {
    store: InMemoryStore,
}

#[async_trait]
impl UnitOfWork for InMemoryUnitOfWork {
    fn orders(&self) -> Box<dyn OrdersRepository + '_> {
        Box::new(self.store.clone())
    }

    fn states(&self) -> Box<dyn ProcessingStatesRepository + '_> {
        Box::new(self.store.clone())
    }

    fn outbox(&self) -> Box<dyn OutboxRepository + '_> {
        Box::new(self.store.clone())
    }

    fn inbox(&self) -> Box<dyn InboxRepository + '_> {
        Box::new(self.store.clone())
    }

    fn dlq(&self) -> Box<dyn DlqRepository + '_> {
        Box::new(self.store.clone())
    }

    async fn commit(self: Box<Self>) -> Result<(), RepositoryError> {
        Ok(())
    }
}

#[derive(Clone, Default)]
pub struct InMemoryUnitOfWorkFactory {
    pub store: InMemoryStore,
}

impl InMemoryUnitOfWorkFactory {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UnitOfWorkFactory for InMemoryUnitOfWorkFactory {
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>, RepositoryError> {
        Ok(Box::new(InMemoryUnitOfWork {
            store: self.store.clone(),
        }))
    }
}
