use persistence::memory::InMemoryStore;
use persistence::{
    DlqRepository, InMemoryUnitOfWorkFactory, InboxRepository, OutboxRepository, UnitOfWorkFactory,
};
use serde_json::json;

#[tokio::test]
async fn inbox_add_is_idempotent() {
    let store = InMemoryStore::new();
    store.add("order.created:ord-1:1").await.unwrap();
    store.add("order.created:ord-1:1").await.unwrap();
    assert!(store.exists("order.created:ord-1:1").await.unwrap());
}

#[tokio::test]
async fn claim_pending_only_returns_unpublished_rows_in_id_order() {
    let store = InMemoryStore::new();
    store.put("order.created", json!({"a": 1})).await.unwrap();
    store.put("order.created", json!({"a": 2})).await.unwrap();

    let pending = store.claim_pending().await.unwrap();
    assert_eq!(pending.len(), 2);
    assert!(pending[0].id < pending[1].id);

    store.mark_published(pending[0].id, "2026-01-01T00:00:00Z").await.unwrap();
    let pending = store.claim_pending().await.unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].id, pending.last().unwrap().id);
}

#[tokio::test]
async fn move_to_dlq_deletes_outbox_row_and_appends_dlq_entry() {
    let store = InMemoryStore::new();
    store.put("order.created", json!({"a": 1})).await.unwrap();
    let pending = store.claim_pending().await.unwrap();
    let entry = pending.into_iter().next().unwrap();

    store
        .move_to_dlq(&entry, "Max retries (5) exceeded", "2026-01-01T00:00:00Z")
        .await
        .unwrap();

    assert!(store.claim_pending().await.unwrap().is_empty());
    let dlq = store.dlq_snapshot();
    assert_eq!(dlq.len(), 1);
    assert_eq!(dlq[0].failure_reason, "Max retries (5) exceeded");
}

#[tokio::test]
async fn dlq_repository_lists_entries_through_the_unit_of_work() {
    let factory = InMemoryUnitOfWorkFactory::new();

    let uow = factory.begin().await.unwrap();
    uow.outbox().put("order.created", json!({"a": 1})).await.unwrap();
    uow.commit().await.unwrap();

    let uow = factory.begin().await.unwrap();
    let entry = uow.outbox().claim_pending().await.unwrap().into_iter().next().unwrap();
    uow.outbox()
        .move_to_dlq(&entry, "Max retries (5) exceeded", "2026-01-01T00:00:00Z")
        .await
        .unwrap();
    uow.commit().await.unwrap();

    let uow = factory.begin().await.unwrap();
    let entries = uow.dlq().list().await.unwrap();
    uow.commit().await.unwrap();

    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].failure_reason, "Max retries (5) exceeded");
}
