//! Transactional gateway to PostgreSQL: one unit-of-work abstraction with a
//! SQL-backed and an in-memory realization, per the five repository
//! contracts (orders, processing states, outbox, inbox, DLQ).

pub mod dlq;
pub mod error;
pub mod inbox;
pub mod memory;
pub mod orders;
pub mod outbox;
pub mod states;
pub mod uow;

pub use dlq::{DlqEntry, DlqRepository, PgDlqRepository};
pub use error::RepositoryError;
pub use inbox::{InboxRepository, PgInboxRepository};
pub use memory::{InMemoryStore, InMemoryUnitOfWork, InMemoryUnitOfWorkFactory};
pub use orders::{OrdersRepository, PgOrdersRepository};
pub use outbox::{OutboxEntry, OutboxRepository, PgOutboxRepository};
pub use states::{PgProcessingStatesRepository, ProcessingStatesRepository};
pub use uow::{PgUnitOfWork, PgUnitOfWorkFactory, UnitOfWork, UnitOfWorkFactory};
