use async_trait::async_trait;
use deadpool_postgres::Pool;
use tracing::{error, warn};

use crate::dlq::{DlqRepository, PgDlqRepository};
use crate::error::RepositoryError;
use crate::inbox::{InboxRepository, PgInboxRepository};
use crate::orders::{OrdersRepository, PgOrdersRepository};
use crate::outbox::{OutboxRepository, PgOutboxRepository};
use crate::states::{PgProcessingStatesRepository, ProcessingStatesRepository};

/// A scoped database session bundling the five repositories into one atomic
/// commit. Dropping a `UnitOfWork` without calling [`UnitOfWork::commit`]
/// leaves the database unchanged from the caller's perspective — use cases
/// always return before ever dropping an uncommitted one.
#[async_trait]
pub trait UnitOfWork: Send {
    fn orders(&self) -> Box<dyn OrdersRepository + '_>;
    fn states(&self) -> Box<dyn ProcessingStatesRepository + '_>;
    fn outbox(&self) -> Box<dyn OutboxRepository + '_>;
    fn inbox(&self) -> Box<dyn InboxRepository + '_>;
    fn dlq(&self) -> Box<dyn DlqRepository + '_>;

    async fn commit(self: Box<Self>) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait UnitOfWorkFactory: Send + Sync {
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>, RepositoryError>;
}

pub struct PgUnitOfWork {
    client: Option<deadpool_postgres::Object>,
    committed: bool,
}

impl PgUnitOfWork {
    fn client(&self) -> &deadpool_postgres::Object {
        self.client
            .as_ref()
            .expect("unit of work client taken before commit")
    }
}

/// A dropped, uncommitted unit of work must not leave `BEGIN` open on the
/// pooled connection: `RecyclingMethod::Fast` only checks liveness, not
/// transaction state, so the next `pool.get()` would hand the same
/// connection back out with a stranded transaction, silently folding the
/// next caller's writes into it. Issue `ROLLBACK` on every non-committed
/// exit path instead of just logging.
impl Drop for PgUnitOfWork {
    fn drop(&mut self) {
        if self.committed {
            return;
        }
        let Some(client) = self.client.take() else {
            return;
        };
        warn!("unit of work dropped without commit; rolling back");
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    if let Err(e) = client.batch_execute("ROLLBACK").await {
                        error!(error = %e, "failed to roll back abandoned unit of work");
                    }
                });
            }
            Err(_) => {
                error!("unit of work dropped outside a tokio runtime; cannot issue rollback");
            }
        }
    }
}

#[async_trait]
impl UnitOfWork for PgUnitOfWork {
    fn orders(&self) -> Box<dyn OrdersRepository + '_> {
        Box::new(PgOrdersRepository(self.client()))
    }

    fn states(&self) -> Box<dyn ProcessingStatesRepository + '_> {
        Box::new(PgProcessingStatesRepository(self.client()))
    }

    fn outbox(&self) -> Box<dyn OutboxRepository + '_> {
        Box::new(PgOutboxRepository(self.client()))
    }

    fn inbox(&self) -> Box<dyn InboxRepository + '_> {
        Box::new(PgInboxRepository(self.client()))
    }

    fn dlq(&self) -> Box<dyn DlqRepository + '_> {
        Box::new(PgDlqRepository(self.client()))
    }

    async fn commit(mut self: Box<Self>) -> Result<(), RepositoryError> {
        self.client().batch_execute("COMMIT").await?;
        self.committed = true;
        Ok(())
    }
}

pub struct PgUnitOfWorkFactory {
    pool: Pool,
}

impl PgUnitOfWorkFactory {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UnitOfWorkFactory for PgUnitOfWorkFactory {
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>, RepositoryError> {
        let client = self.pool.get().await?;
        client.batch_execute("BEGIN").await?;
        Ok(Box::new(PgUnitOfWork {
            client: Some(client),
            committed: false,
        }))
    }
}
