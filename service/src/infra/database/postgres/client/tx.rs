//! [`Tx`] client definitions.

use std::sync::Arc;

use tokio::sync::{MappedMutexGuard, Mutex, MutexGuard};
use tokio_postgres::{Row, ToStatement};
use tracerr::Traced;

use crate::infra::database::{
    self,
    postgres::{
        connection::{self, Params},
        Connection,
    },
};

use super::{delegate_to_connection, NonTx};

/// Postgres client running all its statements in a single transaction.
///
/// `BEGIN` is issued lazily on the first statement, so a command rejected
/// by its preliminary checks never takes a pooled connection for long.
/// Dropping the last clone without [`Tx::commit()`] rolls everything back.
#[derive(Clone, Debug)]
pub struct Tx {
    /// [`NonTx`] client to borrow the connection from.
    non_tx: NonTx,

    /// Transaction, once opened.
    tx: Arc<Mutex<Option<connection::Tx>>>,
}

impl Tx {
    /// Creates a new [`Tx`] client on top of the provided [`NonTx`] one.
    #[must_use]
    pub fn from_non_tx(client: NonTx) -> Self {
        Self {
            non_tx: client,
            tx: Arc::new(Mutex::new(None)),
        }
    }

    /// Returns the open [`connection::Tx`], opening it if needed.
    async fn connection(
        &self,
    ) -> Result<MappedMutexGuard<'_, connection::Tx>, Traced<database::Error>>
    {
        let mut guard = self.tx.lock().await;
        if guard.is_none() {
            let conn = self
                .non_tx
                .connection()
                .await
                .map_err(tracerr::wrap!())?;
            *guard = Some(
                connection::Tx::from_non_tx(conn)
                    .await
                    .map_err(tracerr::wrap!())?,
            );
        }

        Ok(MutexGuard::map(guard, |tx| {
            tx.as_mut().expect("transaction is opened above")
        }))
    }

    /// Commits the open transaction, if any.
    ///
    /// # Errors
    ///
    /// If `COMMIT` fails.
    pub async fn commit(&self) -> Result<(), Traced<database::Error>> {
        let tx = self.tx.lock().await.take();
        match tx {
            Some(tx) => tx.commit().await.map_err(tracerr::wrap!()),
            None => Ok(()),
        }
    }

    /// Rolls back the open transaction, if any.
    ///
    /// # Errors
    ///
    /// If `ROLLBACK` fails.
    pub async fn rollback(&self) -> Result<(), Traced<database::Error>> {
        let tx = self.tx.lock().await.take();
        match tx {
            Some(tx) => tx.rollback().await.map_err(tracerr::wrap!()),
            None => Ok(()),
        }
    }
}

delegate_to_connection!(Tx);
