//! Raw Postgres [`Connection`]s the flash sale storage runs its statements
//! on.

use std::{fmt, future::Future};

use futures::{FutureExt as _, TryFutureExt as _};
use ouroboros::self_referencing;
use tokio_postgres::{types::ToSql, Row, ToStatement};
use tracerr::Traced;
use tracing as log;

use crate::infra::database::{self, postgres};

pub use deadpool_postgres::{
    Client as NonTx, CreatePoolError as PoolCreationError, Pool, PoolError,
};
pub use tokio_postgres::Error;

/// Parameters bound to a statement.
pub type Params<'a> = [&'a (dyn ToSql + Sync)];

/// [`NonTx`] connection holding an open transaction.
///
/// Every reservation, purchase record and status transition of a single
/// command goes through the same [`Tx`], so row locks taken by the
/// conditional updates are held until [`Tx::commit()`] or
/// [`Tx::rollback()`].
#[self_referencing]
pub struct Tx {
    /// Pooled connection the transaction is opened on.
    non_tx: NonTx,

    /// Open transaction, [`None`] once finished.
    #[borrows(mut non_tx)]
    #[not_covariant]
    tx: Option<deadpool_postgres::Transaction<'this>>,
}

impl fmt::Debug for Tx {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tx")
            .field("finished", &self.with_tx(|tx| tx.is_none()))
            .finish_non_exhaustive()
    }
}

impl Tx {
    /// Opens a transaction on the provided pooled [`NonTx`] connection.
    ///
    /// # Errors
    ///
    /// If Postgres refuses to `BEGIN`.
    pub async fn from_non_tx(
        client: NonTx,
    ) -> Result<Tx, Traced<database::Error>> {
        Tx::try_new_async_send(client, |c| c.transaction().map_ok(Some).boxed())
            .await
            .map_err(tracerr::from_and_wrap!(=> postgres::Error))
            .map_err(tracerr::map_from)
    }

    /// Returns the open [`deadpool_postgres::Transaction`].
    fn tx(&self) -> &deadpool_postgres::Transaction<'_> {
        self.with_tx(|tx| tx.as_ref().expect("already finished"))
    }

    /// Makes all the changes of this [`Tx`] visible to other connections.
    ///
    /// # Errors
    ///
    /// If `COMMIT` fails, in which case nothing is applied.
    #[expect(clippy::missing_panics_doc, reason = "infallible")]
    pub async fn commit(mut self) -> Result<(), Traced<database::Error>> {
        #[expect(
            clippy::redundant_closure_for_method_calls,
            reason = "different variance, see \
                      https://doc.rust-lang.org/nomicon/subtyping.html#variance"
        )]
        let tx = self.with_tx_mut(|tx| tx.take()).expect("already finished");
        tx.commit()
            .await
            .inspect(|_| log::trace!("transaction committed"))
            .map_err(tracerr::from_and_wrap!(=> postgres::Error))
            .map_err(tracerr::map_from)
    }

    /// Discards all the changes of this [`Tx`], returning reserved units
    /// and releasing the taken row locks.
    ///
    /// # Errors
    ///
    /// If `ROLLBACK` fails. Postgres still discards the changes once the
    /// connection is closed.
    #[expect(clippy::missing_panics_doc, reason = "infallible")]
    pub async fn rollback(mut self) -> Result<(), Traced<database::Error>> {
        #[expect(
            clippy::redundant_closure_for_method_calls,
            reason = "different variance, see \
                      https://doc.rust-lang.org/nomicon/subtyping.html#variance"
        )]
        let tx = self.with_tx_mut(|tx| tx.take()).expect("already finished");
        tx.rollback()
            .await
            .inspect(|_| log::trace!("transaction rolled back"))
            .map_err(tracerr::from_and_wrap!(=> postgres::Error))
            .map_err(tracerr::map_from)
    }
}

/// Something SQL statements can be run on.
pub trait Connection {
    /// Runs the provided statement and returns all the resulting rows.
    ///
    /// # Errors
    ///
    /// If the statement fails, including `lock_timeout` and
    /// `statement_timeout` expiration.
    fn query<T>(
        &self,
        stmt: &T,
        params: &Params<'_>,
    ) -> impl Future<Output = Result<Vec<Row>, Traced<database::Error>>>
    where
        T: ToStatement + ?Sized;

    /// Runs the provided statement and returns the resulting row, if any.
    ///
    /// Conditional `UPDATE ... RETURNING` statements report whether they
    /// matched through this.
    ///
    /// # Errors
    ///
    /// If the statement fails or returns more than one row.
    fn query_opt<T>(
        &self,
        stmt: &T,
        params: &Params<'_>,
    ) -> impl Future<Output = Result<Option<Row>, Traced<database::Error>>>
    where
        T: ToStatement + ?Sized;

    /// Runs the provided statement and returns the number of affected rows.
    ///
    /// # Errors
    ///
    /// If the statement fails.
    fn exec<T>(
        &self,
        stmt: &T,
        params: &Params<'_>,
    ) -> impl Future<Output = Result<u64, Traced<database::Error>>>
    where
        T: ToStatement + ?Sized;
}

/// Implements [`Connection`] for a type by delegating to the
/// [`tokio_postgres`] client returned by the provided accessor.
macro_rules! impl_connection {
    ($ty:ty, |$this:ident| $client:expr) => {
        impl Connection for $ty {
            async fn query<T>(
                &self,
                stmt: &T,
                params: &Params<'_>,
            ) -> Result<Vec<Row>, Traced<database::Error>>
            where
                T: ToStatement + ?Sized,
            {
                let $this = self;
                $client
                    .query(stmt, params)
                    .await
                    .map_err(tracerr::from_and_wrap!(=> postgres::Error))
                    .map_err(tracerr::map_from)
            }

            async fn query_opt<T>(
                &self,
                stmt: &T,
                params: &Params<'_>,
            ) -> Result<Option<Row>, Traced<database::Error>>
            where
                T: ToStatement + ?Sized,
            {
                let $this = self;
                $client
                    .query_opt(stmt, params)
                    .await
                    .map_err(tracerr::from_and_wrap!(=> postgres::Error))
                    .map_err(tracerr::map_from)
            }

            async fn exec<T>(
                &self,
                stmt: &T,
                params: &Params<'_>,
            ) -> Result<u64, Traced<database::Error>>
            where
                T: ToStatement + ?Sized,
            {
                let $this = self;
                $client
                    .execute(stmt, params)
                    .await
                    .map_err(tracerr::from_and_wrap!(=> postgres::Error))
                    .map_err(tracerr::map_from)
            }
        }
    };
}

impl_connection!(NonTx, |this| (**this));
impl_connection!(Tx, |this| this.tx());
