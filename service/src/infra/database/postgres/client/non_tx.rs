//! [`NonTx`] client definitions.

use tokio_postgres::{Row, ToStatement};
use tracerr::Traced;

use crate::infra::database::{
    self,
    postgres::{
        self,
        connection::{self, Params},
        Connection,
    },
};

use super::delegate_to_connection;

/// Postgres client running every statement in its own implicit
/// transaction.
///
/// Queries go through it, while commands switch to a [`Tx`] client before
/// touching the stock.
///
/// [`Tx`]: super::Tx
#[derive(Clone, Debug)]
pub struct NonTx {
    /// Pool to borrow a [`connection::NonTx`] from for each statement.
    pub(crate) pool: connection::Pool,
}

impl NonTx {
    /// Wraps the provided [`connection::Pool`].
    #[must_use]
    pub(crate) fn from_pool(pool: connection::Pool) -> Self {
        Self { pool }
    }

    /// Borrows a [`connection::NonTx`] from the pool, waiting for a free one
    /// if the pool is exhausted.
    pub(crate) async fn connection(
        &self,
    ) -> Result<connection::NonTx, Traced<database::Error>> {
        self.pool
            .get()
            .await
            .map_err(tracerr::from_and_wrap!(=> postgres::Error))
            .map_err(tracerr::map_from)
    }
}

delegate_to_connection!(NonTx);
