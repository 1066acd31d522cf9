//! Postgres clients the [`Postgres`] database is parametrized with.
//!
//! [`Postgres`]: super::Postgres

pub mod non_tx;
pub mod tx;

pub use self::{non_tx::NonTx, tx::Tx};

/// Implements [`Connection`] for a client by running every statement on the
/// [`Connection`] returned by its `connection()` method.
///
/// [`Connection`]: super::Connection
macro_rules! delegate_to_connection {
    ($client:ty) => {
        impl Connection for $client {
            async fn query<T>(
                &self,
                stmt: &T,
                params: &Params<'_>,
            ) -> Result<Vec<Row>, Traced<database::Error>>
            where
                T: ToStatement + ?Sized,
            {
                self.connection()
                    .await
                    .map_err(tracerr::wrap!())?
                    .query(stmt, params)
                    .await
                    .map_err(tracerr::wrap!())
            }

            async fn query_opt<T>(
                &self,
                stmt: &T,
                params: &Params<'_>,
            ) -> Result<Option<Row>, Traced<database::Error>>
            where
                T: ToStatement + ?Sized,
            {
                self.connection()
                    .await
                    .map_err(tracerr::wrap!())?
                    .query_opt(stmt, params)
                    .await
                    .map_err(tracerr::wrap!())
            }

            async fn exec<T>(
                &self,
                stmt: &T,
                params: &Params<'_>,
            ) -> Result<u64, Traced<database::Error>>
            where
                T: ToStatement + ?Sized,
            {
                self.connection()
                    .await
                    .map_err(tracerr::wrap!())?
                    .exec(stmt, params)
                    .await
                    .map_err(tracerr::wrap!())
            }
        }
    };
}
pub(crate) use delegate_to_connection;
