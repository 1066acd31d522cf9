//! Postgres [`Database`] implementation.

pub mod client;
pub mod connection;
mod impls;

use deadpool_postgres::Runtime;
use derive_more::{Deref, Display, Error as StdError, From};
use tokio_postgres::{error::SqlState, NoTls};
use tracerr::Traced;

use crate::infra::database;
#[cfg(doc)]
use crate::infra::Database;

pub use refinery::embed_migrations;

pub use self::{
    client::{NonTx, Tx},
    connection::Connection,
};

pub use deadpool_postgres::Config;

/// Postgres [`Database`] client.
#[derive(Clone, Copy, Debug, Deref)]
pub struct Postgres<T = NonTx>(T);

impl Postgres {
    /// Creates a new [`Postgres`] client with the provided [`Config`].
    ///
    /// # Errors
    ///
    /// If failed to create a new [`Postgres`] client.
    pub fn new(conf: &Config) -> Result<Self, Traced<database::Error>> {
        let pool = conf
            .create_pool(Some(Runtime::Tokio1), NoTls)
            .map_err(tracerr::from_and_wrap!(=> Error))
            .map_err(tracerr::map_from)?;
        Ok(Self(NonTx::from_pool(pool)))
    }
}

/// Postgres database [`Error`].
#[derive(Debug, Display, StdError, From)]
pub enum Error {
    /// Statement failed or the connection broke.
    #[display("Postgres error: {_0}")]
    Connection(connection::Error),

    /// [`Config`] doesn't describe a usable pool.
    #[display("Failed to create Postgres pool: {_0}")]
    PoolCreationError(connection::PoolCreationError),

    /// No pooled connection could be obtained.
    #[display("Postgres pool error: {_0}")]
    PoolError(connection::PoolError),
}

impl Error {
    /// Checks whether a `DELETE` hit a foreign key still referencing the
    /// row, optionally restricted to the specified constraint.
    #[must_use]
    pub fn is_foreign_key_violation(&self, constraint: Option<&str>) -> bool {
        self.sql_state() == Some(&SqlState::FOREIGN_KEY_VIOLATION)
            && constraint.map_or(true, |c| self.constraint() == Some(c))
    }

    /// Checks whether a row lock wasn't acquired within `lock_timeout`.
    #[must_use]
    pub fn is_lock_timeout(&self) -> bool {
        self.sql_state() == Some(&SqlState::LOCK_NOT_AVAILABLE)
    }

    /// Returns the [`SqlState`] reported by Postgres, if any.
    fn sql_state(&self) -> Option<&SqlState> {
        match self {
            Self::Connection(e) => e.code(),
            Self::PoolError(..) | Self::PoolCreationError(..) => None,
        }
    }

    /// Returns the name of the violated constraint, if any.
    fn constraint(&self) -> Option<&str> {
        match self {
            Self::Connection(e) => e.as_db_error().and_then(|e| e.constraint()),
            Self::PoolError(..) | Self::PoolCreationError(..) => None,
        }
    }
}
