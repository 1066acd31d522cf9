//! [`Database`]-related implementations.

#[cfg(any(test, feature = "memory"))]
pub mod memory;
#[cfg(feature = "postgres")]
pub mod postgres;

use derive_more::{Display, Error as StdError, From};

#[cfg(any(test, feature = "memory"))]
pub use self::memory::Memory;
#[cfg(feature = "postgres")]
pub use self::postgres::Postgres;

/// Database operation.
///
/// Implementations must provide:
/// - [`Reserve`] as a single atomic conditional decrement, so concurrent
///   callers never take more units than available;
/// - [`Insert`] of a [`Purchase`] guarded by a persisted uniqueness of the
///   user and the sale, reporting a conflict as a [`Duplicate`];
/// - transactions whose uncommitted changes are discarded entirely on
///   [`Rollback`] or when dropped.
///
/// [`Duplicate`]: crate::domain::purchase::Insertion::Duplicate
/// [`Insert`]: common::operations::Insert
/// [`Purchase`]: crate::domain::Purchase
/// [`Reserve`]: common::operations::Reserve
/// [`Rollback`]: common::operations::Rollback
pub use common::Handler as Database;

/// [`Database`] error.
#[derive(Debug, Display, From, StdError)]
pub enum Error {
    #[cfg(feature = "postgres")]
    /// [`Postgres`] error.
    Postgres(postgres::Error),

    #[cfg(any(test, feature = "memory"))]
    /// [`Memory`] error.
    Memory(memory::Error),
}

impl Error {
    /// Checks whether the error is caused by removing an entity still
    /// referenced by others.
    #[must_use]
    pub fn is_foreign_key_violation(&self) -> bool {
        match self {
            #[cfg(feature = "postgres")]
            Self::Postgres(e) => e.is_foreign_key_violation(None),
            #[cfg(any(test, feature = "memory"))]
            Self::Memory(e) => matches!(
                e,
                memory::Error::Referenced(..) | memory::Error::Dangling(..),
            ),
        }
    }

    /// Checks whether the error is caused by exceeding the configured lock
    /// wait timeout.
    #[must_use]
    pub fn is_lock_timeout(&self) -> bool {
        match self {
            #[cfg(feature = "postgres")]
            Self::Postgres(e) => e.is_lock_timeout(),
            #[cfg(any(test, feature = "memory"))]
            Self::Memory(_) => false,
        }
    }
}
