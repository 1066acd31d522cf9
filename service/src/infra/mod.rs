//! Infrastructure layer.

pub mod audit;
pub mod database;

pub use self::{audit::Audit, database::Database};
#[cfg(any(test, feature = "memory"))]
pub use self::database::{memory, Memory};
#[cfg(feature = "postgres")]
pub use self::database::{postgres, Postgres};
