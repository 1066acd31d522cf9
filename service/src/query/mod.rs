//! Read-only [`Query`]s of sales, offers and purchases.
//!
//! None of them open a transaction: stock counters are read as committed,
//! so a concurrent purchase is either fully seen or not at all.

pub mod offer;
pub mod purchase;
pub mod sale;

use common::operations::{By, Select};
use tracerr::Traced;

use crate::{
    infra::{database, Database},
    Service,
};

/// [`Query`] of the [`Service`].
pub use common::Handler as Query;

/// [`Query`] returning whatever the [`Database`] [`Select`]s by `T`, like
/// a [`Sale`] by its ID or [`Purchase`]s of a user.
///
/// [`Purchase`]: crate::domain::Purchase
/// [`Sale`]: crate::domain::Sale
#[derive(Clone, Copy, Debug)]
#[expect(clippy::module_name_repetitions, reason = "more readable")]
pub struct DatabaseQuery<T>(T);

impl<W, B> DatabaseQuery<By<W, B>> {
    /// Creates a new [`DatabaseQuery`] of a `W` by the provided `B`.
    #[must_use]
    pub fn by(by: B) -> Self {
        Self(By::new(by))
    }
}

impl<Db, Au, W, B> Query<DatabaseQuery<By<W, B>>> for Service<Db, Au>
where
    Db: Database<Select<By<W, B>>, Ok = W, Err = Traced<database::Error>>,
{
    type Ok = W;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        DatabaseQuery(by): DatabaseQuery<By<W, B>>,
    ) -> Result<Self::Ok, Self::Err> {
        self.database()
            .execute(Select(by))
            .await
            .map_err(tracerr::wrap!())
    }
}
