//! [`Command`] for deleting a [`Sale`].

use common::operations::{By, Commit, Delete, Select, Transact, Transacted};
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    domain::{sale, Sale},
    infra::{database, Database},
    read::sale::HasPurchases,
    Service,
};
#[cfg(doc)]
use crate::domain::{Offer, Purchase};

use super::Command;

/// [`Command`] for deleting a [`Sale`] along with its [`Offer`]s.
///
/// Refused while any [`Purchase`] references the [`Sale`].
#[derive(Clone, Copy, Debug)]
pub struct DeleteSale {
    /// ID of the [`Sale`] to delete.
    pub sale_id: sale::Id,
}

impl<Db, Au> Command<DeleteSale> for Service<Db, Au>
where
    Db: Database<Transact, Err = Traced<database::Error>>,
    Transacted<Db>: Database<
            Select<By<Option<Sale>, sale::Id>>,
            Ok = Option<Sale>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<HasPurchases, sale::Id>>,
            Ok = HasPurchases,
            Err = Traced<database::Error>,
        > + Database<Delete<By<Sale, sale::Id>>, Err = Traced<database::Error>>
        + Database<Commit, Err = Traced<database::Error>>,
{
    type Ok = Sale;
    type Err = Traced<ExecutionError>;

    async fn execute(&self, cmd: DeleteSale) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let DeleteSale { sale_id } = cmd;

        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        let sale = tx
            .execute(Select(By::<Option<Sale>, _>::new(sale_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::SaleNotExists(sale_id))
            .map_err(tracerr::wrap!())?;

        let has_purchases = tx
            .execute(Select(By::<HasPurchases, _>::new(sale_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;
        if *has_purchases {
            return Err(tracerr::new!(E::SaleHasPurchases(sale_id)));
        }

        // A purchase committed after the check above is still caught by the
        // foreign keys.
        let deleted = tx.execute(Delete(By::<Sale, _>::new(sale_id))).await;
        if deleted
            .as_ref()
            .is_err_and(|e| e.as_ref().is_foreign_key_violation())
        {
            return Err(tracerr::new!(E::SaleHasPurchases(sale_id)));
        }
        deleted
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        Ok(sale)
    }
}

/// Error of [`DeleteSale`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    #[from]
    Db(database::Error),

    /// [`Sale`] is referenced by [`Purchase`]s.
    #[display("`Sale(id: {_0})` has purchases")]
    SaleHasPurchases(#[error(not(source))] sale::Id),

    /// [`Sale`] with the provided ID does not exist.
    #[display("`Sale(id: {_0})` does not exist")]
    SaleNotExists(#[error(not(source))] sale::Id),
}

#[cfg(test)]
mod spec {
    use common::operations::{By, Select};

    use crate::{
        command::{delete_sale::ExecutionError, AttemptPurchase},
        domain::{Offer, Sale},
        infra::Database as _,
        testing, Command as _,
    };

    use super::DeleteSale;

    #[tokio::test]
    async fn deletes_sale_with_its_offer() {
        let svc = testing::service();
        let (sale, offer) = testing::live_sale(&svc, 3).await;

        _ = svc.execute(DeleteSale { sale_id: sale.id }).await.unwrap();

        let db = svc.database();
        assert!(db
            .execute(Select(By::<Option<Sale>, _>::new(sale.id)))
            .await
            .unwrap()
            .is_none());
        assert!(db
            .execute(Select(By::<Option<Offer>, _>::new(offer.id)))
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn refuses_deleting_sale_with_purchases() {
        let svc = testing::service();
        let (sale, offer) = testing::live_sale(&svc, 3).await;
        _ = svc
            .execute(AttemptPurchase::single(testing::user(1), sale.id))
            .await
            .unwrap();

        let err = svc
            .execute(DeleteSale { sale_id: sale.id })
            .await
            .unwrap_err();

        assert!(matches!(err.as_ref(), ExecutionError::SaleHasPurchases(_)));
        assert_eq!(testing::stock(&svc, offer.id).await.sold().to_i32(), 1);
    }
}
