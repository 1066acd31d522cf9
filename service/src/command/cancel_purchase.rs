//! [`Command`] for cancelling a [`Purchase`].

use std::fmt;

use common::operations::{
    By, Commit, Record, Release, Select, Transact, Transacted, Update,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;
use tracing as log;

use crate::{
    domain::{offer, purchase, Purchase},
    infra::{audit, database, Audit, Database},
    Service,
};

use super::Command;

/// [`Command`] for cancelling a [`purchase::Status::Completed`] [`Purchase`]
/// and releasing its units back to the [`Offer`].
///
/// The cancelled [`Purchase`] still counts for the uniqueness of purchases,
/// so its [`user`] can't purchase on the same [`Sale`] again.
///
/// [`Offer`]: crate::domain::Offer
/// [`Sale`]: crate::domain::Sale
/// [`user`]: crate::domain::user
#[derive(Clone, Copy, Debug)]
pub struct CancelPurchase {
    /// ID of the [`Purchase`] to cancel.
    pub purchase_id: purchase::Id,
}

impl<Db, Au> Command<CancelPurchase> for Service<Db, Au>
where
    Db: Database<Transact, Err = Traced<database::Error>>,
    Transacted<Db>: Database<
            Select<By<Option<Purchase>, purchase::Id>>,
            Ok = Option<Purchase>,
            Err = Traced<database::Error>,
        > + Database<
            Release<offer::StockChange>,
            Ok = offer::Restock,
            Err = Traced<database::Error>,
        > + Database<
            Update<purchase::Transition>,
            Ok = bool,
            Err = Traced<database::Error>,
        > + Database<Commit, Err = Traced<database::Error>>,
    Au: Audit<Record<audit::Event>, Err: fmt::Display>,
{
    type Ok = Purchase;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: CancelPurchase,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let CancelPurchase { purchase_id } = cmd;

        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        let mut purchase = tx
            .execute(Select(By::<Option<Purchase>, _>::new(purchase_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::PurchaseNotExists(purchase_id))
            .map_err(tracerr::wrap!())?;
        if purchase.status != purchase::Status::Completed {
            return Err(tracerr::new!(E::NotCompleted(purchase_id)));
        }

        // Only one of concurrent cancellations passes the transition, so
        // the units are released once.
        let transited = tx
            .execute(Update(purchase::Transition {
                purchase_id,
                from: purchase::Status::Completed,
                to: purchase::Status::Cancelled,
            }))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;
        if !transited {
            return Err(tracerr::new!(E::NotCompleted(purchase_id)));
        }
        purchase.status = purchase::Status::Cancelled;

        let restock = tx
            .execute(Release(offer::StockChange {
                offer_id: purchase.offer_id,
                sale_id: purchase.sale_id,
                quantity: purchase.quantity,
            }))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;
        match restock {
            offer::Restock::Released(_) => {}
            offer::Restock::ExceedsTotal => {
                return Err(tracerr::new!(E::ExceedsTotal(purchase.offer_id)));
            }
            offer::Restock::OfferNotExists => {
                return Err(tracerr::new!(E::OfferNotExists(purchase.offer_id)));
            }
        }

        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        if let Err(e) = self
            .audit()
            .execute(Record(audit::Event::PurchaseCancelled(purchase.clone())))
            .await
        {
            log::error!(
                purchase_id = %purchase.id,
                "failed to audit cancelled purchase: {e}",
            );
        }

        Ok(purchase)
    }
}

/// Error of [`CancelPurchase`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    #[from]
    Db(database::Error),

    /// Releasing would exceed the total units of the [`Offer`].
    ///
    /// [`Offer`]: crate::domain::Offer
    #[display("Releasing exceeds total units of `Offer(id: {_0})`")]
    ExceedsTotal(#[error(not(source))] offer::Id),

    /// [`Purchase`] is not [`purchase::Status::Completed`].
    #[display("`Purchase(id: {_0})` is not completed")]
    NotCompleted(#[error(not(source))] purchase::Id),

    /// [`Offer`] of the [`Purchase`] doesn't exist anymore.
    ///
    /// [`Offer`]: crate::domain::Offer
    #[display("`Offer(id: {_0})` does not exist")]
    OfferNotExists(#[error(not(source))] offer::Id),

    /// [`Purchase`] with the provided ID does not exist.
    #[display("`Purchase(id: {_0})` does not exist")]
    PurchaseNotExists(#[error(not(source))] purchase::Id),
}

#[cfg(test)]
mod spec {
    use crate::{
        command::{attempt_purchase, AttemptPurchase},
        domain::{offer, purchase},
        infra::audit,
        testing, Command as _,
    };

    use super::{CancelPurchase, ExecutionError};

    #[tokio::test]
    async fn releases_units_of_cancelled_purchase() {
        let svc = testing::service();
        let (sale, offer) = testing::live_sale(&svc, 2).await;
        let purchase = svc
            .execute(AttemptPurchase::single(testing::user(1), sale.id))
            .await
            .unwrap();

        let cancelled = svc
            .execute(CancelPurchase {
                purchase_id: purchase.id,
            })
            .await
            .unwrap();

        assert_eq!(cancelled.status, purchase::Status::Cancelled);
        assert_eq!(
            testing::stock(&svc, offer.id).await.available(),
            offer::Quantity::new(2).unwrap(),
        );
        assert_eq!(
            svc.audit().events().last(),
            Some(&audit::Event::PurchaseCancelled(cancelled)),
        );
    }

    #[tokio::test]
    async fn cancels_only_once() {
        let svc = testing::service();
        let (sale, offer) = testing::live_sale(&svc, 2).await;
        let purchase = svc
            .execute(AttemptPurchase::single(testing::user(1), sale.id))
            .await
            .unwrap();
        _ = svc
            .execute(CancelPurchase {
                purchase_id: purchase.id,
            })
            .await
            .unwrap();

        let err = svc
            .execute(CancelPurchase {
                purchase_id: purchase.id,
            })
            .await
            .unwrap_err();

        assert!(matches!(err.as_ref(), ExecutionError::NotCompleted(_)));
        assert_eq!(
            testing::stock(&svc, offer.id).await.available(),
            offer::Quantity::new(2).unwrap(),
        );
    }

    #[tokio::test]
    async fn cancelled_user_cannot_purchase_again() {
        let svc = testing::service();
        let (sale, offer) = testing::live_sale(&svc, 2).await;
        let purchase = svc
            .execute(AttemptPurchase::single(testing::user(1), sale.id))
            .await
            .unwrap();
        _ = svc
            .execute(CancelPurchase {
                purchase_id: purchase.id,
            })
            .await
            .unwrap();

        let err = svc
            .execute(AttemptPurchase::single(testing::user(1), sale.id))
            .await
            .unwrap_err();

        assert_eq!(
            err.as_ref().kind(),
            attempt_purchase::ErrorKind::AlreadyPurchased,
        );
        assert_eq!(
            testing::stock(&svc, offer.id).await.available(),
            offer::Quantity::new(2).unwrap(),
        );
        assert_eq!(testing::purchases(&svc, sale.id).await.len(), 1);
    }

    #[tokio::test]
    async fn fails_on_unknown_purchase() {
        let svc = testing::service();

        let err = svc
            .execute(CancelPurchase {
                purchase_id: purchase::Id::new(),
            })
            .await
            .unwrap_err();

        assert!(matches!(
            err.as_ref(),
            ExecutionError::PurchaseNotExists(_),
        ));
    }
}
