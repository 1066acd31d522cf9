//! [`Command`] for attempting to purchase on a [`Sale`].

use std::fmt;

use common::{
    operations::{
        By, Commit, Insert, Record, Reserve, Rollback, Select, Transact,
        Transacted,
    },
    DateTime,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;
use tracing as log;

use crate::{
    domain::{offer, purchase, sale, user, Offer, Purchase, Sale},
    infra::{audit, database, Audit, Database},
    Service,
};

use super::Command;

/// [`Command`] for attempting to purchase an [`Offer`] on a [`Sale`].
///
/// The whole attempt runs in a single transaction, and relies on the
/// [`Database`] only to serialize concurrent attempts:
/// 1. an existing [`purchase::Status::Completed`] [`Purchase`] of the same
///    [`user`] on the same [`Sale`] fails the attempt early;
/// 2. the [`Sale`] must be [`sale::Status::Live`] at the moment;
/// 3. units are [`Reserve`]d by a single conditional decrement, so the
///    [`offer::Stock`] is never oversold;
/// 4. a new [`Purchase`] is [`Insert`]ed under the persisted uniqueness of
///    its [`user`] and [`Sale`], which is what actually stops two
///    interleaved attempts of the same [`user`].
///
/// Any failure rolls back everything done so far, including the reserved
/// units.
#[derive(Clone, Debug)]
pub struct AttemptPurchase {
    /// ID of the already authenticated [`user`] purchasing.
    pub user_id: user::Id,

    /// ID of the [`Sale`] to purchase on.
    pub sale_id: sale::Id,

    /// ID of the [`Offer`] to purchase.
    ///
    /// If [`None`], the single [`Offer`] of the [`Sale`] is purchased.
    pub offer_id: Option<offer::Id>,

    /// Number of units to purchase.
    pub quantity: purchase::Quantity,
}

impl AttemptPurchase {
    /// Creates a new [`AttemptPurchase`] of a single unit of the [`Sale`]'s
    /// only [`Offer`].
    #[must_use]
    pub fn single(user_id: user::Id, sale_id: sale::Id) -> Self {
        Self {
            user_id,
            sale_id,
            offer_id: None,
            quantity: purchase::Quantity::ONE,
        }
    }
}

impl<Db, Au> Command<AttemptPurchase> for Service<Db, Au>
where
    Db: Database<Transact, Err = Traced<database::Error>>,
    Transacted<Db>: Database<
            Select<By<Option<Purchase>, (user::Id, sale::Id)>>,
            Ok = Option<Purchase>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<Sale>, sale::Id>>,
            Ok = Option<Sale>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Vec<Offer>, sale::Id>>,
            Ok = Vec<Offer>,
            Err = Traced<database::Error>,
        > + Database<
            Reserve<offer::StockChange>,
            Ok = offer::Reservation,
            Err = Traced<database::Error>,
        > + Database<
            Insert<Purchase>,
            Ok = purchase::Insertion,
            Err = Traced<database::Error>,
        > + Database<Commit, Err = Traced<database::Error>>
        + Database<Rollback, Err = Traced<database::Error>>,
    Au: Audit<Record<audit::Event>, Err: fmt::Display>,
{
    type Ok = Purchase;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: AttemptPurchase,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let AttemptPurchase {
            user_id,
            sale_id,
            offer_id,
            quantity,
        } = cmd;

        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        let attempt = async {
            let existing = tx
                .execute(Select(By::<Option<Purchase>, _>::new((
                    user_id.clone(),
                    sale_id,
                ))))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))?;
            if existing.is_some_and(|p| p.status == purchase::Status::Completed)
            {
                return Err(tracerr::new!(E::AlreadyPurchased(sale_id)));
            }

            let sale = tx
                .execute(Select(By::<Option<Sale>, _>::new(sale_id)))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))?
                .ok_or(E::SaleNotExists(sale_id))
                .map_err(tracerr::wrap!())?;
            let status = sale.status_at(DateTime::now());
            if !status.is_live() {
                return Err(tracerr::new!(E::NotEligible { sale_id, status }));
            }

            let offer_id = match offer_id {
                Some(id) => id,
                None => tx
                    .execute(Select(By::<Vec<Offer>, _>::new(sale_id)))
                    .await
                    .map_err(tracerr::map_from_and_wrap!(=> E))?
                    .first()
                    .map(|o| o.id)
                    .ok_or(E::SaleHasNoOffers(sale_id))
                    .map_err(tracerr::wrap!())?,
            };

            let reservation = tx
                .execute(Reserve(offer::StockChange {
                    offer_id,
                    sale_id,
                    quantity,
                }))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))?;
            match reservation {
                offer::Reservation::Reserved(_) => {}
                offer::Reservation::InsufficientStock => {
                    return Err(tracerr::new!(E::SoldOut(offer_id)));
                }
                offer::Reservation::OfferNotExists => {
                    return Err(tracerr::new!(E::OfferNotExists(offer_id)));
                }
            }

            let purchase = Purchase {
                id: purchase::Id::new(),
                user_id: user_id.clone(),
                sale_id,
                offer_id,
                quantity,
                status: purchase::Status::Completed,
                purchased_at: DateTime::now().coerce(),
            };
            let insertion = tx
                .execute(Insert(purchase.clone()))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))?;
            match insertion {
                purchase::Insertion::Inserted => {}
                purchase::Insertion::Duplicate => {
                    return Err(tracerr::new!(E::AlreadyPurchased(sale_id)));
                }
            }

            tx.execute(Commit)
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))
                .map(drop)?;

            Ok::<_, Traced<E>>(purchase)
        };

        let purchase = match attempt.await {
            Ok(p) => p,
            Err(e) => {
                if let Err(rollback_err) = tx.execute(Rollback).await {
                    log::error!(
                        user_id = %user_id,
                        sale_id = %sale_id,
                        "failed to roll back purchase attempt: {rollback_err}",
                    );
                }
                return Err(e);
            }
        };

        log::debug!(
            purchase_id = %purchase.id,
            user_id = %purchase.user_id,
            sale_id = %purchase.sale_id,
            offer_id = %purchase.offer_id,
            "purchase completed",
        );
        if let Err(e) = self
            .audit()
            .execute(Record(audit::Event::PurchaseCompleted(purchase.clone())))
            .await
        {
            log::error!(
                purchase_id = %purchase.id,
                "failed to audit completed purchase: {e}",
            );
        }

        Ok(purchase)
    }
}

/// Error of [`AttemptPurchase`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`user`] has already purchased on the [`Sale`].
    #[display("Already purchased on `Sale(id: {_0})`")]
    AlreadyPurchased(#[error(not(source))] sale::Id),

    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    #[from]
    Db(database::Error),

    /// [`Sale`] doesn't accept purchases at the moment.
    #[display("`Sale(id: {sale_id})` is not live, but {status}")]
    NotEligible {
        /// ID of the [`Sale`].
        sale_id: sale::Id,

        /// Actual [`sale::Status`] of the [`Sale`].
        status: sale::Status,
    },

    /// [`Offer`] with the provided ID does not exist in the [`Sale`].
    #[display("`Offer(id: {_0})` does not exist in the `Sale`")]
    OfferNotExists(#[error(not(source))] offer::Id),

    /// [`Sale`] with the provided ID has no [`Offer`]s.
    #[display("`Sale(id: {_0})` has no `Offer`s")]
    SaleHasNoOffers(#[error(not(source))] sale::Id),

    /// [`Sale`] with the provided ID does not exist.
    #[display("`Sale(id: {_0})` does not exist")]
    SaleNotExists(#[error(not(source))] sale::Id),

    /// Not enough units of the [`Offer`] are left.
    #[display("`Offer(id: {_0})` is sold out")]
    SoldOut(#[error(not(source))] offer::Id),
}

impl ExecutionError {
    /// Returns the [`ErrorKind`] of this [`ExecutionError`].
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::AlreadyPurchased(_) => ErrorKind::AlreadyPurchased,
            Self::NotEligible { .. } => ErrorKind::NotEligible,
            Self::SoldOut(_) => ErrorKind::SoldOut,
            Self::OfferNotExists(_)
            | Self::SaleHasNoOffers(_)
            | Self::SaleNotExists(_) => ErrorKind::NotFound,
            Self::Db(_) => ErrorKind::ServerError,
        }
    }
}

/// Kind of an [`ExecutionError`] as seen by a caller.
#[derive(Clone, Copy, Debug, Display, Eq, Hash, PartialEq)]
pub enum ErrorKind {
    /// [`user`] already has a [`Purchase`] on the [`Sale`].
    AlreadyPurchased,

    /// [`Sale`] is not live.
    NotEligible,

    /// [`Offer`] has not enough units left.
    SoldOut,

    /// [`Sale`] or [`Offer`] doesn't exist.
    NotFound,

    /// [`Database`] failed, including exceeding a lock wait timeout.
    ///
    /// Safe to retry: a repeated attempt is absorbed by the uniqueness of
    /// [`Purchase`]s.
    ServerError,
}

#[cfg(test)]
mod spec {
    use std::collections::HashSet;

    use common::operations::{
        By, Commit, Insert, Record, Reserve, Rollback, Select, Transact, Update,
    };
    use futures::future;
    use tracerr::Traced;

    use crate::{
        command::UpdateSale,
        domain::{offer, purchase, sale, user, Offer, Purchase, Sale},
        infra::{audit, database, memory, Audit, Database, Memory},
        testing::{self, MINUTE},
        Command as _, Service,
    };

    use super::{AttemptPurchase, ErrorKind, ExecutionError};

    fn kind<T>(res: &Result<T, Traced<ExecutionError>>) -> Option<ErrorKind> {
        res.as_ref().err().map(|e| e.as_ref().kind())
    }

    /// [`Memory`] failing to store any [`Purchase`], and optionally failing to
    /// [`Rollback`] as well.
    #[derive(Clone, Debug)]
    struct Failing {
        db: Memory,
        rollback_fails: bool,
    }

    impl Failing {
        fn error() -> Traced<database::Error> {
            tracerr::new!(database::Error::from(memory::Error::Dangling(
                "purchases.offer_id",
            )))
        }
    }

    impl Database<Transact> for Failing {
        type Ok = Self;
        type Err = Traced<database::Error>;

        async fn execute(&self, op: Transact) -> Result<Self::Ok, Self::Err> {
            Ok(Self {
                db: self.db.execute(op).await?,
                rollback_fails: self.rollback_fails,
            })
        }
    }

    impl Database<Insert<Purchase>> for Failing {
        type Ok = purchase::Insertion;
        type Err = Traced<database::Error>;

        async fn execute(
            &self,
            _: Insert<Purchase>,
        ) -> Result<Self::Ok, Self::Err> {
            Err(Self::error())
        }
    }

    impl Database<Rollback> for Failing {
        type Ok = ();
        type Err = Traced<database::Error>;

        async fn execute(&self, op: Rollback) -> Result<Self::Ok, Self::Err> {
            if self.rollback_fails {
                return Err(Self::error());
            }
            self.db.execute(op).await
        }
    }

    macro_rules! delegate_to_memory {
        ($($op:ty => $ok:ty),* $(,)?) => {$(
            impl Database<$op> for Failing {
                type Ok = $ok;
                type Err = Traced<database::Error>;

                async fn execute(
                    &self,
                    op: $op,
                ) -> Result<Self::Ok, Self::Err> {
                    self.db.execute(op).await
                }
            }
        )*};
    }

    delegate_to_memory!(
        Select<By<Option<Purchase>, (user::Id, sale::Id)>> => Option<Purchase>,
        Select<By<Option<Sale>, sale::Id>> => Option<Sale>,
        Select<By<Vec<Offer>, sale::Id>> => Vec<Offer>,
        Reserve<offer::StockChange> => offer::Reservation,
        Commit => (),
    );

    #[tokio::test]
    async fn purchases_single_unit() {
        let svc = testing::service();
        let (sale, offer) = testing::live_sale(&svc, 3).await;

        let purchase = svc
            .execute(AttemptPurchase::single(testing::user(1), sale.id))
            .await
            .unwrap();

        assert_eq!(purchase.offer_id, offer.id);
        assert_eq!(purchase.status, purchase::Status::Completed);
        assert_eq!(purchase.quantity, purchase::Quantity::ONE);
        assert_eq!(
            testing::stock(&svc, offer.id).await.available(),
            offer::Quantity::new(2).unwrap(),
        );
        assert_eq!(
            svc.audit().events(),
            [audit::Event::PurchaseCompleted(purchase)],
        );
    }

    #[tokio::test]
    async fn reports_missing_sale_and_offer() {
        let svc = testing::service();
        let (sale, _) = testing::live_sale(&svc, 3).await;

        let res = svc
            .execute(AttemptPurchase::single(
                testing::user(1),
                sale::Id::new(),
            ))
            .await;
        assert_eq!(kind(&res), Some(ErrorKind::NotFound));

        let res = svc
            .execute(AttemptPurchase {
                offer_id: Some(offer::Id::new()),
                ..AttemptPurchase::single(testing::user(1), sale.id)
            })
            .await;
        assert_eq!(kind(&res), Some(ErrorKind::NotFound));
        assert!(testing::purchases(&svc, sale.id).await.is_empty());
    }

    #[tokio::test]
    async fn rejects_outside_window_regardless_of_stock() {
        let svc = testing::service();
        let (scheduled, s_offer) =
            testing::sale(&svc, 10 * MINUTE, 360 * MINUTE, 50).await;
        let (live, l_offer) = testing::live_sale(&svc, 50).await;

        let res = svc
            .execute(AttemptPurchase::single(testing::user(1), scheduled.id))
            .await;
        assert_eq!(kind(&res), Some(ErrorKind::NotEligible));

        _ = svc
            .execute(UpdateSale {
                sale_id: live.id,
                name: None,
                start: Some(
                    (live.window.start().coerce::<()>() - 120 * MINUTE)
                        .coerce(),
                ),
                end: Some(
                    (live.window.start().coerce::<()>() - 60 * MINUTE)
                        .coerce(),
                ),
                enabled: None,
            })
            .await
            .unwrap();
        let res = svc
            .execute(AttemptPurchase::single(testing::user(1), live.id))
            .await;
        assert_eq!(kind(&res), Some(ErrorKind::NotEligible));

        assert_eq!(testing::stock(&svc, s_offer.id).await.sold().to_i32(), 0);
        assert_eq!(testing::stock(&svc, l_offer.id).await.sold().to_i32(), 0);
    }

    #[tokio::test]
    async fn rejects_disabled_sale_regardless_of_stock() {
        let svc = testing::service();
        let (sale, offer) = testing::live_sale(&svc, 50).await;
        _ = svc
            .execute(UpdateSale {
                sale_id: sale.id,
                name: None,
                start: None,
                end: None,
                enabled: Some(false),
            })
            .await
            .unwrap();

        let res = svc
            .execute(AttemptPurchase::single(testing::user(1), sale.id))
            .await;

        assert!(matches!(
            res.as_ref().map_err(|e| e.as_ref()),
            Err(ExecutionError::NotEligible {
                status: sale::Status::Suspended,
                ..
            }),
        ));
        assert_eq!(testing::stock(&svc, offer.id).await.sold().to_i32(), 0);
        assert!(svc.audit().events().is_empty());
    }

    #[tokio::test]
    async fn rejects_repeated_purchase() {
        let svc = testing::service();
        let (sale, offer) = testing::live_sale(&svc, 3).await;
        _ = svc
            .execute(AttemptPurchase::single(testing::user(1), sale.id))
            .await
            .unwrap();

        let res = svc
            .execute(AttemptPurchase::single(testing::user(1), sale.id))
            .await;

        assert_eq!(kind(&res), Some(ErrorKind::AlreadyPurchased));
        assert_eq!(
            testing::stock(&svc, offer.id).await.available(),
            offer::Quantity::new(2).unwrap(),
        );
    }

    #[tokio::test]
    async fn rejects_quantity_over_available() {
        let svc = testing::service();
        let (sale, offer) = testing::live_sale(&svc, 2).await;

        let res = svc
            .execute(AttemptPurchase {
                quantity: purchase::Quantity::new(3).unwrap(),
                ..AttemptPurchase::single(testing::user(1), sale.id)
            })
            .await;

        assert_eq!(kind(&res), Some(ErrorKind::SoldOut));
        assert_eq!(
            testing::stock(&svc, offer.id).await.available(),
            offer::Quantity::new(2).unwrap(),
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn allocates_exactly_available_units_among_users() {
        const K: usize = 20;
        const M: usize = 15;

        let svc = testing::service();
        let (sale, offer) = testing::live_sale(&svc, K as u32).await;

        let results = future::join_all((0..K + M).map(|n| {
            let svc = svc.clone();
            async move {
                svc.execute(AttemptPurchase::single(testing::user(n), sale.id))
                    .await
            }
        }))
        .await;

        let succeeded = results.iter().filter(|r| r.is_ok()).count();
        let sold_out = results
            .iter()
            .filter(|r| kind(r) == Some(ErrorKind::SoldOut))
            .count();
        assert_eq!(succeeded, K);
        assert_eq!(sold_out, M);

        let stock = testing::stock(&svc, offer.id).await;
        assert_eq!(stock.available(), offer::Quantity::ZERO);
        assert_eq!(stock.sold(), offer::Quantity::new(K as u32).unwrap());

        let purchases = testing::purchases(&svc, sale.id).await;
        assert_eq!(testing::completed(&purchases), K);
        let buyers =
            purchases.iter().map(|p| &p.user_id).collect::<HashSet<_>>();
        assert_eq!(buyers.len(), K);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn same_user_completes_only_once() {
        const N: usize = 25;

        let svc = testing::service();
        let (sale, offer) = testing::live_sale(&svc, 10).await;

        let results = future::join_all((0..N).map(|_| {
            let svc = svc.clone();
            async move {
                svc.execute(AttemptPurchase::single(testing::user(7), sale.id))
                    .await
            }
        }))
        .await;

        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        assert!(results
            .iter()
            .filter(|r| r.is_err())
            .all(|r| kind(r) == Some(ErrorKind::AlreadyPurchased)));

        let purchases = testing::purchases(&svc, sale.id).await;
        assert_eq!(testing::completed(&purchases), 1);
        assert_eq!(
            testing::stock(&svc, offer.id).await.available(),
            offer::Quantity::new(9).unwrap(),
        );
        assert_eq!(svc.audit().events().len(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn repeated_attempts_do_not_starve_other_users() {
        let svc = testing::service();
        let (sale, offer) = testing::live_sale(&svc, 2).await;

        let results = future::join_all(
            [1, 1, 1, 2, 1, 1].into_iter().map(|n| {
                let svc = svc.clone();
                async move {
                    let res = svc
                        .execute(AttemptPurchase::single(
                            testing::user(n),
                            sale.id,
                        ))
                        .await;
                    (n, res)
                }
            }),
        )
        .await;

        let of = |n: usize| results.iter().filter(move |(u, _)| *u == n);
        assert!(of(2).all(|(_, r)| r.is_ok()));
        assert_eq!(of(1).filter(|(_, r)| r.is_ok()).count(), 1);
        assert!(of(1)
            .filter(|(_, r)| r.is_err())
            .all(|(_, r)| kind(r) == Some(ErrorKind::AlreadyPurchased)));

        assert!(testing::stock(&svc, offer.id).await.is_sold_out());
        let purchases = testing::purchases(&svc, sale.id).await;
        assert_eq!(testing::completed(&purchases), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn single_unit_goes_to_exactly_one_user() {
        let svc = testing::service();
        let (sale, offer) = testing::live_sale(&svc, 1).await;

        let results = future::join_all((0..10).map(|n| {
            let svc = svc.clone();
            async move {
                svc.execute(AttemptPurchase::single(testing::user(n), sale.id))
                    .await
            }
        }))
        .await;

        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        assert_eq!(
            results
                .iter()
                .filter(|r| kind(r) == Some(ErrorKind::SoldOut))
                .count(),
            9,
        );
        assert!(testing::stock(&svc, offer.id).await.is_sold_out());
    }

    #[tokio::test]
    async fn rolled_back_attempt_leaves_no_trace() {
        let svc = testing::service();
        let (sale, offer) = testing::live_sale(&svc, 5).await;
        _ = svc
            .execute(AttemptPurchase::single(testing::user(1), sale.id))
            .await
            .unwrap();
        let stock_before = testing::stock(&svc, offer.id).await;
        let purchases_before = testing::purchases(&svc, sale.id).await;

        // Cancelled purchases skip the early check, so this attempt reserves
        // a unit before hitting the uniqueness and rolling back.
        let cancelled = svc
            .database()
            .execute(Update(purchase::Transition {
                purchase_id: purchases_before[0].id,
                from: purchase::Status::Completed,
                to: purchase::Status::Cancelled,
            }))
            .await
            .unwrap();
        assert!(cancelled);
        let purchases_before = testing::purchases(&svc, sale.id).await;

        let res = svc
            .execute(AttemptPurchase::single(testing::user(1), sale.id))
            .await;

        assert_eq!(kind(&res), Some(ErrorKind::AlreadyPurchased));
        assert_eq!(testing::stock(&svc, offer.id).await, stock_before);
        assert_eq!(testing::purchases(&svc, sale.id).await, purchases_before);
    }

    #[tokio::test]
    async fn storage_failure_rolls_back_reserved_units() {
        for rollback_fails in [false, true] {
            let setup = testing::service();
            let (sale, offer) = testing::live_sale(&setup, 3).await;
            let svc = Service::with_audit(
                Failing {
                    db: setup.database().clone(),
                    rollback_fails,
                },
                audit::Collect::default(),
            );

            let res = svc
                .execute(AttemptPurchase::single(testing::user(1), sale.id))
                .await;

            assert_eq!(kind(&res), Some(ErrorKind::ServerError));
            assert!(matches!(
                res.as_ref().map_err(|e| e.as_ref()),
                Err(ExecutionError::Db(_)),
            ));
            assert_eq!(
                testing::stock(&setup, offer.id).await.available(),
                offer::Quantity::new(3).unwrap(),
                "rollback fails: {rollback_fails}",
            );
            assert!(testing::purchases(&setup, sale.id).await.is_empty());
            assert!(svc.audit().events().is_empty());
        }
    }

    #[tokio::test]
    async fn audit_failure_does_not_fail_purchase() {
        #[derive(Clone, Copy, Debug)]
        struct Broken;

        impl Audit<Record<audit::Event>> for Broken {
            type Ok = ();
            type Err = &'static str;

            async fn execute(
                &self,
                _: Record<audit::Event>,
            ) -> Result<Self::Ok, Self::Err> {
                Err("sink is down")
            }
        }

        let setup = testing::service();
        let (sale, offer) = testing::live_sale(&setup, 2).await;
        let svc = Service::with_audit(setup.database().clone(), Broken);

        let res = svc
            .execute(AttemptPurchase::single(testing::user(1), sale.id))
            .await;

        assert!(res.is_ok());
        assert_eq!(
            testing::stock(&setup, offer.id).await.available(),
            offer::Quantity::new(1).unwrap(),
        );
    }

    #[tokio::test]
    async fn flash_sale_scenario() {
        let svc = testing::service();
        let (sale, offer) =
            testing::sale(&svc, 10 * MINUTE, 360 * MINUTE, 50).await;

        let res = svc
            .execute(AttemptPurchase::single(testing::user(0), sale.id))
            .await;
        assert_eq!(kind(&res), Some(ErrorKind::NotEligible));

        // Eleven minutes later the window is open: shift it instead of
        // waiting.
        _ = svc
            .execute(UpdateSale {
                sale_id: sale.id,
                name: None,
                start: Some(
                    (sale.window.start().coerce::<()>() - 11 * MINUTE).coerce(),
                ),
                end: Some(
                    (sale.window.end().coerce::<()>() - 11 * MINUTE).coerce(),
                ),
                enabled: None,
            })
            .await
            .unwrap();

        _ = svc
            .execute(AttemptPurchase::single(testing::user(0), sale.id))
            .await
            .unwrap();
        assert_eq!(
            testing::stock(&svc, offer.id).await.available(),
            offer::Quantity::new(49).unwrap(),
        );

        let res = svc
            .execute(AttemptPurchase::single(testing::user(0), sale.id))
            .await;
        assert_eq!(kind(&res), Some(ErrorKind::AlreadyPurchased));
        assert_eq!(
            testing::stock(&svc, offer.id).await.available(),
            offer::Quantity::new(49).unwrap(),
        );

        for n in 1..50 {
            _ = svc
                .execute(AttemptPurchase::single(testing::user(n), sale.id))
                .await
                .unwrap();
        }
        assert!(testing::stock(&svc, offer.id).await.is_sold_out());

        let res = svc
            .execute(AttemptPurchase::single(testing::user(50), sale.id))
            .await;
        assert_eq!(kind(&res), Some(ErrorKind::SoldOut));
    }
}
