//! In-memory [`Database`] implementation.
//!
//! Every operation is applied atomically under a single lock, after yielding
//! to the scheduler, so concurrently running operations interleave the same
//! way their statements do against a real database.
//!
//! Changes made inside a transaction are visible to others right away, and
//! are undone on [`Rollback`] or once the last clone of the transaction is
//! dropped without a [`Commit`].
//!
//! Every changed row stays locked until the transaction ends, the same way
//! a real database keeps the row locks of an `UPDATE`. Concurrent writers of
//! the same row wait for each other. So uncommitted changes are never built
//! upon by others, and restoring a previous version on [`Rollback`] never
//! overwrites a change of another transaction.

use std::{
    collections::HashMap,
    hash::Hash,
    mem,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use tokio::sync::{Mutex as RowLock, OwnedMutexGuard};

use common::operations::{
    By, Commit, Delete, Insert, Release, Reserve, Rollback, Select, Transact,
    Update,
};
use derive_more::{Display, Error as StdError};
use tracerr::Traced;

use crate::{
    domain::{offer, purchase, sale, user, Offer, Purchase, Sale},
    infra::{database, Database},
    read,
};

/// In-memory [`Database`].
///
/// Clones share the same data.
#[derive(Clone, Debug, Default)]
pub struct Memory {
    /// Stored data.
    state: Arc<Mutex<State>>,

    /// Locks of the [`Row`]s ever written.
    rows: Arc<Mutex<HashMap<Row, Arc<RowLock<()>>>>>,

    /// [`Journal`] of the current transaction, if any.
    tx: Option<Arc<Journal>>,
}

impl Memory {
    /// Locks the provided [`Row`]s, waiting for other transactions holding
    /// any of them to end.
    ///
    /// Inside a transaction the locks are held by its [`Journal`] until it
    /// ends. Otherwise, they are held by the returned guards.
    async fn lock_rows(
        &self,
        rows: impl IntoIterator<Item = Row>,
    ) -> Vec<OwnedMutexGuard<()>> {
        let mut guards = vec![];
        for row in rows {
            if self
                .tx
                .as_ref()
                .is_some_and(|tx| lock(&tx.rows).contains_key(&row))
            {
                continue;
            }
            let row_lock =
                Arc::clone(lock(&self.rows).entry(row.clone()).or_default());
            let guard = row_lock.lock_owned().await;
            if let Some(tx) = &self.tx {
                _ = lock(&tx.rows).insert(row, guard);
            } else {
                guards.push(guard);
            }
        }
        guards
    }

    /// Runs the provided `op` over the stored [`State`] atomically, recording
    /// the [`Undo`] steps it produces into the current transaction.
    async fn apply<R>(
        &self,
        op: impl FnOnce(&mut State, &mut Vec<Undo>) -> R,
    ) -> R {
        tokio::task::yield_now().await;

        let mut undo = vec![];
        let out = op(&mut lock(&self.state), &mut undo);
        if let Some(tx) = &self.tx {
            lock(&tx.undo).extend(undo);
        }
        out
    }
}

/// Error of [`Memory`] database.
#[derive(Clone, Copy, Debug, Display, StdError)]
pub enum Error {
    /// Entity cannot be removed while others reference it.
    #[display("Entity is still referenced by `{_0}`")]
    Referenced(#[error(not(source))] &'static str),

    /// Entity references another one which doesn't exist.
    #[display("Referenced entity doesn't exist: `{_0}`")]
    Dangling(#[error(not(source))] &'static str),
}

/// Data stored in [`Memory`].
#[derive(Debug, Default)]
struct State {
    /// Stored [`Sale`]s.
    sales: HashMap<sale::Id, Sale>,

    /// Stored [`Offer`]s.
    offers: HashMap<offer::Id, Offer>,

    /// Stored [`Purchase`]s.
    purchases: HashMap<purchase::Id, Purchase>,
}

/// Entity of [`State`] locked by its writers.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
enum Row {
    /// [`Sale`] with the provided ID.
    Sale(sale::Id),

    /// [`Offer`] with the provided ID, along with its [`offer::Stock`].
    Offer(offer::Id),

    /// [`Purchase`] with the provided ID.
    Purchase(purchase::Id),

    /// The only [`Purchase`] allowed for a [`user`] on a [`Sale`].
    PurchaseOf(user::Id, sale::Id),
}

/// Changes of a single transaction to be undone if it's not committed.
#[derive(Debug)]
struct Journal {
    /// [`State`] the changes were applied to.
    state: Arc<Mutex<State>>,

    /// [`Undo`] steps in the order the changes were applied.
    undo: Mutex<Vec<Undo>>,

    /// Locks of the [`Row`]s written by this transaction.
    rows: Mutex<HashMap<Row, OwnedMutexGuard<()>>>,
}

impl Journal {
    /// Creates a new empty [`Journal`] of changes to the provided [`State`].
    fn new(state: Arc<Mutex<State>>) -> Self {
        Self {
            state,
            undo: Mutex::default(),
            rows: Mutex::default(),
        }
    }

    /// Undoes all the recorded changes and unlocks the written [`Row`]s.
    fn discard(&self) {
        let undo = mem::take(&mut *lock(&self.undo));
        {
            let mut state = lock(&self.state);
            for step in undo.into_iter().rev() {
                step.apply(&mut state);
            }
        }
        lock(&self.rows).clear();
    }

    /// Forgets all the recorded changes, making them permanent, and unlocks
    /// the written [`Row`]s.
    fn forget(&self) {
        lock(&self.undo).clear();
        lock(&self.rows).clear();
    }
}

impl Drop for Journal {
    fn drop(&mut self) {
        self.discard();
    }
}

/// Step reverting a single change of [`State`].
///
/// Previous versions are restored only while the changed [`Row`] is still
/// locked, so no other transaction could have changed it in the meantime.
#[derive(Debug)]
enum Undo {
    /// Restores the previous version of a [`Sale`].
    Sale(sale::Id, Option<Sale>),

    /// Restores the previous version of an [`Offer`].
    Offer(offer::Id, Option<Offer>),

    /// Restores the previous version of a [`Purchase`].
    Purchase(purchase::Id, Option<Purchase>),

    /// Puts back units taken from an [`Offer`].
    Reserved(offer::Id, offer::Quantity),

    /// Takes back units put to an [`Offer`].
    Released(offer::Id, offer::Quantity),
}

impl Undo {
    /// Applies this [`Undo`] step to the provided [`State`].
    ///
    /// Stock changes are reverted as deltas, so changes made by other
    /// transactions in the meantime are kept.
    fn apply(self, state: &mut State) {
        match self {
            Self::Sale(id, prev) => restore(&mut state.sales, id, prev),
            Self::Offer(id, prev) => restore(&mut state.offers, id, prev),
            Self::Purchase(id, prev) => {
                restore(&mut state.purchases, id, prev);
            }
            Self::Reserved(id, quantity) => {
                if let Some(o) = state.offers.get_mut(&id) {
                    o.stock = o.stock.release(quantity).unwrap_or(o.stock);
                }
            }
            Self::Released(id, quantity) => {
                if let Some(o) = state.offers.get_mut(&id) {
                    o.stock = o.stock.reserve(quantity).unwrap_or(o.stock);
                }
            }
        }
    }
}

/// Puts the `prev` value back into the `map`, or removes the `key` if there
/// was no value.
fn restore<K: Eq + Hash, V>(map: &mut HashMap<K, V>, key: K, prev: Option<V>) {
    if let Some(v) = prev {
        _ = map.insert(key, v);
    } else {
        _ = map.remove(&key);
    }
}

/// Locks the provided [`Mutex`] ignoring its poisoning.
///
/// [`State`] is changed only by non-panicking code, so it's never left
/// half-updated.
fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Database<Transact> for Memory {
    type Ok = Self;
    type Err = Traced<database::Error>;

    async fn execute(&self, _: Transact) -> Result<Self::Ok, Self::Err> {
        if self.tx.is_some() {
            return Ok(self.clone());
        }
        Ok(Self {
            state: Arc::clone(&self.state),
            rows: Arc::clone(&self.rows),
            tx: Some(Arc::new(Journal::new(Arc::clone(&self.state)))),
        })
    }
}

impl Database<Commit> for Memory {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(&self, _: Commit) -> Result<Self::Ok, Self::Err> {
        if let Some(tx) = &self.tx {
            tx.forget();
        }
        Ok(())
    }
}

impl Database<Rollback> for Memory {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(&self, _: Rollback) -> Result<Self::Ok, Self::Err> {
        if let Some(tx) = &self.tx {
            tx.discard();
        }
        Ok(())
    }
}

impl Database<Select<By<Option<Sale>, sale::Id>>> for Memory {
    type Ok = Option<Sale>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Sale>, sale::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = by.into_inner();
        Ok(self.apply(|s, _| s.sales.get(&id).cloned()).await)
    }
}

impl Database<Insert<Sale>> for Memory {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(sale): Insert<Sale>,
    ) -> Result<Self::Ok, Self::Err> {
        self.execute(Update(sale)).await.map_err(tracerr::wrap!())
    }
}

impl Database<Update<Sale>> for Memory {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Update(mut sale): Update<Sale>,
    ) -> Result<Self::Ok, Self::Err> {
        let _locked = self.lock_rows([Row::Sale(sale.id)]).await;
        self.apply(|s, undo| {
            let prev = s.sales.get(&sale.id).cloned();
            if let Some(p) = &prev {
                // Authorship is fixed once created.
                sale.created_by = p.created_by.clone();
                sale.created_at = p.created_at;
            }
            undo.push(Undo::Sale(sale.id, prev));
            _ = s.sales.insert(sale.id, sale);
        })
        .await;
        Ok(())
    }
}

impl Database<Delete<By<Sale, sale::Id>>> for Memory {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Delete(by): Delete<By<Sale, sale::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = by.into_inner();
        let offers = self
            .apply(|s, _| {
                s.offers
                    .values()
                    .filter(|o| o.sale_id == id)
                    .map(|o| Row::Offer(o.id))
                    .collect::<Vec<_>>()
            })
            .await;
        let _locked = self
            .lock_rows(std::iter::once(Row::Sale(id)).chain(offers))
            .await;

        self.apply(|s, undo| {
            if s.purchases.values().any(|p| p.sale_id == id) {
                return Err(Error::Referenced("purchases.sale_id"));
            }

            let offers = s
                .offers
                .values()
                .filter(|o| o.sale_id == id)
                .map(|o| o.id)
                .collect::<Vec<_>>();
            for offer_id in offers {
                let prev = s.offers.remove(&offer_id);
                undo.push(Undo::Offer(offer_id, prev));
            }
            let prev = s.sales.remove(&id);
            undo.push(Undo::Sale(id, prev));
            Ok(())
        })
        .await
        .map_err(tracerr::from_and_wrap!(=> database::Error))
    }
}

impl Database<Select<By<read::sale::Overview, sale::Now>>> for Memory {
    type Ok = read::sale::Overview;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<read::sale::Overview, sale::Now>>,
    ) -> Result<Self::Ok, Self::Err> {
        let now = by.into_inner();
        Ok(self
            .apply(|s, _| {
                let current = s
                    .sales
                    .values()
                    .filter(|v| {
                        matches!(
                            v.status_at(now),
                            sale::Status::Live | sale::Status::Suspended,
                        )
                    })
                    .max_by_key(|v| (v.enabled, v.created_at, v.id))
                    .cloned();
                let upcoming = s
                    .sales
                    .values()
                    .filter(|v| v.status_at(now) == sale::Status::Scheduled)
                    .min_by(|a, b| {
                        a.window
                            .start()
                            .cmp(&b.window.start())
                            .then(b.created_at.cmp(&a.created_at))
                            .then(b.id.cmp(&a.id))
                    })
                    .cloned();
                let live_count = s
                    .sales
                    .values()
                    .filter(|v| v.status_at(now).is_live())
                    .count();

                read::sale::Overview {
                    current,
                    upcoming,
                    live_count: u32::try_from(live_count).unwrap_or(u32::MAX),
                    total_count: u32::try_from(s.sales.len())
                        .unwrap_or(u32::MAX),
                }
            })
            .await)
    }
}

impl Database<Select<By<read::sale::HasPurchases, sale::Id>>> for Memory {
    type Ok = read::sale::HasPurchases;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<read::sale::HasPurchases, sale::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = by.into_inner();
        Ok(read::sale::HasPurchases(
            self.apply(|s, _| s.purchases.values().any(|p| p.sale_id == id))
                .await,
        ))
    }
}

impl Database<Select<By<Option<Offer>, offer::Id>>> for Memory {
    type Ok = Option<Offer>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Offer>, offer::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = by.into_inner();
        Ok(self.apply(|s, _| s.offers.get(&id).cloned()).await)
    }
}

impl Database<Select<By<Vec<Offer>, sale::Id>>> for Memory {
    type Ok = Vec<Offer>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Vec<Offer>, sale::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let sale_id = by.into_inner();
        Ok(self
            .apply(|s, _| {
                let mut offers = s
                    .offers
                    .values()
                    .filter(|o| o.sale_id == sale_id)
                    .cloned()
                    .collect::<Vec<_>>();
                offers.sort_by_key(|o| o.id);
                offers
            })
            .await)
    }
}

impl Database<Insert<Offer>> for Memory {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(offer): Insert<Offer>,
    ) -> Result<Self::Ok, Self::Err> {
        let _locked = self.lock_rows([Row::Offer(offer.id)]).await;
        self.apply(|s, undo| {
            if !s.sales.contains_key(&offer.sale_id) {
                return Err(Error::Dangling("offers.sale_id"));
            }
            let prev = s.offers.insert(offer.id, offer.clone());
            undo.push(Undo::Offer(offer.id, prev));
            Ok(())
        })
        .await
        .map_err(tracerr::from_and_wrap!(=> database::Error))
    }
}

impl Database<Reserve<offer::StockChange>> for Memory {
    type Ok = offer::Reservation;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Reserve(change): Reserve<offer::StockChange>,
    ) -> Result<Self::Ok, Self::Err> {
        let offer::StockChange {
            offer_id,
            sale_id,
            quantity,
        } = change;
        let quantity = offer::Quantity::from(quantity);

        let _locked = self.lock_rows([Row::Offer(offer_id)]).await;
        Ok(self
            .apply(|s, undo| {
                let Some(offer) = s
                    .offers
                    .get_mut(&offer_id)
                    .filter(|o| o.sale_id == sale_id)
                else {
                    return offer::Reservation::OfferNotExists;
                };
                let Some(stock) = offer.stock.reserve(quantity) else {
                    return offer::Reservation::InsufficientStock;
                };
                offer.stock = stock;
                undo.push(Undo::Reserved(offer_id, quantity));
                offer::Reservation::Reserved(stock)
            })
            .await)
    }
}

impl Database<Release<offer::StockChange>> for Memory {
    type Ok = offer::Restock;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Release(change): Release<offer::StockChange>,
    ) -> Result<Self::Ok, Self::Err> {
        let offer::StockChange {
            offer_id,
            sale_id,
            quantity,
        } = change;
        let quantity = offer::Quantity::from(quantity);

        let _locked = self.lock_rows([Row::Offer(offer_id)]).await;
        Ok(self
            .apply(|s, undo| {
                let Some(offer) = s
                    .offers
                    .get_mut(&offer_id)
                    .filter(|o| o.sale_id == sale_id)
                else {
                    return offer::Restock::OfferNotExists;
                };
                let Some(stock) = offer.stock.release(quantity) else {
                    return offer::Restock::ExceedsTotal;
                };
                offer.stock = stock;
                undo.push(Undo::Released(offer_id, quantity));
                offer::Restock::Released(stock)
            })
            .await)
    }
}

impl Database<Select<By<Option<Purchase>, purchase::Id>>> for Memory {
    type Ok = Option<Purchase>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Purchase>, purchase::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = by.into_inner();
        Ok(self.apply(|s, _| s.purchases.get(&id).cloned()).await)
    }
}

impl Database<Select<By<Option<Purchase>, (user::Id, sale::Id)>>> for Memory {
    type Ok = Option<Purchase>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Purchase>, (user::Id, sale::Id)>>,
    ) -> Result<Self::Ok, Self::Err> {
        let (user_id, sale_id) = by.into_inner();
        Ok(self
            .apply(|s, _| {
                s.purchases
                    .values()
                    .find(|p| p.user_id == user_id && p.sale_id == sale_id)
                    .cloned()
            })
            .await)
    }
}

impl Database<Select<By<Vec<Purchase>, sale::Id>>> for Memory {
    type Ok = Vec<Purchase>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Vec<Purchase>, sale::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let sale_id = by.into_inner();
        Ok(self
            .apply(|s, _| {
                let mut purchases = s
                    .purchases
                    .values()
                    .filter(|p| p.sale_id == sale_id)
                    .cloned()
                    .collect::<Vec<_>>();
                purchases.sort_by_key(|p| (p.purchased_at, p.id));
                purchases
            })
            .await)
    }
}

impl Database<Insert<Purchase>> for Memory {
    type Ok = purchase::Insertion;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(purchase): Insert<Purchase>,
    ) -> Result<Self::Ok, Self::Err> {
        let _locked = self
            .lock_rows([
                Row::PurchaseOf(purchase.user_id.clone(), purchase.sale_id),
                Row::Purchase(purchase.id),
            ])
            .await;
        self.apply(|s, undo| {
            if s.purchases.values().any(|p| {
                p.user_id == purchase.user_id && p.sale_id == purchase.sale_id
            }) {
                return Ok(purchase::Insertion::Duplicate);
            }
            if !s
                .offers
                .get(&purchase.offer_id)
                .is_some_and(|o| o.sale_id == purchase.sale_id)
            {
                return Err(Error::Dangling("purchases.offer_id"));
            }

            undo.push(Undo::Purchase(purchase.id, None));
            _ = s.purchases.insert(purchase.id, purchase);
            Ok(purchase::Insertion::Inserted)
        })
        .await
        .map_err(tracerr::from_and_wrap!(=> database::Error))
    }
}

impl Database<Update<purchase::Transition>> for Memory {
    type Ok = bool;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Update(transition): Update<purchase::Transition>,
    ) -> Result<Self::Ok, Self::Err> {
        let purchase::Transition {
            purchase_id,
            from,
            to,
        } = transition;

        let _locked = self.lock_rows([Row::Purchase(purchase_id)]).await;
        Ok(self
            .apply(|s, undo| {
                let Some(p) = s
                    .purchases
                    .get_mut(&purchase_id)
                    .filter(|p| p.status == from)
                else {
                    return false;
                };
                undo.push(Undo::Purchase(p.id, Some(p.clone())));
                p.status = to;
                true
            })
            .await)
    }
}

#[cfg(test)]
mod spec {
    use common::{
        operations::{
            By, Commit, Delete, Insert, Reserve, Rollback, Select, Transact,
            Update,
        },
        DateTime, Money,
    };
    use futures::future;

    use crate::{
        domain::{offer, purchase, sale, user, Offer, Purchase, Sale},
        infra::Database as _,
    };

    use super::Memory;

    async fn seed(db: &Memory, total: u32) -> (sale::Id, offer::Id) {
        let now = DateTime::now();
        let sale = Sale {
            id: sale::Id::new(),
            name: sale::Name::new("Spring").unwrap(),
            window: sale::Window::new(
                now.coerce(),
                (now + std::time::Duration::from_secs(3600)).coerce(),
            )
            .unwrap(),
            enabled: true,
            created_by: user::Id::new("admin").unwrap(),
            created_at: now.coerce(),
            updated_at: now.coerce(),
        };
        let offer = Offer {
            id: offer::Id::new(),
            sale_id: sale.id,
            name: offer::Name::new("Widget").unwrap(),
            price: "9.99USD".parse::<Money>().unwrap(),
            stock: offer::Stock::full(units(total)).unwrap(),
        };
        let ids = (sale.id, offer.id);
        db.execute(Insert(sale)).await.unwrap();
        db.execute(Insert(offer)).await.unwrap();
        ids
    }

    fn change(sale_id: sale::Id, offer_id: offer::Id) -> offer::StockChange {
        offer::StockChange {
            offer_id,
            sale_id,
            quantity: purchase::Quantity::ONE,
        }
    }

    fn units(n: u32) -> offer::Quantity {
        offer::Quantity::new(n).unwrap()
    }

    async fn available(db: &Memory, id: offer::Id) -> offer::Quantity {
        db.execute(Select(By::<Option<Offer>, _>::new(id)))
            .await
            .unwrap()
            .unwrap()
            .stock
            .available()
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn never_reserves_more_than_available() {
        let db = Memory::default();
        let (sale_id, offer_id) = seed(&db, 5).await;

        let outcomes = future::join_all((0..20).map(|_| {
            let db = db.clone();
            async move { db.execute(Reserve(change(sale_id, offer_id))).await }
        }))
        .await;

        let reserved = outcomes
            .into_iter()
            .filter(|r| matches!(r, Ok(offer::Reservation::Reserved(_))))
            .count();
        assert_eq!(reserved, 5);
        assert_eq!(available(&db, offer_id).await, offer::Quantity::ZERO);
    }

    #[tokio::test]
    async fn reports_missing_offer() {
        let db = Memory::default();
        let (sale_id, offer_id) = seed(&db, 1).await;

        let res = db
            .execute(Reserve(change(sale::Id::new(), offer_id)))
            .await
            .unwrap();
        assert_eq!(res, offer::Reservation::OfferNotExists);

        let res = db
            .execute(Reserve(change(sale_id, offer::Id::new())))
            .await
            .unwrap();
        assert_eq!(res, offer::Reservation::OfferNotExists);
    }

    #[tokio::test]
    async fn rollback_discards_transaction_changes() {
        let db = Memory::default();
        let (sale_id, offer_id) = seed(&db, 3).await;

        let tx = db.execute(Transact).await.unwrap();
        _ = tx.execute(Reserve(change(sale_id, offer_id))).await.unwrap();
        let inserted = tx
            .execute(Insert(Purchase {
                id: purchase::Id::new(),
                user_id: user::Id::new("alice").unwrap(),
                sale_id,
                offer_id,
                quantity: purchase::Quantity::ONE,
                status: purchase::Status::Completed,
                purchased_at: DateTime::now().coerce(),
            }))
            .await
            .unwrap();
        assert_eq!(inserted, purchase::Insertion::Inserted);
        assert_eq!(available(&db, offer_id).await, units(2));

        tx.execute(Rollback).await.unwrap();

        assert_eq!(available(&db, offer_id).await, units(3));
        let purchases = db
            .execute(Select(By::<Vec<Purchase>, _>::new(sale_id)))
            .await
            .unwrap();
        assert!(purchases.is_empty());
    }

    #[tokio::test]
    async fn dropping_uncommitted_transaction_discards_changes() {
        let db = Memory::default();
        let (sale_id, offer_id) = seed(&db, 3).await;

        {
            let tx = db.execute(Transact).await.unwrap();
            _ = tx.execute(Reserve(change(sale_id, offer_id))).await.unwrap();
        }
        assert_eq!(available(&db, offer_id).await, units(3));

        let tx = db.execute(Transact).await.unwrap();
        _ = tx.execute(Reserve(change(sale_id, offer_id))).await.unwrap();
        tx.execute(Commit).await.unwrap();
        drop(tx);
        assert_eq!(available(&db, offer_id).await, units(2));
    }

    #[tokio::test]
    async fn rollback_keeps_changes_of_others() {
        let db = Memory::default();
        let (sale_id, offer_id) = seed(&db, 3).await;

        let tx = db.execute(Transact).await.unwrap();
        _ = tx.execute(Reserve(change(sale_id, offer_id))).await.unwrap();
        let (other, ()) = future::join(
            db.execute(Reserve(change(sale_id, offer_id))),
            async { tx.execute(Rollback).await.unwrap() },
        )
        .await;

        assert!(matches!(other, Ok(offer::Reservation::Reserved(_))));
        assert_eq!(available(&db, offer_id).await, units(2));
    }

    #[tokio::test]
    async fn reservations_wait_for_uncommitted_ones() {
        let db = Memory::default();
        let (sale_id, offer_id) = seed(&db, 1).await;

        let tx = db.execute(Transact).await.unwrap();
        _ = tx.execute(Reserve(change(sale_id, offer_id))).await.unwrap();

        // The unit taken by the transaction comes back once it's rolled
        // back, so the waiting reservation gets it instead of failing.
        let (other, ()) = future::join(
            async {
                let other = db.execute(Transact).await.unwrap();
                let res = other
                    .execute(Reserve(change(sale_id, offer_id)))
                    .await
                    .unwrap();
                other.execute(Commit).await.unwrap();
                res
            },
            async {
                tokio::task::yield_now().await;
                tx.execute(Rollback).await.unwrap();
            },
        )
        .await;

        assert!(matches!(other, offer::Reservation::Reserved(_)));
        assert_eq!(available(&db, offer_id).await, offer::Quantity::ZERO);
    }

    #[tokio::test]
    async fn rollback_keeps_committed_edits_of_others() {
        let db = Memory::default();
        let (sale_id, _) = seed(&db, 1).await;
        let original = db
            .execute(Select(By::<Option<Sale>, _>::new(sale_id)))
            .await
            .unwrap()
            .unwrap();
        let renamed = |name: &str| Sale {
            name: sale::Name::new(name).unwrap(),
            ..original.clone()
        };

        let tx = db.execute(Transact).await.unwrap();
        tx.execute(Update(renamed("Discarded"))).await.unwrap();
        let (edited, ()) = future::join(
            db.execute(Update(renamed("Committed"))),
            async {
                tokio::task::yield_now().await;
                tx.execute(Rollback).await.unwrap();
            },
        )
        .await;
        edited.unwrap();

        let stored = db
            .execute(Select(By::<Option<Sale>, _>::new(sale_id)))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.name.to_string(), "Committed");
    }

    #[tokio::test]
    async fn rollback_restores_deleted_sale_with_offers() {
        let db = Memory::default();
        let (sale_id, offer_id) = seed(&db, 4).await;

        let tx = db.execute(Transact).await.unwrap();
        tx.execute(Delete(By::<Sale, _>::new(sale_id))).await.unwrap();
        assert!(db
            .execute(Select(By::<Option<Sale>, _>::new(sale_id)))
            .await
            .unwrap()
            .is_none());
        tx.execute(Rollback).await.unwrap();

        assert!(db
            .execute(Select(By::<Option<Sale>, _>::new(sale_id)))
            .await
            .unwrap()
            .is_some());
        assert_eq!(available(&db, offer_id).await, units(4));
    }

    #[tokio::test]
    async fn detects_duplicate_purchase() {
        let db = Memory::default();
        let (sale_id, offer_id) = seed(&db, 3).await;
        let purchase = || Purchase {
            id: purchase::Id::new(),
            user_id: user::Id::new("bob").unwrap(),
            sale_id,
            offer_id,
            quantity: purchase::Quantity::ONE,
            status: purchase::Status::Completed,
            purchased_at: DateTime::now().coerce(),
        };

        let first = db.execute(Insert(purchase())).await.unwrap();
        let second = db.execute(Insert(purchase())).await.unwrap();

        assert_eq!(first, purchase::Insertion::Inserted);
        assert_eq!(second, purchase::Insertion::Duplicate);
    }
}
