//! Helpers for [`Service`] tests.

use std::time::Duration;

use common::{
    operations::{By, Select},
    DateTime, Money,
};

use crate::{
    command::{create_sale, CreateSale},
    domain::{offer, purchase, sale, user, Offer, Purchase, Sale},
    infra::{audit, Database as _, Memory},
    Command as _, Service,
};

/// [`Service`] over the [`Memory`] database, collecting audit events.
pub(crate) type TestService = Service<Memory, audit::Collect>;

/// One minute.
pub(crate) const MINUTE: Duration = Duration::from_secs(60);

/// Creates a new empty [`TestService`].
pub(crate) fn service() -> TestService {
    Service::with_audit(Memory::default(), audit::Collect::default())
}

/// Creates a [`user::Id`] numbered with the provided `n`.
pub(crate) fn user(n: usize) -> user::Id {
    user::Id::new(format!("user-{n}")).unwrap()
}

/// Creates an enabled [`Sale`] with the provided window bounds relative to
/// now, and a single [`Offer`] of `total` units.
pub(crate) async fn sale(
    svc: &TestService,
    starts_in: Duration,
    ends_in: Duration,
    total: u32,
) -> (Sale, Offer) {
    let now = DateTime::now();
    svc.execute(CreateSale {
        name: sale::Name::new("Midnight drop").unwrap(),
        start: (now + starts_in).coerce(),
        end: (now + ends_in).coerce(),
        enabled: true,
        created_by: user::Id::new("admin").unwrap(),
        offer: create_sale::NewOffer {
            name: offer::Name::new("Sneakers").unwrap(),
            price: "120.00USD".parse::<Money>().unwrap(),
            total: offer::Quantity::new(total).unwrap(),
        },
    })
    .await
    .unwrap()
}

/// Creates a [`Sale`] being live right now with a single [`Offer`] of
/// `total` units.
pub(crate) async fn live_sale(svc: &TestService, total: u32) -> (Sale, Offer) {
    sale(svc, Duration::ZERO, 60 * MINUTE, total).await
}

/// Returns the current [`offer::Stock`] of the [`Offer`] with the provided
/// [`offer::Id`].
pub(crate) async fn stock(svc: &TestService, id: offer::Id) -> offer::Stock {
    svc.database()
        .execute(Select(By::<Option<Offer>, _>::new(id)))
        .await
        .unwrap()
        .unwrap()
        .stock
}

/// Returns all the stored [`Purchase`]s of the [`Sale`] with the provided
/// [`sale::Id`].
pub(crate) async fn purchases(
    svc: &TestService,
    id: sale::Id,
) -> Vec<Purchase> {
    svc.database()
        .execute(Select(By::<Vec<Purchase>, _>::new(id)))
        .await
        .unwrap()
}

/// Returns the number of [`purchase::Status::Completed`] [`Purchase`]s among
/// the provided ones.
pub(crate) fn completed(purchases: &[Purchase]) -> usize {
    purchases
        .iter()
        .filter(|p| p.status == purchase::Status::Completed)
        .count()
}
