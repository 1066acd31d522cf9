//! [`Query`] collection related to [`Offer`]s.

use common::operations::{By, Select};
use tracerr::Traced;

use crate::{
    domain::{offer, sale, Offer},
    infra::{database, Database},
    Query, Service,
};

use super::DatabaseQuery;

/// Queries an [`Offer`] by its [`offer::Id`].
pub type ById = DatabaseQuery<By<Option<Offer>, offer::Id>>;

/// Queries all the [`Offer`]s of a [`Sale`] by its [`sale::Id`].
///
/// [`Sale`]: crate::domain::Sale
pub type BySale = DatabaseQuery<By<Vec<Offer>, sale::Id>>;

/// [`Query`] for the current [`offer::Stock`] of an [`Offer`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Stock {
    /// ID of the [`Offer`] to query the [`offer::Stock`] of.
    pub offer_id: offer::Id,
}

impl<Db, Au> Query<Stock> for Service<Db, Au>
where
    Db: Database<
        Select<By<Option<Offer>, offer::Id>>,
        Ok = Option<Offer>,
        Err = Traced<database::Error>,
    >,
{
    type Ok = Option<offer::Stock>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Stock { offer_id }: Stock,
    ) -> Result<Self::Ok, Self::Err> {
        Ok(self
            .database()
            .execute(Select(By::<Option<Offer>, _>::new(offer_id)))
            .await
            .map_err(tracerr::wrap!())?
            .map(|o| o.stock))
    }
}

#[cfg(test)]
mod spec {
    use crate::{
        command::AttemptPurchase,
        domain::offer,
        testing, Command as _, Query as _,
    };

    use super::{BySale, Stock};

    #[tokio::test]
    async fn tracks_sold_units() {
        let svc = testing::service();
        let (sale, offer) = testing::live_sale(&svc, 3).await;
        _ = svc
            .execute(AttemptPurchase::single(testing::user(1), sale.id))
            .await
            .unwrap();

        let stock = svc
            .execute(Stock { offer_id: offer.id })
            .await
            .unwrap()
            .unwrap();

        assert_eq!(stock.total(), offer::Quantity::new(3).unwrap());
        assert_eq!(stock.available(), offer::Quantity::new(2).unwrap());
        assert_eq!(stock.sold(), offer::Quantity::new(1).unwrap());
        assert!(!stock.is_sold_out());
    }

    #[tokio::test]
    async fn reports_nothing_for_unknown_offer() {
        let svc = testing::service();

        let stock = svc
            .execute(Stock {
                offer_id: offer::Id::new(),
            })
            .await
            .unwrap();

        assert_eq!(stock, None);
    }

    #[tokio::test]
    async fn lists_offers_of_sale() {
        let svc = testing::service();
        let (sale, offer) = testing::live_sale(&svc, 3).await;
        _ = testing::live_sale(&svc, 3).await;

        let offers = svc.execute(BySale::by(sale.id)).await.unwrap();

        assert_eq!(offers, vec![offer]);
    }
}
