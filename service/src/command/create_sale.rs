//! [`Command`] for creating a new [`Sale`].

use common::{
    operations::{Commit, Insert, Transact, Transacted},
    DateTime, Money,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    domain::{offer, sale, user, Offer, Sale},
    infra::{database, Database},
    Service,
};

use super::Command;

/// [`Command`] for creating a new [`Sale`] together with its single
/// [`Offer`].
#[derive(Clone, Debug)]
pub struct CreateSale {
    /// Name of a new [`Sale`].
    pub name: sale::Name,

    /// [`DateTime`] when a new [`Sale`] starts.
    pub start: sale::StartDateTime,

    /// [`DateTime`] when a new [`Sale`] ends.
    pub end: sale::EndDateTime,

    /// Indicator whether a new [`Sale`] is enabled.
    pub enabled: bool,

    /// ID of the [`user`] creating a new [`Sale`].
    pub created_by: user::Id,

    /// [`Offer`] to put on a new [`Sale`].
    pub offer: NewOffer,
}

/// [`Offer`] to be created along with a [`Sale`].
#[derive(Clone, Debug)]
pub struct NewOffer {
    /// Name of a new [`Offer`].
    pub name: offer::Name,

    /// Price of a single unit.
    pub price: Money,

    /// Total number of units to sell.
    pub total: offer::Quantity,
}

impl<Db, Au> Command<CreateSale> for Service<Db, Au>
where
    Db: Database<Transact, Err = Traced<database::Error>>,
    Transacted<Db>: Database<Insert<Sale>, Err = Traced<database::Error>>
        + Database<Insert<Offer>, Err = Traced<database::Error>>
        + Database<Commit, Err = Traced<database::Error>>,
{
    type Ok = (Sale, Offer);
    type Err = Traced<ExecutionError>;

    async fn execute(&self, cmd: CreateSale) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let CreateSale {
            name,
            start,
            end,
            enabled,
            created_by,
            offer,
        } = cmd;

        let window = sale::Window::new(start, end)
            .ok_or(E::InvalidWindow)
            .map_err(tracerr::wrap!())?;
        if !offer.price.is_positive() {
            return Err(tracerr::new!(E::NonPositivePrice));
        }
        let stock = offer::Stock::full(offer.total)
            .ok_or(E::ZeroQuantity)
            .map_err(tracerr::wrap!())?;

        let now = DateTime::now();
        let sale = Sale {
            id: sale::Id::new(),
            name,
            window,
            enabled,
            created_by,
            created_at: now.coerce(),
            updated_at: now.coerce(),
        };
        let offer = Offer {
            id: offer::Id::new(),
            sale_id: sale.id,
            name: offer.name,
            price: offer.price,
            stock,
        };

        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        tx.execute(Insert(sale.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;
        tx.execute(Insert(offer.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        Ok((sale, offer))
    }
}

/// Error of [`CreateSale`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    #[from]
    Db(database::Error),

    /// [`Sale`] doesn't end strictly after it starts.
    #[display("`Sale` must end strictly after it starts")]
    InvalidWindow,

    /// [`Offer`] price is not positive.
    #[display("`Offer` price must be positive")]
    NonPositivePrice,

    /// [`Offer`] has no units to sell.
    #[display("`Offer` must have at least one unit")]
    ZeroQuantity,
}

#[cfg(test)]
mod spec {
    use common::{DateTime, Money};

    use crate::{
        command::create_sale::ExecutionError,
        domain::{offer, sale, user},
        testing::{self, MINUTE},
        Command as _,
    };

    use super::{CreateSale, NewOffer};

    fn cmd(start_in: u32, end_in: u32) -> CreateSale {
        let now = DateTime::now();
        CreateSale {
            name: sale::Name::new("Clearance").unwrap(),
            start: (now + start_in * MINUTE).coerce(),
            end: (now + end_in * MINUTE).coerce(),
            enabled: true,
            created_by: user::Id::new("admin").unwrap(),
            offer: NewOffer {
                name: offer::Name::new("Hoodie").unwrap(),
                price: "49.90EUR".parse::<Money>().unwrap(),
                total: offer::Quantity::new(10).unwrap(),
            },
        }
    }

    #[tokio::test]
    async fn creates_sale_with_full_stock() {
        let svc = testing::service();

        let (sale, offer) = svc.execute(cmd(10, 360)).await.unwrap();

        assert_eq!(offer.sale_id, sale.id);
        assert_eq!(offer.stock.total(), offer::Quantity::new(10).unwrap());
        assert_eq!(offer.stock.available(), offer::Quantity::new(10).unwrap());
        assert_eq!(testing::stock(&svc, offer.id).await, offer.stock);
        assert_eq!(
            sale.status_at(DateTime::now()),
            sale::Status::Scheduled,
        );
    }

    #[tokio::test]
    async fn rejects_non_positive_window() {
        let svc = testing::service();

        let err = svc.execute(cmd(10, 10)).await.unwrap_err();
        assert!(matches!(err.as_ref(), ExecutionError::InvalidWindow));

        let err = svc.execute(cmd(10, 5)).await.unwrap_err();
        assert!(matches!(err.as_ref(), ExecutionError::InvalidWindow));
    }

    #[tokio::test]
    async fn rejects_invalid_offer() {
        let svc = testing::service();

        let mut free = cmd(10, 20);
        free.offer.price = "0USD".parse().unwrap();
        let err = svc.execute(free).await.unwrap_err();
        assert!(matches!(err.as_ref(), ExecutionError::NonPositivePrice));

        let mut empty = cmd(10, 20);
        empty.offer.total = offer::Quantity::ZERO;
        let err = svc.execute(empty).await.unwrap_err();
        assert!(matches!(err.as_ref(), ExecutionError::ZeroQuantity));
    }
}
