//! [`Offer`]-related [`Database`] implementations.

use common::{
    operations::{By, Insert, Release, Reserve, Select},
    Money,
};
use tokio_postgres::Row;
use tracerr::Traced;

use crate::{
    domain::{offer, sale, Offer},
    infra::{
        database::{self, postgres::Connection, Postgres},
        Database,
    },
};

/// Builds an [`Offer`] out of the provided [`Row`].
fn offer_from_row(row: &Row) -> Offer {
    Offer {
        id: row.get("id"),
        sale_id: row.get("sale_id"),
        name: row.get("name"),
        price: Money {
            amount: row.get("price"),
            currency: row.get("price_currency"),
        },
        stock: stock_from_row(row),
    }
}

/// Builds an [`offer::Stock`] out of the provided [`Row`].
fn stock_from_row(row: &Row) -> offer::Stock {
    offer::Stock::new(
        offer::Quantity::from_i32(row.get("total_quantity"))
            .expect("`offers_total_quantity_check` constraint"),
        offer::Quantity::from_i32(row.get("available_quantity"))
            .expect("`offers_available_quantity_check` constraint"),
    )
    .expect("`offers_available_quantity_check` constraint")
}

impl<C> Database<Select<By<Option<Offer>, offer::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = Option<Offer>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Offer>, offer::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        // Avoid subtle change for SQL.
        let id: offer::Id = by.into_inner();

        const SQL: &str = "\
            SELECT id, sale_id, name, price, price_currency, \
                   total_quantity, available_quantity \
            FROM offers \
            WHERE id = $1::UUID \
            LIMIT 1";
        Ok(self
            .query_opt(SQL, &[&id])
            .await
            .map_err(tracerr::wrap!())?
            .as_ref()
            .map(offer_from_row))
    }
}

impl<C> Database<Select<By<Vec<Offer>, sale::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = Vec<Offer>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Vec<Offer>, sale::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        // Avoid subtle change for SQL.
        let sale_id: sale::Id = by.into_inner();

        const SQL: &str = "\
            SELECT id, sale_id, name, price, price_currency, \
                   total_quantity, available_quantity \
            FROM offers \
            WHERE sale_id = $1::UUID \
            ORDER BY id ASC";
        Ok(self
            .query(SQL, &[&sale_id])
            .await
            .map_err(tracerr::wrap!())?
            .iter()
            .map(offer_from_row)
            .collect())
    }
}

impl<C> Database<Insert<Offer>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(offer): Insert<Offer>,
    ) -> Result<Self::Ok, Self::Err> {
        let Offer {
            id,
            sale_id,
            name,
            price,
            stock,
        } = offer;

        const SQL: &str = "\
            INSERT INTO offers (\
                id, sale_id, name, price, price_currency, \
                total_quantity, available_quantity\
            ) VALUES (\
                $1::UUID, $2::UUID, $3::VARCHAR, \
                $4::NUMERIC, $5::INT2, \
                $6::INT4, $7::INT4\
            )";
        self.exec(
            SQL,
            &[
                &id,
                &sale_id,
                &name,
                &price.amount,
                &price.currency,
                &stock.total().to_i32(),
                &stock.available().to_i32(),
            ],
        )
        .await
        .map_err(tracerr::wrap!())
        .map(drop)
    }
}

impl<C> Database<Reserve<offer::StockChange>> for Postgres<C>
where
    C: Connection,
{
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

        // Single conditional statement: the row lock taken by `UPDATE`
        // serializes concurrent reservations, and the `WHERE` re-check
        // happens against the latest committed value.
        const SQL: &str = "\
            UPDATE offers \
            SET available_quantity = available_quantity - $3::INT4 \
            WHERE id = $1::UUID \
              AND sale_id = $2::UUID \
              AND available_quantity >= $3::INT4 \
            RETURNING total_quantity, available_quantity";
        let row = self
            .query_opt(SQL, &[&offer_id, &sale_id, &quantity.to_i32()])
            .await
            .map_err(tracerr::wrap!())?;
        if let Some(row) = row {
            return Ok(offer::Reservation::Reserved(stock_from_row(&row)));
        }

        if self.offer_exists(offer_id, sale_id).await? {
            Ok(offer::Reservation::InsufficientStock)
        } else {
            Ok(offer::Reservation::OfferNotExists)
        }
    }
}

impl<C> Database<Release<offer::StockChange>> for Postgres<C>
where
    C: Connection,
{
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

        const SQL: &str = "\
            UPDATE offers \
            SET available_quantity = available_quantity + $3::INT4 \
            WHERE id = $1::UUID \
              AND sale_id = $2::UUID \
              AND available_quantity + $3::INT4 <= total_quantity \
            RETURNING total_quantity, available_quantity";
        let row = self
            .query_opt(SQL, &[&offer_id, &sale_id, &quantity.to_i32()])
            .await
            .map_err(tracerr::wrap!())?;
        if let Some(row) = row {
            return Ok(offer::Restock::Released(stock_from_row(&row)));
        }

        if self.offer_exists(offer_id, sale_id).await? {
            Ok(offer::Restock::ExceedsTotal)
        } else {
            Ok(offer::Restock::OfferNotExists)
        }
    }
}

impl<C> Postgres<C>
where
    C: Connection,
{
    /// Checks whether the [`Offer`] with the provided [`offer::Id`] exists in
    /// the [`Sale`] with the provided [`sale::Id`].
    ///
    /// [`Sale`]: crate::domain::Sale
    async fn offer_exists(
        &self,
        offer_id: offer::Id,
        sale_id: sale::Id,
    ) -> Result<bool, Traced<database::Error>> {
        const SQL: &str = "\
            SELECT id \
            FROM offers \
            WHERE id = $1::UUID \
              AND sale_id = $2::UUID \
            LIMIT 1";
        self.query_opt(SQL, &[&offer_id, &sale_id])
            .await
            .map_err(tracerr::wrap!())
            .map(|r| r.is_some())
    }
}
