//! [`Purchase`]-related [`Database`] implementations.

use common::operations::{By, Insert, Select, Update};
use tokio_postgres::Row;
use tracerr::Traced;

use crate::{
    domain::{purchase, sale, user, Purchase},
    infra::{
        database::{self, postgres::Connection, Postgres},
        Database,
    },
};

/// Builds a [`Purchase`] out of the provided [`Row`].
fn purchase_from_row(row: &Row) -> Purchase {
    Purchase {
        id: row.get("id"),
        user_id: row.get("user_id"),
        sale_id: row.get("sale_id"),
        offer_id: row.get("offer_id"),
        quantity: purchase::Quantity::from_i32(row.get("quantity"))
            .expect("`purchases_quantity_check` constraint"),
        status: row.get("status"),
        purchased_at: row.get("purchased_at"),
    }
}

impl<C> Database<Select<By<Option<Purchase>, purchase::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = Option<Purchase>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Purchase>, purchase::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        // Avoid subtle change for SQL.
        let id: purchase::Id = by.into_inner();

        const SQL: &str = "\
            SELECT id, user_id, sale_id, offer_id, \
                   quantity, status, purchased_at \
            FROM purchases \
            WHERE id = $1::UUID \
            LIMIT 1";
        Ok(self
            .query_opt(SQL, &[&id])
            .await
            .map_err(tracerr::wrap!())?
            .as_ref()
            .map(purchase_from_row))
    }
}

impl<C> Database<Select<By<Option<Purchase>, (user::Id, sale::Id)>>>
    for Postgres<C>
where
    C: Connection,
{
    type Ok = Option<Purchase>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Purchase>, (user::Id, sale::Id)>>,
    ) -> Result<Self::Ok, Self::Err> {
        // Avoid subtle change for SQL.
        let (user_id, sale_id): (user::Id, sale::Id) = by.into_inner();

        const SQL: &str = "\
            SELECT id, user_id, sale_id, offer_id, \
                   quantity, status, purchased_at \
            FROM purchases \
            WHERE user_id = $1::VARCHAR \
              AND sale_id = $2::UUID \
            LIMIT 1";
        Ok(self
            .query_opt(SQL, &[&user_id, &sale_id])
            .await
            .map_err(tracerr::wrap!())?
            .as_ref()
            .map(purchase_from_row))
    }
}

impl<C> Database<Select<By<Vec<Purchase>, sale::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = Vec<Purchase>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Vec<Purchase>, sale::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        // Avoid subtle change for SQL.
        let sale_id: sale::Id = by.into_inner();

        const SQL: &str = "\
            SELECT id, user_id, sale_id, offer_id, \
                   quantity, status, purchased_at \
            FROM purchases \
            WHERE sale_id = $1::UUID \
            ORDER BY purchased_at ASC, id ASC";
        Ok(self
            .query(SQL, &[&sale_id])
            .await
            .map_err(tracerr::wrap!())?
            .iter()
            .map(purchase_from_row)
            .collect())
    }
}

impl<C> Database<Insert<Purchase>> for Postgres<C>
where
    C: Connection,
{
    type Ok = purchase::Insertion;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(purchase): Insert<Purchase>,
    ) -> Result<Self::Ok, Self::Err> {
        let Purchase {
            id,
            user_id,
            sale_id,
            offer_id,
            quantity,
            status,
            purchased_at,
        } = purchase;

        // Conflicts on `purchases_user_id_sale_id_key` only, any other
        // violation is still an error.
        const SQL: &str = "\
            INSERT INTO purchases (\
                id, user_id, sale_id, offer_id, \
                quantity, status, purchased_at\
            ) VALUES (\
                $1::UUID, $2::VARCHAR, $3::UUID, $4::UUID, \
                $5::INT4, $6::INT2, $7::TIMESTAMPTZ\
            ) \
            ON CONFLICT (user_id, sale_id) DO NOTHING";
        let inserted = self
            .exec(
                SQL,
                &[
                    &id,
                    &user_id,
                    &sale_id,
                    &offer_id,
                    &quantity.to_i32(),
                    &status,
                    &purchased_at,
                ],
            )
            .await
            .map_err(tracerr::wrap!())?;

        Ok(if inserted > 0 {
            purchase::Insertion::Inserted
        } else {
            purchase::Insertion::Duplicate
        })
    }
}

impl<C> Database<Update<purchase::Transition>> for Postgres<C>
where
    C: Connection,
{
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

        // Concurrent transitions of the same row wait for each other, and the
        // `status` re-check lets only the first one through.
        const SQL: &str = "\
            UPDATE purchases \
            SET status = $3::INT2 \
            WHERE id = $1::UUID \
              AND status = $2::INT2";
        self.exec(SQL, &[&purchase_id, &from, &to])
            .await
            .map_err(tracerr::wrap!())
            .map(|n| n > 0)
    }
}
