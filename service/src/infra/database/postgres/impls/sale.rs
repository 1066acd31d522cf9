//! [`Sale`]-related [`Database`] implementations.

use common::operations::{By, Delete, Insert, Select, Update};
use tokio_postgres::Row;
use tracerr::Traced;

use crate::{
    domain::{sale, Sale},
    infra::{
        database::{self, postgres::Connection, Postgres},
        Database,
    },
    read,
};

/// Builds a [`Sale`] out of the provided [`Row`].
fn sale_from_row(row: &Row) -> Sale {
    sale_from_columns(row, "")
}

/// Builds a [`Sale`] out of the [`Row`] columns named with the provided
/// `prefix`.
fn sale_from_columns(row: &Row, prefix: &str) -> Sale {
    let col = |name: &str| format!("{prefix}{name}");
    Sale {
        id: row.get(&*col("id")),
        name: row.get(&*col("name")),
        window: sale::Window::new(
            row.get(&*col("start_time")),
            row.get(&*col("end_time")),
        )
        .expect("`sales_window_check` constraint"),
        enabled: row.get(&*col("enabled")),
        created_by: row.get(&*col("created_by")),
        created_at: row.get(&*col("created_at")),
        updated_at: row.get(&*col("updated_at")),
    }
}

impl<C> Database<Select<By<Option<Sale>, sale::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = Option<Sale>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Sale>, sale::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        // Avoid subtle change for SQL.
        let id: sale::Id = by.into_inner();

        const SQL: &str = "\
            SELECT id, name, start_time, end_time, enabled, \
                   created_by, created_at, updated_at \
            FROM sales \
            WHERE id = $1::UUID \
            LIMIT 1";
        Ok(self
            .query_opt(SQL, &[&id])
            .await
            .map_err(tracerr::wrap!())?
            .as_ref()
            .map(sale_from_row))
    }
}

impl<C> Database<Insert<Sale>> for Postgres<C>
where
    C: Connection,
    Self: Database<Update<Sale>, Ok = (), Err = Traced<database::Error>>,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(sale): Insert<Sale>,
    ) -> Result<Self::Ok, Self::Err> {
        self.execute(Update(sale)).await.map_err(tracerr::wrap!())
    }
}

impl<C> Database<Update<Sale>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Update(sale): Update<Sale>,
    ) -> Result<Self::Ok, Self::Err> {
        let Sale {
            id,
            name,
            window,
            enabled,
            created_by,
            created_at,
            updated_at,
        } = sale;

        const SQL: &str = "\
            INSERT INTO sales (\
                id, name, start_time, end_time, enabled, \
                created_by, created_at, updated_at\
            ) VALUES (\
                $1::UUID, $2::VARCHAR, \
                $3::TIMESTAMPTZ, $4::TIMESTAMPTZ, \
                $5::BOOLEAN, \
                $6::VARCHAR, $7::TIMESTAMPTZ, $8::TIMESTAMPTZ\
            ) \
            ON CONFLICT (id) DO UPDATE \
            SET name = EXCLUDED.name, \
                start_time = EXCLUDED.start_time, \
                end_time = EXCLUDED.end_time, \
                enabled = EXCLUDED.enabled, \
                updated_at = EXCLUDED.updated_at";
        self.exec(
            SQL,
            &[
                &id,
                &name,
                &window.start(),
                &window.end(),
                &enabled,
                &created_by,
                &created_at,
                &updated_at,
            ],
        )
        .await
        .map_err(tracerr::wrap!())
        .map(drop)
    }
}

impl<C> Database<Delete<By<Sale, sale::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Delete(by): Delete<By<Sale, sale::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        // Avoid subtle change for SQL.
        let id: sale::Id = by.into_inner();

        // Both fail with a foreign key violation if any purchase still
        // references the sale or its offers.
        const OFFERS_SQL: &str = "\
            DELETE FROM offers \
            WHERE sale_id = $1::UUID";
        _ = self
            .exec(OFFERS_SQL, &[&id])
            .await
            .map_err(tracerr::wrap!())?;

        const SALE_SQL: &str = "\
            DELETE FROM sales \
            WHERE id = $1::UUID";
        self.exec(SALE_SQL, &[&id])
            .await
            .map_err(tracerr::wrap!())
            .map(drop)
    }
}

impl<C> Database<Select<By<read::sale::Overview, sale::Now>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = read::sale::Overview;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<read::sale::Overview, sale::Now>>,
    ) -> Result<Self::Ok, Self::Err> {
        // Avoid subtle change for SQL.
        let now: sale::Now = by.into_inner();

        const SQL: &str = "\
            WITH running AS ( \
                SELECT * \
                FROM sales \
                WHERE start_time <= $1::TIMESTAMPTZ \
                  AND end_time >= $1::TIMESTAMPTZ \
                ORDER BY enabled DESC, created_at DESC, id DESC \
                LIMIT 1 \
            ), upcoming AS ( \
                SELECT * \
                FROM sales \
                WHERE start_time > $1::TIMESTAMPTZ \
                ORDER BY start_time ASC, created_at DESC, id DESC \
                LIMIT 1 \
            ) \
            SELECT r.id AS current_id, r.name AS current_name, \
                   r.start_time AS current_start_time, \
                   r.end_time AS current_end_time, \
                   r.enabled AS current_enabled, \
                   r.created_by AS current_created_by, \
                   r.created_at AS current_created_at, \
                   r.updated_at AS current_updated_at, \
                   n.id AS upcoming_id, n.name AS upcoming_name, \
                   n.start_time AS upcoming_start_time, \
                   n.end_time AS upcoming_end_time, \
                   n.enabled AS upcoming_enabled, \
                   n.created_by AS upcoming_created_by, \
                   n.created_at AS upcoming_created_at, \
                   n.updated_at AS upcoming_updated_at, \
                   (SELECT COUNT(*)::INT4 \
                    FROM sales \
                    WHERE enabled \
                      AND start_time <= $1::TIMESTAMPTZ \
                      AND end_time >= $1::TIMESTAMPTZ) AS live_count, \
                   (SELECT COUNT(*)::INT4 \
                    FROM sales) AS total_count \
            FROM (SELECT 1) AS one \
            LEFT JOIN running r ON TRUE \
            LEFT JOIN upcoming n ON TRUE";
        let row = self
            .query_opt(SQL, &[&now])
            .await
            .map_err(tracerr::wrap!())?
            .expect("always exists");

        let sale = |prefix: &str| {
            row.get::<_, Option<sale::Id>>(&*format!("{prefix}id"))
                .map(|_| sale_from_columns(&row, prefix))
        };
        Ok(read::sale::Overview {
            current: sale("current_"),
            upcoming: sale("upcoming_"),
            live_count: u32::try_from(row.get::<_, i32>("live_count"))
                .expect("`COUNT` is never negative"),
            total_count: u32::try_from(row.get::<_, i32>("total_count"))
                .expect("`COUNT` is never negative"),
        })
    }
}

impl<C> Database<Select<By<read::sale::HasPurchases, sale::Id>>>
    for Postgres<C>
where
    C: Connection,
{
    type Ok = read::sale::HasPurchases;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<read::sale::HasPurchases, sale::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        // Avoid subtle change for SQL.
        let id: sale::Id = by.into_inner();

        const SQL: &str = "\
            SELECT id \
            FROM purchases \
            WHERE sale_id = $1::UUID \
            LIMIT 1";
        self.query_opt(SQL, &[&id])
            .await
            .map_err(tracerr::wrap!())
            .map(|r| read::sale::HasPurchases(r.is_some()))
    }
}
