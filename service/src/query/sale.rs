//! [`Query`] collection related to [`Sale`]s.

use common::{
    operations::{By, Select},
    DateTime,
};
use tracerr::Traced;

use crate::{
    domain::{sale, Sale},
    infra::{database, Database},
    read, Query, Service,
};

use super::DatabaseQuery;

/// Queries a [`Sale`] by its [`sale::Id`].
pub type ById = DatabaseQuery<By<Option<Sale>, sale::Id>>;

/// [`Query`] for the [`read::sale::CurrentStatus`] of flash sales.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct CurrentStatus {
    /// Moment to evaluate the [`read::sale::CurrentStatus`] at.
    pub at: sale::Now,
}

impl CurrentStatus {
    /// Creates a new [`CurrentStatus`] [`Query`] evaluated at the current
    /// moment.
    #[must_use]
    pub fn now() -> Self {
        Self {
            at: DateTime::now().coerce(),
        }
    }
}

impl<Db, Au> Query<CurrentStatus> for Service<Db, Au>
where
    Db: Database<
        Select<By<read::sale::Overview, sale::Now>>,
        Ok = read::sale::Overview,
        Err = Traced<database::Error>,
    >,
{
    type Ok = read::sale::CurrentStatus;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        CurrentStatus { at }: CurrentStatus,
    ) -> Result<Self::Ok, Self::Err> {
        let overview = self
            .database()
            .execute(Select(By::<read::sale::Overview, _>::new(at)))
            .await
            .map_err(tracerr::wrap!())?;

        Ok(read::sale::CurrentStatus::new(overview, at))
    }
}

#[cfg(test)]
mod spec {
    use std::time::Duration;

    use common::DateTime;

    use crate::{
        command::UpdateSale,
        domain::sale,
        testing::{self, MINUTE},
        Command as _, Query as _,
    };

    use super::CurrentStatus;

    #[tokio::test]
    async fn reports_nothing_without_sales() {
        let svc = testing::service();

        let status = svc.execute(CurrentStatus::now()).await.unwrap();

        assert_eq!(status.status, None);
        assert_eq!(status.current, None);
        assert_eq!(status.upcoming, None);
        assert_eq!((status.live_count, status.total_count), (0, 0));
    }

    #[tokio::test]
    async fn reports_live_sale_and_nearest_upcoming() {
        let svc = testing::service();
        let (live, _) = testing::live_sale(&svc, 5).await;
        let (soon, _) =
            testing::sale(&svc, 10 * MINUTE, 120 * MINUTE, 5).await;
        _ = testing::sale(&svc, 30 * MINUTE, 120 * MINUTE, 5).await;

        let status = svc.execute(CurrentStatus::now()).await.unwrap();

        assert_eq!(status.status, Some(sale::Status::Live));
        assert_eq!(status.current.map(|s| s.id), Some(live.id));
        assert_eq!(status.upcoming.map(|s| s.id), Some(soon.id));
        assert_eq!((status.live_count, status.total_count), (1, 3));
    }

    #[tokio::test]
    async fn prefers_most_recently_created_live_sale() {
        let svc = testing::service();
        _ = testing::live_sale(&svc, 5).await;
        // Creation timestamps have microsecond precision.
        std::thread::sleep(Duration::from_millis(2));
        let (latest, _) = testing::live_sale(&svc, 5).await;

        let status = svc.execute(CurrentStatus::now()).await.unwrap();

        assert_eq!(status.current.map(|s| s.id), Some(latest.id));
        assert_eq!(status.live_count, 2);
    }

    #[tokio::test]
    async fn reports_disabled_sale_inside_window() {
        let svc = testing::service();
        let (sale, _) = testing::live_sale(&svc, 5).await;
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

        let status = svc.execute(CurrentStatus::now()).await.unwrap();

        assert_eq!(status.status, Some(sale::Status::Suspended));
        assert_eq!(status.current.map(|s| s.id), Some(sale.id));
        assert_eq!(status.live_count, 0);
    }

    #[tokio::test]
    async fn reports_scheduled_and_ended() {
        let svc = testing::service();
        let (sale, _) =
            testing::sale(&svc, 10 * MINUTE, 60 * MINUTE, 5).await;

        let status = svc.execute(CurrentStatus::now()).await.unwrap();
        assert_eq!(status.status, Some(sale::Status::Scheduled));
        assert_eq!(status.current, None);

        let status = svc
            .execute(CurrentStatus {
                at: (DateTime::now() + 90 * MINUTE).coerce(),
            })
            .await
            .unwrap();
        assert_eq!(status.status, Some(sale::Status::Ended));
        assert_eq!(status.upcoming, None);
        assert_eq!(status.total_count, 1);
        assert_eq!(status.current, None);
        assert_eq!(sale.status_at(DateTime::now()), sale::Status::Scheduled);
    }
}
