//! [`Query`] collection related to [`Purchase`]s.

use common::operations::By;

use crate::domain::{purchase, sale, user, Purchase};
#[cfg(doc)]
use crate::{domain::Sale, Query};

use super::DatabaseQuery;

/// Queries a [`Purchase`] by its [`purchase::Id`].
pub type ById = DatabaseQuery<By<Option<Purchase>, purchase::Id>>;

/// Queries a [`Purchase`] of a [`user`] in a [`Sale`].
pub type ByUserAndSale =
    DatabaseQuery<By<Option<Purchase>, (user::Id, sale::Id)>>;

/// Queries all the [`Purchase`]s made in a [`Sale`].
pub type BySale = DatabaseQuery<By<Vec<Purchase>, sale::Id>>;

#[cfg(test)]
mod spec {
    use crate::{
        command::{AttemptPurchase, CancelPurchase},
        domain::purchase,
        testing, Command as _, Query as _,
    };

    use super::{ById, BySale, ByUserAndSale};

    #[tokio::test]
    async fn finds_purchases_of_user_and_sale() {
        let svc = testing::service();
        let (sale, _) = testing::live_sale(&svc, 3).await;
        let first = svc
            .execute(AttemptPurchase::single(testing::user(1), sale.id))
            .await
            .unwrap();
        let second = svc
            .execute(AttemptPurchase::single(testing::user(2), sale.id))
            .await
            .unwrap();
        _ = svc
            .execute(CancelPurchase {
                purchase_id: second.id,
            })
            .await
            .unwrap();

        let found = svc
            .execute(ByUserAndSale::by((testing::user(1), sale.id)))
            .await
            .unwrap();
        assert_eq!(found, Some(first));

        let found = svc.execute(ById::by(second.id)).await.unwrap().unwrap();
        assert_eq!(found.status, purchase::Status::Cancelled);

        let all = svc.execute(BySale::by(sale.id)).await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(testing::completed(&all), 1);
        assert!(svc
            .execute(ByUserAndSale::by((testing::user(3), sale.id)))
            .await
            .unwrap()
            .is_none());
    }
}
