//! [`Purchase`]-related definitions.

use common::DateTime;
use derive_more::{Display, From, Into};
use juniper::{graphql_object, GraphQLEnum, GraphQLScalar};
use service::{domain, query, Query as _};
use uuid::Uuid;

use crate::{api, AsError, Context, Error};

/// A purchase made on a `Sale`.
#[derive(Clone, Debug, From)]
pub struct Purchase(domain::Purchase);

/// A purchase made on a `Sale`.
#[graphql_object(context = Context)]
impl Purchase {
    /// Unique identifier of this `Purchase`.
    pub fn id(&self) -> Id {
        self.0.id.into()
    }

    /// ID of the user who made this `Purchase`.
    pub fn user_id(&self) -> api::user::Id {
        self.0.user_id.clone().into()
    }

    /// `Sale` this `Purchase` was made on.
    pub fn sale(&self) -> api::Sale {
        #[expect(
            unsafe_code,
            reason = "`Purchase` references existing `Sale`"
        )]
        unsafe {
            api::Sale::new_unchecked(self.0.sale_id)
        }
    }

    /// Purchased `Offer`.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `OFFER_NOT_EXISTS` - the `Offer` was removed.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Purchase.offer",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub async fn offer(&self, ctx: &Context) -> Result<api::Offer, Error> {
        ctx.service()
            .execute(query::offer::ById::by(self.0.offer_id))
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())?
            .ok_or_else(|| api::query::OfferError::NotExists.into())
            .map_err(ctx.error())
            .map(Into::into)
    }

    /// Number of purchased units.
    pub fn quantity(&self) -> i32 {
        self.0.quantity.to_i32()
    }

    /// Status of this `Purchase`.
    pub fn status(&self) -> Status {
        self.0.status.into()
    }

    /// `DateTime` when this `Purchase` was made.
    pub fn purchased_at(&self) -> DateTime {
        self.0.purchased_at.coerce()
    }
}

/// Unique identifier of a `Purchase`.
#[derive(Clone, Copy, Debug, Display, Into, From, GraphQLScalar)]
#[from(domain::purchase::Id)]
#[into(domain::purchase::Id)]
#[graphql(name = "PurchaseId", transparent)]
pub struct Id(Uuid);

/// Status of a `Purchase`.
#[derive(Clone, Copy, Debug, Eq, GraphQLEnum, PartialEq)]
#[graphql(name = "PurchaseStatus")]
pub enum Status {
    /// Units are reserved and the `Purchase` is done.
    Completed,

    /// `Purchase` was revoked and its units were released.
    Cancelled,

    /// `Purchase` is awaiting completion.
    Pending,
}

impl From<domain::purchase::Status> for Status {
    fn from(status: domain::purchase::Status) -> Self {
        use domain::purchase::Status as S;
        match status {
            S::Completed => Self::Completed,
            S::Cancelled => Self::Cancelled,
            S::Pending => Self::Pending,
        }
    }
}
