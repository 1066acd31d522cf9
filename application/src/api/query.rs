//! GraphQL [`Query`]s definitions.

use juniper::graphql_object;
use service::{query, Query as _};

use crate::{api, define_error, AsError, Context, Error};

/// Root of all GraphQL queries.
#[derive(Clone, Copy, Debug)]
pub struct Query;

impl Query {
    /// Name of the [`tracing::Span`] for the queries.
    pub(crate) const SPAN_NAME: &'static str = "GraphQL query";
}

#[graphql_object(context = Context)]
impl Query {
    /// Returns the current state of flash sales: the `Sale` accepting
    /// purchases right now (if any), the nearest upcoming one, and counters.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "currentStatus",
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn current_status(
        ctx: &Context,
    ) -> Result<api::sale::CurrentStatus, Error> {
        ctx.service()
            .execute(query::sale::CurrentStatus::now())
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(Into::into)
    }

    /// Returns the `Sale` with the specified ID.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `SALE_NOT_EXISTS` - the `Sale` with the specified ID does not exist.
    #[tracing::instrument(
        skip_all,
        fields(
            id = %id,
            gql.name = "sale",
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn sale(
        id: api::sale::Id,
        ctx: &Context,
    ) -> Result<api::Sale, Error> {
        ctx.service()
            .execute(query::sale::ById::by(id.into()))
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())?
            .ok_or_else(|| SaleError::NotExists.into())
            .map_err(ctx.error())
            .map(Into::into)
    }

    /// Returns the `Offer` with the specified ID.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `OFFER_NOT_EXISTS` - the `Offer` with the specified ID does not
    ///                        exist.
    #[tracing::instrument(
        skip_all,
        fields(
            id = %id,
            gql.name = "offer",
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn offer(
        id: api::offer::Id,
        ctx: &Context,
    ) -> Result<api::Offer, Error> {
        ctx.service()
            .execute(query::offer::ById::by(id.into()))
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())?
            .ok_or_else(|| OfferError::NotExists.into())
            .map_err(ctx.error())
            .map(Into::into)
    }

    /// Returns the units counters of the `Offer` with the specified ID.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `OFFER_NOT_EXISTS` - the `Offer` with the specified ID does not
    ///                        exist.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "offerStatus",
            offer_id = %offer_id,
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn offer_status(
        offer_id: api::offer::Id,
        ctx: &Context,
    ) -> Result<api::offer::Stock, Error> {
        ctx.service()
            .execute(query::offer::Stock {
                offer_id: offer_id.into(),
            })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())?
            .ok_or_else(|| OfferError::NotExists.into())
            .map_err(ctx.error())
            .map(Into::into)
    }

    /// Returns the `Purchase` made by the current user on the `Sale` with
    /// the specified ID, if any.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `USER_ID_REQUIRED` - the `X-User-Id` header is missing.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "myPurchase",
            otel.name = Self::SPAN_NAME,
            sale_id = %sale_id,
        ),
    )]
    pub async fn my_purchase(
        sale_id: api::sale::Id,
        ctx: &Context,
    ) -> Result<Option<api::Purchase>, Error> {
        let my_id = ctx.user_id()?;
        ctx.service()
            .execute(query::purchase::ByUserAndSale::by((
                my_id,
                sale_id.into(),
            )))
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(|p| p.map(Into::into))
    }

    /// Returns all the `Purchase`s made on the `Sale` with the specified ID.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "salePurchases",
            otel.name = Self::SPAN_NAME,
            sale_id = %sale_id,
        ),
    )]
    pub async fn sale_purchases(
        sale_id: api::sale::Id,
        ctx: &Context,
    ) -> Result<Vec<api::Purchase>, Error> {
        ctx.service()
            .execute(query::purchase::BySale::by(sale_id.into()))
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(|ps| ps.into_iter().map(Into::into).collect())
    }
}

define_error! {
    enum OfferError {
        #[code = "OFFER_NOT_EXISTS"]
        #[status = NOT_FOUND]
        #[message = "`Offer` with the specified ID does not exist"]
        NotExists,
    }
}

define_error! {
    enum SaleError {
        #[code = "SALE_NOT_EXISTS"]
        #[status = NOT_FOUND]
        #[message = "`Sale` with the specified ID does not exist"]
        NotExists,
    }
}
