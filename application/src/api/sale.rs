//! [`Sale`]-related definitions.

use std::future;

use common::{DateTime, Handler as _};
use derive_more::{AsRef, Display, From, Into};
use futures::TryFutureExt as _;
use juniper::{graphql_object, GraphQLEnum, GraphQLScalar};
use service::{domain, query, read};
use tokio::sync::OnceCell;
use uuid::Uuid;

use crate::{
    api::{self, scalar},
    AsError, Context, Error,
};

/// A flash sale.
#[derive(Clone, Debug)]
pub struct Sale {
    /// ID of this [`Sale`].
    id: Id,

    /// Underlying [`domain::Sale`].
    sale: OnceCell<domain::Sale>,
}

impl From<domain::Sale> for Sale {
    fn from(sale: domain::Sale) -> Self {
        Self {
            id: sale.id.into(),
            sale: OnceCell::new_with(Some(sale)),
        }
    }
}

impl Sale {
    /// Creates a new [`Sale`] with the provided ID.
    ///
    /// # Safety
    ///
    /// Caller must ensure that [`Sale`] with the provided ID exists,
    /// otherwise accessing this [`Sale`] will result with an error.
    #[expect(unsafe_code, reason = "bypass")]
    #[must_use]
    pub unsafe fn new_unchecked(id: impl Into<Id>) -> Self {
        Self {
            id: id.into(),
            sale: OnceCell::new(),
        }
    }

    /// Returns the underlying [`domain::Sale`].
    ///
    /// # Errors
    ///
    /// Errors if the [`domain::Sale`] doesn't exist.
    async fn sale(&self, ctx: &Context) -> Result<&domain::Sale, Error> {
        let id = self.id.into();
        self.sale
            .get_or_try_init(|| {
                ctx.service()
                    .execute(query::sale::ById::by(id))
                    .map_err(AsError::into_error)
                    .map_err(ctx.error())
                    .and_then(|s| {
                        future::ready(s.ok_or_else(|| {
                            api::query::SaleError::NotExists.into()
                        }))
                    })
            })
            .await
    }
}

/// A flash sale.
#[graphql_object(context = Context)]
impl Sale {
    /// Unique identifier of this `Sale`.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Sale.id",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub fn id(&self) -> Id {
        self.id
    }

    /// Name of this `Sale`.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Sale.name",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub async fn name(&self, ctx: &Context) -> Result<Name, Error> {
        Ok(self.sale(ctx).await?.name.clone().into())
    }

    /// `DateTime` when this `Sale` starts accepting purchases.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Sale.startTime",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub async fn start_time(&self, ctx: &Context) -> Result<DateTime, Error> {
        Ok(self.sale(ctx).await?.window.start().coerce())
    }

    /// `DateTime` when this `Sale` stops accepting purchases.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Sale.endTime",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub async fn end_time(&self, ctx: &Context) -> Result<DateTime, Error> {
        Ok(self.sale(ctx).await?.window.end().coerce())
    }

    /// Indicator whether this `Sale` is switched on.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Sale.enabled",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub async fn enabled(&self, ctx: &Context) -> Result<bool, Error> {
        Ok(self.sale(ctx).await?.enabled)
    }

    /// Status of this `Sale` at the moment.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Sale.status",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub async fn status(&self, ctx: &Context) -> Result<Status, Error> {
        Ok(self.sale(ctx).await?.status_at(DateTime::now()).into())
    }

    /// ID of the user who created this `Sale`.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Sale.createdBy",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub async fn created_by(
        &self,
        ctx: &Context,
    ) -> Result<api::user::Id, Error> {
        Ok(self.sale(ctx).await?.created_by.clone().into())
    }

    /// `DateTime` when this `Sale` was created.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Sale.createdAt",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub async fn created_at(&self, ctx: &Context) -> Result<DateTime, Error> {
        Ok(self.sale(ctx).await?.created_at.coerce())
    }

    /// `DateTime` when this `Sale` was updated last time.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Sale.updatedAt",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub async fn updated_at(&self, ctx: &Context) -> Result<DateTime, Error> {
        Ok(self.sale(ctx).await?.updated_at.coerce())
    }

    /// `Offer`s put on this `Sale`.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Sale.offers",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub async fn offers(
        &self,
        ctx: &Context,
    ) -> Result<Vec<api::Offer>, Error> {
        ctx.service()
            .execute(query::offer::BySale::by(self.id.into()))
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(|offers| offers.into_iter().map(Into::into).collect())
    }
}

/// Unique identifier of a `Sale`.
#[derive(Clone, Copy, Debug, Display, Into, From, GraphQLScalar)]
#[from(domain::sale::Id)]
#[into(domain::sale::Id)]
#[graphql(name = "SaleId", transparent)]
pub struct Id(Uuid);

/// Name of a `Sale`.
#[derive(AsRef, Clone, Debug, Display, From, GraphQLScalar, Into)]
#[graphql(name = "SaleName", with = scalar::Via::<domain::sale::Name>)]
pub struct Name(domain::sale::Name);

/// Status of a `Sale` at some moment.
#[derive(Clone, Copy, Debug, Eq, GraphQLEnum, PartialEq)]
#[graphql(name = "SaleStatus")]
pub enum Status {
    /// Window hasn't opened yet.
    Scheduled,

    /// Purchases are accepted.
    Live,

    /// Inside the window, but switched off.
    Suspended,

    /// Window has already closed.
    Ended,
}

impl From<domain::sale::Status> for Status {
    fn from(status: domain::sale::Status) -> Self {
        use domain::sale::Status as S;
        match status {
            S::Scheduled => Self::Scheduled,
            S::Live => Self::Live,
            S::Suspended => Self::Suspended,
            S::Ended => Self::Ended,
        }
    }
}

/// Current state of flash sales.
#[derive(Clone, Debug)]
pub struct CurrentStatus(read::sale::CurrentStatus);

impl From<read::sale::CurrentStatus> for CurrentStatus {
    fn from(status: read::sale::CurrentStatus) -> Self {
        Self(status)
    }
}

/// Current state of flash sales.
#[graphql_object(context = Context)]
impl CurrentStatus {
    /// Status of the current `Sale`.
    ///
    /// `SCHEDULED` if only an upcoming `Sale` exists, `ENDED` if all the
    /// `Sale`s are over, and `null` if there are no `Sale`s at all.
    pub fn status(&self) -> Option<Status> {
        self.0.status.map(Into::into)
    }

    /// `Sale` whose window contains the current moment.
    ///
    /// If several do, the most recently created enabled one is returned.
    pub fn current_sale(&self) -> Option<Sale> {
        self.0.current.clone().map(Into::into)
    }

    /// Nearest `Sale` not started yet.
    pub fn upcoming_sale(&self) -> Option<Sale> {
        self.0.upcoming.clone().map(Into::into)
    }

    /// Number of `Sale`s accepting purchases right now.
    pub fn live_count(&self) -> i32 {
        i32::try_from(self.0.live_count).unwrap_or(i32::MAX)
    }

    /// Number of all the `Sale`s.
    pub fn total_count(&self) -> i32 {
        i32::try_from(self.0.total_count).unwrap_or(i32::MAX)
    }
}
