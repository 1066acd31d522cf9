//! GraphQL [`Mutation`]s definitions.

use common::DateTime;
use juniper::graphql_object;
use service::{command, domain, Command as _};

use crate::{api, define_error, AsError, Context, Error};

/// Root of all GraphQL mutations.
#[derive(Clone, Copy, Debug)]
pub struct Mutation;

impl Mutation {
    /// Name of the [`tracing::Span`] for the mutations.
    const SPAN_NAME: &'static str = "GraphQL mutation";
}

#[graphql_object(context = Context)]
impl Mutation {
    /// Attempts to purchase units of an `Offer` on the `Sale` as the current
    /// user.
    ///
    /// If `offerId` is omitted, the single `Offer` of the `Sale` is
    /// purchased. A user may purchase on a `Sale` only once.
    ///
    /// Repeating the same attempt is safe: it never produces a second
    /// `Purchase`.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `ALREADY_PURCHASED` - the current user has already purchased on the
    ///                         `Sale`;
    /// - `INVALID_QUANTITY` - the provided `quantity` is not positive;
    /// - `NOT_ELIGIBLE` - the `Sale` doesn't accept purchases at the moment;
    /// - `OFFER_NOT_EXISTS` - the `Offer` does not exist in the `Sale`;
    /// - `SALE_NOT_EXISTS` - the `Sale` does not exist;
    /// - `SOLD_OUT` - not enough units are left;
    /// - `USER_ID_REQUIRED` - the `X-User-Id` header is missing.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "attemptPurchase",
            offer_id = ?offer_id.map(|id| id.to_string()),
            otel.name = Self::SPAN_NAME,
            quantity = ?quantity,
            sale_id = %sale_id,
        ),
    )]
    pub async fn attempt_purchase(
        sale_id: api::sale::Id,
        offer_id: Option<api::offer::Id>,
        quantity: Option<i32>,
        ctx: &Context,
    ) -> Result<api::Purchase, Error> {
        let user_id = ctx.user_id()?;
        let quantity = quantity
            .map_or(Some(domain::purchase::Quantity::ONE), |q| {
                domain::purchase::Quantity::from_i32(q)
            })
            .ok_or_else(|| api::QuantityError::NotPositive.into())
            .map_err(ctx.error())?;

        ctx.service()
            .execute(command::AttemptPurchase {
                user_id,
                sale_id: sale_id.into(),
                offer_id: offer_id.map(Into::into),
                quantity,
            })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(Into::into)
    }

    /// Cancels the `Purchase` with the provided ID, putting its units back
    /// on sale.
    ///
    /// The user still can't purchase on the same `Sale` again.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `PURCHASE_NOT_COMPLETED` - the `Purchase` is not completed;
    /// - `PURCHASE_NOT_EXISTS` - the `Purchase` does not exist.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "cancelPurchase",
            id = %id,
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn cancel_purchase(
        id: api::purchase::Id,
        ctx: &Context,
    ) -> Result<api::Purchase, Error> {
        ctx.service()
            .execute(command::CancelPurchase {
                purchase_id: id.into(),
            })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(Into::into)
    }

    /// Creates a new `Sale` with a single `Offer`.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `INVALID_QUANTITY` - the `Offer` total quantity is not positive;
    /// - `INVALID_SALE_WINDOW` - `endTime` is not after `startTime`;
    /// - `NON_POSITIVE_PRICE` - the `Offer` price is not positive;
    /// - `USER_ID_REQUIRED` - the `X-User-Id` header is missing.
    #[tracing::instrument(
        skip_all,
        fields(
            end_time = %end_time.to_rfc3339(),
            gql.name = "createSale",
            name = %name,
            otel.name = Self::SPAN_NAME,
            start_time = %start_time.to_rfc3339(),
        ),
    )]
    pub async fn create_sale(
        name: api::sale::Name,
        start_time: DateTime,
        end_time: DateTime,
        enabled: Option<bool>,
        offer: api::offer::New,
        ctx: &Context,
    ) -> Result<api::Sale, Error> {
        let created_by = ctx.user_id()?;
        let total = domain::offer::Quantity::from_i32(offer.total_quantity)
            .filter(|&q| q > domain::offer::Quantity::ZERO)
            .ok_or_else(|| api::QuantityError::NotPositive.into())
            .map_err(ctx.error())?;

        ctx.service()
            .execute(command::CreateSale {
                name: name.into(),
                start: start_time.coerce(),
                end: end_time.coerce(),
                enabled: enabled.unwrap_or(true),
                created_by,
                offer: command::create_sale::NewOffer {
                    name: offer.name.into(),
                    price: offer.price,
                    total,
                },
            })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(|(sale, _)| sale.into())
    }

    /// Updates the provided fields of the `Sale` with the provided ID.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `INVALID_SALE_WINDOW` - the `Sale` wouldn't end after it starts;
    /// - `SALE_NOT_EXISTS` - the `Sale` does not exist.
    #[tracing::instrument(
        skip_all,
        fields(
            enabled = ?enabled,
            gql.name = "updateSale",
            id = %id,
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn update_sale(
        id: api::sale::Id,
        name: Option<api::sale::Name>,
        start_time: Option<DateTime>,
        end_time: Option<DateTime>,
        enabled: Option<bool>,
        ctx: &Context,
    ) -> Result<api::Sale, Error> {
        ctx.service()
            .execute(command::UpdateSale {
                sale_id: id.into(),
                name: name.map(Into::into),
                start: start_time.map(DateTime::coerce),
                end: end_time.map(DateTime::coerce),
                enabled,
            })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(Into::into)
    }

    /// Deletes the `Sale` with the provided ID along with its `Offer`s.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `SALE_HAS_PURCHASES` - some `Purchase`s were made on the `Sale`;
    /// - `SALE_NOT_EXISTS` - the `Sale` does not exist.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "deleteSale",
            id = %id,
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn delete_sale(
        id: api::sale::Id,
        ctx: &Context,
    ) -> Result<api::sale::Id, Error> {
        ctx.service()
            .execute(command::DeleteSale { sale_id: id.into() })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(|sale| sale.id.into())
    }
}

define_error! {
    enum SaleError {
        #[code = "INVALID_SALE_WINDOW"]
        #[status = BAD_REQUEST]
        #[message = "`Sale` must end strictly after it starts"]
        InvalidWindow,

        #[code = "SALE_NOT_EXISTS"]
        #[status = NOT_FOUND]
        #[message = "`Sale` with the provided ID does not exist"]
        NotExists,
    }
}

impl AsError for command::attempt_purchase::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        define_error! {
            enum Error {
                #[code = "ALREADY_PURCHASED"]
                #[status = CONFLICT]
                #[message = "Already purchased on the `Sale`"]
                AlreadyPurchased,

                #[code = "NOT_ELIGIBLE"]
                #[status = BAD_REQUEST]
                #[message = "`Sale` doesn't accept purchases at the moment"]
                NotEligible,

                #[code = "OFFER_NOT_EXISTS"]
                #[status = NOT_FOUND]
                #[message = "`Offer` with the provided ID does not exist in \
                             the `Sale`"]
                OfferNotExists,

                #[code = "SOLD_OUT"]
                #[status = CONFLICT]
                #[message = "Not enough units are left"]
                SoldOut,
            }
        }

        Some(match self {
            Self::AlreadyPurchased(_) => Error::AlreadyPurchased.into(),
            Self::Db(e) => return e.try_as_error(),
            Self::NotEligible { .. } => Error::NotEligible.into(),
            Self::OfferNotExists(_) | Self::SaleHasNoOffers(_) => {
                Error::OfferNotExists.into()
            }
            Self::SaleNotExists(_) => SaleError::NotExists.into(),
            Self::SoldOut(_) => Error::SoldOut.into(),
        })
    }
}

impl AsError for command::cancel_purchase::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        define_error! {
            enum Error {
                #[code = "PURCHASE_NOT_COMPLETED"]
                #[status = CONFLICT]
                #[message = "`Purchase` with the provided ID is not \
                             completed"]
                NotCompleted,

                #[code = "PURCHASE_NOT_EXISTS"]
                #[status = NOT_FOUND]
                #[message = "`Purchase` with the provided ID does not exist"]
                PurchaseNotExists,
            }
        }

        Some(match self {
            Self::Db(e) => return e.try_as_error(),
            Self::ExceedsTotal(_) | Self::OfferNotExists(_) => return None,
            Self::NotCompleted(_) => Error::NotCompleted.into(),
            Self::PurchaseNotExists(_) => Error::PurchaseNotExists.into(),
        })
    }
}

impl AsError for command::create_sale::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        define_error! {
            enum Error {
                #[code = "NON_POSITIVE_PRICE"]
                #[status = BAD_REQUEST]
                #[message = "`Offer` price must be positive"]
                NonPositivePrice,
            }
        }

        Some(match self {
            Self::Db(e) => return e.try_as_error(),
            Self::InvalidWindow => SaleError::InvalidWindow.into(),
            Self::NonPositivePrice => Error::NonPositivePrice.into(),
            Self::ZeroQuantity => api::QuantityError::NotPositive.into(),
        })
    }
}

impl AsError for command::update_sale::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        Some(match self {
            Self::Db(e) => return e.try_as_error(),
            Self::InvalidWindow => SaleError::InvalidWindow.into(),
            Self::SaleNotExists(_) => SaleError::NotExists.into(),
        })
    }
}

impl AsError for command::delete_sale::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        define_error! {
            enum Error {
                #[code = "SALE_HAS_PURCHASES"]
                #[status = CONFLICT]
                #[message = "`Sale` with the provided ID has purchases"]
                SaleHasPurchases,
            }
        }

        Some(match self {
            Self::Db(e) => return e.try_as_error(),
            Self::SaleHasPurchases(_) => Error::SaleHasPurchases.into(),
            Self::SaleNotExists(_) => SaleError::NotExists.into(),
        })
    }
}
