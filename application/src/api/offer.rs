//! [`Offer`]-related definitions.

use common::Money;
use derive_more::{AsRef, Display, From, Into};
use juniper::{graphql_object, GraphQLInputObject, GraphQLScalar};
use service::domain;
use uuid::Uuid;

use crate::{
    api::{self, scalar},
    Context,
};

/// A product put on a `Sale`.
#[derive(Clone, Debug, From)]
pub struct Offer(domain::Offer);

/// A product put on a `Sale`.
#[graphql_object(context = Context)]
impl Offer {
    /// Unique identifier of this `Offer`.
    pub fn id(&self) -> Id {
        self.0.id.into()
    }

    /// `Sale` this `Offer` is put on.
    pub fn sale(&self) -> api::Sale {
        #[expect(unsafe_code, reason = "`Offer` references existing `Sale`")]
        unsafe {
            api::Sale::new_unchecked(self.0.sale_id)
        }
    }

    /// Name of the offered product.
    pub fn name(&self) -> Name {
        self.0.name.clone().into()
    }

    /// Price of a single unit.
    pub fn price(&self) -> Money {
        self.0.price
    }

    /// Stock of this `Offer` as of the query.
    pub fn stock(&self) -> Stock {
        self.0.stock.into()
    }
}

/// Unique identifier of an `Offer`.
#[derive(Clone, Copy, Debug, Display, Into, From, GraphQLScalar)]
#[from(domain::offer::Id)]
#[into(domain::offer::Id)]
#[graphql(name = "OfferId", transparent)]
pub struct Id(Uuid);

/// Name of an `Offer`.
#[derive(AsRef, Clone, Debug, Display, From, GraphQLScalar, Into)]
#[graphql(name = "OfferName", with = scalar::Via::<domain::offer::Name>)]
pub struct Name(domain::offer::Name);

/// Units counters of an `Offer`.
#[derive(Clone, Copy, Debug, From)]
pub struct Stock(domain::offer::Stock);

/// Units counters of an `Offer`.
///
/// Always `0 <= available <= total`.
#[graphql_object(context = Context, name = "OfferStock")]
impl Stock {
    /// Total number of units put on the `Sale`.
    pub fn total(&self) -> i32 {
        self.0.total().to_i32()
    }

    /// Number of units still available.
    pub fn available(&self) -> i32 {
        self.0.available().to_i32()
    }

    /// Number of units already sold.
    pub fn sold(&self) -> i32 {
        self.0.sold().to_i32()
    }

    /// Indicator whether no units are available anymore.
    pub fn sold_out(&self) -> bool {
        self.0.is_sold_out()
    }
}

/// `Offer` to create along with a `Sale`.
#[derive(Clone, Debug, GraphQLInputObject)]
#[graphql(name = "NewOffer")]
pub struct New {
    /// Name of the offered product.
    pub name: Name,

    /// Price of a single unit.
    pub price: Money,

    /// Total number of units to sell.
    pub total_quantity: i32,
}
