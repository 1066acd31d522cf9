//! GraphQL API definitions.

mod mutation;
pub mod offer;
pub mod purchase;
mod query;
pub mod sale;
pub mod scalar;
pub mod user;

use juniper::EmptySubscription;

use crate::{define_error, Context};

pub use self::{
    mutation::Mutation, offer::Offer, purchase::Purchase, query::Query,
    sale::Sale,
};

/// GraphQL schema.
pub type Schema =
    juniper::RootNode<'static, Query, Mutation, EmptySubscription<Context>>;

define_error! {
    enum QuantityError {
        #[code = "INVALID_QUANTITY"]
        #[status = BAD_REQUEST]
        #[message = "Quantity must be a positive number"]
        NotPositive,
    }
}
