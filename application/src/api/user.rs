//! User-related definitions.

use derive_more::{AsRef, Display, From, Into};
use juniper::GraphQLScalar;
use service::domain;

use crate::api::scalar;

/// Unique identifier of an already authenticated user.
#[derive(AsRef, Clone, Debug, Display, From, GraphQLScalar, Into)]
#[graphql(name = "UserId", with = scalar::Via::<domain::user::Id>)]
pub struct Id(domain::user::Id);
