//! External user identity.
//!
//! Users are registered and authenticated elsewhere, so here they are known
//! by their [`Id`] only.

use derive_more::{AsRef, Display};
#[cfg(feature = "postgres")]
use postgres_types::{FromSql, ToSql};
use serde::{Deserialize, Serialize};

/// ID of an already authenticated user.
#[derive(
    AsRef,
    Clone,
    Debug,
    Deserialize,
    Display,
    Eq,
    Hash,
    Ord,
    PartialEq,
    PartialOrd,
    Serialize,
)]
#[as_ref(str, String)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct Id(String);

impl Id {
    /// Creates a new [`Id`] if the given `id` is valid.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Option<Self> {
        let id = id.into();
        Self::check(&id).then_some(Self(id))
    }

    /// Checks whether the given `id` is a valid [`Id`].
    fn check(id: impl AsRef<str>) -> bool {
        let id = id.as_ref();
        !id.is_empty()
            && id.len() <= 255
            && !id.chars().any(|c| c.is_whitespace() || c.is_control())
    }
}

impl std::str::FromStr for Id {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s).ok_or("invalid `user::Id`")
    }
}
