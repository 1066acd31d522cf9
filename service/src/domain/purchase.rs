//! [`Purchase`] definitions.

use std::num::NonZeroU32;

#[cfg(doc)]
use common::DateTime;
use common::{define_kind, unit, DateTimeOf};
use derive_more::{Display, From, FromStr, Into};
#[cfg(feature = "postgres")]
use postgres_types::{FromSql, ToSql};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{offer, sale, user};
#[cfg(doc)]
use crate::domain::{Offer, Sale};

/// Record of a [`user`] buying an [`Offer`] on a [`Sale`].
///
/// There is at most one [`Purchase`] per [`user`] per [`Sale`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Purchase {
    /// ID of this [`Purchase`].
    pub id: Id,

    /// ID of the [`user`] who made this [`Purchase`].
    pub user_id: user::Id,

    /// ID of the [`Sale`] this [`Purchase`] was made on.
    pub sale_id: sale::Id,

    /// ID of the purchased [`Offer`].
    pub offer_id: offer::Id,

    /// Number of purchased units.
    pub quantity: Quantity,

    /// [`Status`] of this [`Purchase`].
    pub status: Status,

    /// [`DateTime`] when this [`Purchase`] was made.
    pub purchased_at: CreationDateTime,
}

/// ID of a [`Purchase`].
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    Deserialize,
    Display,
    Eq,
    From,
    FromStr,
    Hash,
    Into,
    Ord,
    PartialEq,
    PartialOrd,
    Serialize,
)]
#[cfg_attr(feature = "postgres", derive(ToSql, FromSql), postgres(transparent))]
pub struct Id(Uuid);

impl Id {
    /// Creates a new random [`Id`].
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

/// Positive number of units in a single [`Purchase`].
///
/// Never exceeds [`i32::MAX`], so always fits into a storage.
#[derive(Clone, Copy, Debug, Display, Eq, Hash, Into, PartialEq)]
pub struct Quantity(NonZeroU32);

impl Quantity {
    /// Single unit, the only quantity sales are normally run with.
    pub const ONE: Self = Self(NonZeroU32::MIN);

    /// Creates a new [`Quantity`] if the given `value` is positive and fits
    /// into a storage.
    #[must_use]
    pub fn new(value: u32) -> Option<Self> {
        i32::try_from(value).ok()?;
        NonZeroU32::new(value).map(Self)
    }

    /// Creates a new [`Quantity`] out of a storage representation.
    ///
    /// [`None`] is returned if the `value` is not positive.
    #[must_use]
    pub fn from_i32(value: i32) -> Option<Self> {
        u32::try_from(value).ok().and_then(Self::new)
    }

    /// Returns the number of units.
    #[must_use]
    pub fn get(self) -> u32 {
        self.0.get()
    }

    /// Returns the storage representation of this [`Quantity`].
    #[must_use]
    pub fn to_i32(self) -> i32 {
        i32::try_from(self.get()).unwrap_or(i32::MAX)
    }
}

impl Default for Quantity {
    fn default() -> Self {
        Self::ONE
    }
}

define_kind! {
    #[doc = "Status of a [`Purchase`]."]
    enum Status {
        #[doc = "Units are reserved and the [`Purchase`] is done."]
        Completed = 1,

        #[doc = "[`Purchase`] was revoked and its units were released."]
        Cancelled = 2,

        #[doc = "[`Purchase`] is awaiting completion."]
        Pending = 3,
    }
}

/// [`DateTime`] when a [`Purchase`] was made.
pub type CreationDateTime = DateTimeOf<(Purchase, unit::Creation)>;

/// Conditional change of a [`Purchase`] [`Status`], applied only if the
/// [`Purchase`] is still in the expected one.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Transition {
    /// ID of the [`Purchase`] to change.
    pub purchase_id: Id,

    /// [`Status`] the [`Purchase`] is expected to be in.
    pub from: Status,

    /// [`Status`] to put the [`Purchase`] into.
    pub to: Status,
}

/// Outcome of inserting a new [`Purchase`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Insertion {
    /// [`Purchase`] was stored.
    Inserted,

    /// Another [`Purchase`] of the same [`user`] on the same [`Sale`] is
    /// already stored, nothing changed.
    Duplicate,
}

#[cfg(test)]
mod spec {
    use super::{Quantity, Status};

    #[test]
    fn quantity_is_positive() {
        assert!(Quantity::new(0).is_none());
        assert_eq!(Quantity::default(), Quantity::ONE);
        assert_eq!(Quantity::from_i32(-3), None);
        assert_eq!(Quantity::from_i32(0), None);
        assert_eq!(Quantity::from_i32(2).map(Quantity::get), Some(2));
    }

    #[test]
    fn quantity_fits_storage() {
        let max = u32::try_from(i32::MAX).unwrap();

        assert_eq!(Quantity::new(max).map(Quantity::to_i32), Some(i32::MAX));
        assert!(Quantity::new(max + 1).is_none());
        assert!(Quantity::new(u32::MAX).is_none());
    }

    #[test]
    fn status_has_stable_representation() {
        assert_eq!(Status::Completed.u8(), 1);
        assert_eq!(Status::from_u8(2), Some(Status::Cancelled));
        assert_eq!(Status::from_u8(9), None);
        assert_eq!(Status::Pending.to_string(), "PENDING");
    }
}
