//! [`Offer`] definitions.

use common::Money;
use derive_more::{AsRef, Display, From, FromStr, Into};
#[cfg(feature = "postgres")]
use postgres_types::{FromSql, ToSql};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{purchase, sale};
#[cfg(doc)]
use crate::domain::Sale;

/// Product put on a [`Sale`] together with its reservable stock.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Offer {
    /// ID of this [`Offer`].
    pub id: Id,

    /// ID of the [`Sale`] this [`Offer`] belongs to.
    pub sale_id: sale::Id,

    /// [`Name`] of the offered product.
    pub name: Name,

    /// Price of a single unit.
    pub price: Money,

    /// [`Stock`] of this [`Offer`].
    pub stock: Stock,
}

/// ID of an [`Offer`].
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

/// Name of an [`Offer`].
#[derive(AsRef, Clone, Debug, Display, Eq, PartialEq)]
#[as_ref(str, String)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct Name(String);

impl Name {
    /// Creates a new [`Name`] if the given `name` is valid.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Option<Self> {
        let name = name.into();
        Self::check(&name).then_some(Self(name))
    }

    /// Checks whether the given `name` is a valid [`Name`].
    fn check(name: impl AsRef<str>) -> bool {
        let name = name.as_ref();
        name.trim() == name && !name.is_empty() && name.len() <= 255
    }
}

impl FromStr for Name {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s).ok_or("invalid `Name`")
    }
}

/// Number of units of an [`Offer`].
///
/// Never exceeds [`i32::MAX`], so always fits into a storage.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    Display,
    Eq,
    Hash,
    Into,
    Ord,
    PartialEq,
    PartialOrd,
)]
pub struct Quantity(u32);

impl Quantity {
    /// No units at all.
    pub const ZERO: Self = Self(0);

    /// Creates a new [`Quantity`] if the given `value` fits into a storage.
    #[must_use]
    pub fn new(value: u32) -> Option<Self> {
        i32::try_from(value).is_ok().then_some(Self(value))
    }

    /// Creates a new [`Quantity`] out of a storage representation.
    ///
    /// [`None`] is returned if the `value` is negative.
    #[must_use]
    pub fn from_i32(value: i32) -> Option<Self> {
        u32::try_from(value).ok().map(Self)
    }

    /// Returns the storage representation of this [`Quantity`].
    #[must_use]
    pub fn to_i32(self) -> i32 {
        i32::try_from(self.0).unwrap_or(i32::MAX)
    }
}

impl From<purchase::Quantity> for Quantity {
    fn from(q: purchase::Quantity) -> Self {
        // Both are bounded by the same storage representation.
        Self(q.get())
    }
}

/// Counters of an [`Offer`] stock.
///
/// Always satisfies `0 <= available <= total`.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct Stock {
    /// Total number of units put on the [`Sale`].
    total: Quantity,

    /// Number of units still available for purchase.
    available: Quantity,
}

impl Stock {
    /// Creates a new [`Stock`] with all the `total` units available.
    ///
    /// [`None`] is returned if the `total` is zero.
    #[must_use]
    pub fn full(total: Quantity) -> Option<Self> {
        Self::new(total, total).filter(|_| total > Quantity::ZERO)
    }

    /// Creates a new [`Stock`] if `available` doesn't exceed `total`.
    #[must_use]
    pub fn new(total: Quantity, available: Quantity) -> Option<Self> {
        (available <= total).then_some(Self { total, available })
    }

    /// Returns the total number of units.
    #[must_use]
    pub fn total(&self) -> Quantity {
        self.total
    }

    /// Returns the number of units still available.
    #[must_use]
    pub fn available(&self) -> Quantity {
        self.available
    }

    /// Returns the number of units already sold.
    #[must_use]
    pub fn sold(&self) -> Quantity {
        Quantity(self.total.0 - self.available.0)
    }

    /// Indicates whether no units are available anymore.
    #[must_use]
    pub fn is_sold_out(&self) -> bool {
        self.available == Quantity::ZERO
    }

    /// Takes the provided `quantity` out of the available units.
    ///
    /// [`None`] is returned if there is not enough units available.
    #[must_use]
    pub fn reserve(self, quantity: Quantity) -> Option<Self> {
        let available = self.available.0.checked_sub(quantity.0)?;
        Some(Self {
            total: self.total,
            available: Quantity(available),
        })
    }

    /// Puts the provided `quantity` back to the available units.
    ///
    /// [`None`] is returned if the result would exceed the total.
    #[must_use]
    pub fn release(self, quantity: Quantity) -> Option<Self> {
        let available = self.available.0.checked_add(quantity.0)?;
        Self::new(self.total, Quantity(available))
    }
}

/// Change of an [`Offer`]'s available units, performed as a single atomic
/// conditional update in a storage.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct StockChange {
    /// ID of the [`Offer`] to change the [`Stock`] of.
    pub offer_id: Id,

    /// ID of the [`Sale`] the [`Offer`] must belong to.
    pub sale_id: sale::Id,

    /// Number of units to move.
    pub quantity: purchase::Quantity,
}

/// Outcome of reserving a [`StockChange`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Reservation {
    /// Units were taken, [`Stock`] after the change is attached.
    Reserved(Stock),

    /// Not enough units available, nothing changed.
    InsufficientStock,

    /// No such [`Offer`] in the [`Sale`].
    OfferNotExists,
}

/// Outcome of releasing a [`StockChange`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Restock {
    /// Units were put back, [`Stock`] after the change is attached.
    Released(Stock),

    /// Putting units back would exceed the total, nothing changed.
    ExceedsTotal,

    /// No such [`Offer`] in the [`Sale`].
    OfferNotExists,
}

#[cfg(test)]
mod spec {
    use super::{Quantity, Stock};

    fn q(n: u32) -> Quantity {
        Quantity::new(n).unwrap()
    }

    #[test]
    fn keeps_available_within_total() {
        assert!(Stock::new(q(3), q(4)).is_none());
        assert!(Stock::full(Quantity::ZERO).is_none());

        let stock = Stock::full(q(3)).unwrap();
        assert_eq!(stock.sold(), Quantity::ZERO);
        assert!(!stock.is_sold_out());
        assert!(stock.release(q(1)).is_none());
    }

    #[test]
    fn reserves_and_releases() {
        let stock = Stock::full(q(2)).unwrap();

        let stock = stock.reserve(q(2)).unwrap();
        assert!(stock.is_sold_out());
        assert_eq!(stock.sold(), q(2));
        assert!(stock.reserve(q(1)).is_none());

        let stock = stock.release(q(1)).unwrap();
        assert_eq!(stock.available(), q(1));
        assert_eq!(stock.total(), q(2));
    }

    #[test]
    fn converts_storage_representation() {
        assert_eq!(Quantity::from_i32(-1), None);
        assert_eq!(Quantity::from_i32(7), Quantity::new(7));
        assert_eq!(q(7).to_i32(), 7);
    }

    #[test]
    fn never_exceeds_storage_representation() {
        let max = u32::try_from(i32::MAX).unwrap();

        assert_eq!(Quantity::new(max).map(Quantity::to_i32), Some(i32::MAX));
        assert!(Quantity::new(max + 1).is_none());
        assert!(Quantity::new(u32::MAX).is_none());
        assert_eq!(Quantity::from_i32(i32::MAX), Quantity::new(max));
    }
}
