//! [`Sale`] definitions.

#[cfg(doc)]
use common::DateTime;
use common::{unit, DateTimeOf};
use derive_more::{AsRef, Display, From, FromStr, Into};
#[cfg(feature = "postgres")]
use postgres_types::{FromSql, ToSql};
use serde::{Deserialize, Serialize};
use strum::Display as StrumDisplay;
use uuid::Uuid;

use crate::domain::user;

/// Time-boxed flash sale of a limited quantity of goods.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Sale {
    /// ID of this [`Sale`].
    pub id: Id,

    /// [`Name`] of this [`Sale`].
    pub name: Name,

    /// [`Window`] during which this [`Sale`] accepts purchases.
    pub window: Window,

    /// Indicator whether this [`Sale`] is switched on by an admin.
    ///
    /// A disabled [`Sale`] never accepts purchases, even inside its
    /// [`Window`].
    pub enabled: bool,

    /// ID of the [`user`] who created this [`Sale`].
    pub created_by: user::Id,

    /// [`DateTime`] when this [`Sale`] was created.
    pub created_at: CreationDateTime,

    /// [`DateTime`] when this [`Sale`] was updated last time.
    pub updated_at: ModificationDateTime,
}

impl Sale {
    /// Returns [`Status`] of this [`Sale`] at the provided moment.
    #[must_use]
    pub fn status_at(&self, now: impl Into<Now>) -> Status {
        Status::at(now, self.window, self.enabled)
    }
}

/// ID of a [`Sale`].
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

/// Name of a [`Sale`].
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

/// Schedule of a [`Sale`]: the closed interval between its
/// [`StartDateTime`] and [`EndDateTime`].
///
/// Always ends strictly after it starts.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Window {
    /// [`DateTime`] when the [`Sale`] goes live.
    start: StartDateTime,

    /// [`DateTime`] when the [`Sale`] stops accepting purchases.
    end: EndDateTime,
}

impl Window {
    /// Creates a new [`Window`] if the `end` is strictly after the `start`.
    #[must_use]
    pub fn new(start: StartDateTime, end: EndDateTime) -> Option<Self> {
        (end.coerce::<()>() > start.coerce()).then_some(Self { start, end })
    }

    /// Returns [`DateTime`] when this [`Window`] opens.
    #[must_use]
    pub fn start(&self) -> StartDateTime {
        self.start
    }

    /// Returns [`DateTime`] when this [`Window`] closes.
    #[must_use]
    pub fn end(&self) -> EndDateTime {
        self.end
    }
}

/// Lifecycle status of a [`Sale`], derived from a wall-clock moment.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, StrumDisplay)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
    /// [`Window`] hasn't opened yet.
    Scheduled,

    /// Inside the [`Window`] and enabled: purchases are accepted.
    Live,

    /// Inside the [`Window`], but disabled by an admin.
    Suspended,

    /// [`Window`] has already closed.
    Ended,
}

impl Status {
    /// Computes the [`Status`] of a [`Sale`] with the provided [`Window`] and
    /// enabled flag at the provided moment.
    ///
    /// Both [`Window`] bounds are inclusive.
    #[must_use]
    pub fn at(now: impl Into<Now>, window: Window, enabled: bool) -> Self {
        let now = now.into();
        if now < window.start.coerce() {
            Self::Scheduled
        } else if now > window.end.coerce() {
            Self::Ended
        } else if enabled {
            Self::Live
        } else {
            Self::Suspended
        }
    }

    /// Indicates whether a [`Sale`] in this [`Status`] accepts purchases.
    #[must_use]
    pub fn is_live(self) -> bool {
        matches!(self, Self::Live)
    }
}

/// Moment a [`Status`] is evaluated at.
pub type Now = DateTimeOf<()>;

/// [`DateTime`] when a [`Sale`] was created.
pub type CreationDateTime = DateTimeOf<(Sale, unit::Creation)>;

/// [`DateTime`] when a [`Sale`] was modified.
pub type ModificationDateTime = DateTimeOf<(Sale, unit::Modification)>;

/// [`DateTime`] when a [`Sale`] starts.
pub type StartDateTime = DateTimeOf<(Sale, unit::Start)>;

/// [`DateTime`] when a [`Sale`] ends.
pub type EndDateTime = DateTimeOf<(Sale, unit::End)>;
