//! [`Sale`]-related read definitions.

use derive_more::Deref;

use crate::domain::{sale, Sale};

/// Snapshot of [`Sale`]s around some moment, as stored.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Overview {
    /// [`Sale`] whose window contains the moment.
    ///
    /// If there are several, the enabled ones win, and the most recently
    /// created one is picked among equals.
    pub current: Option<Sale>,

    /// [`Sale`] with the nearest window opening after the moment.
    pub upcoming: Option<Sale>,

    /// Number of enabled [`Sale`]s whose window contains the moment.
    pub live_count: u32,

    /// Number of all the stored [`Sale`]s.
    pub total_count: u32,
}

/// Current state of flash sales, as shown to buyers.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct CurrentStatus {
    /// [`sale::Status`] of the [`CurrentStatus::current`] [`Sale`], or
    /// [`sale::Status::Scheduled`] if only an upcoming one exists, or
    /// [`sale::Status::Ended`] if all the [`Sale`]s are over.
    ///
    /// [`None`] if there are no [`Sale`]s at all.
    pub status: Option<sale::Status>,

    /// [`Sale`] whose window contains the moment, if any.
    pub current: Option<Sale>,

    /// Nearest [`Sale`] not started yet, if any.
    pub upcoming: Option<Sale>,

    /// Number of [`Sale`]s accepting purchases right now.
    pub live_count: u32,

    /// Number of all the [`Sale`]s.
    pub total_count: u32,
}

impl CurrentStatus {
    /// Evaluates the [`CurrentStatus`] out of the [`Overview`] taken at the
    /// provided moment.
    #[must_use]
    pub fn new(overview: Overview, now: sale::Now) -> Self {
        let Overview {
            current,
            upcoming,
            live_count,
            total_count,
        } = overview;

        let status = current
            .as_ref()
            .map(|s| s.status_at(now))
            .or_else(|| upcoming.as_ref().map(|_| sale::Status::Scheduled))
            .or_else(|| (total_count > 0).then_some(sale::Status::Ended));

        Self {
            status,
            current,
            upcoming,
            live_count,
            total_count,
        }
    }
}

/// Indicator whether any purchase references a [`Sale`].
#[derive(Clone, Copy, Debug, Deref, Eq, Hash, PartialEq)]
pub struct HasPurchases(pub bool);
