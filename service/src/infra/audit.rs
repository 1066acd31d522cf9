//! Audit trail of purchase decisions.

use std::convert::Infallible;
#[cfg(any(test, feature = "memory"))]
use std::sync::{Arc, Mutex, PoisonError};

use common::operations::Record;
use tracing as log;

use crate::domain::{purchase, Purchase};

/// Audit sink operation.
///
/// Recording is fire-and-forget for callers: a failed [`Record`] is logged
/// and never fails the operation being audited.
pub use common::Handler as Audit;

/// Audited occurrence.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Event {
    /// [`Purchase`] was completed.
    PurchaseCompleted(Purchase),

    /// [`Purchase`] was cancelled and its units were released.
    PurchaseCancelled(Purchase),
}

impl Event {
    /// Returns the stable name of this [`Event`].
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::PurchaseCompleted(_) => "purchase.completed",
            Self::PurchaseCancelled(_) => "purchase.cancelled",
        }
    }

    /// Returns ID of the [`Purchase`] this [`Event`] is about.
    #[must_use]
    pub fn subject_id(&self) -> purchase::Id {
        match self {
            Self::PurchaseCompleted(p) | Self::PurchaseCancelled(p) => p.id,
        }
    }
}

/// [`Audit`] sink writing [`Event`]s as structured [`tracing`] events with
/// the `audit` target.
#[derive(Clone, Copy, Debug, Default)]
pub struct Log;

impl Audit<Record<Event>> for Log {
    type Ok = ();
    type Err = Infallible;

    async fn execute(
        &self,
        Record(event): Record<Event>,
    ) -> Result<Self::Ok, Self::Err> {
        let (Event::PurchaseCompleted(p) | Event::PurchaseCancelled(p)) =
            &event;
        log::info!(
            target: "audit",
            event = event.name(),
            subject_id = %event.subject_id(),
            user_id = %p.user_id,
            sale_id = %p.sale_id,
            offer_id = %p.offer_id,
            quantity = p.quantity.get(),
            status = %p.status,
            "{}",
            event.name(),
        );
        Ok(())
    }
}

/// [`Audit`] sink keeping recorded [`Event`]s in memory.
///
/// Clones share the same [`Event`]s.
#[cfg(any(test, feature = "memory"))]
#[derive(Clone, Debug, Default)]
pub struct Collect(Arc<Mutex<Vec<Event>>>);

#[cfg(any(test, feature = "memory"))]
impl Collect {
    /// Returns all the [`Event`]s recorded so far.
    #[must_use]
    pub fn events(&self) -> Vec<Event> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

#[cfg(any(test, feature = "memory"))]
impl Audit<Record<Event>> for Collect {
    type Ok = ();
    type Err = Infallible;

    async fn execute(
        &self,
        Record(event): Record<Event>,
    ) -> Result<Self::Ok, Self::Err> {
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
        Ok(())
    }
}
