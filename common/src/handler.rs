//! [`Handler`] abstractions.

use std::future::Future;

/// Executable handler.
///
/// Commands, queries and storage operations are all modeled as a
/// [`Handler`] of some typed argument, so every caller spells out exactly
/// which operations it depends on.
pub trait Handler<Args = ()> {
    /// Type of successful [`Handler`] result.
    type Ok;

    /// Type of this [`Handler`] error.
    type Err;

    /// Executes this [`Handler`] with the provided arguments.
    fn execute(
        &self,
        args: Args,
    ) -> impl Future<Output = Result<Self::Ok, Self::Err>>;
}
