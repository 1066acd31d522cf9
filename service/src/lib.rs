//! Service contains the flash sale admission control logic.
//!
//! List of available Cargo features:
#![doc = document_features::document_features!()]
#![deny(
    nonstandard_style,
    rust_2018_idioms,
    rustdoc::all,
    trivial_casts,
    trivial_numeric_casts,
    unsafe_code
)]
#![forbid(non_ascii_idents)]
#![warn(
    clippy::allow_attributes,
    clippy::allow_attributes_without_reason,
    clippy::pedantic,
    clippy::wildcard_enum_match_arm,
    deprecated_in_future,
    missing_copy_implementations,
    missing_debug_implementations,
    missing_docs,
    unreachable_pub,
    unused_crate_dependencies,
    unused_import_braces,
    unused_labels,
    unused_lifetimes,
    unused_qualifications,
    unused_results
)]

pub mod command;
pub mod domain;
pub mod infra;
pub mod query;
pub mod read;
#[cfg(test)]
mod testing;

#[cfg(doc)]
use infra::{Audit, Database};

pub use self::{command::Command, query::Query};

/// Domain service.
#[derive(Clone, Debug)]
pub struct Service<Db, Au = infra::audit::Log> {
    /// [`Database`] of this [`Service`].
    database: Db,

    /// [`Audit`] sink of this [`Service`].
    audit: Au,
}

impl<Db> Service<Db> {
    /// Creates a new [`Service`] with the provided [`Database`], auditing
    /// into the log.
    #[must_use]
    pub fn new(database: Db) -> Self {
        Self::with_audit(database, infra::audit::Log)
    }
}

impl<Db, Au> Service<Db, Au> {
    /// Creates a new [`Service`] with the provided [`Database`] and [`Audit`]
    /// sink.
    #[must_use]
    pub fn with_audit(database: Db, audit: Au) -> Self {
        Self { database, audit }
    }

    /// Returns [`Database`] of this [`Service`].
    #[must_use]
    pub fn database(&self) -> &Db {
        &self.database
    }

    /// Returns [`Audit`] sink of this [`Service`].
    #[must_use]
    pub fn audit(&self) -> &Au {
        &self.audit
    }
}
