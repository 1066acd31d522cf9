//! Read entities definitions.

pub mod sale;
