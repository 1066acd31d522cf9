//! Domain definitions.

pub mod offer;
pub mod purchase;
pub mod sale;
pub mod user;

pub use self::{offer::Offer, purchase::Purchase, sale::Sale};
