//! [`Command`] definition.

pub mod attempt_purchase;
pub mod cancel_purchase;
pub mod create_sale;
pub mod delete_sale;
pub mod update_sale;

/// [`Command`] of the [`Service`].
///
/// [`Service`]: crate::Service
pub use common::Handler as Command;

pub use self::{
    attempt_purchase::AttemptPurchase, cancel_purchase::CancelPurchase,
    create_sale::CreateSale, delete_sale::DeleteSale, update_sale::UpdateSale,
};
