//! [`Command`] for updating a [`Sale`].

use common::{
    operations::{By, Commit, Select, Transact, Transacted, Update},
    DateTime,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    domain::{sale, Sale},
    infra::{database, Database},
    Service,
};

use super::Command;

/// [`Command`] for updating a [`Sale`].
///
/// Only the provided fields are changed.
#[derive(Clone, Debug)]
pub struct UpdateSale {
    /// ID of the [`Sale`] to update.
    pub sale_id: sale::Id,

    /// New name of the [`Sale`].
    pub name: Option<sale::Name>,

    /// New [`DateTime`] when the [`Sale`] starts.
    pub start: Option<sale::StartDateTime>,

    /// New [`DateTime`] when the [`Sale`] ends.
    pub end: Option<sale::EndDateTime>,

    /// New enabled flag of the [`Sale`].
    pub enabled: Option<bool>,
}

impl<Db, Au> Command<UpdateSale> for Service<Db, Au>
where
    Db: Database<Transact, Err = Traced<database::Error>>,
    Transacted<Db>: Database<
            Select<By<Option<Sale>, sale::Id>>,
            Ok = Option<Sale>,
            Err = Traced<database::Error>,
        > + Database<Update<Sale>, Err = Traced<database::Error>>
        + Database<Commit, Err = Traced<database::Error>>,
{
    type Ok = Sale;
    type Err = Traced<ExecutionError>;

    async fn execute(&self, cmd: UpdateSale) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let UpdateSale {
            sale_id,
            name,
            start,
            end,
            enabled,
        } = cmd;

        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        let mut sale = tx
            .execute(Select(By::<Option<Sale>, _>::new(sale_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::SaleNotExists(sale_id))
            .map_err(tracerr::wrap!())?;

        // Validated against the merged values, so shifting a single bound
        // still can't turn the window inside out.
        sale.window = sale::Window::new(
            start.unwrap_or(sale.window.start()),
            end.unwrap_or(sale.window.end()),
        )
        .ok_or(E::InvalidWindow)
        .map_err(tracerr::wrap!())?;
        if let Some(name) = name {
            sale.name = name;
        }
        if let Some(enabled) = enabled {
            sale.enabled = enabled;
        }
        sale.updated_at = DateTime::now().coerce();

        tx.execute(Update(sale.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        Ok(sale)
    }
}

/// Error of [`UpdateSale`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    #[from]
    Db(database::Error),

    /// [`Sale`] wouldn't end strictly after it starts.
    #[display("`Sale` must end strictly after it starts")]
    InvalidWindow,

    /// [`Sale`] with the provided ID does not exist.
    #[display("`Sale(id: {_0})` does not exist")]
    SaleNotExists(#[error(not(source))] sale::Id),
}
