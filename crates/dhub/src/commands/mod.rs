//! Command dispatch: bridges CLI args to the inventory core and output.

pub mod config_cmd;
pub mod devices;
pub mod lots;

use std::sync::Arc;

use dhub_api::{Collection, HttpResourceServer};
use dhub_core::{ClientConfig, IdentityCache, Resources};

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

pub type HttpResources = Resources<HttpResourceServer>;

/// Build one HTTP server per collection over a shared client.
pub fn connect(config: &ClientConfig) -> Result<Arc<HttpResources>, CliError> {
    let base = HttpResourceServer::new(
        &config.url,
        config.database.as_deref(),
        Collection::Devices,
        &config.transport(),
    )?;
    let resources = Resources::new(Arc::new(IdentityCache::new()), |collection| {
        base.for_collection(collection)
    })
    .with_base_url(config.url.clone());
    Ok(Arc::new(resources))
}

/// Dispatch a server-bound command to its handler.
pub async fn dispatch(cmd: Command, resources: Arc<HttpResources>, global: &GlobalOpts) -> Result<(), CliError> {
    match cmd {
        Command::Devices(args) => devices::handle(resources, args, global).await,
        Command::Lots(args) => lots::handle(&resources, args, global).await,
        Command::Config(_) | Command::Completions(_) => Err(CliError::Internal {
            message: "local command reached server dispatch".into(),
        }),
    }
}
