//! Wires configuration, storage and the menu together.

use std::sync::Arc;

use anyhow::Context;
use cloudsave_drive::DriveClient;
use cloudsave_games::GamesService;
use cloudsave_paths::PathResolver;
use tokio::io::BufReader;

use crate::config::Config;
use crate::console::Console;
use crate::menu::Menu;

/// Runs one interactive session.
pub async fn run(config: Config) -> anyhow::Result<()> {
    let root_id = config.root_folder_id()?;
    let credentials = config.credentials()?;

    let client = DriveClient::new(credentials)
        .context("failed to create cloud storage client")?
        .with_base_urls(config.api_url.clone(), config.upload_url.clone());

    let staging_base = config.staging_base();
    tokio::fs::create_dir_all(&staging_base)
        .await
        .with_context(|| format!("failed to create staging dir {}", staging_base.display()))?;

    let service = Arc::new(GamesService::new(
        Arc::new(client),
        PathResolver::system(),
        staging_base,
    ));

    tracing::info!(root_id = %root_id, "session started");

    let console = Console::new(BufReader::new(tokio::io::stdin()), tokio::io::stdout());
    let mut menu = Menu::new(console, service, root_id, config.autosave_intervals());
    menu.run().await?;

    tracing::debug!("session ended");
    Ok(())
}
