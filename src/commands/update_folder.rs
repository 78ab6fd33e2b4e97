// ABOUTME: Update-folder command: deploys one named folder of the current release.
// ABOUTME: Takes the connection string explicitly instead of resolving it from installed copies.

use std::path::Path;

use super::{components, report};
use dropship::config::Config;
use dropship::deploy::{DeployLock, Release};
use dropship::error::Result;
use dropship::output::Output;

pub async fn update_folder(
    config: Config,
    start: &Path,
    folder: &str,
    connection_string: &str,
    force: bool,
    mut output: Output,
) -> Result<()> {
    output.start_timer();
    let release = Release::discover(start)?;
    output.progress(&format!("Updating {folder} from {}", release.label()));

    let lock_dir = release.root().parent().unwrap_or(release.root());
    let _lock = DeployLock::acquire(lock_dir, &release.label(), force)?;

    let driver = components::driver(&config, release.root())?;
    let outcome = driver
        .single_folder(&release, folder, connection_string)
        .await?;
    report(outcome, &output)
}
