// ABOUTME: Fullupdate command: deploys the release the current directory belongs to.
// ABOUTME: Holds the deploy lock in the base update directory while it runs.

use std::path::Path;

use super::{components, report};
use dropship::config::Config;
use dropship::deploy::{DeployLock, Release};
use dropship::error::Result;
use dropship::output::Output;

pub async fn fullupdate(config: Config, start: &Path, force: bool, mut output: Output) -> Result<()> {
    output.start_timer();
    let release = Release::discover(start)?;
    output.progress(&format!("Deploying {}", release.label()));

    let lock_dir = release.root().parent().unwrap_or(release.root());
    let _lock = DeployLock::acquire(lock_dir, &release.label(), force)?;

    let driver = components::driver(&config, release.root())?;
    let outcome = driver.full(&release).await?;
    report(outcome, &output)
}
