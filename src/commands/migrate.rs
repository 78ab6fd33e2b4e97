// ABOUTME: Migrate command: brings one database up to date without touching folders.
// ABOUTME: Scripts come from --scripts-dir or the configured migrations directory.

use std::path::Path;

use super::{components, report};
use dropship::config::Config;
use dropship::error::Result;
use dropship::output::Output;

pub async fn migrate(
    config: Option<Config>,
    scripts_dir: &Path,
    connection_string: &str,
    mut output: Output,
) -> Result<()> {
    output.start_timer();
    let conversions = config
        .as_ref()
        .map(Config::conversions)
        .unwrap_or_default();
    let migrator = components::migrator(conversions, scripts_dir)?;
    output.progress(&format!(
        "Migrating with {} script(s) from {}",
        migrator.scripts().len(),
        scripts_dir.display()
    ));
    let outcome = migrator.run(connection_string).await?;
    report(outcome, &output)
}
