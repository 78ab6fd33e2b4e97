// ABOUTME: Push command: sends one release zip to a listening daemon.
// ABOUTME: Only files with a .zip extension are accepted.

use std::path::Path;

use dropship::config::Config;
use dropship::error::{Error, Result};
use dropship::output::Output;
use dropship::transport::{UpdatePackage, push_package};

pub fn ensure_zip(path: &Path) -> Result<()> {
    let is_zip = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("zip"));
    if is_zip && path.is_file() {
        Ok(())
    } else {
        Err(Error::NotAZip(path.to_path_buf()))
    }
}

pub async fn push(config: Config, package: &Path, mut output: Output) -> Result<()> {
    ensure_zip(package)?;
    output.start_timer();

    let endpoint = config.push_endpoint()?;
    let payload = tokio::fs::read(package).await?;
    let update = UpdatePackage::new(config.integrity_key.resolve()?, payload);

    output.progress(&format!(
        "Pushing {} to {}:{}",
        package.display(),
        endpoint.address,
        endpoint.port
    ));
    push_package(
        &endpoint.address,
        endpoint.port,
        config.transport.framing(),
        &update,
    )
    .await?;
    output.success("Package pushed");
    Ok(())
}
