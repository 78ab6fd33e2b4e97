// ABOUTME: Config scaffolding for new installations.
// ABOUTME: Writes a commented dropship.yml template.

use std::path::Path;

use crate::error::{Error, Result};

use super::{CONFIG_FILENAME, DEFAULT_PORT};

pub fn init_config(dir: &Path, base_update_path: Option<&Path>, force: bool) -> Result<()> {
    let config_path = dir.join(CONFIG_FILENAME);

    if config_path.exists() && !force {
        return Err(Error::AlreadyExists(config_path));
    }

    let base = base_update_path
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "/srv/dropship/releases".to_string());
    std::fs::write(&config_path, template_yaml(&base))?;
    tracing::info!(path = %config_path.display(), "config written");

    Ok(())
}

fn template_yaml(base: &str) -> String {
    format!(
        r#"listen:
  address: 0.0.0.0
  port: {DEFAULT_PORT}
push:
  address: deploy.example.com
  port: {DEFAULT_PORT}
# Shared secret checked against every package
integrity_key:
  env: DROPSHIP_INTEGRITY_KEY
base_update_path: {base}
transport:
  framing: length_prefixed
  queue_depth: 16
  shutdown_grace: 30s
hosts:
  service_util:
    program: dropship-svc
  web_util:
    program: dropship-web
migrations:
  scripts_dir: Database
  # conversions:
  #   - name: split-addresses
  #     version: 2.5
  #     phase: after
  #     program: ./convert-addresses
"#
    )
}
