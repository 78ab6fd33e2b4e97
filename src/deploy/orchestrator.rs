// ABOUTME: Brings one AppFolder up to the release version.
// ABOUTME: Dispatches on folder kind to the web, service, or resource procedure.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::{DeployError, Release, ReleaseStamp};
use crate::diagnostics::{Diagnostics, Warning};
use crate::host::{
    AppConfig, ConfigStore, HostError, ServiceHandle, ServiceHostManager, ServiceStatus, Site,
    WebApplication, WebHostManager,
};
use crate::manifest::{AppFolder, AppFolderKind};
use crate::outcome::{FailureKind, Outcome};

/// Why a folder procedure stopped early.
enum Halt {
    Failed(Outcome),
    Error(DeployError),
}

impl From<DeployError> for Halt {
    fn from(e: DeployError) -> Self {
        Halt::Error(e)
    }
}

trait StepExt<T> {
    fn step(self, what: impl FnOnce() -> String) -> Result<T, Halt>;
}

impl<T> StepExt<T> for Result<T, HostError> {
    fn step(self, what: impl FnOnce() -> String) -> Result<T, Halt> {
        self.map_err(|e| {
            Halt::Failed(Outcome::failure(
                e.failure_kind(),
                format!("{} failed: {e}", what()),
            ))
        })
    }
}

pub struct DeploymentOrchestrator {
    web: Arc<dyn WebHostManager>,
    services: Arc<dyn ServiceHostManager>,
    config: Arc<dyn ConfigStore>,
}

impl DeploymentOrchestrator {
    pub fn new(
        web: Arc<dyn WebHostManager>,
        services: Arc<dyn ServiceHostManager>,
        config: Arc<dyn ConfigStore>,
    ) -> Self {
        Self {
            web,
            services,
            config,
        }
    }

    /// Deploy one folder of `release`.
    ///
    /// `connection_string` is applied to components installed for the first
    /// time; existing components keep their own.
    pub async fn deploy(
        &self,
        release: &Release,
        folder: &AppFolder,
        connection_string: Option<&str>,
    ) -> Result<Outcome, DeployError> {
        tracing::info!(
            folder = %folder.name(),
            kind = folder.kind().type_name(),
            "deploying folder"
        );
        let connection_string = connection_string.filter(|c| !c.trim().is_empty());
        let mut diag = Diagnostics::default();

        let result = match folder.kind() {
            AppFolderKind::Web {
                application_name,
                pool_name,
            } => {
                self.deploy_web(release, folder, application_name, pool_name, connection_string, &mut diag)
                    .await
            }
            AppFolderKind::Service { service_name } => {
                self.deploy_service(release, folder, service_name, connection_string, &mut diag)
                    .await
            }
            AppFolderKind::Resource => {
                self.deploy_resource(release, folder, connection_string, &mut diag)
            }
        };

        match result {
            Ok(outcome) | Err(Halt::Failed(outcome)) => Ok(outcome.with_diagnostics(diag)),
            Err(Halt::Error(e)) => Err(e),
        }
    }

    async fn deploy_web(
        &self,
        release: &Release,
        folder: &AppFolder,
        application: &str,
        pool: &str,
        connection_string: Option<&str>,
        diag: &mut Diagnostics,
    ) -> Result<Outcome, Halt> {
        let site = self
            .web
            .find_by_application_name(application)
            .await
            .step(|| format!("Locating the web site for {application}"))?
            .ok_or_else(|| {
                Halt::Failed(Outcome::failure(
                    FailureKind::HostOperation,
                    format!("No web site is available to host {application}."),
                ))
            })?;

        let existing = self
            .existing_application(&site, application)
            .await
            .step(|| format!("Looking up web application {application}"))?;

        if let Some(app) = &existing
            && let Some(current) = already_current(release, folder, &app.physical_path, diag)
        {
            return Ok(current);
        }

        let update_path = release.folder_path(folder);
        tracing::info!(%pool, "creating application pool");
        self.web
            .create_pool(pool)
            .await
            .step(|| format!("Creating application pool {pool}"))?;

        tracing::info!(%application, site = %site.name, path = %update_path.display(), "binding application");
        self.web
            .set_application_path(&site, application, &update_path)
            .await
            .step(|| format!("Pointing {application} at {}", update_path.display()))?;
        self.web
            .set_application_pool(&site, application, pool)
            .await
            .step(|| format!("Assigning pool {pool} to {application}"))?;

        let update_config = folder.config_path_in(&update_path);
        match &existing {
            None => self
                .apply_connection_string(folder, &update_config, connection_string, diag)
                .step(|| format!("Setting the connection string in {}", update_config.display()))?,
            Some(app) => {
                let installed_config = folder.config_path_in(&app.physical_path);
                self.carry_config(folder, &installed_config, &update_config)
                    .step(|| format!("Copying settings from {}", installed_config.display()))?
            }
        }

        self.finish(release, folder, &update_path)
    }

    async fn deploy_service(
        &self,
        release: &Release,
        folder: &AppFolder,
        service: &str,
        connection_string: Option<&str>,
        diag: &mut Diagnostics,
    ) -> Result<Outcome, Halt> {
        let update_path = release.folder_path(folder);
        let update_binary = folder.update_assembly_path(release.root());
        let update_config = folder.config_path_in(&update_path);

        let existing = self
            .services
            .find(service)
            .await
            .step(|| format!("Looking up service {service}"))?;

        let Some(handle) = existing else {
            tracing::info!(%service, binary = %update_binary.display(), "installing new service");
            self.services
                .install(&update_binary)
                .await
                .step(|| format!("Installing service {service}"))?;
            self.apply_connection_string(folder, &update_config, connection_string, diag)
                .step(|| format!("Setting the connection string in {}", update_config.display()))?;
            self.start_service(service, diag).await;
            return self.finish(release, folder, &update_path);
        };

        let installed_dir = handle
            .binary_path
            .as_deref()
            .and_then(Path::parent)
            .map(Path::to_path_buf);

        if let Some(dir) = &installed_dir
            && let Some(current) = already_current(release, folder, dir, diag)
        {
            return Ok(current);
        }

        if handle.status != ServiceStatus::Stopped {
            tracing::info!(%service, "stopping service");
            self.services
                .stop(service)
                .await
                .step(|| format!("Stopping service {service}"))?;
        }

        match &installed_dir {
            Some(dir) => {
                let installed_config = folder.config_path_in(dir);
                if let Err(e) = self.carry_config(folder, &installed_config, &update_config) {
                    diag.warn(Warning::config_not_carried(folder.name().as_str(), e));
                }
            }
            None => diag.warn(Warning::config_not_carried(
                folder.name().as_str(),
                "the installed location is unknown",
            )),
        }

        self.uninstall_old(service, &handle, &update_binary).await?;

        tracing::info!(%service, binary = %update_binary.display(), "installing service");
        self.services
            .install(&update_binary)
            .await
            .step(|| format!("Installing service {service}"))?;
        self.start_service(service, diag).await;

        self.finish(release, folder, &update_path)
    }

    fn deploy_resource(
        &self,
        release: &Release,
        folder: &AppFolder,
        connection_string: Option<&str>,
        diag: &mut Diagnostics,
    ) -> Result<Outcome, Halt> {
        let update_path = release.folder_path(folder);
        let update_config = folder.config_path_in(&update_path);
        self.apply_connection_string(folder, &update_config, connection_string, diag)
            .step(|| format!("Updating the resource configuration {}", update_config.display()))?;
        self.finish(release, folder, &update_path)
    }

    /// Uninstall from the installed binary, falling back to the new binary path.
    async fn uninstall_old(
        &self,
        service: &str,
        handle: &ServiceHandle,
        update_binary: &Path,
    ) -> Result<(), Halt> {
        let first = match &handle.binary_path {
            Some(installed) => {
                tracing::info!(%service, binary = %installed.display(), "uninstalling service");
                self.services.uninstall(installed).await
            }
            None => Err(HostError::Rejected("installed binary path is unknown".to_string())),
        };

        if let Err(e) = first {
            tracing::info!(
                %service,
                error = %e,
                fallback = %update_binary.display(),
                "uninstall from installed location failed, trying the update location"
            );
            self.services
                .uninstall(update_binary)
                .await
                .step(|| format!("Uninstalling the old service {service}"))?;
        }
        Ok(())
    }

    async fn start_service(&self, service: &str, diag: &mut Diagnostics) {
        match self.services.start(service).await {
            Ok(()) => tracing::info!(%service, "service started"),
            Err(e) => diag.warn(Warning::service_start_failed(service, e)),
        }
    }

    fn apply_connection_string(
        &self,
        folder: &AppFolder,
        config_path: &Path,
        connection_string: Option<&str>,
        diag: &mut Diagnostics,
    ) -> Result<(), HostError> {
        let Some(connection_string) = connection_string else {
            diag.warn(Warning::missing_connection_string(folder.name().as_str()));
            return Ok(());
        };
        let name = folder.connection_string_name();
        let mut config = self.config.read(config_path, name)?;
        config.connection_string = Some(connection_string.to_string());
        self.config.write(config_path, name, &config)
    }

    /// Overwrite the new config's settings with their installed values and
    /// carry the installed connection string.
    ///
    /// Settings the new release no longer declares stay dropped.
    fn carry_config(&self, folder: &AppFolder, from: &Path, to: &Path) -> Result<(), HostError> {
        let name = folder.connection_string_name();
        let installed = self.config.read(from, name)?;
        let mut updated: AppConfig = self.config.read(to, name)?;

        for (key, value) in installed.app_settings {
            if let Some(slot) = updated.app_settings.get_mut(&key) {
                *slot = value;
            }
        }
        if installed.connection_string.is_some() {
            updated.connection_string = installed.connection_string;
        }
        self.config.write(to, name, &updated)?;
        tracing::info!(from = %from.display(), to = %to.display(), "configuration carried forward");
        Ok(())
    }

    fn finish(&self, release: &Release, folder: &AppFolder, update_path: &Path) -> Result<Outcome, Halt> {
        ReleaseStamp::for_release(release.manifest()).write(update_path)?;
        tracing::info!(folder = %folder.name(), "folder deployed");
        Ok(Outcome::success(format!(
            "{} updated to {}.",
            folder.name(),
            release.manifest().version()
        )))
    }

    /// Connection string configured for the installed copy of `folder`, if any.
    pub async fn installed_connection_string(&self, folder: &AppFolder) -> Option<String> {
        let dir = self.installed_dir(folder).await?;
        let config_path = folder.config_path_in(&dir);
        match self.config.read(&config_path, folder.connection_string_name()) {
            Ok(config) => config.connection_string.filter(|c| !c.trim().is_empty()),
            Err(e) => {
                tracing::debug!(folder = %folder.name(), error = %e, "installed configuration unreadable");
                None
            }
        }
    }

    async fn installed_dir(&self, folder: &AppFolder) -> Option<PathBuf> {
        let located = match folder.kind() {
            AppFolderKind::Web {
                application_name, ..
            } => self.installed_web_dir(application_name).await,
            AppFolderKind::Service { service_name } => {
                self.services.find(service_name).await.map(|handle| {
                    handle
                        .and_then(|h| h.binary_path)
                        .and_then(|p| p.parent().map(Path::to_path_buf))
                })
            }
            AppFolderKind::Resource => Ok(None),
        };

        located.unwrap_or_else(|e| {
            tracing::debug!(folder = %folder.name(), error = %e, "could not locate installed copy");
            None
        })
    }

    /// The prior application, if the web server already hosts one by this name.
    async fn existing_application(
        &self,
        site: &Site,
        application: &str,
    ) -> Result<Option<WebApplication>, HostError> {
        if !self.web.application_exists(application).await? {
            tracing::info!(%application, "no prior web application");
            return Ok(None);
        }
        self.web.application(site, application).await
    }

    async fn installed_web_dir(&self, application: &str) -> Result<Option<PathBuf>, HostError> {
        let Some(site) = self.web.find_by_application_name(application).await? else {
            return Ok(None);
        };
        Ok(self
            .existing_application(&site, application)
            .await?
            .map(|app| app.physical_path))
    }

    /// First connection string found on an installed web folder, then on an installed service.
    pub async fn resolve_connection_string(&self, release: &Release) -> Option<String> {
        let web = release
            .manifest()
            .folders()
            .filter(|f| matches!(f.kind(), AppFolderKind::Web { .. }));
        let services = release
            .manifest()
            .folders()
            .filter(|f| matches!(f.kind(), AppFolderKind::Service { .. }));

        for folder in web.chain(services) {
            if let Some(found) = self.installed_connection_string(folder).await {
                tracing::info!(folder = %folder.name(), "using connection string from installed folder");
                return Some(found);
            }
        }
        None
    }
}

/// Skip outcome when the installed copy already runs this release or newer.
fn already_current(
    release: &Release,
    folder: &AppFolder,
    installed_dir: &Path,
    diag: &mut Diagnostics,
) -> Option<Outcome> {
    match ReleaseStamp::read(installed_dir) {
        Ok(Some(stamp)) if stamp.covers(release.manifest()) => {
            tracing::info!(folder = %folder.name(), installed = %stamp.version, "already current");
            Some(Outcome::success(format!(
                "{} is already current at version {}.",
                folder.name(),
                stamp.version
            )))
        }
        Ok(_) => None,
        Err(e) => {
            diag.warn(Warning::release_stamp_unreadable(
                &ReleaseStamp::path_in(installed_dir),
                e,
            ));
            None
        }
    }
}
