// ABOUTME: Test support utilities.
// ABOUTME: In-memory host managers, config store, SQL backend, and package builders.

#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap};
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Once};

use async_trait::async_trait;
use dropship::host::{
    AppConfig, ConfigStore, HostError, ServiceHandle, ServiceHostManager, ServiceStatus, Site,
    WebApplication, WebHostManager,
};
use dropship::migrate::{ExecutorError, SchemaLedgerEntry, SqlConnector, SqlExecutor};
use dropship::types::ScriptVersion;
use parking_lot::Mutex;
use zip::write::SimpleFileOptions;

static TRACING_INIT: Once = Once::new();

/// Initialize tracing for tests. Safe to call multiple times.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::EnvFilter;
        let filter = EnvFilter::from_default_env()
            .add_directive("dropship=debug".parse().unwrap())
            .add_directive("sqlx=warn".parse().unwrap());
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init()
            .ok();
    });
}

// Manifests and packages

pub const WEB_FOLDER: &str = r#"{
    "Name": "Web", "TypeName": "Web", "ConnectionStringName": "ShopDb",
    "AssemblyName": "Shop.Web.dll", "WebApplicationName": "shop", "WebApplicationPoolName": "ShopPool"
}"#;

pub const SERVICE_FOLDER: &str = r#"{
    "Name": "Worker", "TypeName": "Service", "ConnectionStringName": "ShopDb",
    "AssemblyName": "Shop.Worker.exe", "ServiceName": "ShopWorker"
}"#;

pub const RESOURCE_FOLDER: &str = r#"{
    "Name": "Reports", "TypeName": "Resource", "ConnectionStringName": "ShopDb",
    "AssemblyName": "Shop.Reports.dll"
}"#;

pub fn manifest_json(version: &str, executable: &str, folders: &[&str]) -> String {
    format!(
        r#"{{
            "ProductName": "Shop",
            "Version": "{version}",
            "DateCreated": "2024-03-09T14:05:59",
            "UpdateExecutableName": "{executable}",
            "AppFolders": [{}]
        }}"#,
        folders.join(",")
    )
}

/// A zip with `(name, contents, unix mode)` entries.
pub fn zip_package(entries: &[(&str, &[u8], u32)]) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    for (name, contents, mode) in entries {
        let options = SimpleFileOptions::default().unix_permissions(*mode);
        writer.start_file(*name, options).unwrap();
        writer.write_all(contents).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

/// Lay out an extracted release under `root`: manifest plus one directory per folder.
pub fn write_release(root: &Path, manifest: &str, folders: &[&str]) {
    std::fs::create_dir_all(root).unwrap();
    std::fs::write(root.join("AppInfo.json"), manifest).unwrap();
    for folder in folders {
        std::fs::create_dir_all(root.join("Application").join(folder)).unwrap();
    }
}

// Web host

#[derive(Debug, Default)]
struct WebState {
    default_site: Option<String>,
    sites: HashMap<String, String>,
    applications: HashMap<(String, String), WebApplication>,
    calls: Vec<String>,
    fail: Option<String>,
}

/// Web host keeping sites and applications in memory.
#[derive(Debug, Default)]
pub struct FakeWebHost {
    state: Mutex<WebState>,
}

impl FakeWebHost {
    pub fn with_default_site(site: &str) -> Self {
        let host = Self::default();
        host.state.lock().default_site = Some(site.to_string());
        host
    }

    pub fn install_application(&self, site: &str, application: &str, path: &Path, pool: &str) {
        let mut state = self.state.lock();
        state.sites.insert(application.to_string(), site.to_string());
        state.applications.insert(
            (site.to_string(), application.to_string()),
            WebApplication {
                name: application.to_string(),
                physical_path: path.to_path_buf(),
                pool: Some(pool.to_string()),
            },
        );
    }

    /// Make the operation named `call` fail from now on.
    pub fn fail_on(&self, call: &str) {
        self.state.lock().fail = Some(call.to_string());
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().calls.clone()
    }

    pub fn application_path(&self, site: &str, application: &str) -> Option<PathBuf> {
        self.state
            .lock()
            .applications
            .get(&(site.to_string(), application.to_string()))
            .map(|app| app.physical_path.clone())
    }

    fn record(&self, call: &str, detail: String) -> Result<(), HostError> {
        let mut state = self.state.lock();
        state.calls.push(format!("{call} {detail}"));
        if state.fail.as_deref() == Some(call) {
            return Err(HostError::Rejected(format!("{call} refused")));
        }
        Ok(())
    }
}

#[async_trait]
impl WebHostManager for FakeWebHost {
    async fn find_by_application_name(&self, application: &str) -> Result<Option<Site>, HostError> {
        self.record("find", application.to_string())?;
        let state = self.state.lock();
        Ok(state
            .sites
            .get(application)
            .or(state.default_site.as_ref())
            .map(Site::new))
    }

    async fn application(
        &self,
        site: &Site,
        application: &str,
    ) -> Result<Option<WebApplication>, HostError> {
        self.record("application", application.to_string())?;
        Ok(self
            .state
            .lock()
            .applications
            .get(&(site.name.clone(), application.to_string()))
            .cloned())
    }

    async fn application_exists(&self, application: &str) -> Result<bool, HostError> {
        self.record("exists", application.to_string())?;
        Ok(self.state.lock().sites.contains_key(application))
    }

    async fn create_pool(&self, pool: &str) -> Result<(), HostError> {
        self.record("create_pool", pool.to_string())
    }

    async fn set_application_path(
        &self,
        site: &Site,
        application: &str,
        path: &Path,
    ) -> Result<(), HostError> {
        self.record("set_path", format!("{application} {}", path.display()))?;
        let mut state = self.state.lock();
        state
            .sites
            .insert(application.to_string(), site.name.clone());
        state
            .applications
            .entry((site.name.clone(), application.to_string()))
            .and_modify(|app| app.physical_path = path.to_path_buf())
            .or_insert_with(|| WebApplication {
                name: application.to_string(),
                physical_path: path.to_path_buf(),
                pool: None,
            });
        Ok(())
    }

    async fn set_application_pool(
        &self,
        site: &Site,
        application: &str,
        pool: &str,
    ) -> Result<(), HostError> {
        self.record("set_pool", format!("{application} {pool}"))?;
        if let Some(app) = self
            .state
            .lock()
            .applications
            .get_mut(&(site.name.clone(), application.to_string()))
        {
            app.pool = Some(pool.to_string());
        }
        Ok(())
    }
}

// Service host

#[derive(Debug, Default)]
struct ServiceState {
    services: HashMap<String, ServiceHandle>,
    calls: Vec<String>,
    fail: Vec<String>,
}

/// Service host keeping registrations in memory.
#[derive(Debug, Default)]
pub struct FakeServiceHost {
    state: Mutex<ServiceState>,
}

impl FakeServiceHost {
    pub fn register(&self, name: &str, status: ServiceStatus, binary_path: Option<&Path>) {
        self.state.lock().services.insert(
            name.to_string(),
            ServiceHandle {
                name: name.to_string(),
                status,
                binary_path: binary_path.map(Path::to_path_buf),
            },
        );
    }

    pub fn fail_on(&self, call: &str) {
        self.state.lock().fail.push(call.to_string());
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().calls.clone()
    }

    pub fn call_names(&self) -> Vec<String> {
        self.calls()
            .iter()
            .filter_map(|c| c.split_whitespace().next().map(str::to_string))
            .collect()
    }

    fn record(&self, call: &str, detail: String) -> Result<(), HostError> {
        let mut state = self.state.lock();
        state.calls.push(format!("{call} {detail}"));
        if state.fail.iter().any(|f| f == call) {
            return Err(HostError::Rejected(format!("{call} refused")));
        }
        Ok(())
    }
}

#[async_trait]
impl ServiceHostManager for FakeServiceHost {
    async fn find(&self, name: &str) -> Result<Option<ServiceHandle>, HostError> {
        self.record("find", name.to_string())?;
        Ok(self.state.lock().services.get(name).cloned())
    }

    async fn stop(&self, name: &str) -> Result<(), HostError> {
        self.record("stop", name.to_string())
    }

    async fn start(&self, name: &str) -> Result<(), HostError> {
        self.record("start", name.to_string())
    }

    async fn install(&self, binary_path: &Path) -> Result<(), HostError> {
        self.record("install", binary_path.display().to_string())
    }

    async fn uninstall(&self, binary_path: &Path) -> Result<(), HostError> {
        self.record("uninstall", binary_path.display().to_string())
    }
}

// Config store

/// Config files held in memory, keyed by path.
#[derive(Debug, Default)]
pub struct MemoryConfigStore {
    files: Mutex<HashMap<PathBuf, (BTreeMap<String, String>, BTreeMap<String, String>)>>,
}

impl MemoryConfigStore {
    /// Create a file with app settings and connection strings.
    pub fn seed(&self, path: &Path, settings: &[(&str, &str)], connections: &[(&str, &str)]) {
        let collect = |pairs: &[(&str, &str)]| {
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect::<BTreeMap<_, _>>()
        };
        self.files
            .lock()
            .insert(path.to_path_buf(), (collect(settings), collect(connections)));
    }

    pub fn setting(&self, path: &Path, key: &str) -> Option<String> {
        self.files.lock().get(path)?.0.get(key).cloned()
    }

    pub fn connection(&self, path: &Path, name: &str) -> Option<String> {
        self.files.lock().get(path)?.1.get(name).cloned()
    }

    pub fn touched(&self) -> usize {
        self.files.lock().len()
    }
}

impl ConfigStore for MemoryConfigStore {
    fn read(&self, path: &Path, connection_name: &str) -> Result<AppConfig, HostError> {
        let files = self.files.lock();
        let (settings, connections) = files
            .get(path)
            .ok_or_else(|| HostError::ConfigNotFound(path.to_path_buf()))?;
        Ok(AppConfig {
            app_settings: settings.clone(),
            connection_string: connections.get(connection_name).cloned(),
        })
    }

    fn write(&self, path: &Path, connection_name: &str, config: &AppConfig) -> Result<(), HostError> {
        let mut files = self.files.lock();
        let (settings, connections) = files
            .get_mut(path)
            .ok_or_else(|| HostError::ConfigNotFound(path.to_path_buf()))?;
        settings.extend(config.app_settings.clone());
        if let Some(connection) = &config.connection_string {
            connections.insert(connection_name.to_string(), connection.clone());
        }
        Ok(())
    }
}

// SQL backend

#[derive(Debug, Default)]
struct DatabaseState {
    reachable: bool,
    ledger: Vec<SchemaLedgerEntry>,
    batches: Vec<String>,
    bootstrapped: Vec<String>,
    fail_marker: Option<String>,
}

/// An in-memory database that records batches and ledger rows.
#[derive(Debug, Clone)]
pub struct MemoryDatabase {
    state: Arc<Mutex<DatabaseState>>,
}

impl Default for MemoryDatabase {
    fn default() -> Self {
        Self {
            state: Arc::new(Mutex::new(DatabaseState {
                reachable: true,
                ..DatabaseState::default()
            })),
        }
    }
}

impl MemoryDatabase {
    pub fn unreachable() -> Self {
        let db = Self::default();
        db.state.lock().reachable = false;
        db
    }

    /// Pretend `version` was applied by an earlier run.
    pub fn at_version(version: f64) -> Self {
        let db = Self::default();
        db.state.lock().ledger.push(SchemaLedgerEntry {
            version: ScriptVersion::new(version).unwrap(),
            applied_at: chrono::Utc::now(),
            script_name: format!("{version}.sql"),
            notes: String::new(),
        });
        db
    }

    /// Fail every batch containing `marker`.
    pub fn fail_batches_containing(&self, marker: &str) {
        self.state.lock().fail_marker = Some(marker.to_string());
    }

    pub fn clear_failures(&self) {
        self.state.lock().fail_marker = None;
    }

    pub fn bootstrapped(&self) -> Vec<String> {
        self.state.lock().bootstrapped.clone()
    }

    pub fn batches(&self) -> Vec<String> {
        self.state.lock().batches.clone()
    }

    pub fn ledger(&self) -> Vec<SchemaLedgerEntry> {
        self.state.lock().ledger.clone()
    }

    pub fn installed(&self) -> ScriptVersion {
        self.state
            .lock()
            .ledger
            .iter()
            .map(|e| e.version)
            .max()
            .unwrap_or(ScriptVersion::ZERO)
    }
}

#[async_trait]
impl SqlConnector for MemoryDatabase {
    async fn connect(&self, connection_string: &str) -> Result<Box<dyn SqlExecutor>, ExecutorError> {
        if connection_string.contains("unreachable") {
            return Err(ExecutorError::Rejected("host not found".to_string()));
        }
        Ok(Box::new(self.clone()))
    }
}

#[async_trait]
impl SqlExecutor for MemoryDatabase {
    async fn probe(&self) -> Result<(), ExecutorError> {
        if self.state.lock().reachable {
            Ok(())
        } else {
            Err(ExecutorError::Rejected("timeout".to_string()))
        }
    }

    async fn installed_version(&self) -> Result<ScriptVersion, ExecutorError> {
        Ok(self.installed())
    }

    async fn execute_batch(&self, sql: &str) -> Result<(), ExecutorError> {
        let mut state = self.state.lock();
        if let Some(marker) = &state.fail_marker
            && sql.contains(marker.as_str())
        {
            return Err(ExecutorError::Rejected(format!("syntax error near {marker}")));
        }
        state.batches.push(sql.to_string());
        Ok(())
    }

    async fn record(&self, entry: &SchemaLedgerEntry) -> Result<(), ExecutorError> {
        self.state.lock().ledger.push(entry.clone());
        Ok(())
    }

    async fn bootstrap_applied(&self, script_name: &str) -> Result<bool, ExecutorError> {
        Ok(self.state.lock().bootstrapped.iter().any(|s| s == script_name))
    }

    async fn mark_bootstrap_applied(&self, script_name: &str) -> Result<(), ExecutorError> {
        let mut state = self.state.lock();
        if !state.bootstrapped.iter().any(|s| s == script_name) {
            state.bootstrapped.push(script_name.to_string());
        }
        Ok(())
    }
}
