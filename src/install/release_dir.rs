// ABOUTME: Naming of side-by-side release directories under the update base path.
// ABOUTME: Collisions get a timestamp suffix appended until the name is free.

use std::path::{Path, PathBuf};

use chrono::Local;

/// Timestamp suffix format, e.g. `-2024-03-09-14_05_59`.
pub const COLLISION_SUFFIX_FORMAT: &str = "-%Y-%m-%d-%H_%M_%S";

/// Prefix of directories holding packages that carried no manifest.
pub const UNIDENTIFIED_PREFIX: &str = "unidentified";

/// First free path for `name` under `base`.
///
/// When `<base>/<name>` (or its `.zip`) exists, a timestamp suffix is appended
/// to the name and the check repeats, so a second collision within the same
/// second stacks another suffix.
pub fn unique_release_dir(base: &Path, name: &str) -> PathBuf {
    let mut name = name.to_string();
    loop {
        let candidate = base.join(&name);
        if !candidate.exists() && !package_path(&candidate).exists() {
            return candidate;
        }
        name.push_str(&Local::now().format(COLLISION_SUFFIX_FORMAT).to_string());
    }
}

/// Directory for a package without a manifest: `<base>/unidentified_<timestamp>`.
pub fn quarantine_dir(base: &Path) -> PathBuf {
    let name = format!(
        "{UNIDENTIFIED_PREFIX}_{}",
        Local::now().format("%Y-%m-%d-%H_%M_%S")
    );
    unique_release_dir(base, &name)
}

/// Where the raw package for `dir` is kept: `<dir>.zip`.
pub fn package_path(dir: &Path) -> PathBuf {
    let mut path = dir.as_os_str().to_os_string();
    path.push(".zip");
    PathBuf::from(path)
}
