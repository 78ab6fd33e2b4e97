// ABOUTME: Zip payload handling: manifest lookup, extraction, and executable search.
// ABOUTME: The manifest may sit at any depth; the first match in archive order wins.

use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};

use snafu::{ResultExt, ensure};
use walkdir::WalkDir;
use zip::ZipArchive;

use super::error::{
    ArchiveSnafu, CreateDirSnafu, ExtractSnafu, InstallError, ManifestSnafu,
    ManifestTooLargeSnafu,
};
use crate::manifest::{MANIFEST_FILENAME, ReleaseManifest};

/// Largest manifest accepted from a package.
pub const MAX_MANIFEST_SIZE: u64 = 1024 * 1024;

fn open(payload: &[u8]) -> Result<ZipArchive<Cursor<&[u8]>>, InstallError> {
    ZipArchive::new(Cursor::new(payload)).context(ArchiveSnafu)
}

/// Parse the first `AppInfo.json` in the archive, if there is one.
pub fn read_manifest(payload: &[u8]) -> Result<Option<ReleaseManifest>, InstallError> {
    let mut archive = open(payload)?;

    for index in 0..archive.len() {
        let mut entry = archive.by_index(index).context(ArchiveSnafu)?;
        if entry.is_dir() {
            continue;
        }
        let is_manifest = Path::new(entry.name())
            .file_name()
            .is_some_and(|name| name.eq_ignore_ascii_case(MANIFEST_FILENAME));
        if !is_manifest {
            continue;
        }

        tracing::debug!(entry = entry.name(), declared = entry.size(), "found manifest");
        // Header sizes come from the sender; read at most one byte past the limit.
        let mut bytes = Vec::new();
        entry
            .by_ref()
            .take(MAX_MANIFEST_SIZE + 1)
            .read_to_end(&mut bytes)
            .map_err(zip::result::ZipError::Io)
            .context(ArchiveSnafu)?;
        ensure!(
            bytes.len() as u64 <= MAX_MANIFEST_SIZE,
            ManifestTooLargeSnafu {
                limit: MAX_MANIFEST_SIZE
            }
        );
        return ReleaseManifest::from_slice(&bytes)
            .map(Some)
            .context(ManifestSnafu);
    }

    Ok(None)
}

/// Extract the whole archive into `dir`, creating it.
pub fn extract(payload: &[u8], dir: &Path) -> Result<(), InstallError> {
    std::fs::create_dir_all(dir).context(CreateDirSnafu { path: dir })?;
    open(payload)?
        .extract(dir)
        .context(ExtractSnafu { path: dir })?;
    tracing::debug!(dir = %dir.display(), "package extracted");
    Ok(())
}

/// First file named `name` under `dir`, walking entries in sorted order.
pub fn find_executable(dir: &Path, name: &str) -> Option<PathBuf> {
    WalkDir::new(dir)
        .sort_by_file_name()
        .into_iter()
        .filter_map(Result::ok)
        .find(|entry| entry.file_type().is_file() && entry.file_name() == name)
        .map(|entry| entry.into_path())
}
