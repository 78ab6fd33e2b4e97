// ABOUTME: Validated domain types shared across the crate.
// ABOUTME: Session ids, script and release versions, and folder names.

mod folder_name;
mod id;
mod version;

pub use folder_name::{FolderName, FolderNameError};
pub use id::SessionId;
pub use version::{ReleaseVersion, ScriptVersion, VersionError};
