// ABOUTME: Deployment of an extracted release onto the host.
// ABOUTME: Per-folder orchestration, release drivers, release stamps, and the deploy lock.

mod driver;
mod error;
mod lock;
mod orchestrator;
mod release;
mod stamp;

pub use driver::DeploymentDriver;
pub use error::{DeployError, DeployErrorKind};
pub use lock::{DeployLock, LOCK_FILENAME, LockInfo};
pub use orchestrator::DeploymentOrchestrator;
pub use release::Release;
pub use stamp::{RELEASE_STAMP_FILENAME, ReleaseStamp, StampReadError};
