// ABOUTME: Command module aggregator for the dropship CLI.
// ABOUTME: One handler per subcommand plus shared component wiring.

mod components;
mod fullupdate;
mod migrate;
mod push;
mod serve;
mod update_folder;

pub use fullupdate::fullupdate;
pub use migrate::migrate;
pub use push::push;
pub use serve::serve;
pub use update_folder::update_folder;

use dropship::error::{Error, Result};
use dropship::outcome::{FailureKind, Outcome};
use dropship::output::Output;

/// Print the outcome and turn a failed one into an error for the exit code.
fn report(outcome: Outcome, output: &Output) -> Result<()> {
    output.outcome(&outcome);
    if outcome.success {
        return Ok(());
    }
    Err(Error::Failed {
        kind: outcome.failure.unwrap_or(FailureKind::Process),
        message: outcome.message,
    })
}
