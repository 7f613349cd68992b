// ABOUTME: Command module aggregator for the slipway CLI.
// ABOUTME: Re-exports deploy, rollback, and status command handlers.

mod deploy;
mod rollback;
mod status;

pub use deploy::deploy;
pub use rollback::rollback;
pub use status::status;

use slipway::diagnostics::Diagnostics;
use slipway::output::Output;

/// Show collected warnings after a run.
fn emit_warnings(output: &Output, diag: &Diagnostics) {
    for warning in diag.warnings() {
        output.warning(&warning.message);
    }
}
