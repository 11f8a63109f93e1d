//! The `validate` command: run validators and report problems.

use anyhow::{Result, bail};

use crate::checks::Runner;
use crate::cli::{CheckOpts, GlobalOpts};
use crate::commands::{CommandSetup, emit_reports};
use crate::logging::Logger;
use crate::meta::Metadata;

/// Validate a configuration against its metadata.
///
/// # Errors
///
/// Returns an error when loading fails, a checker name is unknown, or
/// any failure report is produced (warnings alone pass).
pub fn run(
    global: &GlobalOpts,
    opts: &CheckOpts,
    log: &Logger,
) -> Result<()> {
    let setup = CommandSetup::init(&opts.file, global, log)?;
    let meta = Metadata::new(&setup.meta_tree);
    let runner = Runner::new();

    log.stage("Validating");
    let reports = runner.validate(
        &setup.main,
        &setup.overlays,
        &meta,
        &opts.checkers,
    )?;
    let failures = emit_reports(&reports, global, log, false)?;

    if failures > 0 {
        bail!("{failures} problem(s) found");
    }
    log.info("configuration is valid");
    Ok(())
}
