//! The `dump` command: canonical reformatting.

use anyhow::{Context as _, Result};

use crate::cli::{DumpOpts, GlobalOpts};
use crate::config::{dumper, parser};
use crate::logging::Logger;

/// Reformat a configuration file, to stdout or in place.
///
/// # Errors
///
/// Returns an error if the file cannot be loaded or written.
pub fn run(
    _global: &GlobalOpts,
    opts: &DumpOpts,
    log: &Logger,
) -> Result<()> {
    let tree = parser::load_file(&opts.file)
        .with_context(|| format!("loading {}", opts.file.display()))?;
    if opts.in_place {
        dumper::dump_file(&tree, &opts.file)
            .with_context(|| format!("writing {}", opts.file.display()))?;
        log.info(&format!("reformatted {}", opts.file.display()));
    } else {
        print!("{}", dumper::dump_string(&tree));
    }
    Ok(())
}
