//! The `resolve` command: import-chain loading of a directory.

use anyhow::{Context as _, Result};

use crate::cli::{GlobalOpts, ResolveOpts};
use crate::config::dumper;
use crate::config::opts::OptKey;
use crate::logging::Logger;
use crate::resolve::TreeLoader;

/// Resolve a directory's import chain and print the merged result.
///
/// # Errors
///
/// Returns an error for unresolvable or cyclic import chains, missing
/// non-tolerated overlays, or parse failures anywhere in the chain.
pub fn run(
    _global: &GlobalOpts,
    opts: &ResolveOpts,
    log: &Logger,
) -> Result<()> {
    let keys: Vec<OptKey> =
        opts.opt_keys.iter().map(|k| OptKey::parse(k)).collect();
    let loader = TreeLoader::new(
        opts.filename.clone(),
        opts.import_paths.clone(),
        keys,
    );

    log.stage("Resolving import chain");
    let tree = loader
        .load(&opts.dir)
        .with_context(|| format!("resolving {}", opts.dir.display()))?;

    for dir in &tree.resolved_dirs {
        log.info(&format!("using {}", dir.display()));
    }
    log.debug(&format!("{} auxiliary file(s)", tree.files.len()));

    print!("{}", dumper::dump_string(&tree.node));
    Ok(())
}
