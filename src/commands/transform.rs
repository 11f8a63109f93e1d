//! The `transform` command: run fixers and trigger propagation, then
//! write the results back.

use std::collections::BTreeMap;

use anyhow::{Context as _, Result, bail};

use crate::checks::{CheckerOptions, Runner};
use crate::cli::{GlobalOpts, TransformOpts};
use crate::commands::{CommandSetup, emit_reports};
use crate::config::{dumper, opts as config_opts};
use crate::logging::Logger;
use crate::meta::Metadata;

/// Transform a configuration in place (or preview with `--dry-run`).
///
/// # Errors
///
/// Returns an error when loading fails, a checker name is unknown, a
/// checker option is malformed, a transformer corrupts its output, or a
/// result cannot be written.
pub fn run(
    global: &GlobalOpts,
    opts: &TransformOpts,
    log: &Logger,
) -> Result<()> {
    let setup = CommandSetup::init(&opts.file, global, log)?;
    let meta = Metadata::new(&setup.meta_tree);
    let runner = Runner::new();
    let options = parse_options(&opts.options)?;

    log.stage("Transforming");
    let output = runner.transform(
        &setup.main,
        &setup.overlays,
        &meta,
        &opts.checkers,
        &options,
    )?;

    let mut named = BTreeMap::new();
    named.insert(String::new(), output.reports.clone());
    emit_reports(&named, global, log, true)?;

    if opts.dry_run {
        log.info("dry run: nothing written");
        return Ok(());
    }

    dumper::dump_file(&output.main, &opts.file)
        .with_context(|| format!("writing {}", opts.file.display()))?;
    for (key, overlay) in &output.overlays {
        let path = config_opts::opt_path(&opts.file, key);
        dumper::dump_file(overlay, &path)
            .with_context(|| format!("writing {}", path.display()))?;
    }
    log.info(&format!(
        "wrote {} and {} overlay(s)",
        opts.file.display(),
        output.overlays.len()
    ));
    Ok(())
}

/// Parse `name=value` checker option arguments.
fn parse_options(args: &[String]) -> Result<CheckerOptions> {
    let mut options = CheckerOptions::new();
    for arg in args {
        let Some((name, value)) = arg.split_once('=') else {
            bail!("bad checker option '{arg}': expected name=value");
        };
        options.insert(name.trim().to_string(), value.trim().to_string());
    }
    Ok(options)
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn parse_options_accepts_pairs() {
        let options = parse_options(&[
            "insert-value=42".to_string(),
            "other = x".to_string(),
        ])
        .unwrap();
        assert_eq!(options["insert-value"], "42");
        assert_eq!(options["other"], "x");
    }

    #[test]
    fn parse_options_rejects_bare_words() {
        assert!(parse_options(&["oops".to_string()]).is_err());
    }
}
