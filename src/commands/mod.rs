//! Top-level subcommand orchestration.

pub mod diff;
pub mod dump;
pub mod resolve;
pub mod transform;
pub mod validate;

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context as _, Result};

use crate::cli::GlobalOpts;
use crate::config::node::Node;
use crate::config::{opts, parser};
use crate::error::ResolveError;
use crate::logging::Logger;
use crate::report::Report;

/// Shared state produced by the common command setup sequence.
///
/// Encapsulates main-file loading, overlay discovery and metadata
/// loading so that each command does not have to repeat the
/// boilerplate. Overlays stay separate from the main tree here: the
/// runner merges and re-diffs them itself.
#[derive(Debug)]
pub struct CommandSetup {
    pub main: Node,
    pub overlays: BTreeMap<String, Node>,
    pub meta_tree: Node,
}

impl CommandSetup {
    /// Load the main configuration, its overlays, and the metadata.
    ///
    /// # Errors
    ///
    /// Returns an error if any file fails to load or a non-tolerated
    /// overlay is missing.
    pub fn init(
        file: &Path,
        global: &GlobalOpts,
        log: &Logger,
    ) -> Result<Self> {
        log.stage("Loading configuration");
        let main = parser::load_file(file)
            .with_context(|| format!("loading {}", file.display()))?;

        let keys = opts::parse_opt_keys(
            main.get_value(&[opts::OPTS_OPTION]).unwrap_or_default(),
        );
        let mut overlays = BTreeMap::new();
        let mut missing = Vec::new();
        for key in keys {
            let path = opts::opt_path(file, &key.name);
            if path.is_file() {
                let overlay = parser::load_file(&path).with_context(
                    || format!("loading overlay {}", path.display()),
                )?;
                overlays.insert(key.name, overlay);
            } else if !key.tolerated {
                missing.push(key.name);
            }
        }
        if !missing.is_empty() {
            missing.sort();
            return Err(anyhow::Error::new(ResolveError::MissingOptionals {
                keys: missing,
            })
            .context("resolving optional configurations"));
        }
        log.debug(&format!("{} overlay(s)", overlays.len()));

        let meta_tree = match &global.meta {
            Some(path) => {
                log.stage("Loading metadata");
                parser::load_file(path).with_context(|| {
                    format!("loading metadata {}", path.display())
                })?
            }
            None => {
                log.debug("no metadata file given; using empty metadata");
                Node::section()
            }
        };

        Ok(Self {
            main,
            overlays,
            meta_tree,
        })
    }
}

/// Print reports, keyed by configuration name (empty = main), as either
/// log lines or one JSON document. Returns the failure count.
pub fn emit_reports(
    named_reports: &BTreeMap<String, Vec<Report>>,
    global: &GlobalOpts,
    log: &Logger,
    changes_are_info: bool,
) -> Result<usize> {
    if global.json {
        let doc = serde_json::to_string_pretty(named_reports)
            .context("serializing reports")?;
        println!("{doc}");
    } else {
        for (name, reports) in named_reports {
            if !name.is_empty() && !reports.is_empty() {
                log.info(&format!("optional configuration: {name}"));
            }
            log.reports(reports, changes_are_info);
        }
    }
    Ok(named_reports
        .values()
        .flatten()
        .filter(|r| !r.is_warning)
        .count())
}
