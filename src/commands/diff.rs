//! The `diff` command: changeset between two configuration files.

use anyhow::{Context as _, Result};

use crate::cli::{DiffOpts, GlobalOpts};
use crate::config::diff::{ConfigDiff, KeyPath};
use crate::config::parser;
use crate::logging::Logger;

/// Print the changeset turning `base` into `overlay`.
///
/// # Errors
///
/// Returns an error if either file fails to load.
pub fn run(
    global: &GlobalOpts,
    opts: &DiffOpts,
    _log: &Logger,
) -> Result<()> {
    let base = parser::load_file(&opts.base)
        .with_context(|| format!("loading {}", opts.base.display()))?;
    let overlay = parser::load_file(&opts.overlay)
        .with_context(|| format!("loading {}", opts.overlay.display()))?;
    let diff = ConfigDiff::set_from_configs(&base, &overlay);

    if global.json {
        let doc = serde_json::json!({
            "added": paths(diff.added().keys()),
            "removed": paths(diff.removed().keys()),
            "modified": paths(diff.modified().keys()),
        });
        println!("{}", serde_json::to_string_pretty(&doc)?);
        return Ok(());
    }

    for path in diff.removed().keys() {
        println!("- {}", path.join("="));
    }
    for path in diff.added().keys() {
        println!("+ {}", path.join("="));
    }
    for (path, (old, new)) in diff.modified() {
        println!(
            "~ {}: {} -> {}",
            path.join("="),
            old.value.as_deref().unwrap_or("(section)"),
            new.value.as_deref().unwrap_or("(section)"),
        );
    }
    Ok(())
}

fn paths<'a>(keys: impl Iterator<Item = &'a KeyPath>) -> Vec<String> {
    keys.map(|p| p.join("=")).collect()
}
