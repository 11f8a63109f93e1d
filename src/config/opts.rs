//! Optional-configuration overlay resolution.
//!
//! A configuration file may carry a pseudo-option `opts` naming overlay
//! keys. Each key `k` resolves to `{dir}/opt/{base}-{k}{ext}` next to
//! the main file; overlays merge into the main tree in listed order,
//! later overlays winning on conflicts. A key wrapped in parentheses is
//! permitted to be missing without error.

use std::path::{Path, PathBuf};

use crate::config::node::Node;
use crate::config::parser;
use crate::error::{ConfigError, ResolveError, SuiteError};

/// Name of the pseudo-option listing overlay keys.
pub const OPTS_OPTION: &str = "opts";

/// Subdirectory holding overlay files.
pub const OPT_DIR: &str = "opt";

/// Result of loading a file together with its overlays.
#[derive(Debug)]
pub struct OptLoad {
    /// The merged tree (main file plus overlays).
    pub node: Node,
    /// Overlay keys that were requested, not tolerated-missing, and not
    /// found. Callers either raise these or aggregate them across an
    /// import chain.
    pub missing: Vec<String>,
}

/// An overlay key as requested: parenthesized keys tolerate absence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptKey {
    /// The bare key (parentheses stripped).
    pub name: String,
    /// Whether the overlay file may be absent without error.
    pub tolerated: bool,
}

impl OptKey {
    /// Parse one overlay key token.
    #[must_use]
    pub fn parse(token: &str) -> Self {
        token.strip_prefix('(').and_then(|t| t.strip_suffix(')')).map_or_else(
            || Self {
                name: token.to_string(),
                tolerated: false,
            },
            |inner| Self {
                name: inner.to_string(),
                tolerated: true,
            },
        )
    }
}

/// Shell-token split an `opts` value into overlay keys.
#[must_use]
pub fn parse_opt_keys(value: &str) -> Vec<OptKey> {
    shlex::split(value)
        .unwrap_or_default()
        .iter()
        .map(|token| OptKey::parse(token))
        .collect()
}

/// The overlay file path for `key` relative to a main file.
#[must_use]
pub fn opt_path(main: &Path, key: &str) -> PathBuf {
    let dir = main.parent().unwrap_or_else(|| Path::new("."));
    let stem = main
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let ext = main
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();
    dir.join(OPT_DIR).join(format!("{stem}-{key}{ext}"))
}

/// Load a file and merge in its overlays.
///
/// Overlay keys come from the file's own `opts` option followed by
/// `extra_keys` (caller-requested, e.g. from the environment or the
/// import chain), in that order. Missing non-tolerated keys are
/// *collected*, not raised — see [`OptLoad::missing`].
///
/// # Errors
///
/// Propagates [`ConfigError`] from the main file or any overlay file
/// that exists but fails to parse.
pub fn load_with_opts(
    path: &Path,
    extra_keys: &[OptKey],
) -> Result<OptLoad, ConfigError> {
    let mut node = parser::load_file(path)?;

    let mut keys =
        parse_opt_keys(node.get_value(&[OPTS_OPTION]).unwrap_or_default());
    keys.extend(extra_keys.iter().cloned());

    let mut missing = Vec::new();
    for key in keys {
        let overlay_path = opt_path(path, &key.name);
        if overlay_path.is_file() {
            let overlay = parser::load_file(&overlay_path)?;
            node.merge_over(&overlay);
        } else if !key.tolerated {
            missing.push(key.name);
        }
    }
    Ok(OptLoad { node, missing })
}

/// Load a file with overlays, raising on any missing non-tolerated key.
///
/// # Errors
///
/// As [`load_with_opts`], plus [`ResolveError::MissingOptionals`] when a
/// requested overlay is absent.
pub fn load(path: &Path, extra_keys: &[OptKey]) -> Result<Node, SuiteError> {
    let mut result = load_with_opts(path, extra_keys)?;
    if result.missing.is_empty() {
        Ok(result.node)
    } else {
        result.missing.sort();
        result.missing.dedup();
        Err(ResolveError::MissingOptionals {
            keys: result.missing,
        }
        .into())
    }
}
