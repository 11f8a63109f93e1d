//! Import-chain loading of a configuration directory.
//!
//! A directory's configuration file may name parent directories via a
//! root-level `import=` option (shell-tokenized, searched across a
//! caller-supplied path list). The chain is ordered by
//! [`linearize`](crate::resolve::linearize::linearize) and merged
//! first-writer-wins: the most derived directory overrides the least.
//! Alongside the merged tree, a manifest records every auxiliary file
//! contributed by the chain.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use crate::config::node::Node;
use crate::config::opts::{self, OptKey};
use crate::error::{ResolveError, SuiteError};
use crate::resolve::linearize::linearize;

/// Name of the root-level option declaring parent directories.
pub const IMPORT_OPTION: &str = "import";

/// Result of loading a configuration directory and its import chain.
#[derive(Debug)]
pub struct LoadedTree {
    /// The merged configuration.
    pub node: Node,
    /// For each auxiliary file (relative path), the first directory in
    /// merge order that contributes it.
    pub files: BTreeMap<String, PathBuf>,
    /// For each auxiliary file, every directory that contains it, in
    /// merge order.
    pub file_locations: BTreeMap<String, Vec<PathBuf>>,
    /// The directories of the chain in merge order, most derived first.
    pub resolved_dirs: Vec<PathBuf>,
}

/// Loader for a directory's import chain.
#[derive(Debug, Clone)]
pub struct TreeLoader {
    filename: String,
    search_paths: Vec<PathBuf>,
    opt_keys: Vec<OptKey>,
}

struct LoadedDir {
    dir: PathBuf,
    node: Node,
    imports: Vec<String>,
    missing_opts: Vec<String>,
}

impl TreeLoader {
    /// Create a loader for `filename`, resolving imports across
    /// `search_paths` and applying `opt_keys` overlays to every file in
    /// the chain.
    #[must_use]
    pub fn new(
        filename: impl Into<String>,
        search_paths: Vec<PathBuf>,
        opt_keys: Vec<OptKey>,
    ) -> Self {
        Self {
            filename: filename.into(),
            search_paths,
            opt_keys,
        }
    }

    /// Load `root_dir`'s configuration together with its import chain.
    ///
    /// # Errors
    ///
    /// Propagates parse errors from any file in the chain;
    /// [`ResolveError::ImportNotFound`] for an unresolvable `import=`
    /// token; [`ResolveError::CyclicImport`] /
    /// [`ResolveError::Unlinearizable`] for a bad chain; and a single
    /// [`ResolveError::MissingOptionals`] listing every overlay key not
    /// found (and not tolerated) across the whole chain.
    pub fn load(&self, root_dir: &Path) -> Result<LoadedTree, SuiteError> {
        let root_dir = dunce::canonicalize(root_dir).unwrap_or_else(|_| root_dir.to_path_buf());
        let root_name = root_dir.display().to_string();

        let mut cache: HashMap<String, LoadedDir> = HashMap::new();
        self.load_dir(&root_name, &root_dir, &mut cache)?;

        let order = {
            let mut parents_of = |name: &str| -> Result<Vec<String>, SuiteError> {
                if !cache.contains_key(name) {
                    let dir = self.find_import(name)?;
                    self.load_dir(name, &dir, &mut cache)?;
                }
                Ok(cache
                    .get(name)
                    .map(|d| d.imports.clone())
                    .unwrap_or_default())
            };
            linearize(&root_name, &mut parents_of)?
        };

        let mut node = Node::section();
        let mut resolved_dirs = Vec::new();
        let mut missing: Vec<String> = Vec::new();
        let mut files = BTreeMap::new();
        let mut file_locations: BTreeMap<String, Vec<PathBuf>> =
            BTreeMap::new();

        for name in &order {
            let Some(loaded) = cache.get(name) else {
                continue;
            };
            node.merge_under(&loaded.node);
            missing.extend(loaded.missing_opts.iter().cloned());
            resolved_dirs.push(loaded.dir.clone());

            for rel in collect_aux_files(&loaded.dir, &self.filename) {
                files
                    .entry(rel.clone())
                    .or_insert_with(|| loaded.dir.clone());
                file_locations
                    .entry(rel)
                    .or_default()
                    .push(loaded.dir.clone());
            }
        }

        if !missing.is_empty() {
            missing.sort();
            missing.dedup();
            return Err(ResolveError::MissingOptionals { keys: missing }.into());
        }

        Ok(LoadedTree {
            node,
            files,
            file_locations,
            resolved_dirs,
        })
    }

    fn load_dir(
        &self,
        name: &str,
        dir: &Path,
        cache: &mut HashMap<String, LoadedDir>,
    ) -> Result<(), SuiteError> {
        let loaded =
            opts::load_with_opts(&dir.join(&self.filename), &self.opt_keys)?;
        let imports = loaded
            .node
            .get_value(&[IMPORT_OPTION])
            .and_then(shlex::split)
            .unwrap_or_default();
        cache.insert(
            name.to_string(),
            LoadedDir {
                dir: dir.to_path_buf(),
                node: loaded.node,
                imports,
                missing_opts: loaded.missing,
            },
        );
        Ok(())
    }

    fn find_import(&self, name: &str) -> Result<PathBuf, ResolveError> {
        for base in &self.search_paths {
            let candidate = base.join(name);
            if candidate.join(&self.filename).is_file() {
                return Ok(dunce::canonicalize(&candidate)
                    .unwrap_or(candidate));
            }
        }
        Err(ResolveError::ImportNotFound {
            name: name.to_string(),
        })
    }
}

/// Relative paths of every auxiliary file under `dir`: hidden entries
/// and the configuration file itself are skipped.
fn collect_aux_files(dir: &Path, config_filename: &str) -> Vec<String> {
    let mut out = Vec::new();
    walk_dir(dir, dir, config_filename, &mut out);
    out.sort();
    out
}

fn walk_dir(
    root: &Path,
    dir: &Path,
    config_filename: &str,
    out: &mut Vec<String>,
) {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.starts_with('.') {
            continue;
        }
        let path = entry.path();
        if path.is_dir() {
            walk_dir(root, &path, config_filename, out);
        } else if let Ok(rel) = path.strip_prefix(root) {
            let rel = rel
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            if rel != config_filename {
                out.push(rel);
            }
        }
    }
}
