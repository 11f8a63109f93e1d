// Shared helpers for integration tests.
//
// Provides a temporary-directory-backed configuration tree and a fluent
// builder so each integration test can set up an isolated environment
// without repeating filesystem boilerplate.
//
// Used by all integration test binaries that declare `mod common;`.
#![allow(dead_code)]

use std::path::{Path, PathBuf};

/// The configuration file name used throughout the tests.
pub const FILENAME: &str = "suite.conf";

/// An isolated configuration workspace backed by a
/// [`tempfile::TempDir`].
///
/// The directory is automatically deleted when dropped.
pub struct TestTree {
    root: tempfile::TempDir,
}

impl TestTree {
    /// Create an empty workspace.
    pub fn new() -> Self {
        Self {
            root: tempfile::tempdir().expect("create temp dir"),
        }
    }

    /// Path to the workspace root.
    pub fn root_path(&self) -> &Path {
        self.root.path()
    }

    /// Absolute path of a file or directory inside the workspace.
    pub fn path(&self, rel: &str) -> PathBuf {
        self.root.path().join(rel)
    }

    /// Write `content` at `rel`, creating parent directories.
    pub fn write(&self, rel: &str, content: &str) -> PathBuf {
        let path = self.path(rel);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("create parent dirs");
        }
        std::fs::write(&path, content).expect("write file");
        path
    }

    /// Write a configuration directory: `suite.conf` under `rel`.
    pub fn write_config_dir(&self, rel: &str, content: &str) -> PathBuf {
        self.write(&format!("{rel}/{FILENAME}"), content);
        self.path(rel)
    }
}

/// Fluent builder for [`TestTree`].
pub struct TestTreeBuilder {
    tree: TestTree,
}

impl TestTreeBuilder {
    /// Begin building a new workspace.
    pub fn new() -> Self {
        Self {
            tree: TestTree::new(),
        }
    }

    /// Add a file at `rel`.
    #[must_use]
    pub fn with_file(self, rel: &str, content: &str) -> Self {
        self.tree.write(rel, content);
        self
    }

    /// Add a configuration directory at `rel`.
    #[must_use]
    pub fn with_config_dir(self, rel: &str, content: &str) -> Self {
        self.tree.write_config_dir(rel, content);
        self
    }

    /// Finalise the workspace.
    pub fn build(self) -> TestTree {
        self.tree
    }
}
