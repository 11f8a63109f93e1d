//! Domain-specific error types for the configuration engine.
//!
//! This module provides a structured error hierarchy using [`thiserror`].
//! Internal modules return typed errors (e.g., [`ConfigError`],
//! [`ResolveError`]) while command handlers at the CLI boundary convert
//! them to [`anyhow::Error`] via the standard `?` operator.
//!
//! # Error hierarchy
//!
//! ```text
//! SuiteError
//! ├── Config(ConfigError)    — file syntax, decoding, I/O
//! ├── Resolve(ResolveError)  — import linearization, overlay lookup
//! └── Trigger(TriggerError)  — dependency-graph structure problems
//! ```
//!
//! Rule evaluation deliberately does *not* appear here: an unresolvable
//! rule reference is an expected condition modelled by
//! [`RuleFailure::Unresolvable`](crate::rules::RuleFailure) and is matched
//! by callers, never raised.

use thiserror::Error;

/// Top-level error type for the configuration engine.
///
/// Aggregates domain-specific sub-errors and is convertible to
/// [`anyhow::Error`] for use at CLI command boundaries.
#[derive(Error, Debug)]
pub enum SuiteError {
    /// Configuration file error (syntax, decoding, I/O).
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Import-chain resolution error (linearization, missing overlays).
    #[error("Resolve error: {0}")]
    Resolve(#[from] ResolveError),

    /// Trigger-graph structure error (cycles, missing metadata).
    #[error("Trigger error: {0}")]
    Trigger(#[from] TriggerError),

    /// A requested checker name is not registered.
    #[error("unknown checker '{name}'")]
    UnknownChecker {
        /// The unrecognized name.
        name: String,
    },

    /// A transformer returned a structurally invalid tree; the runner
    /// aborts before any output is written.
    #[error("checker '{checker}' returned a corrupt configuration: {detail}")]
    CorruptOutput {
        /// The offending checker.
        checker: String,
        /// What was wrong with the returned tree.
        detail: String,
    },
}

/// Errors that arise while loading or writing a configuration file.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A line is neither a section header, an option, a comment, nor a
    /// continuation.
    #[error("{file}:{line}:{col}: syntax error: {text}")]
    Syntax {
        /// Name of the file being parsed (or `"<string>"`).
        file: String,
        /// 1-based line number of the offending line.
        line: usize,
        /// 0-based column of the first unparsable character.
        col: usize,
        /// The offending line, verbatim.
        text: String,
    },

    /// The file contains bytes that are not valid UTF-8.
    #[error("{file}: not valid UTF-8")]
    Decode {
        /// Name of the file that could not be decoded.
        file: String,
    },

    /// An I/O error occurred while reading or writing a config file.
    #[error("IO error on config file {path}: {source}")]
    Io {
        /// Path to the file that could not be read or written.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },
}

/// Errors that arise while resolving a configuration directory's import
/// chain and optional overlays.
#[derive(Error, Debug)]
pub enum ResolveError {
    /// The import graph has no consistent linearization (conflicting
    /// parent orders).
    #[error("cannot linearize import chain for '{target}'")]
    Unlinearizable {
        /// The name originally queried.
        target: String,
    },

    /// A name depends on itself, directly or transitively.
    #[error("cyclic import chain detected for '{target}'")]
    CyclicImport {
        /// The name originally queried.
        target: String,
    },

    /// An `import=` entry could not be found on the search path.
    #[error("import '{name}' not found on search path")]
    ImportNotFound {
        /// The import token that could not be located.
        name: String,
    },

    /// Requested optional overlay keys were not found anywhere in the
    /// import chain and were not declared tolerant-of-absence.
    #[error("optional configuration keys not found: {}", keys.join(", "))]
    MissingOptionals {
        /// Every bad key, in sorted order.
        keys: Vec<String>,
    },
}

/// Structural problems in the metadata-declared trigger graph.
///
/// Validation stops at the first problem found (non-exhaustive by
/// design), so at most one of these is reported per validation pass.
#[derive(Error, Debug)]
pub enum TriggerError {
    /// A trigger references an id with no metadata section.
    #[error("no metadata for '{id}' (referenced by trigger in '{src}')")]
    MissingMetadata {
        /// The id lacking metadata.
        id: String,
        /// The id whose trigger referenced it.
        src: String,
    },

    /// A trigger expression failed to compile.
    #[error("invalid trigger expression for '{id}': {detail}")]
    InvalidExpression {
        /// The id carrying the bad expression.
        id: String,
        /// Diagnostic text from the rule compiler.
        detail: String,
    },

    /// A duplicated section is the target of a trigger from a different
    /// section family.
    #[error("duplicate section '{target}' badly triggered by '{src}'")]
    BadDuplicateTrigger {
        /// The duplicated target section id.
        target: String,
        /// The offending trigger source id.
        src: String,
    },

    /// An id is reachable from itself through the trigger graph.
    #[error("cyclic dependency detected at '{id}'")]
    CyclicDependency {
        /// The id at which the cycle was detected.
        id: String,
    },
}
