//! Metadata-driven configuration management engine.
//!
//! Structured, text-based suite configuration: settings live in
//! sections and options, annotated by a parallel metadata configuration
//! that declares types, legal values, and cross-setting dependency
//! rules. The engine merges configuration fragments along a
//! deterministic multi-parent import order and computes, for every
//! setting, whether it is enabled, trigger-ignored, or user-ignored.
//!
//! The public API is organised in layers:
//!
//! - **[`config`]** — the node tree, text format loader/dumper, diffs
//!   and optional overlays
//! - **[`resolve`]** — import-chain linearization and directory loading
//! - **[`meta`]** + **[`rules`]** — metadata lookup and the rule
//!   expression engine
//! - **[`trigger`]** — dependency propagation over setting states
//! - **[`checks`]** — capability checkers and the runner
//! - **[`commands`]** — top-level subcommand orchestration
#![deny(clippy::or_fun_call)]
#![deny(clippy::bool_to_int_with_if)]

pub mod checks;
pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod logging;
pub mod meta;
pub mod report;
pub mod resolve;
pub mod rules;
pub mod trigger;
