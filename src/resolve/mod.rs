//! Import-chain resolution: merge-order linearization and directory
//! tree loading.

pub mod linearize;
pub mod tree;

pub use linearize::linearize;
pub use tree::{LoadedTree, TreeLoader};
