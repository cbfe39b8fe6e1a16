//! Fragmentation trees read from formula-labelled Newick files.

pub mod error;
pub mod formula;
pub mod parser;
pub mod reader;
pub mod scoring;
pub mod tree;

pub use error::FragTreeError;
pub use formula::Formula;
pub use scoring::{ScoreFormula, ScoringParams, StandardScoring};
pub use tree::{FragAdapter, FragId, FragRef, FragTree, Fragment};
