//! Global alignment of rooted, ordered trees with joins.
//!
//! Roots are always paired. Every other vertex is matched, deleted, or folded
//! into a join, where a vertex path on one side is aligned with a vertex path
//! on the other. Three solvers share one recurrence:
//!
//! * [`DenseAligner`]: bottom-up tables, at most one join, small degrees
//! * [`SparseAligner`]: memoized, at most one join
//! * [`MultiJoinAligner`]: memoized, join paths of any length on both sides
//!
//! ```
//! use ftalign::libs::treealign::{set_of, EqualityScoring, NestedAdapter, Solver, TreeAligner};
//!
//! struct Node { label: u8, children: Vec<Node> }
//! fn children(node: &Node) -> Vec<&Node> {
//!     node.children.iter().collect()
//! }
//!
//! let tree = Node { label: 0, children: vec![Node { label: 1, children: vec![] }] };
//! let adapter = NestedAdapter::new(children);
//! let scoring = EqualityScoring::new(|n: &Node| n.label);
//!
//! let aligner = TreeAligner::new(&adapter, &scoring).solver(Solver::Dense);
//! assert_eq!(aligner.self_score(&tree).unwrap(), 2.0);
//! assert_eq!(set_of(3), 0b111);
//! ```

mod adapter;
mod algorithm;
mod alignment_tree;
mod backtrace;
mod cursor;
mod decorate;
mod dense;
mod error;
mod multijoin;
mod pair;
mod scoring;
mod set;
mod sparse;
mod traversal;


pub use adapter::{BackrefTreeAdapter, NestedAdapter, TreeAdapter};
pub use algorithm::{Solver, TreeAligner, TreeAlignmentAlgorithm};
pub use alignment_tree::{AlignNode, AlignNodeId, AlignmentTree, AlignmentTreeBacktrace};
pub use backtrace::{Backtrace, MatchCounter, StackedBacktrace, TraceLog};
pub use cursor::{BackrefCursor, StackCursor, TreeCursor};
pub use decorate::{DecoratedTree, Vertex, VertexId};
pub use dense::{DenseAligner, DENSE_MAX_DEGREE};
pub use error::AlignError;
pub use multijoin::MultiJoinAligner;
pub use scoring::{EqualityScoring, Scoring};
pub use set::{set_of, ChildSet, SubsetTable, MAX_DEGREE};
pub use sparse::SparseAligner;
pub use traversal::{PostOrderIter, PostOrderTraversal, PreOrderIter, PreOrderTraversal};
