use std::hash::Hash;
use std::str::FromStr;

use super::adapter::TreeAdapter;
use super::alignment_tree::{AlignmentTree, AlignmentTreeBacktrace};
use super::backtrace::Backtrace;
use super::dense::DenseAligner;
use super::error::AlignError;
use super::multijoin::MultiJoinAligner;
use super::scoring::Scoring;
use super::sparse::SparseAligner;
use super::traversal::PostOrderTraversal;

/// A solver bound to one pair of trees.
pub trait TreeAlignmentAlgorithm<N> {
    /// Fills the DP and returns the optimal score. Repeated calls are cheap.
    fn compute(&mut self) -> Result<f64, AlignError>;

    /// Replays one optimal alignment into `tracer`.
    fn backtrace(&mut self, tracer: &mut dyn Backtrace<N>) -> Result<(), AlignError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Solver {
    /// Sparse for at most one join, multi-join otherwise
    #[default]
    Auto,
    Dense,
    Sparse,
    MultiJoin,
}

impl Solver {
    pub fn resolve(self, joins: usize) -> Solver {
        match self {
            Solver::Auto if joins <= 1 => Solver::Sparse,
            Solver::Auto => Solver::MultiJoin,
            other => other,
        }
    }
}

impl FromStr for Solver {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "auto" => Ok(Solver::Auto),
            "dense" => Ok(Solver::Dense),
            "sparse" => Ok(Solver::Sparse),
            "multijoin" => Ok(Solver::MultiJoin),
            _ => Err(format!("unknown solver: {}", s)),
        }
    }
}

/// Entry point for aligning trees that share an adapter.
///
/// ```
/// use ftalign::libs::treealign::{EqualityScoring, NestedAdapter, TreeAligner};
///
/// struct Node { label: char, children: Vec<Node> }
/// fn children(node: &Node) -> Vec<&Node> {
///     node.children.iter().collect()
/// }
///
/// let leaf = |label| Node { label, children: vec![] };
/// let left = Node { label: 'r', children: vec![leaf('a'), leaf('b')] };
/// let right = Node { label: 'r', children: vec![leaf('b')] };
///
/// let adapter = NestedAdapter::new(children);
/// let scoring = EqualityScoring::new(|n: &Node| n.label).with_gap(-1.0);
/// let aligner = TreeAligner::new(&adapter, &scoring);
///
/// // roots and b match, a is deleted
/// assert_eq!(aligner.score(Some(&left), Some(&right)).unwrap(), 1.0);
/// ```
pub struct TreeAligner<'a, A, S> {
    adapter: &'a A,
    scoring: &'a S,
    joins: usize,
    solver: Solver,
}

impl<'a, A, S> TreeAligner<'a, A, S>
where
    A: TreeAdapter,
    S: Scoring<A::Node>,
{
    pub fn new(adapter: &'a A, scoring: &'a S) -> Self {
        Self {
            adapter,
            scoring,
            joins: 0,
            solver: Solver::Auto,
        }
    }

    /// Join cardinality: 0 disables joins.
    pub fn joins(mut self, joins: usize) -> Self {
        self.joins = joins;
        self
    }

    pub fn solver(mut self, solver: Solver) -> Self {
        self.solver = solver;
        self
    }

    pub fn build(
        &self,
        left: A::Node,
        right: A::Node,
    ) -> Result<Box<dyn TreeAlignmentAlgorithm<A::Node> + 'a>, AlignError>
    where
        A::Node: 'a,
    {
        let (adapter, scoring, joins) = (self.adapter, self.scoring, self.joins);
        let algorithm: Box<dyn TreeAlignmentAlgorithm<A::Node> + 'a> =
            match self.solver.resolve(joins) {
                Solver::Dense => Box::new(DenseAligner::new(adapter, left, right, scoring, joins)?),
                Solver::Sparse => {
                    Box::new(SparseAligner::new(adapter, left, right, scoring, joins)?)
                }
                _ => Box::new(MultiJoinAligner::new(adapter, left, right, scoring, joins)?),
            };
        Ok(algorithm)
    }

    /// Optimal score. A missing tree means everything on the other side is deleted.
    pub fn score(&self, left: Option<A::Node>, right: Option<A::Node>) -> Result<f64, AlignError>
    where
        A::Node: 'a,
    {
        match (left, right) {
            (Some(l), Some(r)) => self.build(l, r)?.compute(),
            _ => Ok(self.delete_all(left, right, None)),
        }
    }

    /// Score of a tree against itself.
    pub fn self_score(&self, root: A::Node) -> Result<f64, AlignError>
    where
        A::Node: 'a,
    {
        self.score(Some(root), Some(root))
    }

    /// Optimal score, with one optimal alignment replayed into `tracer`.
    pub fn align(
        &self,
        left: Option<A::Node>,
        right: Option<A::Node>,
        tracer: &mut dyn Backtrace<A::Node>,
    ) -> Result<f64, AlignError>
    where
        A::Node: 'a,
    {
        match (left, right) {
            (Some(l), Some(r)) => {
                let mut algorithm = self.build(l, r)?;
                let score = algorithm.compute()?;
                algorithm.backtrace(tracer)?;
                Ok(score)
            }
            _ => Ok(self.delete_all(left, right, Some(tracer))),
        }
    }

    /// Optimal alignment as a tree of aligned vertex pairs.
    pub fn alignment_tree(
        &self,
        left: A::Node,
        right: A::Node,
    ) -> Result<AlignmentTree<A::Node>, AlignError>
    where
        A::Node: 'a + Eq + Hash,
    {
        let mut builder = AlignmentTreeBacktrace::new(self.adapter, left, right);
        let score = self.align(Some(left), Some(right), &mut builder)?;
        let mut tree = builder.into_tree()?;
        tree.set_score(score);
        Ok(tree)
    }

    fn delete_all(
        &self,
        left: Option<A::Node>,
        right: Option<A::Node>,
        mut tracer: Option<&mut dyn Backtrace<A::Node>>,
    ) -> f64 {
        let mut score = 0.0;
        if let Some(root) = left {
            PostOrderTraversal::new(self.adapter, root).run(|node, _| {
                let s = self.scoring.delete_left(node);
                if let Some(t) = tracer.as_mut() {
                    t.delete_left(s, node);
                }
                score += s;
            });
        }
        if let Some(root) = right {
            PostOrderTraversal::new(self.adapter, root).run(|node, _| {
                let s = self.scoring.delete_right(node);
                if let Some(t) = tracer.as_mut() {
                    t.delete_right(s, node);
                }
                score += s;
            });
        }
        score
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_solver_resolve() {
        assert_eq!(Solver::Auto.resolve(0), Solver::Sparse);
        assert_eq!(Solver::Auto.resolve(1), Solver::Sparse);
        assert_eq!(Solver::Auto.resolve(2), Solver::MultiJoin);
        assert_eq!(Solver::Dense.resolve(3), Solver::Dense);
        assert_eq!("multijoin".parse::<Solver>(), Ok(Solver::MultiJoin));
        assert!("fast".parse::<Solver>().is_err());
    }
}
