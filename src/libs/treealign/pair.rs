use super::adapter::TreeAdapter;
use super::backtrace::Backtrace;
use super::decorate::{DecoratedTree, VertexId};
use super::error::AlignError;
use super::scoring::Scoring;
use super::set::bits_of;

/// Running maximum over the options of a DP cell.
///
/// The first option wins ties, so replaying the same option sequence during
/// the backtrace lands on the same choice. NaN options lose against any
/// number.
#[derive(Debug, Clone, Copy)]
pub struct Best<C> {
    pub score: f64,
    pub choice: Option<C>,
}

impl<C> Best<C> {
    pub fn new() -> Self {
        Self {
            score: f64::NEG_INFINITY,
            choice: None,
        }
    }

    pub fn offer(&mut self, score: f64, choice: C) {
        if self.choice.is_none() || score > self.score || (self.score.is_nan() && !score.is_nan())
        {
            self.score = score;
            self.choice = Some(choice);
        }
    }

    pub fn into_choice(self, what: &str) -> Result<C, AlignError> {
        self.choice
            .ok_or_else(|| AlignError::Backtrace(format!("no option left in {}", what)))
    }
}

impl<C> Default for Best<C> {
    fn default() -> Self {
        Self::new()
    }
}

/// Both decorated trees of one alignment call together with every score that
/// does not depend on the DP state.
pub struct TreePair<'s, N, S> {
    pub left: DecoratedTree<N>,
    pub right: DecoratedTree<N>,
    pub scoring: &'s S,
    matches: Vec<f64>,
    del_left: Vec<f64>,
    del_right: Vec<f64>,
    drop_left: Vec<f64>,
    drop_right: Vec<f64>,
}

impl<'s, N, S> TreePair<'s, N, S>
where
    N: Copy,
    S: Scoring<N>,
{
    pub fn new<A>(
        adapter: &A,
        left_root: N,
        right_root: N,
        scoring: &'s S,
        degree_limit: usize,
    ) -> Result<Self, AlignError>
    where
        A: TreeAdapter<Node = N>,
    {
        let left = DecoratedTree::new(adapter, left_root, degree_limit)?;
        let right = DecoratedTree::new(adapter, right_root, degree_limit)?;

        let mut matches = Vec::with_capacity(left.len() * right.len());
        for l in &left.vertices {
            for r in &right.vertices {
                matches.push(scoring.match_score(l.label, r.label));
            }
        }
        let del_left: Vec<f64> = left
            .vertices
            .iter()
            .map(|v| scoring.delete_left(v.label))
            .collect();
        let del_right: Vec<f64> = right
            .vertices
            .iter()
            .map(|v| scoring.delete_right(v.label))
            .collect();
        let drop_left = subtree_sums(&left, &del_left);
        let drop_right = subtree_sums(&right, &del_right);

        Ok(Self {
            left,
            right,
            scoring,
            matches,
            del_left,
            del_right,
            drop_left,
            drop_right,
        })
    }

    pub fn match_score(&self, a: VertexId, b: VertexId) -> f64 {
        self.matches[a * self.right.len() + b]
    }

    pub fn root_score(&self) -> f64 {
        self.scoring.score_vertices(
            self.left.label(self.left.root),
            self.right.label(self.right.root),
        )
    }

    pub fn del_left(&self, a: VertexId) -> f64 {
        self.del_left[a]
    }

    pub fn del_right(&self, b: VertexId) -> f64 {
        self.del_right[b]
    }

    /// Deleting every child of `u` selected by `mask`, with their subtrees.
    pub fn forest_left(&self, u: VertexId, mask: u32) -> f64 {
        let children = &self.left.vertices[u].children;
        bits_of(mask).map(|i| self.drop_left[children[i]]).sum()
    }

    pub fn forest_right(&self, v: VertexId, mask: u32) -> f64 {
        let children = &self.right.vertices[v].children;
        bits_of(mask).map(|i| self.drop_right[children[i]]).sum()
    }

    /// Subtree score of a matched pair when at least one side is a leaf.
    pub fn leaf_subtree(&self, a: VertexId, b: VertexId) -> f64 {
        let (l, r) = (self.left.vertex(a), self.right.vertex(b));
        match (l.is_leaf(), r.is_leaf()) {
            (true, true) => 0.0,
            (true, false) => self.forest_right(b, r.full_set()),
            (false, true) => self.forest_left(a, l.full_set()),
            (false, false) => f64::NAN,
        }
    }

    /// Score of a join of `left_path` and `right_path` (anchors first).
    pub fn join_score(&self, left_path: &[VertexId], right_path: &[VertexId]) -> f64 {
        let left: Vec<N> = left_path.iter().map(|&v| self.left.label(v)).collect();
        let right: Vec<N> = right_path.iter().map(|&v| self.right.label(v)).collect();
        match (left.len(), right.len()) {
            (2, 1) => self.scoring.join_left(left[1], left[0], right[0]),
            (1, 2) => self.scoring.join_right(right[1], right[0], left[0]),
            _ => self.scoring.join(&left, &right),
        }
    }

    /// `x` followed by its `n` nearest ancestors in the left tree.
    pub fn left_path(&self, x: VertexId, n: usize) -> Vec<VertexId> {
        ancestor_path(&self.left, x, n)
    }

    pub fn right_path(&self, y: VertexId, n: usize) -> Vec<VertexId> {
        ancestor_path(&self.right, y, n)
    }

    pub fn emit_root(&self, tracer: &mut dyn Backtrace<N>) {
        tracer.match_vertices(
            self.root_score(),
            self.left.label(self.left.root),
            self.right.label(self.right.root),
        );
    }

    pub fn emit_match(&self, a: VertexId, b: VertexId, tracer: &mut dyn Backtrace<N>) {
        tracer.match_nodes(
            self.match_score(a, b),
            self.left.label(a),
            self.right.label(b),
        );
    }

    /// Deletes the subtree below `a`, `a` included.
    pub fn emit_drop_left(&self, a: VertexId, tracer: &mut dyn Backtrace<N>) {
        for v in postorder(&self.left, a) {
            tracer.delete_left(self.del_left[v], self.left.label(v));
        }
    }

    pub fn emit_drop_right(&self, b: VertexId, tracer: &mut dyn Backtrace<N>) {
        for v in postorder(&self.right, b) {
            tracer.delete_right(self.del_right[v], self.right.label(v));
        }
    }

    pub fn emit_forest_left(&self, u: VertexId, mask: u32, tracer: &mut dyn Backtrace<N>) {
        for child in self.left.children_in(u, mask) {
            self.emit_drop_left(child, tracer);
        }
    }

    pub fn emit_forest_right(&self, v: VertexId, mask: u32, tracer: &mut dyn Backtrace<N>) {
        for child in self.right.children_in(v, mask) {
            self.emit_drop_right(child, tracer);
        }
    }

    /// Subtrees of a matched pair when at least one side is a leaf.
    pub fn emit_leaf_subtree(&self, a: VertexId, b: VertexId, tracer: &mut dyn Backtrace<N>) {
        let (l, r) = (self.left.vertex(a), self.right.vertex(b));
        if !r.is_leaf() {
            self.emit_forest_right(b, r.full_set(), tracer);
        }
        if !l.is_leaf() {
            self.emit_forest_left(a, l.full_set(), tracer);
        }
    }

    /// Announces the absorbed vertices, then the join itself.
    pub fn emit_join(
        &self,
        left_path: &[VertexId],
        right_path: &[VertexId],
        tracer: &mut dyn Backtrace<N>,
    ) {
        for &v in left_path.iter().skip(1) {
            tracer.inner_join_left(self.left.label(v));
        }
        for &v in right_path.iter().skip(1) {
            tracer.inner_join_right(self.right.label(v));
        }
        let mut left = left_path.iter().map(|&v| self.left.label(v));
        let mut right = right_path.iter().map(|&v| self.right.label(v));
        tracer.join(
            self.join_score(left_path, right_path),
            &mut left,
            &mut right,
            left_path.len(),
            right_path.len(),
        );
    }
}

fn subtree_sums<N: Copy>(tree: &DecoratedTree<N>, own: &[f64]) -> Vec<f64> {
    // children precede their parent in the arena
    let mut sums = vec![0.0; tree.len()];
    for (id, vertex) in tree.vertices.iter().enumerate() {
        sums[id] = own[id] + vertex.children.iter().map(|&c| sums[c]).sum::<f64>();
    }
    sums
}

fn ancestor_path<N>(tree: &DecoratedTree<N>, start: VertexId, n: usize) -> Vec<VertexId> {
    let mut path = vec![start];
    let mut current = tree.vertices[start].parent;
    while path.len() <= n {
        match current {
            Some(v) => {
                path.push(v);
                current = tree.vertices[v].parent;
            }
            None => break,
        }
    }
    path
}

fn postorder<N>(tree: &DecoratedTree<N>, start: VertexId) -> Vec<VertexId> {
    let mut out = Vec::new();
    let mut stack = vec![(start, false)];
    while let Some((v, expanded)) = stack.pop() {
        if expanded {
            out.push(v);
        } else {
            stack.push((v, true));
            for &child in tree.vertices[v].children.iter().rev() {
                stack.push((child, false));
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::libs::treealign::tests::ArenaTree;
    use crate::libs::treealign::EqualityScoring;

    #[test]
    fn test_best_keeps_first() {
        let mut best = Best::new();
        best.offer(f64::NAN, 'n');
        best.offer(1.0, 'a');
        best.offer(3.0, 'b');
        best.offer(3.0, 'c');
        assert_eq!(best.score, 3.0);
        assert_eq!(best.choice, Some('b'));

        let empty: Best<char> = Best::new();
        assert!(empty.into_choice("test").is_err());
    }

    #[test]
    fn test_subtree_sums() {
        let mut forest = ArenaTree::new();
        // 0 -> (1 -> (2), 3)
        let root = forest.add_tree(&[None, Some(0), Some(1), Some(0)], "abcd");
        let scoring = EqualityScoring::new(|n: usize| n).with_gap(-1.0);
        let pair = TreePair::new(&forest, root, root, &scoring, 31).unwrap();

        let r = pair.left.root;
        assert_eq!(pair.forest_left(r, 0b11), -3.0);
        assert_eq!(pair.forest_left(r, 0b10), -1.0);
        assert_eq!(pair.forest_right(r, 0b01), -2.0);
        assert_eq!(pair.left_path(0, 2), vec![0, 1, 3]);
        assert_eq!(pair.left_path(0, 9), vec![0, 1, 3]);
    }
}
