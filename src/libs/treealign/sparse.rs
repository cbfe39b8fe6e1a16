//! Top-down solver that only materialises the subset pairs it reaches.
//!
//! Each cell decides the fate of the lowest remaining left child: it is
//! matched, absorbed into a join, deleted, or swallowed by a right child that
//! is deleted or absorbed. Cells are memoised per vertex pair in hash maps.

use fxhash::FxHashMap;

use super::adapter::TreeAdapter;
use super::algorithm::TreeAlignmentAlgorithm;
use super::backtrace::Backtrace;
use super::decorate::VertexId;
use super::error::AlignError;
use super::pair::{Best, TreePair};
use super::scoring::Scoring;
use super::set::{bits_of, subsets_of, MAX_DEGREE};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    Match(usize, usize),
    JoinLeft(usize, u32),
    JoinRight(usize, u32),
    DeleteLeft(usize, u32),
    DeleteRight(usize, u32),
}

#[derive(Debug, Default)]
struct Memo {
    d: FxHashMap<(u32, u32), f64>,
    jl: FxHashMap<u32, f64>,
    jr: FxHashMap<u32, f64>,
}

pub struct SparseAligner<'s, N, S> {
    pair: TreePair<'s, N, S>,
    joins: usize,
    memo: Vec<Memo>,
    score: Option<f64>,
}

impl<'s, N, S> SparseAligner<'s, N, S>
where
    N: Copy,
    S: Scoring<N>,
{
    pub fn new<A>(
        adapter: &A,
        left: N,
        right: N,
        scoring: &'s S,
        joins: usize,
    ) -> Result<Self, AlignError>
    where
        A: TreeAdapter<Node = N>,
    {
        if joins > 1 {
            return Err(AlignError::Unsupported(format!(
                "the sparse solver handles at most one join, {} requested",
                joins
            )));
        }
        let pair = TreePair::new(adapter, left, right, scoring, MAX_DEGREE)?;
        let pairs = pair.left.inner.len() * pair.right.inner.len();
        let memo = (0..pairs).map(|_| Memo::default()).collect();
        Ok(Self {
            pair,
            joins,
            memo,
            score: None,
        })
    }

    /// Number of memoised cells, over all vertex pairs.
    pub fn cells(&self) -> usize {
        self.memo
            .iter()
            .map(|m| m.d.len() + m.jl.len() + m.jr.len())
            .sum()
    }

    fn slot(&self, u: VertexId, v: VertexId) -> Option<usize> {
        let i = self.pair.left.vertex(u).index?;
        let j = self.pair.right.vertex(v).index?;
        Some(i * self.pair.right.inner.len() + j)
    }

    fn is_inner_pair(&self, u: VertexId, v: VertexId) -> bool {
        self.slot(u, v).is_some()
    }

    fn subtree(&mut self, a: VertexId, b: VertexId) -> f64 {
        if self.is_inner_pair(a, b) {
            let full_a = self.pair.left.vertex(a).full_set();
            let full_b = self.pair.right.vertex(b).full_set();
            self.d(a, b, full_a, full_b)
        } else {
            self.pair.leaf_subtree(a, b)
        }
    }

    fn d(&mut self, u: VertexId, v: VertexId, a: u32, b: u32) -> f64 {
        if a == 0 {
            return self.pair.forest_right(v, b);
        }
        if b == 0 {
            return self.pair.forest_left(u, a);
        }
        let slot = match self.slot(u, v) {
            Some(slot) => slot,
            None => return f64::NAN,
        };
        if let Some(&score) = self.memo[slot].d.get(&(a, b)) {
            return score;
        }
        let best = self.best_step(u, v, a, b);
        self.memo[slot].d.insert((a, b), best.score);
        best.score
    }

    fn best_step(&mut self, u: VertexId, v: VertexId, a: u32, b: u32) -> Best<Step> {
        let mut best = Best::new();
        for step in self.steps(u, v, a, b) {
            let score = self.value(u, v, a, b, step);
            best.offer(score, step);
        }
        best
    }

    fn steps(&self, u: VertexId, v: VertexId, a: u32, b: u32) -> Vec<Step> {
        let pair = &self.pair;
        let x = a.trailing_zeros() as usize;
        let rest = a & !(1 << x);
        let cx = pair.left.vertex(u).children[x];
        let cv = &pair.right.vertex(v).children;
        let x_inner = !pair.left.vertex(cx).is_leaf();

        let mut steps: Vec<Step> = bits_of(b).map(|y| Step::Match(x, y)).collect();
        if self.joins > 0 {
            if x_inner {
                steps.extend(subsets_of(b).filter(|&s| s != 0).map(|s| Step::JoinLeft(x, s)));
            }
            for y in bits_of(b) {
                if !pair.right.vertex(cv[y]).is_leaf() {
                    steps.extend(subsets_of(rest).map(|s| Step::JoinRight(y, s | 1 << x)));
                }
            }
        }
        if x_inner {
            steps.extend(subsets_of(b).map(|s| Step::DeleteLeft(x, s)));
        } else {
            steps.push(Step::DeleteLeft(x, 0));
        }
        for y in bits_of(b) {
            if !pair.right.vertex(cv[y]).is_leaf() {
                steps.extend(subsets_of(rest).map(|s| Step::DeleteRight(y, s | 1 << x)));
            }
        }
        steps
    }

    fn value(&mut self, u: VertexId, v: VertexId, a: u32, b: u32, step: Step) -> f64 {
        let cx_of = |s: &Self, x: usize| s.pair.left.vertex(u).children[x];
        let cy_of = |s: &Self, y: usize| s.pair.right.vertex(v).children[y];
        match step {
            Step::Match(x, y) => {
                let (cx, cy) = (cx_of(self, x), cy_of(self, y));
                let m = self.pair.match_score(cx, cy);
                let sub = self.subtree(cx, cy);
                m + sub + self.d(u, v, a & !(1 << x), b & !(1 << y))
            }
            Step::JoinLeft(x, sub) => {
                let cx = cx_of(self, x);
                let join = self.jl(cx, v, sub);
                join + self.d(u, v, a & !(1 << x), b & !sub)
            }
            Step::JoinRight(y, sub) => {
                let cy = cy_of(self, y);
                let join = self.jr(u, cy, sub);
                join + self.d(u, v, a & !sub, b & !(1 << y))
            }
            Step::DeleteLeft(x, sub) => {
                let cx = cx_of(self, x);
                let del = self.pair.del_left(cx);
                let inner = if self.is_inner_pair(cx, v) {
                    let full = self.pair.left.vertex(cx).full_set();
                    self.d(cx, v, full, sub)
                } else {
                    0.0
                };
                del + inner + self.d(u, v, a & !(1 << x), b & !sub)
            }
            Step::DeleteRight(y, sub) => {
                let cy = cy_of(self, y);
                let del = self.pair.del_right(cy);
                let full = self.pair.right.vertex(cy).full_set();
                let inner = self.d(u, cy, sub, full);
                del + inner + self.d(u, v, a & !sub, b & !(1 << y))
            }
        }
    }

    /// Left join absorbing `u`: all of `ch(u)` against `sub ⊆ ch(v)`.
    fn jl(&mut self, u: VertexId, v: VertexId, sub: u32) -> f64 {
        let slot = match self.slot(u, v) {
            Some(slot) => slot,
            None => return f64::NEG_INFINITY,
        };
        if let Some(&score) = self.memo[slot].jl.get(&sub) {
            return score;
        }
        let best = self.best_anchor(u, v, true, sub);
        self.memo[slot].jl.insert(sub, best.score);
        best.score
    }

    /// Right join absorbing `v`: `sub ⊆ ch(u)` against all of `ch(v)`.
    fn jr(&mut self, u: VertexId, v: VertexId, sub: u32) -> f64 {
        let slot = match self.slot(u, v) {
            Some(slot) => slot,
            None => return f64::NEG_INFINITY,
        };
        if let Some(&score) = self.memo[slot].jr.get(&sub) {
            return score;
        }
        let best = self.best_anchor(u, v, false, sub);
        self.memo[slot].jr.insert(sub, best.score);
        best.score
    }

    fn best_anchor(&mut self, u: VertexId, v: VertexId, left: bool, sub: u32) -> Best<(usize, usize)> {
        let (a, b) = if left {
            (self.pair.left.vertex(u).full_set(), sub)
        } else {
            (sub, self.pair.right.vertex(v).full_set())
        };
        let mut best = Best::new();
        for x in bits_of(a) {
            for y in bits_of(b) {
                let cx = self.pair.left.vertex(u).children[x];
                let cy = self.pair.right.vertex(v).children[y];
                let join = if left {
                    self.pair.join_score(&[cx, u], &[cy])
                } else {
                    self.pair.join_score(&[cx], &[cy, v])
                };
                let inner = self.subtree(cx, cy);
                let score = join + inner + self.d(u, v, a & !(1 << x), b & !(1 << y));
                best.offer(score, (x, y));
            }
        }
        best
    }

    fn trace_subtree(
        &mut self,
        a: VertexId,
        b: VertexId,
        tracer: &mut dyn Backtrace<N>,
    ) -> Result<(), AlignError> {
        if self.is_inner_pair(a, b) {
            let full_a = self.pair.left.vertex(a).full_set();
            let full_b = self.pair.right.vertex(b).full_set();
            self.trace_d(a, b, full_a, full_b, tracer)
        } else {
            self.pair.emit_leaf_subtree(a, b, tracer);
            Ok(())
        }
    }

    fn trace_d(
        &mut self,
        u: VertexId,
        v: VertexId,
        mut a: u32,
        mut b: u32,
        tracer: &mut dyn Backtrace<N>,
    ) -> Result<(), AlignError> {
        while a != 0 && b != 0 {
            let step = self.best_step(u, v, a, b).into_choice("sparse cell")?;
            let cx = |s: &Self, x: usize| s.pair.left.vertex(u).children[x];
            let cy = |s: &Self, y: usize| s.pair.right.vertex(v).children[y];
            match step {
                Step::Match(x, y) => {
                    let (lx, ry) = (cx(self, x), cy(self, y));
                    self.pair.emit_match(lx, ry, tracer);
                    self.trace_subtree(lx, ry, tracer)?;
                    a &= !(1 << x);
                    b &= !(1 << y);
                }
                Step::JoinLeft(x, sub) => {
                    let lx = cx(self, x);
                    self.trace_join(lx, v, true, sub, tracer)?;
                    a &= !(1 << x);
                    b &= !sub;
                }
                Step::JoinRight(y, sub) => {
                    let ry = cy(self, y);
                    self.trace_join(u, ry, false, sub, tracer)?;
                    a &= !sub;
                    b &= !(1 << y);
                }
                Step::DeleteLeft(x, sub) => {
                    let lx = cx(self, x);
                    tracer.delete_left(self.pair.del_left(lx), self.pair.left.label(lx));
                    if self.is_inner_pair(lx, v) {
                        let full = self.pair.left.vertex(lx).full_set();
                        self.trace_d(lx, v, full, sub, tracer)?;
                    }
                    a &= !(1 << x);
                    b &= !sub;
                }
                Step::DeleteRight(y, sub) => {
                    let ry = cy(self, y);
                    tracer.delete_right(self.pair.del_right(ry), self.pair.right.label(ry));
                    let full = self.pair.right.vertex(ry).full_set();
                    self.trace_d(u, ry, sub, full, tracer)?;
                    a &= !sub;
                    b &= !(1 << y);
                }
            }
        }
        self.pair.emit_forest_left(u, a, tracer);
        self.pair.emit_forest_right(v, b, tracer);
        Ok(())
    }

    fn trace_join(
        &mut self,
        u: VertexId,
        v: VertexId,
        left: bool,
        sub: u32,
        tracer: &mut dyn Backtrace<N>,
    ) -> Result<(), AlignError> {
        let (x, y) = self.best_anchor(u, v, left, sub).into_choice("sparse join")?;
        let cx = self.pair.left.vertex(u).children[x];
        let cy = self.pair.right.vertex(v).children[y];
        if left {
            self.pair.emit_join(&[cx, u], &[cy], tracer);
        } else {
            self.pair.emit_join(&[cx], &[cy, v], tracer);
        }
        self.trace_subtree(cx, cy, tracer)?;

        let (a, b) = if left {
            (self.pair.left.vertex(u).full_set(), sub)
        } else {
            (sub, self.pair.right.vertex(v).full_set())
        };
        self.trace_d(u, v, a & !(1 << x), b & !(1 << y), tracer)
    }
}

impl<'s, N, S> TreeAlignmentAlgorithm<N> for SparseAligner<'s, N, S>
where
    N: Copy,
    S: Scoring<N>,
{
    fn compute(&mut self) -> Result<f64, AlignError> {
        if let Some(score) = self.score {
            return Ok(score);
        }
        let (rl, rr) = (self.pair.left.root, self.pair.right.root);
        let score = self.pair.root_score() + self.subtree(rl, rr);
        log::debug!(
            "sparse alignment of {} x {} vertices, {} cells",
            self.pair.left.len(),
            self.pair.right.len(),
            self.cells()
        );
        self.score = Some(score);
        Ok(score)
    }

    fn backtrace(&mut self, tracer: &mut dyn Backtrace<N>) -> Result<(), AlignError> {
        self.compute()?;
        let (rl, rr) = (self.pair.left.root, self.pair.right.root);
        self.pair.emit_root(tracer);
        self.trace_subtree(rl, rr, tracer)
    }
}
