//! Top-down solver for joins spanning several vertices per side.
//!
//! Besides the plain state `(0, 0)`, a vertex pair `(u, v)` carries join
//! states `(l, r)`: `u` and its `l - 1` nearest ancestors are absorbed on the
//! left, `v` and its `r - 1` nearest ancestors on the right. A join state
//! either anchors, pairing a child `x` with a child `y` under the join score
//! of both paths, or extends the path one level deeper on either side.

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
    Anchor(usize, usize),
    DeeperLeft(usize, u32),
    DeeperRight(usize, u32),
    DeleteLeft(usize, u32),
    DeleteRight(usize, u32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct Cell {
    l: u8,
    r: u8,
    a: u32,
    b: u32,
}

pub struct MultiJoinAligner<'s, N, S> {
    pair: TreePair<'s, N, S>,
    joins: usize,
    memo: Vec<FxHashMap<Cell, f64>>,
    score: Option<f64>,
}

impl<'s, N, S> MultiJoinAligner<'s, N, S>
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
        if joins > u8::MAX as usize - 1 {
            return Err(AlignError::Unsupported(format!(
                "{} joins requested, at most {} supported",
                joins,
                u8::MAX - 1
            )));
        }
        let pair = TreePair::new(adapter, left, right, scoring, MAX_DEGREE)?;
        let pairs = pair.left.inner.len() * pair.right.inner.len();
        let memo = (0..pairs).map(|_| FxHashMap::default()).collect();
        Ok(Self {
            pair,
            joins,
            memo,
            score: None,
        })
    }

    pub fn cells(&self) -> usize {
        self.memo.iter().map(|m| m.len()).sum()
    }

    fn slot(&self, u: VertexId, v: VertexId) -> Option<usize> {
        let i = self.pair.left.vertex(u).index?;
        let j = self.pair.right.vertex(v).index?;
        Some(i * self.pair.right.inner.len() + j)
    }

    fn left_child(&self, u: VertexId, x: usize) -> VertexId {
        self.pair.left.vertex(u).children[x]
    }

    fn right_child(&self, v: VertexId, y: usize) -> VertexId {
        self.pair.right.vertex(v).children[y]
    }

    fn subtree(&mut self, a: VertexId, b: VertexId) -> f64 {
        if self.slot(a, b).is_some() {
            let full_a = self.pair.left.vertex(a).full_set();
            let full_b = self.pair.right.vertex(b).full_set();
            self.cell(a, b, Cell { l: 0, r: 0, a: full_a, b: full_b })
        } else {
            self.pair.leaf_subtree(a, b)
        }
    }

    fn plain(&mut self, u: VertexId, v: VertexId, a: u32, b: u32) -> f64 {
        self.cell(u, v, Cell { l: 0, r: 0, a, b })
    }

    fn cell(&mut self, u: VertexId, v: VertexId, cell: Cell) -> f64 {
        let joined = cell.l > 0 || cell.r > 0;
        if cell.a == 0 || cell.b == 0 {
            if joined {
                return f64::NEG_INFINITY;
            }
            return if cell.a == 0 {
                self.pair.forest_right(v, cell.b)
            } else {
                self.pair.forest_left(u, cell.a)
            };
        }
        let slot = match self.slot(u, v) {
            Some(slot) => slot,
            None => return f64::NEG_INFINITY,
        };
        if let Some(&score) = self.memo[slot].get(&cell) {
            return score;
        }
        let best = self.best_step(u, v, cell);
        self.memo[slot].insert(cell, best.score);
        best.score
    }

    fn best_step(&mut self, u: VertexId, v: VertexId, cell: Cell) -> Best<Step> {
        let mut best = Best::new();
        for step in self.steps(u, v, cell) {
            let score = self.value(u, v, cell, step);
            best.offer(score, step);
        }
        best
    }

    fn steps(&self, u: VertexId, v: VertexId, cell: Cell) -> Vec<Step> {
        let Cell { l, r, a, b } = cell;
        let joined = l > 0 || r > 0;
        let left_inner = |x: usize| !self.pair.left.vertex(self.left_child(u, x)).is_leaf();
        let right_inner = |y: usize| !self.pair.right.vertex(self.right_child(v, y)).is_leaf();
        let mut steps = Vec::new();

        if joined {
            // any child pair may anchor the join
            for x in bits_of(a) {
                steps.extend(bits_of(b).map(|y| Step::Anchor(x, y)));
            }
            if (l as usize) < self.joins {
                for x in bits_of(a).filter(|&x| left_inner(x)) {
                    steps.extend(subsets_of(b).filter(|&s| s != 0).map(|s| Step::DeeperLeft(x, s)));
                }
            }
            if (r as usize) < self.joins {
                for y in bits_of(b).filter(|&y| right_inner(y)) {
                    steps.extend(subsets_of(a).filter(|&s| s != 0).map(|s| Step::DeeperRight(y, s)));
                }
            }
            return steps;
        }

        // plain cell: decide the fate of the lowest left child
        let x = a.trailing_zeros() as usize;
        let rest = a & !(1 << x);
        steps.extend(bits_of(b).map(|y| Step::Match(x, y)));
        if self.joins > 0 {
            if left_inner(x) {
                steps.extend(subsets_of(b).filter(|&s| s != 0).map(|s| Step::DeeperLeft(x, s)));
            }
            for y in bits_of(b).filter(|&y| right_inner(y)) {
                steps.extend(subsets_of(rest).map(|s| Step::DeeperRight(y, s | 1 << x)));
            }
        }
        if left_inner(x) {
            steps.extend(subsets_of(b).map(|s| Step::DeleteLeft(x, s)));
        } else {
            steps.push(Step::DeleteLeft(x, 0));
        }
        for y in bits_of(b).filter(|&y| right_inner(y)) {
            steps.extend(subsets_of(rest).map(|s| Step::DeleteRight(y, s | 1 << x)));
        }
        steps
    }

    fn anchor_paths(&self, u: VertexId, v: VertexId, cell: Cell, x: usize, y: usize) -> (Vec<VertexId>, Vec<VertexId>) {
        let cx = self.left_child(u, x);
        let cy = self.right_child(v, y);
        (
            self.pair.left_path(cx, cell.l as usize),
            self.pair.right_path(cy, cell.r as usize),
        )
    }

    fn value(&mut self, u: VertexId, v: VertexId, cell: Cell, step: Step) -> f64 {
        let Cell { l, r, a, b } = cell;
        match step {
            Step::Match(x, y) => {
                let (cx, cy) = (self.left_child(u, x), self.right_child(v, y));
                let m = self.pair.match_score(cx, cy);
                let sub = self.subtree(cx, cy);
                m + sub + self.plain(u, v, a & !(1 << x), b & !(1 << y))
            }
            Step::Anchor(x, y) => {
                let (cx, cy) = (self.left_child(u, x), self.right_child(v, y));
                let (lp, rp) = self.anchor_paths(u, v, cell, x, y);
                let join = self.pair.join_score(&lp, &rp);
                let sub = self.subtree(cx, cy);
                join + sub + self.plain(u, v, a & !(1 << x), b & !(1 << y))
            }
            Step::DeeperLeft(x, sub) => {
                let cx = self.left_child(u, x);
                let full = self.pair.left.vertex(cx).full_set();
                let deeper = self.cell(cx, v, Cell { l: l + 1, r, a: full, b: sub });
                deeper + self.plain(u, v, a & !(1 << x), b & !sub)
            }
            Step::DeeperRight(y, sub) => {
                let cy = self.right_child(v, y);
                let full = self.pair.right.vertex(cy).full_set();
                let deeper = self.cell(u, cy, Cell { l, r: r + 1, a: sub, b: full });
                deeper + self.plain(u, v, a & !sub, b & !(1 << y))
            }
            Step::DeleteLeft(x, sub) => {
                let cx = self.left_child(u, x);
                let del = self.pair.del_left(cx);
                let inner = if self.slot(cx, v).is_some() {
                    let full = self.pair.left.vertex(cx).full_set();
                    self.plain(cx, v, full, sub)
                } else {
                    0.0
                };
                del + inner + self.plain(u, v, a & !(1 << x), b & !sub)
            }
            Step::DeleteRight(y, sub) => {
                let cy = self.right_child(v, y);
                let del = self.pair.del_right(cy);
                let full = self.pair.right.vertex(cy).full_set();
                let inner = self.plain(u, cy, sub, full);
                del + inner + self.plain(u, v, a & !sub, b & !(1 << y))
            }
        }
    }

    fn trace_subtree(
        &mut self,
        a: VertexId,
        b: VertexId,
        tracer: &mut dyn Backtrace<N>,
    ) -> Result<(), AlignError> {
        if self.slot(a, b).is_some() {
            let full_a = self.pair.left.vertex(a).full_set();
            let full_b = self.pair.right.vertex(b).full_set();
            self.trace(a, b, Cell { l: 0, r: 0, a: full_a, b: full_b }, tracer)
        } else {
            self.pair.emit_leaf_subtree(a, b, tracer);
            Ok(())
        }
    }

    fn trace(
        &mut self,
        u: VertexId,
        v: VertexId,
        mut cell: Cell,
        tracer: &mut dyn Backtrace<N>,
    ) -> Result<(), AlignError> {
        while cell.a != 0 && cell.b != 0 {
            let step = self.best_step(u, v, cell).into_choice("multi-join cell")?;
            let Cell { l, r, a, b } = cell;
            let (rest_a, rest_b) = match step {
                Step::Match(x, y) => {
                    let (cx, cy) = (self.left_child(u, x), self.right_child(v, y));
                    self.pair.emit_match(cx, cy, tracer);
                    self.trace_subtree(cx, cy, tracer)?;
                    (a & !(1 << x), b & !(1 << y))
                }
                Step::Anchor(x, y) => {
                    let (cx, cy) = (self.left_child(u, x), self.right_child(v, y));
                    let (lp, rp) = self.anchor_paths(u, v, cell, x, y);
                    self.pair.emit_join(&lp, &rp, tracer);
                    self.trace_subtree(cx, cy, tracer)?;
                    (a & !(1 << x), b & !(1 << y))
                }
                Step::DeeperLeft(x, sub) => {
                    let cx = self.left_child(u, x);
                    let full = self.pair.left.vertex(cx).full_set();
                    self.trace(cx, v, Cell { l: l + 1, r, a: full, b: sub }, tracer)?;
                    (a & !(1 << x), b & !sub)
                }
                Step::DeeperRight(y, sub) => {
                    let cy = self.right_child(v, y);
                    let full = self.pair.right.vertex(cy).full_set();
                    self.trace(u, cy, Cell { l, r: r + 1, a: sub, b: full }, tracer)?;
                    (a & !sub, b & !(1 << y))
                }
                Step::DeleteLeft(x, sub) => {
                    let cx = self.left_child(u, x);
                    tracer.delete_left(self.pair.del_left(cx), self.pair.left.label(cx));
                    if self.slot(cx, v).is_some() {
                        let full = self.pair.left.vertex(cx).full_set();
                        self.trace(cx, v, Cell { l: 0, r: 0, a: full, b: sub }, tracer)?;
                    }
                    (a & !(1 << x), b & !sub)
                }
                Step::DeleteRight(y, sub) => {
                    let cy = self.right_child(v, y);
                    tracer.delete_right(self.pair.del_right(cy), self.pair.right.label(cy));
                    let full = self.pair.right.vertex(cy).full_set();
                    self.trace(u, cy, Cell { l: 0, r: 0, a: sub, b: full }, tracer)?;
                    (a & !sub, b & !(1 << y))
                }
            };
            // whatever a join state leaves over is aligned plainly
            cell = Cell {
                l: 0,
                r: 0,
                a: rest_a,
                b: rest_b,
            };
        }
        self.pair.emit_forest_left(u, cell.a, tracer);
        self.pair.emit_forest_right(v, cell.b, tracer);
        Ok(())
    }
}

impl<'s, N, S> TreeAlignmentAlgorithm<N> for MultiJoinAligner<'s, N, S>
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
            "multi-join alignment ({} joins) of {} x {} vertices, {} cells",
            self.joins,
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
