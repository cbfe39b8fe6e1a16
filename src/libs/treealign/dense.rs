//! Bottom-up solver over complete subset tables.
//!
//! For every pair of inner vertices `(u, v)` the table `D[A][B]` holds the
//! best alignment of the child subsets `A ⊆ ch(u)` and `B ⊆ ch(v)`. Pairs are
//! filled with both trees in post-order, so every table a cell reads from is
//! complete. With single joins enabled, each pair also keeps the row
//! `JL[ch(u)][B]` (`u` absorbed into a join) and the column `JR[A][ch(v)]`.

use super::adapter::TreeAdapter;
use super::algorithm::TreeAlignmentAlgorithm;
use super::backtrace::Backtrace;
use super::decorate::VertexId;
use super::error::AlignError;
use super::pair::{Best, TreePair};
use super::scoring::Scoring;
use super::set::{bits_of, SubsetTable};

/// Widest vertex the dense tables accept.
pub const DENSE_MAX_DEGREE: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    Match(usize, usize),
    JoinLeft(usize, u32),
    JoinRight(usize, u32),
    DeleteLeft(usize, u32),
    DeleteRight(usize, u32),
}

#[derive(Debug, Default)]
struct Table {
    stride: usize,
    d: Vec<f64>,
    /// `JL[ch(u)][B]`, indexed by `B`
    jl: Vec<f64>,
    /// `JR[A][ch(v)]`, indexed by `A`
    jr: Vec<f64>,
}

impl Table {
    fn d(&self, a: u32, b: u32) -> f64 {
        self.d[a as usize * self.stride + b as usize]
    }
}

pub struct DenseAligner<'s, N, S> {
    pair: TreePair<'s, N, S>,
    joins: usize,
    subsets: SubsetTable,
    tables: Vec<Table>,
    score: Option<f64>,
}

impl<'s, N, S> DenseAligner<'s, N, S>
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
                "the dense solver handles at most one join, {} requested",
                joins
            )));
        }
        let pair = TreePair::new(adapter, left, right, scoring, DENSE_MAX_DEGREE)?;
        let widest = pair.left.max_degree.max(pair.right.max_degree);
        let subsets = SubsetTable::until(super::set::set_of(widest));
        log::debug!(
            "dense alignment of {} x {} vertices, {} table pairs",
            pair.left.len(),
            pair.right.len(),
            pair.left.inner.len() * pair.right.inner.len()
        );
        Ok(Self {
            pair,
            joins,
            subsets,
            tables: Vec::new(),
            score: None,
        })
    }

    fn table(&self, u: VertexId, v: VertexId) -> Option<&Table> {
        let i = self.pair.left.vertex(u).index?;
        let j = self.pair.right.vertex(v).index?;
        Some(&self.tables[i * self.pair.right.inner.len() + j])
    }

    /// Score of the children of a matched pair `(a, b)`.
    fn subtree(&self, a: VertexId, b: VertexId) -> f64 {
        match self.table(a, b) {
            Some(t) => {
                let (l, r) = (self.pair.left.vertex(a), self.pair.right.vertex(b));
                t.d(l.full_set(), r.full_set())
            }
            None => self.pair.leaf_subtree(a, b),
        }
    }

    fn visit_cell<F>(&self, u: VertexId, v: VertexId, current: &Table, a: u32, b: u32, mut f: F)
    where
        F: FnMut(f64, Step),
    {
        let pair = &self.pair;
        let cu = &pair.left.vertex(u).children;
        let cv = &pair.right.vertex(v).children;

        for x in bits_of(a) {
            for y in bits_of(b) {
                let (cx, cy) = (cu[x], cv[y]);
                let rest = current.d(a & !(1 << x), b & !(1 << y));
                f(pair.match_score(cx, cy) + self.subtree(cx, cy) + rest, Step::Match(x, y));
            }
        }

        if self.joins > 0 {
            for x in bits_of(a) {
                if let Some(t) = self.table(cu[x], v) {
                    for &sub in self.subsets.subsets(b).iter().skip(1) {
                        let rest = current.d(a & !(1 << x), b & !sub);
                        f(t.jl[sub as usize] + rest, Step::JoinLeft(x, sub));
                    }
                }
            }
            for y in bits_of(b) {
                if let Some(t) = self.table(u, cv[y]) {
                    for &sub in self.subsets.subsets(a).iter().skip(1) {
                        let rest = current.d(a & !sub, b & !(1 << y));
                        f(t.jr[sub as usize] + rest, Step::JoinRight(y, sub));
                    }
                }
            }
        }

        for x in bits_of(a) {
            let cx = cu[x];
            let del = pair.del_left(cx);
            match self.table(cx, v) {
                Some(t) => {
                    let full = pair.left.vertex(cx).full_set();
                    for &sub in self.subsets.subsets(b) {
                        let rest = current.d(a & !(1 << x), b & !sub);
                        f(del + t.d(full, sub) + rest, Step::DeleteLeft(x, sub));
                    }
                }
                None => f(del + current.d(a & !(1 << x), b), Step::DeleteLeft(x, 0)),
            }
        }
        for y in bits_of(b) {
            let cy = cv[y];
            let del = pair.del_right(cy);
            match self.table(u, cy) {
                Some(t) => {
                    let full = pair.right.vertex(cy).full_set();
                    for &sub in self.subsets.subsets(a) {
                        let rest = current.d(a & !sub, b & !(1 << y));
                        f(del + t.d(sub, full) + rest, Step::DeleteRight(y, sub));
                    }
                }
                None => f(del + current.d(a, b & !(1 << y)), Step::DeleteRight(y, 0)),
            }
        }
    }

    /// Anchors of a join absorbing `u` (left) or `v` (right).
    fn visit_join<F>(
        &self,
        u: VertexId,
        v: VertexId,
        current: &Table,
        left: bool,
        sub: u32,
        mut f: F,
    ) where
        F: FnMut(f64, (usize, usize)),
    {
        let pair = &self.pair;
        let cu = &pair.left.vertex(u).children;
        let cv = &pair.right.vertex(v).children;
        let (a, b) = if left {
            (pair.left.vertex(u).full_set(), sub)
        } else {
            (sub, pair.right.vertex(v).full_set())
        };
        for x in bits_of(a) {
            for y in bits_of(b) {
                let (cx, cy) = (cu[x], cv[y]);
                let join = if left {
                    pair.join_score(&[cx, u], &[cy])
                } else {
                    pair.join_score(&[cx], &[cy, v])
                };
                let rest = current.d(a & !(1 << x), b & !(1 << y));
                f(join + self.subtree(cx, cy) + rest, (x, y));
            }
        }
    }

    fn fill(&self, u: VertexId, v: VertexId) -> Table {
        let pair = &self.pair;
        let (lu, rv) = (pair.left.vertex(u), pair.right.vertex(v));
        let (full_a, full_b) = (lu.full_set(), rv.full_set());
        let stride = full_b as usize + 1;

        let mut table = Table {
            stride,
            d: vec![0.0; (full_a as usize + 1) * stride],
            jl: Vec::new(),
            jr: Vec::new(),
        };
        for a in 0..=full_a {
            for b in 0..=full_b {
                let value = if a == 0 {
                    pair.forest_right(v, b)
                } else if b == 0 {
                    pair.forest_left(u, a)
                } else {
                    let mut best = Best::new();
                    self.visit_cell(u, v, &table, a, b, |s, step| best.offer(s, step));
                    best.score
                };
                table.d[a as usize * stride + b as usize] = value;
            }
        }

        if self.joins > 0 {
            if lu.parent.is_some() {
                table.jl = (0..=full_b)
                    .map(|b| {
                        let mut best = Best::new();
                        self.visit_join(u, v, &table, true, b, |s, c| best.offer(s, c));
                        best.score
                    })
                    .collect();
            }
            if rv.parent.is_some() {
                table.jr = (0..=full_a)
                    .map(|a| {
                        let mut best = Best::new();
                        self.visit_join(u, v, &table, false, a, |s, c| best.offer(s, c));
                        best.score
                    })
                    .collect();
            }
        }
        table
    }

    fn trace_subtree(
        &self,
        a: VertexId,
        b: VertexId,
        tracer: &mut dyn Backtrace<N>,
    ) -> Result<(), AlignError> {
        if self.table(a, b).is_some() {
            let full_a = self.pair.left.vertex(a).full_set();
            let full_b = self.pair.right.vertex(b).full_set();
            self.trace_cell(a, b, full_a, full_b, tracer)
        } else {
            self.pair.emit_leaf_subtree(a, b, tracer);
            Ok(())
        }
    }

    fn trace_cell(
        &self,
        u: VertexId,
        v: VertexId,
        mut a: u32,
        mut b: u32,
        tracer: &mut dyn Backtrace<N>,
    ) -> Result<(), AlignError> {
        let pair = &self.pair;
        let current = self
            .table(u, v)
            .ok_or_else(|| AlignError::Backtrace("missing table".to_string()))?;
        let cu = &pair.left.vertex(u).children;
        let cv = &pair.right.vertex(v).children;

        while a != 0 && b != 0 {
            let mut best = Best::new();
            self.visit_cell(u, v, current, a, b, |s, step| best.offer(s, step));
            match best.into_choice("dense cell")? {
                Step::Match(x, y) => {
                    pair.emit_match(cu[x], cv[y], tracer);
                    self.trace_subtree(cu[x], cv[y], tracer)?;
                    a &= !(1 << x);
                    b &= !(1 << y);
                }
                Step::JoinLeft(x, sub) => {
                    self.trace_join(cu[x], v, true, sub, tracer)?;
                    a &= !(1 << x);
                    b &= !sub;
                }
                Step::JoinRight(y, sub) => {
                    self.trace_join(u, cv[y], false, sub, tracer)?;
                    a &= !sub;
                    b &= !(1 << y);
                }
                Step::DeleteLeft(x, sub) => {
                    let cx = cu[x];
                    tracer.delete_left(pair.del_left(cx), pair.left.label(cx));
                    if self.table(cx, v).is_some() {
                        let full = pair.left.vertex(cx).full_set();
                        self.trace_cell(cx, v, full, sub, tracer)?;
                    }
                    a &= !(1 << x);
                    b &= !sub;
                }
                Step::DeleteRight(y, sub) => {
                    let cy = cv[y];
                    tracer.delete_right(pair.del_right(cy), pair.right.label(cy));
                    if self.table(u, cy).is_some() {
                        let full = pair.right.vertex(cy).full_set();
                        self.trace_cell(u, cy, sub, full, tracer)?;
                    }
                    a &= !sub;
                    b &= !(1 << y);
                }
            }
        }
        pair.emit_forest_left(u, a, tracer);
        pair.emit_forest_right(v, b, tracer);
        Ok(())
    }

    fn trace_join(
        &self,
        u: VertexId,
        v: VertexId,
        left: bool,
        sub: u32,
        tracer: &mut dyn Backtrace<N>,
    ) -> Result<(), AlignError> {
        let pair = &self.pair;
        let current = self
            .table(u, v)
            .ok_or_else(|| AlignError::Backtrace("missing join table".to_string()))?;
        let mut best = Best::new();
        self.visit_join(u, v, current, left, sub, |s, c| best.offer(s, c));
        let (x, y) = best.into_choice("dense join")?;

        let cx = pair.left.vertex(u).children[x];
        let cy = pair.right.vertex(v).children[y];
        if left {
            pair.emit_join(&[cx, u], &[cy], tracer);
        } else {
            pair.emit_join(&[cx], &[cy, v], tracer);
        }
        self.trace_subtree(cx, cy, tracer)?;

        let (a, b) = if left {
            (pair.left.vertex(u).full_set(), sub)
        } else {
            (sub, pair.right.vertex(v).full_set())
        };
        self.trace_cell(u, v, a & !(1 << x), b & !(1 << y), tracer)
    }
}

impl<'s, N, S> TreeAlignmentAlgorithm<N> for DenseAligner<'s, N, S>
where
    N: Copy,
    S: Scoring<N>,
{
    fn compute(&mut self) -> Result<f64, AlignError> {
        if let Some(score) = self.score {
            return Ok(score);
        }
        let left_inner = self.pair.left.inner.clone();
        let right_inner = self.pair.right.inner.clone();
        self.tables = Vec::with_capacity(left_inner.len() * right_inner.len());
        for &u in &left_inner {
            for &v in &right_inner {
                let table = self.fill(u, v);
                self.tables.push(table);
            }
        }
        let (rl, rr) = (self.pair.left.root, self.pair.right.root);
        let score = self.pair.root_score() + self.subtree(rl, rr);
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
