//! Sinks for the edit operations of an optimal alignment.
//!
//! The solvers emit every operation exactly once, in no particular order.
//! All methods are no-ops by default so a sink only implements the events it
//! cares about.

use std::fmt::Debug;
use std::io::Write;

pub trait Backtrace<N> {
    fn delete_left(&mut self, _score: f64, _node: N) {}

    fn delete_right(&mut self, _score: f64, _node: N) {}

    fn match_nodes(&mut self, _score: f64, _left: N, _right: N) {}

    /// The forced root pair. Emitted once per alignment.
    fn match_vertices(&mut self, _score: f64, _left: N, _right: N) {}

    /// A join of two vertex paths. Both iterators yield the anchor first and
    /// then the absorbed ancestors bottom-up; they can be consumed once.
    fn join(
        &mut self,
        _score: f64,
        _left: &mut dyn Iterator<Item = N>,
        _right: &mut dyn Iterator<Item = N>,
        _left_count: usize,
        _right_count: usize,
    ) {
    }

    /// Announces a left vertex absorbed by the next join.
    fn inner_join_left(&mut self, _node: N) {}

    /// Announces a right vertex absorbed by the next join.
    fn inner_join_right(&mut self, _node: N) {}
}

/// Forwards every event to several sinks.
pub struct StackedBacktrace<'a, N> {
    sinks: Vec<&'a mut dyn Backtrace<N>>,
}

impl<'a, N: Copy> StackedBacktrace<'a, N> {
    pub fn new() -> Self {
        Self { sinks: Vec::new() }
    }

    pub fn push(mut self, sink: &'a mut dyn Backtrace<N>) -> Self {
        self.sinks.push(sink);
        self
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

impl<'a, N: Copy> Default for StackedBacktrace<'a, N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a, N: Copy> Backtrace<N> for StackedBacktrace<'a, N> {
    fn delete_left(&mut self, score: f64, node: N) {
        for sink in self.sinks.iter_mut() {
            sink.delete_left(score, node);
        }
    }

    fn delete_right(&mut self, score: f64, node: N) {
        for sink in self.sinks.iter_mut() {
            sink.delete_right(score, node);
        }
    }

    fn match_nodes(&mut self, score: f64, left: N, right: N) {
        for sink in self.sinks.iter_mut() {
            sink.match_nodes(score, left, right);
        }
    }

    fn match_vertices(&mut self, score: f64, left: N, right: N) {
        for sink in self.sinks.iter_mut() {
            sink.match_vertices(score, left, right);
        }
    }

    fn join(
        &mut self,
        score: f64,
        left: &mut dyn Iterator<Item = N>,
        right: &mut dyn Iterator<Item = N>,
        left_count: usize,
        right_count: usize,
    ) {
        // the iterators are single-pass
        let left: Vec<N> = left.collect();
        let right: Vec<N> = right.collect();
        for sink in self.sinks.iter_mut() {
            sink.join(
                score,
                &mut left.iter().copied(),
                &mut right.iter().copied(),
                left_count,
                right_count,
            );
        }
    }

    fn inner_join_left(&mut self, node: N) {
        for sink in self.sinks.iter_mut() {
            sink.inner_join_left(node);
        }
    }

    fn inner_join_right(&mut self, node: N) {
        for sink in self.sinks.iter_mut() {
            sink.inner_join_right(node);
        }
    }
}

/// Counts edit operations by kind.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct MatchCounter {
    pub matches: usize,
    pub joins: usize,
    pub deletions: usize,
    pub roots: usize,
}

impl MatchCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Matched losses: plain matches plus joins.
    pub fn matched(&self) -> usize {
        self.matches + self.joins
    }
}

impl<N> Backtrace<N> for MatchCounter {
    fn delete_left(&mut self, _: f64, _: N) {
        self.deletions += 1;
    }

    fn delete_right(&mut self, _: f64, _: N) {
        self.deletions += 1;
    }

    fn match_nodes(&mut self, _: f64, _: N, _: N) {
        self.matches += 1;
    }

    fn match_vertices(&mut self, _: f64, _: N, _: N) {
        self.roots += 1;
    }

    fn join(
        &mut self,
        _: f64,
        _: &mut dyn Iterator<Item = N>,
        _: &mut dyn Iterator<Item = N>,
        _: usize,
        _: usize,
    ) {
        self.joins += 1;
    }
}

/// Writes one line per event. `describe` renders a vertex.
pub struct TraceLog<W, F> {
    out: W,
    describe: F,
    error: Option<std::io::Error>,
}

impl<W: Write, F> TraceLog<W, F> {
    pub fn new(out: W, describe: F) -> Self {
        Self {
            out,
            describe,
            error: None,
        }
    }

    /// Returns the writer, or the first write error.
    pub fn finish(mut self) -> std::io::Result<W> {
        match self.error.take() {
            Some(e) => Err(e),
            None => {
                self.out.flush()?;
                Ok(self.out)
            }
        }
    }

    fn line(&mut self, line: std::fmt::Arguments) {
        if self.error.is_none() {
            if let Err(e) = self.out.write_fmt(line) {
                self.error = Some(e);
            }
        }
    }
}

impl<N, W, F, D> Backtrace<N> for TraceLog<W, F>
where
    W: Write,
    F: Fn(N) -> D,
    D: Debug,
{
    fn delete_left(&mut self, score: f64, node: N) {
        let node = (self.describe)(node);
        self.line(format_args!("delete_left\t{:?}\t-\t{}\n", node, score));
    }

    fn delete_right(&mut self, score: f64, node: N) {
        let node = (self.describe)(node);
        self.line(format_args!("delete_right\t-\t{:?}\t{}\n", node, score));
    }

    fn match_nodes(&mut self, score: f64, left: N, right: N) {
        let (left, right) = ((self.describe)(left), (self.describe)(right));
        self.line(format_args!("match\t{:?}\t{:?}\t{}\n", left, right, score));
    }

    fn match_vertices(&mut self, score: f64, left: N, right: N) {
        let (left, right) = ((self.describe)(left), (self.describe)(right));
        self.line(format_args!("root\t{:?}\t{:?}\t{}\n", left, right, score));
    }

    fn join(
        &mut self,
        score: f64,
        left: &mut dyn Iterator<Item = N>,
        right: &mut dyn Iterator<Item = N>,
        _: usize,
        _: usize,
    ) {
        let left: Vec<D> = left.map(|n| (self.describe)(n)).collect();
        let right: Vec<D> = right.map(|n| (self.describe)(n)).collect();
        self.line(format_args!("join\t{:?}\t{:?}\t{}\n", left, right, score));
    }
}
