/// Score model of an alignment. Higher is better.
///
/// Join paths are given anchor first, followed by the absorbed ancestors in
/// bottom-up order. A path of length one is a plain vertex.
pub trait Scoring<N> {
    fn match_score(&self, left: N, right: N) -> f64;

    /// Score of the forced root pair.
    fn score_vertices(&self, left: N, right: N) -> f64 {
        self.match_score(left, right)
    }

    fn delete_left(&self, node: N) -> f64;

    fn delete_right(&self, node: N) -> f64;

    fn join(&self, left_path: &[N], right_path: &[N]) -> f64;

    /// `absorbed` and its child `anchor` against `right`.
    fn join_left(&self, absorbed: N, anchor: N, right: N) -> f64 {
        self.join(&[anchor, absorbed], &[right])
    }

    /// `absorbed` and its child `anchor` against `left`.
    fn join_right(&self, absorbed: N, anchor: N, left: N) -> f64 {
        self.join(&[left], &[anchor, absorbed])
    }
}

/// Label-equality scoring for generic trees.
///
/// ```
/// use ftalign::libs::treealign::{EqualityScoring, Scoring};
///
/// let scoring = EqualityScoring::new(|c: char| c).with_match(2.0).with_gap(-1.0);
/// assert_eq!(scoring.match_score('a', 'a'), 2.0);
/// assert_eq!(scoring.match_score('a', 'b'), 0.0);
/// assert_eq!(scoring.delete_left('a'), -1.0);
/// ```
#[derive(Debug, Clone)]
pub struct EqualityScoring<F> {
    key: F,
    pub match_bonus: f64,
    pub mismatch: f64,
    pub gap: f64,
    /// Added once per join
    pub join_fixed: f64,
    /// Added per absorbed vertex
    pub join_per_vertex: f64,
}

impl<F> EqualityScoring<F> {
    pub fn new(key: F) -> Self {
        Self {
            key,
            match_bonus: 1.0,
            mismatch: 0.0,
            gap: 0.0,
            join_fixed: 0.0,
            join_per_vertex: 0.0,
        }
    }

    pub fn with_match(mut self, score: f64) -> Self {
        self.match_bonus = score;
        self
    }

    pub fn with_mismatch(mut self, score: f64) -> Self {
        self.mismatch = score;
        self
    }

    pub fn with_gap(mut self, score: f64) -> Self {
        self.gap = score;
        self
    }

    pub fn with_join(mut self, fixed: f64, per_vertex: f64) -> Self {
        self.join_fixed = fixed;
        self.join_per_vertex = per_vertex;
        self
    }
}

impl<N, K, F> Scoring<N> for EqualityScoring<F>
where
    N: Copy,
    K: PartialEq,
    F: Fn(N) -> K,
{
    fn match_score(&self, left: N, right: N) -> f64 {
        if (self.key)(left) == (self.key)(right) {
            self.match_bonus
        } else {
            self.mismatch
        }
    }

    fn delete_left(&self, _: N) -> f64 {
        self.gap
    }

    fn delete_right(&self, _: N) -> f64 {
        self.gap
    }

    /// Anchors are compared; absorbed vertices only cost the join penalty.
    fn join(&self, left_path: &[N], right_path: &[N]) -> f64 {
        let anchors = match (left_path.first(), right_path.first()) {
            (Some(&l), Some(&r)) => self.match_score(l, r),
            _ => self.mismatch,
        };
        let absorbed = (left_path.len() + right_path.len()).saturating_sub(2);
        anchors + self.join_fixed + self.join_per_vertex * absorbed as f64
    }
}
