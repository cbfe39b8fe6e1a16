use super::error::FragTreeError;
use super::formula::Formula;
use super::tree::FragRef;
use crate::libs::treealign::Scoring;
use lazy_static::lazy_static;
use regex::Regex;
use std::fmt;
use std::str::FromStr;

lazy_static! {
    static ref RE_SCORE: Regex = Regex::new(
        r"^\+?(-?\d+(?:\.\d+)?)(?:x(-?\d+(?:\.\d+)?))?(?:-(\d+(?:\.\d+)?)(?:x(\d+(?:\.\d+)?))?)?$"
    )
    .unwrap();
}

/// Score rule written `+AxB-CxD`: equal formulas score `A + B * n`, where `n`
/// counts their non-hydrogen atoms, different formulas score `-(C + D * d)`,
/// where `d` counts the non-hydrogen atoms they differ in. Missing parts are 0.
///
/// ```
/// use ftalign::libs::fragtree::ScoreFormula;
///
/// let rule: ScoreFormula = "+5x1-2x0.5".parse().unwrap();
/// assert_eq!(rule.matching(3), 8.0);
/// assert_eq!(rule.mismatching(2), -3.0);
/// assert_eq!(rule.to_string(), "+5x1-2x0.5");
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreFormula {
    pub match_fixed: f64,
    pub match_per_atom: f64,
    pub mismatch_fixed: f64,
    pub mismatch_per_atom: f64,
}

impl ScoreFormula {
    pub fn new(
        match_fixed: f64,
        match_per_atom: f64,
        mismatch_fixed: f64,
        mismatch_per_atom: f64,
    ) -> Self {
        Self {
            match_fixed,
            match_per_atom,
            mismatch_fixed,
            mismatch_per_atom,
        }
    }

    pub fn matching(&self, atoms: i64) -> f64 {
        self.match_fixed + self.match_per_atom * atoms as f64
    }

    pub fn mismatching(&self, atoms: i64) -> f64 {
        -(self.mismatch_fixed + self.mismatch_per_atom * atoms as f64)
    }

    pub fn compare(&self, left: &Formula, right: &Formula) -> f64 {
        if left == right {
            self.matching(left.non_hydrogen())
        } else {
            self.mismatching(left.distance(right))
        }
    }
}

impl FromStr for ScoreFormula {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let caps = RE_SCORE
            .captures(s.trim())
            .ok_or_else(|| anyhow::anyhow!("expected a score like +AxB-CxD, got \"{}\"", s))?;
        let value = |i: usize| -> anyhow::Result<f64> {
            match caps.get(i) {
                Some(m) => Ok(m.as_str().parse::<f64>()?),
                None => Ok(0.0),
            }
        };
        Ok(ScoreFormula::new(value(1)?, value(2)?, value(3)?, value(4)?))
    }
}

impl fmt::Display for ScoreFormula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "+{}x{}", self.match_fixed, self.match_per_atom)?;
        if self.mismatch_fixed != 0.0 || self.mismatch_per_atom != 0.0 {
            write!(f, "-{}x{}", self.mismatch_fixed, self.mismatch_per_atom)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScoringParams {
    /// Rule for the losses on the edges into two matched fragments
    pub loss: ScoreFormula,
    /// Rule for the fragment formulas, off by default
    pub fragment: Option<ScoreFormula>,
    /// `+AxB`: fixed join score plus a score per absorbed edge
    pub join: ScoreFormula,
    /// Score of every deleted fragment
    pub gap: f64,
}

impl Default for ScoringParams {
    fn default() -> Self {
        Self {
            loss: ScoreFormula::new(5.0, 1.0, 2.0, 0.5),
            fragment: None,
            join: ScoreFormula::new(0.0, -0.25, 0.0, 0.0),
            gap: 0.0,
        }
    }
}

impl ScoringParams {
    /// Fragment rule used when fragment scoring is switched on without a value.
    pub fn default_fragment() -> ScoreFormula {
        ScoreFormula::new(5.0, 1.0, 3.0, 0.0)
    }
}

/// Neutral-loss scoring of fragmentation trees.
#[derive(Debug, Clone, Default)]
pub struct StandardScoring {
    pub params: ScoringParams,
}

impl StandardScoring {
    pub fn new(params: ScoringParams) -> Self {
        Self { params }
    }

    fn fragment_score(&self, left: FragRef, right: FragRef) -> f64 {
        self.params
            .fragment
            .map_or(0.0, |rule| rule.compare(left.formula(), right.formula()))
    }
}

/// Sum of the losses from the anchor up to the topmost absorbed vertex.
fn path_loss(path: &[FragRef]) -> Result<Formula, FragTreeError> {
    path.iter()
        .try_fold(Formula::new(), |acc, node| acc.add(node.loss()))
}

impl<'a> Scoring<FragRef<'a>> for StandardScoring {
    fn match_score(&self, left: FragRef<'a>, right: FragRef<'a>) -> f64 {
        self.params.loss.compare(left.loss(), right.loss()) + self.fragment_score(left, right)
    }

    fn score_vertices(&self, left: FragRef<'a>, right: FragRef<'a>) -> f64 {
        self.fragment_score(left, right)
    }

    fn delete_left(&self, _: FragRef<'a>) -> f64 {
        self.params.gap
    }

    fn delete_right(&self, _: FragRef<'a>) -> f64 {
        self.params.gap
    }

    fn join(&self, left_path: &[FragRef<'a>], right_path: &[FragRef<'a>]) -> f64 {
        let (left, right) = match (left_path.first(), right_path.first()) {
            (Some(&l), Some(&r)) => (l, r),
            _ => return f64::NEG_INFINITY,
        };
        let (left_loss, right_loss) = match (path_loss(left_path), path_loss(right_path)) {
            (Ok(l), Ok(r)) => (l, r),
            _ => return f64::NEG_INFINITY,
        };
        let loss = self.params.loss.compare(&left_loss, &right_loss);
        let edges = (left_path.len() + right_path.len()).saturating_sub(2);
        loss + self.fragment_score(left, right) + self.params.join.matching(edges as i64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::libs::fragtree::{FragAdapter, FragTree};
    use crate::libs::treealign::{Solver, TreeAligner};

    #[test]
    fn test_score_formula() {
        let rule: ScoreFormula = "+5x1-3".parse().unwrap();
        assert_eq!(rule, ScoreFormula::new(5.0, 1.0, 3.0, 0.0));
        let rule: ScoreFormula = "+0x-0.25".parse().unwrap();
        assert_eq!(rule, ScoreFormula::new(0.0, -0.25, 0.0, 0.0));
        assert_eq!(rule.to_string(), "+0x-0.25");
        let rule: ScoreFormula = "3".parse().unwrap();
        assert_eq!(rule.matching(10), 3.0);

        assert!("+5y1".parse::<ScoreFormula>().is_err());
        assert!("".parse::<ScoreFormula>().is_err());
    }

    #[test]
    fn test_standard_scoring() {
        // losses CO and H4 on both sides
        let left = FragTree::from_newick("(C2H4,C3O)C3H4O;", "l").unwrap().remove(0);
        let right = FragTree::from_newick("(C2H4,C3O)C3H4O;", "r").unwrap().remove(0);
        let scoring = StandardScoring::default();

        // CO vs CO: 5 + 1 * 2
        assert_eq!(scoring.match_score(left.node(1), right.node(1)), 7.0);
        // CO vs H4: C differs by 1, O by 1
        assert_eq!(scoring.match_score(left.node(1), right.node(2)), -3.0);
        assert_eq!(scoring.score_vertices(left.root(), right.root()), 0.0);

        let mut params = ScoringParams::default();
        params.fragment = Some(ScoringParams::default_fragment());
        let scoring = StandardScoring::new(params);
        // C3H4O: 5 + 4
        assert_eq!(scoring.score_vertices(left.root(), right.root()), 9.0);
    }

    #[test]
    fn test_join_scoring() {
        // C4H8O -(CO)-> C3H8 -(CH4)-> C2H4 against C4H8O -(C2H4O)-> C2H4
        let left = FragTree::from_newick("((C2H4)C3H8)C4H8O;", "l").unwrap().remove(0);
        let right = FragTree::from_newick("(C2H4)C4H8O;", "r").unwrap().remove(0);
        let scoring = StandardScoring::default();

        // combined loss C2H4O on both sides: 5 + 3, one absorbed edge -0.25
        let joined = scoring.join(&[left.node(2), left.node(1)], &[right.node(1)]);
        assert_eq!(joined, 7.75);

        let adapter = FragAdapter::new();
        let plain = TreeAligner::new(&adapter, &scoring);
        let with_join = TreeAligner::new(&adapter, &scoring)
            .joins(1)
            .solver(Solver::Sparse);
        assert_eq!(plain.score(Some(left.root()), Some(right.root())).unwrap(), 0.0);
        assert_eq!(
            with_join.score(Some(left.root()), Some(right.root())).unwrap(),
            7.75
        );
    }
}
