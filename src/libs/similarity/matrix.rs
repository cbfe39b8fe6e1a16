use anyhow::anyhow;
use itertools::Itertools;
use rayon::prelude::*;
use std::str::FromStr;

use crate::libs::fragtree::{FragAdapter, FragTree, StandardScoring};
use crate::libs::treealign::{AlignError, MatchCounter, Solver, TreeAligner};

/// Square matrix, row-major.
pub type Matrix = Vec<Vec<f64>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Normalization {
    /// `M[i][j] / sqrt(M[i][i] * M[j][j])`
    #[default]
    GeometricMean,
    /// `M[i][j] / min(M[i][i], M[j][j])`
    Minimum,
}

impl FromStr for Normalization {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "geometric" => Ok(Normalization::GeometricMean),
            "min" => Ok(Normalization::Minimum),
            _ => Err(format!("unknown normalization: {}", s)),
        }
    }
}

/// What a failing cell does to the whole matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorPolicy {
    #[default]
    FailFast,
    MarkNan,
}

impl FromStr for ErrorPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "fail" => Ok(ErrorPolicy::FailFast),
            "nan" => Ok(ErrorPolicy::MarkNan),
            _ => Err(format!("unknown error policy: {}", s)),
        }
    }
}

// Evaluates every cell on the current rayon pool. Results are gathered
// before anything is returned, errors are reported in cell order.
fn run_cells<F>(
    cells: Vec<(usize, usize)>,
    policy: ErrorPolicy,
    cell: F,
) -> anyhow::Result<Vec<(usize, usize, f64)>>
where
    F: Fn(usize, usize) -> anyhow::Result<f64> + Sync,
{
    let results: Vec<(usize, usize, anyhow::Result<f64>)> = cells
        .into_par_iter()
        .map(|(i, j)| (i, j, cell(i, j)))
        .collect();

    let mut values = Vec::with_capacity(results.len());
    for (i, j, result) in results {
        let value = match (result, policy) {
            (Ok(v), _) => v,
            (Err(e), ErrorPolicy::FailFast) => {
                return Err(e.context(format!("cell ({}, {}) failed", i, j)))
            }
            (Err(e), ErrorPolicy::MarkNan) => {
                log::warn!("cell ({}, {}) set to NaN: {:#}", i, j, e);
                f64::NAN
            }
        };
        values.push((i, j, value));
    }
    Ok(values)
}

/// Fills a symmetric `n x n` matrix. `cell(i, j)` is called once for every
/// `i <= j`, in parallel on the current rayon pool.
///
/// ```
/// use ftalign::libs::similarity::{pairwise_matrix, ErrorPolicy};
///
/// let m = pairwise_matrix(3, ErrorPolicy::FailFast, |i, j| Ok((i * 10 + j) as f64)).unwrap();
/// assert_eq!(m[0][2], 2.0);
/// assert_eq!(m[2][0], 2.0);
/// assert_eq!(m[2][2], 22.0);
/// ```
pub fn pairwise_matrix<F>(n: usize, policy: ErrorPolicy, cell: F) -> anyhow::Result<Matrix>
where
    F: Fn(usize, usize) -> anyhow::Result<f64> + Sync,
{
    let cells = (0..n).flat_map(|i| (i..n).map(move |j| (i, j))).collect();
    let mut matrix = vec![vec![0.0; n]; n];
    for (i, j, value) in run_cells(cells, policy, cell)? {
        matrix[i][j] = value;
        matrix[j][i] = value;
    }
    Ok(matrix)
}

/// Divides every cell by the self scores on the diagonal. Rows or columns
/// with a self score of zero or less become 0.
pub fn normalize(matrix: &mut Matrix, method: Normalization) {
    let diagonal: Vec<f64> = (0..matrix.len()).map(|i| matrix[i][i]).collect();
    for (i, row) in matrix.iter_mut().enumerate() {
        for (j, value) in row.iter_mut().enumerate() {
            let (a, b) = (diagonal[i], diagonal[j]);
            *value = if a <= 0.0 || b <= 0.0 {
                0.0
            } else {
                match method {
                    Normalization::GeometricMean => *value / (a * b).sqrt(),
                    Normalization::Minimum => *value / a.min(b),
                }
            };
        }
    }
}

/// Pearson correlation. 0 when either side has no variance.
///
/// ```
/// use ftalign::libs::similarity::pearson;
///
/// assert!((pearson(&[1.0, 2.0, 3.0], &[2.0, 4.0, 6.0]) - 1.0).abs() < 1e-12);
/// assert_eq!(pearson(&[1.0, 1.0], &[1.0, 2.0]), 0.0);
/// ```
pub fn pearson(x: &[f64], y: &[f64]) -> f64 {
    let n = x.len().min(y.len());
    if n == 0 {
        return 0.0;
    }
    let mean_x = x[..n].iter().sum::<f64>() / n as f64;
    let mean_y = y[..n].iter().sum::<f64>() / n as f64;

    let (mut cov, mut var_x, mut var_y) = (0.0, 0.0, 0.0);
    for (a, b) in x.iter().zip(y.iter()) {
        let (dx, dy) = (a - mean_x, b - mean_y);
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }
    if var_x == 0.0 || var_y == 0.0 {
        0.0
    } else {
        cov / (var_x * var_y).sqrt()
    }
}

/// Tree-size correction of raw scores: `score / (n_l * n_r)^(exponent / 2)`,
/// where `n` counts the fragments of a tree.
///
/// ```
/// use ftalign::libs::fragtree::FragTree;
/// use ftalign::libs::similarity::TreeSizeNormalizer;
///
/// let left = FragTree::from_newick("((C5H5)C7H7,C6H5)C8H10O;", "l").unwrap().remove(0);
/// let right = FragTree::from_newick("((C5H5)C7H7,C6H5O)C8H10O;", "r").unwrap().remove(0);
/// // (4 * 4)^0.25 = 2
/// let score = TreeSizeNormalizer::default().normalize(14.0, &left, &right);
/// assert!((score - 7.0).abs() < 1e-12);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TreeSizeNormalizer {
    pub exponent: f64,
}

impl Default for TreeSizeNormalizer {
    fn default() -> Self {
        Self { exponent: 0.5 }
    }
}

impl TreeSizeNormalizer {
    pub fn new(exponent: f64) -> Self {
        Self { exponent }
    }

    pub fn normalize(&self, score: f64, left: &FragTree, right: &FragTree) -> f64 {
        let sizes = (left.len() * right.len()) as f64;
        if sizes == 0.0 {
            0.0
        } else {
            score / sizes.powf(self.exponent / 2.0)
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SimilarityOptions {
    pub joins: usize,
    pub solver: Solver,
    /// ftalign cells with fewer matched losses score 0. 0 keeps everything.
    pub min_matches: usize,
    pub policy: ErrorPolicy,
    pub normalization: Normalization,
}

impl Default for SimilarityOptions {
    fn default() -> Self {
        Self {
            joins: 2,
            solver: Solver::Auto,
            min_matches: 6,
            policy: ErrorPolicy::FailFast,
            normalization: Normalization::GeometricMean,
        }
    }
}

/// All-against-all similarities of fragmentation trees.
pub struct TreeSimilarity<'s> {
    scoring: &'s StandardScoring,
    options: SimilarityOptions,
}

impl<'s> TreeSimilarity<'s> {
    pub fn new(scoring: &'s StandardScoring, options: SimilarityOptions) -> Self {
        Self { scoring, options }
    }

    pub fn options(&self) -> &SimilarityOptions {
        &self.options
    }

    /// Alignment score without the matched-loss filter.
    pub fn raw_score(&self, left: &FragTree, right: &FragTree) -> Result<f64, AlignError> {
        let adapter = FragAdapter::new();
        TreeAligner::new(&adapter, self.scoring)
            .joins(self.options.joins)
            .solver(self.options.solver)
            .score(Some(left.root()), Some(right.root()))
    }

    /// Alignment score, 0 when too few losses are matched.
    pub fn score(&self, left: &FragTree, right: &FragTree) -> Result<f64, AlignError> {
        if self.options.min_matches == 0 {
            return self.raw_score(left, right);
        }
        let adapter = FragAdapter::new();
        let aligner = TreeAligner::new(&adapter, self.scoring)
            .joins(self.options.joins)
            .solver(self.options.solver);
        let mut counter = MatchCounter::new();
        let score = aligner.align(Some(left.root()), Some(right.root()), &mut counter)?;
        if counter.matched() < self.options.min_matches {
            log::debug!(
                "{} vs {}: {} matched losses, below {}",
                left.name(),
                right.name(),
                counter.matched(),
                self.options.min_matches
            );
            Ok(0.0)
        } else {
            Ok(score)
        }
    }

    pub fn self_score(&self, tree: &FragTree) -> Result<f64, AlignError> {
        let adapter = FragAdapter::new();
        TreeAligner::new(&adapter, self.scoring)
            .joins(self.options.joins)
            .solver(self.options.solver)
            .self_score(tree.root())
    }

    /// Normalised pairwise alignment scores.
    pub fn ftalign(&self, trees: &[FragTree]) -> anyhow::Result<Matrix> {
        let mut matrix = pairwise_matrix(trees.len(), self.options.policy, |i, j| {
            self.score(&trees[i], &trees[j])
                .map_err(|e| anyhow!("{} vs {}: {}", trees[i].name(), trees[j].name(), e))
        })?;
        normalize(&mut matrix, self.options.normalization);
        Ok(matrix)
    }

    /// Correlation of the query profiles, see [`TreeSimilarity::ftblast_profiles`].
    pub fn ftblast(&self, queries: &[FragTree], library: &[FragTree]) -> anyhow::Result<Matrix> {
        let profiles = self.ftblast_profiles(queries, library)?;
        pairwise_matrix(queries.len(), ErrorPolicy::FailFast, |i, j| {
            Ok(pearson(&profiles[i], &profiles[j]))
        })
    }

    /// One row per query, one column per tree of `library` followed by the
    /// queries themselves. An entry is the unfiltered alignment score divided
    /// by the square root of the smaller self score.
    pub fn ftblast_profiles(
        &self,
        queries: &[FragTree],
        library: &[FragTree],
    ) -> anyhow::Result<Matrix> {
        let targets: Vec<&FragTree> = library.iter().chain(queries.iter()).collect();
        log::info!(
            "ftblast: {} queries against {} library trees",
            queries.len(),
            library.len()
        );

        let policy = self.options.policy;
        let self_scores: Vec<f64> = run_cells(
            (0..targets.len()).map(|k| (k, k)).collect(),
            policy,
            |k, _| {
                self.self_score(targets[k])
                    .map_err(|e| anyhow!("{} self score: {}", targets[k].name(), e))
            },
        )?
        .into_iter()
        .map(|(_, _, v)| v)
        .collect();

        let cells = (0..queries.len())
            .cartesian_product(0..targets.len())
            .collect();
        let mut profiles = vec![vec![0.0; targets.len()]; queries.len()];
        for (i, j, value) in run_cells(cells, policy, |i, j| {
            let query_self = self_scores[library.len() + i];
            let norm = query_self.min(self_scores[j]);
            if norm <= 0.0 {
                return Ok(0.0);
            }
            let score = self
                .raw_score(&queries[i], targets[j])
                .map_err(|e| anyhow!("{} vs {}: {}", queries[i].name(), targets[j].name(), e))?;
            Ok(score / norm.sqrt())
        })? {
            profiles[i][j] = value;
        }
        Ok(profiles)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn trees() -> Vec<FragTree> {
        FragTree::from_newick(
            "((C5H5)C7H7,C6H5)C8H10O;\n((C5H5)C7H7,C6H5O)C8H10O;\n(C2H4)C4H8O;",
            "t",
        )
        .unwrap()
    }

    #[test]
    fn test_pairwise_matrix() {
        let calls = std::sync::atomic::AtomicUsize::new(0);
        let m = pairwise_matrix(4, ErrorPolicy::FailFast, |i, j| {
            calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            assert!(i <= j);
            Ok((i + j) as f64)
        })
        .unwrap();
        assert_eq!(calls.into_inner(), 10);
        assert_eq!(m[3][1], 4.0);
        assert_eq!(m[1][3], 4.0);

        assert!(pairwise_matrix(0, ErrorPolicy::FailFast, |_, _| Ok(1.0))
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_error_policy() {
        let cell = |i: usize, j: usize| {
            if i == 0 && j == 1 {
                Err(anyhow!("boom"))
            } else {
                Ok(1.0)
            }
        };
        let err = pairwise_matrix(2, ErrorPolicy::FailFast, cell).unwrap_err();
        assert!(format!("{:#}", err).contains("boom"));

        let m = pairwise_matrix(2, ErrorPolicy::MarkNan, cell).unwrap();
        assert!(m[0][1].is_nan());
        assert!(m[1][0].is_nan());
        assert_eq!(m[1][1], 1.0);

        assert_eq!("nan".parse::<ErrorPolicy>(), Ok(ErrorPolicy::MarkNan));
        assert!("skip".parse::<ErrorPolicy>().is_err());
    }

    #[test]
    fn test_normalize() {
        let raw = vec![vec![4.0, 2.0, 1.0], vec![2.0, 9.0, 1.0], vec![1.0, 1.0, 0.0]];

        let mut m = raw.clone();
        normalize(&mut m, Normalization::GeometricMean);
        assert_eq!(m[0][0], 1.0);
        assert_eq!(m[1][1], 1.0);
        assert_relative_eq!(m[0][1], 2.0 / 6.0);
        assert_eq!(m[2][0], 0.0);
        assert_eq!(m[2][2], 0.0);

        let mut m = raw;
        normalize(&mut m, Normalization::Minimum);
        assert_eq!(m[0][1], 0.5);
        assert_eq!(m[1][0], 0.5);
    }

    #[test]
    fn test_ftalign() {
        let trees = trees();
        let scoring = StandardScoring::default();
        let options = SimilarityOptions {
            min_matches: 0,
            ..SimilarityOptions::default()
        };
        let similarity = TreeSimilarity::new(&scoring, options);
        let m = similarity.ftalign(&trees).unwrap();

        assert_eq!(m.len(), 3);
        for (i, row) in m.iter().enumerate() {
            assert_relative_eq!(row[i], 1.0, epsilon = 1e-9);
            for (j, value) in row.iter().enumerate() {
                assert_eq!(*value, m[j][i]);
                assert!(*value <= 1.0 + 1e-9);
            }
        }
        // the first two trees share a branch
        assert!(m[0][1] > 0.0);
    }

    #[test]
    fn test_min_matches() {
        let trees = trees();
        let scoring = StandardScoring::default();
        let options = SimilarityOptions {
            min_matches: 10,
            ..SimilarityOptions::default()
        };
        let similarity = TreeSimilarity::new(&scoring, options);
        assert_eq!(similarity.score(&trees[0], &trees[1]).unwrap(), 0.0);
        // the self score itself is not filtered
        assert!(similarity.self_score(&trees[0]).unwrap() > 0.0);
    }

    #[test]
    fn test_ftblast() {
        let trees = trees();
        let scoring = StandardScoring::default();
        let similarity = TreeSimilarity::new(&scoring, SimilarityOptions::default());
        let m = similarity.ftblast(&trees[..2], &trees[2..]).unwrap();

        assert_eq!(m.len(), 2);
        assert_relative_eq!(m[0][0], 1.0, epsilon = 1e-9);
        assert_relative_eq!(m[1][1], 1.0, epsilon = 1e-9);
        assert_eq!(m[0][1], m[1][0]);
        assert!(m[0][1] <= 1.0 + 1e-9);
    }

    #[test]
    fn test_min_matches_default() {
        let trees = trees();
        let scoring = StandardScoring::default();
        let similarity = TreeSimilarity::new(&scoring, SimilarityOptions::default());
        assert_eq!(similarity.options().min_matches, 6);

        // three losses per tree, below the default
        assert_eq!(similarity.score(&trees[0], &trees[1]).unwrap(), 0.0);
        assert_eq!(similarity.raw_score(&trees[0], &trees[1]).unwrap(), 14.0);
        let m = similarity.ftalign(&trees[..2]).unwrap();
        assert!(m.iter().flatten().all(|&v| v == 0.0));

        // ftblast keeps the unfiltered scores
        // columns: butanone, toluene, anisole
        let profiles = similarity.ftblast_profiles(&trees[..2], &trees[2..]).unwrap();
        assert_eq!(profiles.len(), 2);
        assert_eq!(profiles[0].len(), 3);
        assert_eq!(profiles[0][0], 0.0);
        assert_relative_eq!(profiles[0][1], 22f64.sqrt(), epsilon = 1e-9);
        assert_relative_eq!(profiles[0][2], 14.0 / 21f64.sqrt(), epsilon = 1e-9);
        assert_relative_eq!(profiles[1][1], 14.0 / 21f64.sqrt(), epsilon = 1e-9);

        let m = similarity.ftblast(&trees[..2], &trees[2..]).unwrap();
        assert_relative_eq!(m[0][0], 1.0, epsilon = 1e-9);
        assert!(m[0][1] > 0.0);
    }

    #[test]
    fn test_tree_size_normalizer() {
        let trees = trees();
        let normalizer = TreeSizeNormalizer::default();
        // 4 x 2 fragments: 8^0.25
        assert_relative_eq!(
            normalizer.normalize(10.0, &trees[0], &trees[2]),
            10.0 / 8f64.powf(0.25),
            epsilon = 1e-12
        );
        assert_eq!(TreeSizeNormalizer::new(0.0).normalize(10.0, &trees[0], &trees[2]), 10.0);
        assert_relative_eq!(
            TreeSizeNormalizer::new(2.0).normalize(16.0, &trees[0], &trees[1]),
            1.0,
            epsilon = 1e-12
        );
    }
}
