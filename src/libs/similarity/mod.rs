//! Similarity matrices over sets of fragmentation trees.

pub mod matrix;
pub mod writer;

pub use matrix::{
    normalize, pairwise_matrix, pearson, ErrorPolicy, Matrix, Normalization, SimilarityOptions,
    TreeSimilarity, TreeSizeNormalizer,
};
pub use writer::{
    csv_quote, csv_row, java_double, round_half_up, write_matrix, write_matrix_to, MatrixFormat,
    CSV_HEADER,
};
