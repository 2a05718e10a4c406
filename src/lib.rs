/// Feature transformations over labelled samples. Currently linear discriminant
/// analysis (two-stage SVD solver), with the derived linear classifier.
pub mod feature;

/// Loading labelled feature tables from CSV files.
pub mod table;

pub use feature::lda::{lda, LDA, LdaSettings, LdaError, Discriminant};
