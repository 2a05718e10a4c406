/// Dimensionality reduction preserving the between/within-class variance
/// ratio (Linear Discriminant Analysis).
pub mod lda;
