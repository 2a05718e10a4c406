use nalgebra::*;
use serde::{Serialize, Deserialize};
use serde::de::DeserializeOwned;
use thiserror::Error;
use std::fs;
use std::path::Path;
use std::convert::TryFrom;

/// Per-class counts, priors and means, and the pooled within-class covariance.
pub mod stats;

/// The two SVD stages of the solver: within-class whitening and
/// between-class rotation.
pub mod scaling;

/// Linear decision rule derived from a fitted discriminant.
pub mod classify;

pub use stats::ClassStats;

pub use scaling::{WithinScaling, BetweenScaling};

pub use classify::LinearClassifier;

#[derive(Debug, Error)]
pub enum LdaError {

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Expected {expected} feature columns, but found {found}")]
    DimensionMismatch { expected : usize, found : usize },

    #[error("Decomposition failed: {0}")]
    Decomposition(&'static str),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error)

}

/// Tuning parameters of the SVD solver.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LdaSettings {

    /// Tolerance for discarding singular values. Absolute for the within-class stage;
    /// relative to the leading singular value for the between-class stage.
    pub tol : f64,

    /// Maximum number of discriminant directions kept. Never increases the rank
    /// found by the solver.
    pub n_components : Option<usize>

}

impl Default for LdaSettings {

    fn default() -> Self {
        Self { tol : 1E-5, n_components : None }
    }

}

impl LdaSettings {

    pub fn load_from_path(path : impl AsRef<Path>) -> Result<Self, LdaError> {
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

}

/// LDA projects a data set into the axes of maximum between-class
/// variation relative to the within-class variation, so that a decision over k
/// classes can be made with at most k-1 variables using information from an
/// arbitrarily large number of dimensions.
///
/// The solver does not invert the within-class covariance. The class-centered data is
/// first whitened by its SVD (so the pooled within-class covariance becomes the identity),
/// then the weighted class centers are decomposed in that space. The right singular vectors
/// of the second decomposition, mapped back through the whitening transform, are the
/// discriminant axes; their squared singular values are proportional to the eigenvalues
/// of sigma_w^-1 sigma_b.
#[derive(Debug, Clone, Default)]
pub struct LDA {
    settings : LdaSettings
}

impl LDA {

    pub fn new(settings : LdaSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &LdaSettings {
        &self.settings
    }

    /// Estimates the discriminant axes for the sample rows of x labelled by y.
    pub fn fit<L>(&self, x : &DMatrix<f64>, y : &[L]) -> Result<Discriminant<L>, LdaError>
    where
        L : Ord + Clone
    {
        self.validate(x)?;
        let stats = ClassStats::estimate(x, y)?;
        if stats.n_classes() < 2 {
            return Err(LdaError::InvalidInput(format!(
                "At least two classes are required (found {})",
                stats.n_classes()
            )));
        }
        if stats.n_samples() <= stats.n_classes() {
            return Err(LdaError::InvalidInput(format!(
                "Number of samples ({}) must exceed the number of classes ({})",
                stats.n_samples(),
                stats.n_classes()
            )));
        }

        let xc = stats.center(x);
        let within = scaling::within_scaling(&xc, stats.n_classes(), self.settings.tol)?;
        let between = scaling::between_scaling(&stats, &within, self.settings.tol)?;

        let BetweenScaling { mut projection, mut explained_variance_ratio, .. } = between;
        if let Some(max_comp) = self.settings.n_components {
            if projection.ncols() > max_comp {
                projection = projection.columns(0, max_comp).clone_owned();
            }
            if explained_variance_ratio.len() > max_comp {
                explained_variance_ratio = explained_variance_ratio.rows(0, max_comp).clone_owned();
            }
        }

        let ClassStats { classes, priors, means, grand_mean, .. } = stats;
        Ok(Discriminant {
            classes,
            priors,
            means,
            grand_mean,
            scalings : within.scalings,
            projection,
            explained_variance_ratio
        })
    }

    fn validate(&self, x : &DMatrix<f64>) -> Result<(), LdaError> {
        let tol = self.settings.tol;
        if !tol.is_finite() || tol < 0.0 {
            return Err(LdaError::InvalidInput(format!("Tolerance must be finite and non-negative (found {})", tol)));
        }
        if x.ncols() == 0 {
            return Err(LdaError::InvalidInput("Feature matrix has no columns".into()));
        }
        if let Some(pos) = x.iter().position(|v| !v.is_finite() ) {
            let (row, col) = (pos % x.nrows(), pos / x.nrows());
            return Err(LdaError::InvalidInput(format!("Non-finite value at row {}, column {}", row, col)));
        }
        Ok(())
    }

}

/// Result of fitting LDA: the discriminant axes of a labelled sample,
/// ordered by decreasing discriminative power.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "DiscriminantRecord<L>")]
#[serde(bound(deserialize = "L : Deserialize<'de>"))]
pub struct Discriminant<L> {

    classes : Vec<L>,

    priors : DVector<f64>,

    means : DMatrix<f64>,

    grand_mean : DVector<f64>,

    // Within-class whitening (n_features x within rank)
    scalings : DMatrix<f64>,

    // Discriminant axes (n_features x rank)
    projection : DMatrix<f64>,

    explained_variance_ratio : DVector<f64>

}

impl<L> Discriminant<L> {

    pub fn classes(&self) -> &[L] {
        &self.classes[..]
    }

    pub fn priors(&self) -> &DVector<f64> {
        &self.priors
    }

    pub fn means(&self) -> &DMatrix<f64> {
        &self.means
    }

    pub fn grand_mean(&self) -> &DVector<f64> {
        &self.grand_mean
    }

    /// Each column is an embedding function: for a (grand-mean centered) row
    /// vector x, x * projection is its discriminant representation.
    pub fn projection(&self) -> &DMatrix<f64> {
        &self.projection
    }

    /// Within-class whitening matrix found at the first stage.
    pub fn scalings(&self) -> &DMatrix<f64> {
        &self.scalings
    }

    /// Fraction of the between-class scatter captured by each direction.
    pub fn explained_variance_ratio(&self) -> &DVector<f64> {
        &self.explained_variance_ratio
    }

    pub fn n_features(&self) -> usize {
        self.projection.nrows()
    }

    /// Number of discriminant directions (zero if classes cannot be separated).
    pub fn rank(&self) -> usize {
        self.projection.ncols()
    }

    pub fn within_rank(&self) -> usize {
        self.scalings.ncols()
    }

    /// Projects the rows of x into the discriminant space, after centering them
    /// at the grand mean.
    pub fn transform(&self, x : &DMatrix<f64>) -> Result<DMatrix<f64>, LdaError> {
        self.check_columns(x)?;
        let mut xc = x.clone();
        for mut row in xc.row_iter_mut() {
            row -= self.grand_mean.transpose();
        }
        Ok(xc * &self.projection)
    }

    pub(crate) fn check_columns(&self, x : &DMatrix<f64>) -> Result<(), LdaError> {
        if x.ncols() != self.n_features() {
            Err(LdaError::DimensionMismatch { expected : self.n_features(), found : x.ncols() })
        } else {
            Ok(())
        }
    }

}

impl<L> Discriminant<L>
where
    L : Clone
{

    /// Builds the shared-covariance gaussian decision rule in the discriminant space.
    pub fn classifier(&self) -> LinearClassifier<L> {
        LinearClassifier::from_discriminant(self)
    }

}

impl<L> Discriminant<L>
where
    L : Serialize + DeserializeOwned
{

    pub fn save_to_path(&self, path : impl AsRef<Path>) -> Result<(), LdaError> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    pub fn load_from_path(path : impl AsRef<Path>) -> Result<Self, LdaError> {
        let content = fs::read_to_string(path)?;
        let record : DiscriminantRecord<L> = serde_json::from_str(&content)?;
        Self::try_from(record)
    }

}

/// Serialized form of a Discriminant, before its dimensions are checked.
#[derive(Debug, Clone, Deserialize)]
pub struct DiscriminantRecord<L> {
    classes : Vec<L>,
    priors : DVector<f64>,
    means : DMatrix<f64>,
    grand_mean : DVector<f64>,
    scalings : DMatrix<f64>,
    projection : DMatrix<f64>,
    explained_variance_ratio : DVector<f64>
}

impl<L> TryFrom<DiscriminantRecord<L>> for Discriminant<L> {

    type Error = LdaError;

    fn try_from(rec : DiscriminantRecord<L>) -> Result<Self, LdaError> {
        let k = rec.classes.len();
        let d = rec.projection.nrows();
        let rank = rec.projection.ncols();
        let mismatch = |what : &str, expected : String, found : String| {
            Err(LdaError::InvalidInput(format!("Inconsistent discriminant: {} should be {}, found {}", what, expected, found)))
        };
        if rec.priors.len() != k {
            return mismatch("priors length", k.to_string(), rec.priors.len().to_string());
        }
        if rec.means.shape() != (k, d) {
            return mismatch("means shape", format!("{:?}", (k, d)), format!("{:?}", rec.means.shape()));
        }
        if rec.grand_mean.len() != d {
            return mismatch("grand mean length", d.to_string(), rec.grand_mean.len().to_string());
        }
        if rec.scalings.nrows() != d {
            return mismatch("scalings rows", d.to_string(), rec.scalings.nrows().to_string());
        }
        if rank > rec.scalings.ncols() {
            return mismatch("projection columns at most", rec.scalings.ncols().to_string(), rank.to_string());
        }
        if rec.explained_variance_ratio.len() < rank {
            return mismatch("explained variance length at least", rank.to_string(), rec.explained_variance_ratio.len().to_string());
        }
        let DiscriminantRecord { classes, priors, means, grand_mean, scalings, projection, explained_variance_ratio } = rec;
        Ok(Self { classes, priors, means, grand_mean, scalings, projection, explained_variance_ratio })
    }

}

/// Linear discriminant analysis with default settings. Returns the discriminant axes
/// (each column is an embedding function; for a centered row vector x, x * eigvector
/// is its embedding) and the explained variance ratio of each axis, in decreasing order.
pub fn lda<L>(x : &DMatrix<f64>, y : &[L]) -> Result<(DMatrix<f64>, DVector<f64>), LdaError>
where
    L : Ord + Clone
{
    let discr = LDA::default().fit(x, y)?;
    Ok((discr.projection, discr.explained_variance_ratio))
}

#[test]
fn settings_fall_back_to_defaults() {
    let settings : LdaSettings = serde_json::from_str(r#"{ "n_components" : 2 }"#).unwrap();
    assert_eq!(settings.tol, 1E-5);
    assert_eq!(settings.n_components, Some(2));
}

#[test]
fn rejects_single_class() {
    let x = DMatrix::from_row_slice(3, 1, &[1.0, 2.0, 3.0]);
    match LDA::default().fit(&x, &[1, 1, 1]) {
        Err(LdaError::InvalidInput(_)) => { },
        other => panic!("Unexpected result: {:?}", other)
    }
}

#[test]
fn rejects_too_few_samples() {
    let x = DMatrix::from_row_slice(2, 1, &[1.0, 2.0]);
    assert!(matches!(LDA::default().fit(&x, &[0, 1]), Err(LdaError::InvalidInput(_))));
}

#[test]
fn rejects_non_finite_values() {
    let x = DMatrix::from_row_slice(4, 1, &[1.0, f64::NAN, 3.0, 4.0]);
    assert!(matches!(LDA::default().fit(&x, &[0, 0, 1, 1]), Err(LdaError::InvalidInput(_))));
}

#[test]
fn rejects_negative_tolerance() {
    let x = DMatrix::from_row_slice(4, 1, &[1.0, 2.0, 3.0, 4.0]);
    let lda = LDA::new(LdaSettings { tol : -1.0, n_components : None });
    assert!(matches!(lda.fit(&x, &[0, 0, 1, 1]), Err(LdaError::InvalidInput(_))));
}

#[test]
fn transform_checks_columns() {
    let x = DMatrix::from_row_slice(4, 1, &[1.0, 2.0, 5.0, 6.0]);
    let discr = LDA::default().fit(&x, &[0, 0, 1, 1]).unwrap();
    let wrong = DMatrix::<f64>::zeros(1, 2);
    assert!(matches!(discr.transform(&wrong), Err(LdaError::DimensionMismatch { expected : 1, found : 2 })));
}

#[test]
fn inconsistent_record_is_rejected() {
    let x2 = DMatrix::from_row_slice(4, 2, &[1.0, 0.0, 2.0, 1.0, 5.0, 4.0, 6.0, 6.0]);
    let x3 = DMatrix::from_row_slice(4, 3, &[1.0, 0.0, 2.0, 2.0, 1.0, 0.0, 5.0, 4.0, 7.0, 6.0, 6.0, 5.0]);
    let y = [0, 0, 1, 1];
    let discr2 = LDA::default().fit(&x2, &y).unwrap();
    let discr3 = LDA::default().fit(&x3, &y).unwrap();
    let mut value = serde_json::to_value(&discr2).unwrap();
    value["grand_mean"] = serde_json::to_value(discr3.grand_mean()).unwrap();
    assert!(serde_json::from_value::<Discriminant<i32>>(value.clone()).is_err());

    let path = std::env::temp_dir().join("lda_inconsistent_record.json");
    fs::write(&path, value.to_string()).unwrap();
    let loaded = Discriminant::<i32>::load_from_path(&path);
    fs::remove_file(&path).ok();
    assert!(matches!(loaded, Err(LdaError::InvalidInput(_))));

    let intact = serde_json::to_value(&discr2).unwrap();
    assert_eq!(serde_json::from_value::<Discriminant<i32>>(intact).unwrap(), discr2);
}
