use nalgebra::*;
use super::{Discriminant, LdaError};

/// Decision rule of the gaussian model with a shared covariance, evaluated in the
/// discriminant space: each class scores x * coef_c^T + intercept_c, and the class
/// with the largest score is predicted.
#[derive(Debug, Clone)]
pub struct LinearClassifier<L> {

    classes : Vec<L>,

    // n_classes x n_features
    coef : DMatrix<f64>,

    intercept : DVector<f64>

}

impl<L> LinearClassifier<L>
where
    L : Clone
{

    pub fn from_discriminant(discr : &Discriminant<L>) -> Self {
        let k = discr.classes.len();
        let mut centers = discr.means.clone();
        for mut row in centers.row_iter_mut() {
            row -= discr.grand_mean.transpose();
        }
        let coef_proj = centers * &discr.projection;
        let mut intercept = DVector::from_iterator(k, (0..k).map(|c| {
            -0.5 * coef_proj.row(c).norm_squared() + discr.priors[c].ln()
        }));
        let coef = if discr.projection.ncols() == 0 {
            DMatrix::zeros(k, discr.projection.nrows())
        } else {
            coef_proj * discr.projection.transpose()
        };
        intercept -= &coef * &discr.grand_mean;
        Self { classes : discr.classes.clone(), coef, intercept }
    }

    pub fn coef(&self) -> &DMatrix<f64> {
        &self.coef
    }

    pub fn intercept(&self) -> &DVector<f64> {
        &self.intercept
    }

    /// Class scores (n_samples x n_classes) for the rows of x.
    pub fn decision_function(&self, x : &DMatrix<f64>) -> Result<DMatrix<f64>, LdaError> {
        if x.ncols() != self.coef.ncols() {
            return Err(LdaError::DimensionMismatch { expected : self.coef.ncols(), found : x.ncols() });
        }
        let mut scores = x * self.coef.transpose();
        for mut row in scores.row_iter_mut() {
            row += self.intercept.transpose();
        }
        Ok(scores)
    }

    /// Most likely class of each row of x. Ties resolve to the first class in label order.
    pub fn predict(&self, x : &DMatrix<f64>) -> Result<Vec<L>, LdaError> {
        let scores = self.decision_function(x)?;
        let mut pred = Vec::with_capacity(scores.nrows());
        for row in scores.row_iter() {
            let mut best = 0;
            for (c, s) in row.iter().enumerate() {
                if *s > row[best] {
                    best = c;
                }
            }
            pred.push(self.classes[best].clone());
        }
        Ok(pred)
    }

}

#[test]
fn separates_two_groups_on_a_line() {
    use super::LDA;
    let x = DMatrix::from_row_slice(6, 1, &[0.0, 1.0, 2.0, 10.0, 11.0, 12.0]);
    let y = ['a', 'a', 'a', 'b', 'b', 'b'];
    let clf = LDA::default().fit(&x, &y[..]).unwrap().classifier();
    let query = DMatrix::from_row_slice(3, 1, &[-5.0, 6.0, 20.0]);
    let pred = clf.predict(&query).unwrap();
    assert_eq!(pred[0], 'a');
    assert_eq!(pred[2], 'b');
    let scores = clf.decision_function(&query).unwrap();
    assert!((scores[(1, 0)] - scores[(1, 1)]).abs() < 1E-8);
}
