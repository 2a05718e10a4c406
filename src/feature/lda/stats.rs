use nalgebra::*;
use std::collections::BTreeMap;
use super::LdaError;

/// Per-class summaries of a labelled sample. Classes are ordered by the
/// label ordering, and every class index used below refers to this order.
#[derive(Debug, Clone)]
pub struct ClassStats<L> {

    pub classes : Vec<L>,

    pub counts : Vec<usize>,

    pub priors : DVector<f64>,

    /// Class means, one row per class (n_classes x n_features).
    pub means : DMatrix<f64>,

    /// Prior-weighted average of the class means.
    pub grand_mean : DVector<f64>,

    // Class index of each sample row.
    assignment : Vec<usize>

}

impl<L> ClassStats<L>
where
    L : Ord + Clone
{

    /// Groups the rows of x by their label and calculates counts, priors
    /// and means. Fails if the label vector length does not match x.
    pub fn estimate(x : &DMatrix<f64>, y : &[L]) -> Result<Self, LdaError> {
        if x.nrows() != y.len() {
            return Err(LdaError::InvalidInput(format!(
                "Mismatch between label count ({}) and sample count ({})",
                y.len(),
                x.nrows()
            )));
        }
        let mut groups : BTreeMap<&L, Vec<usize>> = BTreeMap::new();
        for (i, label) in y.iter().enumerate() {
            groups.entry(label).or_insert_with(Vec::new).push(i);
        }

        let n = x.nrows() as f64;
        let (k, d) = (groups.len(), x.ncols());
        let mut classes = Vec::with_capacity(k);
        let mut counts = Vec::with_capacity(k);
        let mut means = DMatrix::zeros(k, d);
        let mut assignment = vec![0; x.nrows()];
        for (c, (label, rows)) in groups.iter().enumerate() {
            for r in rows.iter() {
                assignment[*r] = c;
                let mut mean_row = means.row_mut(c);
                mean_row += x.row(*r);
            }
            means.row_mut(c).unscale_mut(rows.len() as f64);
            classes.push((*label).clone());
            counts.push(rows.len());
        }
        let priors = DVector::from_iterator(k, counts.iter().map(|c| *c as f64 / n ));
        let grand_mean = means.transpose() * &priors;
        tracing::trace!("Class counts: {:?}", counts);
        Ok(Self { classes, counts, priors, means, grand_mean, assignment })
    }

    pub fn n_classes(&self) -> usize {
        self.classes.len()
    }

    pub fn n_samples(&self) -> usize {
        self.assignment.len()
    }

    /// Class index of each sample, following the order of x rows.
    pub fn assignment(&self) -> &[usize] {
        &self.assignment[..]
    }

    /// Subtracts from each row of x the mean of its class.
    pub fn center(&self, x : &DMatrix<f64>) -> DMatrix<f64> {
        let mut xc = x.clone();
        for (i, c) in self.assignment.iter().enumerate() {
            let mut row = xc.row_mut(i);
            row -= self.means.row(*c);
        }
        xc
    }

    /// Average of the unbiased within-class covariance matrices, weighted by the
    /// class priors. Classes with a single observation contribute a zero matrix.
    pub fn pooled_covariance(&self, x : &DMatrix<f64>) -> DMatrix<f64> {
        let d = self.means.ncols();
        let xc = self.center(x);
        let mut cov = DMatrix::zeros(d, d);
        for c in 0..self.n_classes() {
            let rows : Vec<_> = self.assignment.iter()
                .enumerate()
                .filter(|(_, a)| **a == c )
                .map(|(i, _)| i )
                .collect();
            if rows.len() < 2 {
                continue;
            }
            let xg = xc.select_rows(rows.iter());
            let mut cov_g = xg.transpose() * &xg;
            cov_g.unscale_mut((rows.len() - 1) as f64);
            cov += cov_g.scale(self.priors[c]);
        }
        cov
    }

}

#[test]
fn class_means_and_priors() {
    let x = DMatrix::from_row_slice(5, 2, &[
        1.0, 2.0,
        3.0, 4.0,
        10.0, 10.0,
        12.0, 14.0,
        14.0, 12.0
    ]);
    let y = ["b", "b", "a", "a", "a"];
    let stats = ClassStats::estimate(&x, &y[..]).unwrap();
    assert_eq!(stats.classes, vec!["a", "b"]);
    assert_eq!(stats.counts, vec![3, 2]);
    assert!((stats.priors[0] - 0.6).abs() < 1E-12);
    assert_eq!(stats.means.row(0).iter().cloned().collect::<Vec<_>>(), vec![12.0, 12.0]);
    assert_eq!(stats.means.row(1).iter().cloned().collect::<Vec<_>>(), vec![2.0, 3.0]);
    assert!((stats.grand_mean[0] - (0.6 * 12.0 + 0.4 * 2.0)).abs() < 1E-12);
    assert_eq!(stats.assignment(), &[1, 1, 0, 0, 0]);
}

#[test]
fn centered_rows_sum_to_zero_per_class() {
    let x = DMatrix::from_row_slice(4, 1, &[1.0, 3.0, 5.0, 9.0]);
    let stats = ClassStats::estimate(&x, &[0, 0, 1, 1]).unwrap();
    let xc = stats.center(&x);
    assert_eq!(xc.as_slice(), &[-1.0, 1.0, -2.0, 2.0]);
}

#[test]
fn pooled_covariance_weights_by_prior() {
    let x = DMatrix::from_row_slice(5, 1, &[0.0, 2.0, 10.0, 12.0, 14.0]);
    let stats = ClassStats::estimate(&x, &[0, 0, 1, 1, 1]).unwrap();
    let cov = stats.pooled_covariance(&x);
    // Class 0 variance is 2, class 1 variance is 4.
    assert!((cov[(0, 0)] - (0.4 * 2.0 + 0.6 * 4.0)).abs() < 1E-12);
}

#[test]
fn label_length_mismatch() {
    let x = DMatrix::<f64>::zeros(3, 2);
    assert!(ClassStats::estimate(&x, &[0, 1]).is_err());
}
