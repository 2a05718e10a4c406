use nalgebra::*;
use std::cmp::Ordering;
use super::LdaError;
use super::stats::ClassStats;

/// Thin singular value decomposition of m, returning the singular values in
/// decreasing order and the corresponding rows of V^T (min(r, c) x c).
/// Matrices without rows or columns decompose into empty factors.
pub fn ordered_svd(m : DMatrix<f64>) -> Result<(DVector<f64>, DMatrix<f64>), LdaError> {
    let ncols = m.ncols();
    if m.nrows() == 0 || ncols == 0 {
        return Ok((DVector::zeros(0), DMatrix::zeros(0, ncols)));
    }
    let svd = SVD::try_new(m, false, true, f64::EPSILON, 0)
        .ok_or(LdaError::Decomposition("SVD did not converge"))?;
    let v_t = svd.v_t.ok_or(LdaError::Decomposition("SVD did not return right singular vectors"))?;
    let s = svd.singular_values;
    let mut order : Vec<usize> = (0..s.len()).collect();
    order.sort_by(|a, b| s[*b].partial_cmp(&s[*a]).unwrap_or(Ordering::Equal) );
    let s_ord = DVector::from_iterator(s.len(), order.iter().map(|i| s[*i] ));
    Ok((s_ord, v_t.select_rows(order.iter())))
}

/// Linear map under which the pooled within-class scatter becomes the identity.
#[derive(Debug, Clone)]
pub struct WithinScaling {

    /// n_features x rank matrix; columns are ordered by decreasing within-class spread.
    pub scalings : DMatrix<f64>,

    /// All singular values of the scaled centered data, including the discarded ones.
    pub singular_values : DVector<f64>,

    /// Per-feature standard deviation of the centered data (zeros replaced by one).
    pub std : DVector<f64>

}

impl WithinScaling {

    pub fn rank(&self) -> usize {
        self.scalings.ncols()
    }

}

/// Whitens the class-centered data xc. Singular values at or below the absolute
/// tolerance tol are treated as collinear directions and dropped from the scaling.
pub fn within_scaling(xc : &DMatrix<f64>, n_classes : usize, tol : f64) -> Result<WithinScaling, LdaError> {
    let (n, d) = xc.shape();
    check_degrees_of_freedom(n, n_classes)?;
    let mut std = DVector::from_iterator(d, xc.column_iter().map(|col| {
        let mean = col.sum() / n as f64;
        (col.iter().map(|v| (v - mean).powi(2) ).sum::<f64>() / n as f64).sqrt()
    }));
    std.iter_mut().filter(|s| **s == 0.0 ).for_each(|s| *s = 1.0 );

    let fac = 1. / (n - n_classes) as f64;
    let mut scaled = xc.clone();
    for (j, mut col) in scaled.column_iter_mut().enumerate() {
        col.unscale_mut(std[j]);
        col.scale_mut(fac.sqrt());
    }

    let (s, v_t) = ordered_svd(scaled)?;
    let rank = s.iter().filter(|v| **v > tol ).count();
    let mut scalings = DMatrix::zeros(d, rank);
    for r in 0..rank {
        for j in 0..d {
            scalings[(j, r)] = v_t[(r, j)] / std[j] / s[r];
        }
    }
    if rank == 0 {
        tracing::warn!("Within-class scatter is numerically null; no discriminant directions remain");
    } else if rank < s.len() {
        tracing::debug!("Within-class rank {} (discarded singular values: {:?})", rank, &s.as_slice()[rank..]);
    } else {
        tracing::debug!("Within-class rank {}", rank);
    }
    Ok(WithinScaling { scalings, singular_values : s, std })
}

fn check_degrees_of_freedom(n_samples : usize, n_classes : usize) -> Result<(), LdaError> {
    if n_samples <= n_classes {
        Err(LdaError::InvalidInput(format!(
            "Number of samples ({}) must exceed the number of classes ({})",
            n_samples,
            n_classes
        )))
    } else {
        Ok(())
    }
}

/// Rotation of the whitened space that orders directions by between-class spread.
#[derive(Debug, Clone)]
pub struct BetweenScaling {

    /// n_features x rank matrix mapping centered samples into the discriminant space.
    pub projection : DMatrix<f64>,

    pub singular_values : DVector<f64>,

    pub explained_variance_ratio : DVector<f64>

}

impl BetweenScaling {

    pub fn rank(&self) -> usize {
        self.projection.ncols()
    }

}

/// Decomposes the weighted class centers expressed in the whitened space. The rank is
/// decided relative to the leading singular value; if that value is exactly zero, the
/// class centers coincide and the projection is empty.
pub fn between_scaling<L>(
    stats : &ClassStats<L>,
    within : &WithinScaling,
    tol : f64
) -> Result<BetweenScaling, LdaError>
where
    L : Ord + Clone
{
    let k = stats.n_classes();
    check_degrees_of_freedom(stats.n_samples(), k)?;
    let n = stats.n_samples() as f64;
    let d = within.scalings.nrows();
    let fac = 1. / (n - k as f64);
    let mut centers = stats.means.clone();
    for c in 0..k {
        let mut row = centers.row_mut(c);
        row -= stats.grand_mean.transpose();
        row.scale_mut((n * stats.priors[c] * fac).sqrt());
    }

    // Centers span at most k - 1 dimensions.
    let (s, v_t) = ordered_svd(centers * &within.scalings)?;
    let max_dim = k.saturating_sub(1);
    let n_ratio = s.len().min(max_dim);
    let (rank, explained_variance_ratio) = match s.iter().next() {
        Some(s0) if *s0 > 0.0 => {
            let total : f64 = s.iter().map(|v| v.powi(2) ).sum();
            let ratio = DVector::from_iterator(n_ratio, s.iter().take(n_ratio).map(|v| v.powi(2) / total ));
            let rank = s.iter().filter(|v| **v > tol * s0 ).count().min(max_dim);
            (rank, ratio)
        },
        _ => (0, DVector::zeros(n_ratio))
    };

    if rank == 0 {
        tracing::warn!("Class centers do not separate in the whitened space; projection is empty");
    } else {
        tracing::debug!("Between-class rank {} (singular values: {:?})", rank, s.as_slice());
    }
    let projection = if rank == 0 {
        DMatrix::zeros(d, 0)
    } else {
        &within.scalings * v_t.rows(0, rank).transpose()
    };
    Ok(BetweenScaling { projection, singular_values : s, explained_variance_ratio })
}

#[test]
fn ordered_svd_sorts_decreasing() {
    let m = DMatrix::from_row_slice(3, 3, &[
        1.0, 0.0, 0.0,
        0.0, 5.0, 0.0,
        0.0, 0.0, 3.0
    ]);
    let (s, v_t) = ordered_svd(m).unwrap();
    assert!((s[0] - 5.0).abs() < 1E-10);
    assert!((s[1] - 3.0).abs() < 1E-10);
    assert!((s[2] - 1.0).abs() < 1E-10);
    assert!((v_t[(0, 1)].abs() - 1.0).abs() < 1E-10);
    assert!((v_t[(2, 0)].abs() - 1.0).abs() < 1E-10);
}

#[test]
fn ordered_svd_of_empty_matrix() {
    let (s, v_t) = ordered_svd(DMatrix::zeros(3, 0)).unwrap();
    assert_eq!(s.len(), 0);
    assert_eq!(v_t.shape(), (0, 0));
}

#[test]
fn within_scaling_whitens_centered_data() {
    let x = DMatrix::from_row_slice(6, 2, &[
        1.0, 2.0,
        2.0, 1.0,
        3.0, 4.0,
        7.0, 9.0,
        9.0, 7.0,
        8.0, 11.0
    ]);
    let stats = ClassStats::estimate(&x, &[0, 0, 0, 1, 1, 1]).unwrap();
    let xc = stats.center(&x);
    let within = within_scaling(&xc, stats.n_classes(), 1E-5).unwrap();
    assert_eq!(within.rank(), 2);
    let z = &xc * &within.scalings;
    let cov = (z.transpose() * &z).unscale(4.0);
    assert!((cov - DMatrix::<f64>::identity(2, 2)).abs().max() < 1E-10);
}

#[test]
fn within_scaling_drops_collinear_feature() {
    // Second feature is twice the first.
    let x = DMatrix::from_row_slice(6, 2, &[
        1.0, 2.0,
        2.0, 4.0,
        4.0, 8.0,
        7.0, 14.0,
        9.0, 18.0,
        8.0, 16.0
    ]);
    let stats = ClassStats::estimate(&x, &[0, 0, 0, 1, 1, 1]).unwrap();
    let within = within_scaling(&stats.center(&x), stats.n_classes(), 1E-5).unwrap();
    assert_eq!(within.rank(), 1);
    assert_eq!(within.singular_values.len(), 2);
}

#[test]
fn scaling_stages_require_more_samples_than_classes() {
    let x = DMatrix::from_row_slice(2, 1, &[1.0, 2.0]);
    let stats = ClassStats::estimate(&x, &[0, 1]).unwrap();
    let xc = stats.center(&x);
    assert!(matches!(within_scaling(&xc, 2, 1E-5), Err(LdaError::InvalidInput(_))));
    let within = WithinScaling {
        scalings : DMatrix::identity(1, 1),
        singular_values : DVector::from_element(1, 1.0),
        std : DVector::from_element(1, 1.0)
    };
    assert!(matches!(between_scaling(&stats, &within, 1E-5), Err(LdaError::InvalidInput(_))));
}

#[test]
fn small_separation_keeps_its_direction() {
    // Class means 1E-6 apart against a unit within-class spread.
    let values : Vec<f64> = (0..200)
        .map(|i| (if i % 2 == 0 { -1.0 } else { 1.0 }) + (if i < 100 { 0.0 } else { 1E-6 }) )
        .collect();
    let y : Vec<usize> = (0..200).map(|i| i / 100 ).collect();
    let x = DMatrix::from_column_slice(200, 1, &values[..]);
    let stats = ClassStats::estimate(&x, &y).unwrap();
    let within = within_scaling(&stats.center(&x), stats.n_classes(), 1E-5).unwrap();
    let between = between_scaling(&stats, &within, 1E-5).unwrap();
    assert!(between.singular_values[0] < 1E-5);
    assert_eq!(between.rank(), 1);
    assert_eq!(between.explained_variance_ratio.len(), 1);
    assert!((between.explained_variance_ratio[0] - 1.0).abs() < 1E-12);
}
