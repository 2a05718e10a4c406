use nalgebra::*;
use rand::prelude::*;
use rand_distr::Normal;
use approx::assert_abs_diff_eq;
use lda::*;
use lda::feature::lda::ClassStats;
use lda::table::LabelledTable;

const EPS : f64 = 1E-8;

/// Gaussian blobs with n points around each center, labelled by center index.
fn blobs(centers : &[&[f64]], n : usize, sd : f64, seed : u64) -> (DMatrix<f64>, Vec<usize>) {
    let mut rng = StdRng::seed_from_u64(seed);
    let noise = Normal::new(0.0, sd).unwrap();
    let d = centers[0].len();
    let mut x = DMatrix::zeros(centers.len() * n, d);
    let mut y = Vec::with_capacity(centers.len() * n);
    for (c, center) in centers.iter().enumerate() {
        for i in 0..n {
            for j in 0..d {
                x[(c * n + i, j)] = center[j] + noise.sample(&mut rng);
            }
            y.push(c);
        }
    }
    (x, y)
}

fn four_classes() -> (DMatrix<f64>, Vec<usize>) {
    blobs(&[
        &[0.0, 0.0, 0.0],
        &[4.0, 1.0, 0.0],
        &[0.0, 3.0, 2.0],
        &[1.0, 1.0, 6.0]
    ], 30, 1.0, 7)
}

#[test]
fn two_blobs_single_direction() {
    let (x, y) = blobs(&[&[0.0, 0.0], &[10.0, 10.0]], 50, 0.5, 1);
    let discr = LDA::default().fit(&x, &y).unwrap();
    assert_eq!(discr.rank(), 1);
    assert_eq!(discr.projection().shape(), (2, 1));
    assert_eq!(discr.explained_variance_ratio().len(), 1);
    assert_abs_diff_eq!(discr.explained_variance_ratio()[0], 1.0, epsilon = EPS);

    // The axis should point roughly along the line joining the centers.
    let axis = discr.projection().column(0).normalize();
    let cos = (axis[0] + axis[1]).abs() / 2.0f64.sqrt();
    assert!(cos > 0.9, "cos = {}", cos);
}

#[test]
fn explained_variance_is_sorted_and_bounded() {
    let (x, y) = four_classes();
    let discr = LDA::default().fit(&x, &y).unwrap();
    assert_eq!(discr.rank(), 3);
    assert_eq!(discr.projection().ncols(), discr.rank());
    let ratio = discr.explained_variance_ratio();
    assert_eq!(ratio.len(), 3);
    assert!(ratio.iter().all(|r| *r >= 0.0 ));
    assert!(ratio.sum() <= 1.0 + EPS);
    for w in ratio.as_slice().windows(2) {
        assert!(w[0] >= w[1]);
    }
}

#[test]
fn rank_is_bounded_by_features() {
    // Four classes but a single feature: at most one direction.
    let (x, y) = blobs(&[&[0.0], &[3.0], &[6.0], &[9.0]], 20, 0.5, 3);
    let discr = LDA::default().fit(&x, &y).unwrap();
    assert_eq!(discr.rank(), 1);
    assert!(discr.explained_variance_ratio().len() <= 1);
}

#[test]
fn grand_mean_maps_to_origin() {
    let (x, y) = four_classes();
    let discr = LDA::default().fit(&x, &y).unwrap();
    let xbar = discr.grand_mean().transpose();
    let z = discr.transform(&DMatrix::from_row_slice(1, xbar.len(), xbar.as_slice())).unwrap();
    assert_abs_diff_eq!(z.abs().max(), 0.0, epsilon = EPS);

    let zm = discr.transform(discr.means()).unwrap();
    let weighted = zm.transpose() * discr.priors();
    assert_abs_diff_eq!(weighted.abs().max(), 0.0, epsilon = EPS);
}

#[test]
fn projection_whitens_within_class_scatter() {
    let (x, y) = four_classes();
    let discr = LDA::default().fit(&x, &y).unwrap();
    let stats = ClassStats::estimate(&x, &y).unwrap();
    let xc = stats.center(&x);
    let sw = (xc.transpose() * &xc).unscale((x.nrows() - stats.n_classes()) as f64);
    let p = discr.projection();
    let whitened = p.transpose() * sw * p;
    let id = DMatrix::<f64>::identity(p.ncols(), p.ncols());
    assert_abs_diff_eq!((whitened - id).abs().max(), 0.0, epsilon = 1E-6);
}

#[test]
fn fit_is_deterministic() {
    let (x, y) = four_classes();
    let first = LDA::default().fit(&x, &y).unwrap();
    let second = LDA::default().fit(&x, &y).unwrap();
    assert_eq!(first, second);
}

#[test]
fn identical_class_means_yield_empty_projection() {
    let x = DMatrix::from_row_slice(12, 2, &[
        1.0, 0.0, -1.0, 0.0, 0.0, 1.0, 0.0, -1.0,
        2.0, 0.0, -2.0, 0.0, 0.0, 2.0, 0.0, -2.0,
        3.0, 0.0, -3.0, 0.0, 0.0, 3.0, 0.0, -3.0,
    ]);
    let y = [0, 0, 0, 0, 1, 1, 1, 1, 2, 2, 2, 2];
    let discr = LDA::default().fit(&x, &y).unwrap();
    assert_eq!(discr.within_rank(), 2);
    assert_eq!(discr.rank(), 0);
    assert_eq!(discr.projection().shape(), (2, 0));
    assert!(discr.explained_variance_ratio().iter().all(|r| *r == 0.0 ));
    assert_eq!(discr.transform(&x).unwrap().shape(), (12, 0));
}

#[test]
fn identical_samples_yield_empty_projection() {
    let x = DMatrix::from_element(6, 3, 2.5);
    let y = ["a", "a", "b", "b", "c", "c"];
    let discr = LDA::default().fit(&x, &y[..]).unwrap();
    assert_eq!(discr.within_rank(), 0);
    assert_eq!(discr.rank(), 0);
    assert_eq!(discr.explained_variance_ratio().len(), 0);

    // Without discriminant directions, every prediction falls on the first class.
    let pred = discr.classifier().predict(&x).unwrap();
    assert!(pred.iter().all(|p| *p == "a" ));
}

#[test]
fn constant_column_stays_finite() {
    let (x2, y) = blobs(&[&[0.0, 0.0], &[5.0, 2.0]], 40, 1.0, 11);
    let x = x2.insert_column(2, 3.0);
    let discr = LDA::default().fit(&x, &y).unwrap();
    assert_eq!(discr.rank(), 1);
    assert!(discr.projection().iter().all(|v| v.is_finite() ));
    assert!(discr.transform(&x).unwrap().iter().all(|v| v.is_finite() ));
}

#[test]
fn classifier_recovers_training_labels() {
    let (x, y) = blobs(&[&[0.0, 0.0], &[8.0, 0.0], &[0.0, 8.0]], 25, 0.5, 5);
    let discr = LDA::default().fit(&x, &y).unwrap();
    let pred = discr.classifier().predict(&x).unwrap();
    assert_eq!(pred, y);
}

#[test]
fn string_labels_are_ordered() {
    let x = DMatrix::from_row_slice(6, 1, &[5.0, 6.0, 0.0, 1.0, 10.0, 12.0]);
    let y : Vec<String> = ["versicolor", "versicolor", "setosa", "setosa", "virginica", "virginica"]
        .iter()
        .map(|s| s.to_string() )
        .collect();
    let discr = LDA::default().fit(&x, &y).unwrap();
    assert_eq!(discr.classes(), &["setosa".to_string(), "versicolor".to_string(), "virginica".to_string()][..]);
    assert_abs_diff_eq!(discr.means()[(0, 0)], 0.5, epsilon = EPS);
}

#[test]
fn n_components_truncates_directions() {
    let (x, y) = four_classes();
    let full = LDA::default().fit(&x, &y).unwrap();
    let settings = LdaSettings { n_components : Some(1), ..Default::default() };
    let reduced = LDA::new(settings).fit(&x, &y).unwrap();
    assert_eq!(reduced.rank(), 1);
    assert_eq!(reduced.explained_variance_ratio().len(), 1);
    assert_eq!(reduced.explained_variance_ratio()[0], full.explained_variance_ratio()[0]);
    assert_eq!(reduced.projection().column(0), full.projection().column(0));
}

#[test]
fn lda_returns_projection_and_ratio() {
    let (x, y) = four_classes();
    let (eigvector, eigvalue) = lda(&x, &y).unwrap();
    let discr = LDA::default().fit(&x, &y).unwrap();
    assert_eq!(&eigvector, discr.projection());
    assert_eq!(&eigvalue, discr.explained_variance_ratio());
}

#[test]
fn mismatched_labels_are_rejected() {
    let (x, mut y) = four_classes();
    y.pop();
    assert!(matches!(lda(&x, &y), Err(LdaError::InvalidInput(_))));
}

#[test]
fn discriminant_survives_json() {
    let (x, y) = four_classes();
    let discr = LDA::default().fit(&x, &y).unwrap();
    let path = std::env::temp_dir().join("lda_discriminant_roundtrip.json");
    discr.save_to_path(&path).unwrap();
    let loaded : Discriminant<usize> = Discriminant::load_from_path(&path).unwrap();
    std::fs::remove_file(&path).ok();
    assert_eq!(loaded.classes(), discr.classes());
    assert_abs_diff_eq!((loaded.projection() - discr.projection()).abs().max(), 0.0, epsilon = 1E-12);
}

#[test]
fn settings_from_json_file() {
    let path = std::env::temp_dir().join("lda_settings_test.json");
    std::fs::write(&path, r#"{ "tol" : 1e-3 }"#).unwrap();
    let settings = LdaSettings::load_from_path(&path).unwrap();
    std::fs::remove_file(&path).ok();
    assert_eq!(settings.tol, 1E-3);
    assert_eq!(settings.n_components, None);
}

#[test]
fn fit_from_csv_table() {
    let content = "\
f1,f2,digit
0.1,0.2,3
0.3,0.1,3
0.2,0.4,3
5.1,4.9,7
4.8,5.2,7
5.3,5.0,7
";
    let tbl = LabelledTable::from_reader(content.as_bytes(), "digit").unwrap();
    let discr = LDA::default().fit(&tbl.features, &tbl.labels).unwrap();
    assert_eq!(discr.classes(), &["3".to_string(), "7".to_string()][..]);
    assert_eq!(discr.rank(), 1);
    let query = DMatrix::from_row_slice(2, 2, &[0.0, 0.0, 6.0, 6.0]);
    let pred = discr.classifier().predict(&query).unwrap();
    assert_eq!(pred, vec!["3".to_string(), "7".to_string()]);
}
