use nalgebra::*;
use rand::prelude::*;
use rand_distr::Normal;
use lda::{LDA, LdaSettings};
use std::error::Error;

// Three gaussian groups in five dimensions, where only the first two
// dimensions carry class information.
fn sample(rng : &mut StdRng, n : usize) -> Result<(DMatrix<f64>, Vec<&'static str>), Box<dyn Error>> {
    let noise = Normal::new(0.0, 1.0)?;
    let centers : [(&str, [f64; 2]); 3] = [("zero", [0.0, 0.0]), ("one", [6.0, 0.0]), ("two", [3.0, 5.0])];
    let mut x = DMatrix::zeros(3 * n, 5);
    let mut y = Vec::new();
    for (c, (label, center)) in centers.iter().enumerate() {
        for i in 0..n {
            for j in 0..5 {
                let loc = if j < 2 { center[j] } else { 0.0 };
                x[(c * n + i, j)] = loc + noise.sample(rng);
            }
            y.push(*label);
        }
    }
    Ok((x, y))
}

fn main() -> Result<(), Box<dyn Error>> {
    let mut rng = StdRng::seed_from_u64(42);
    let (x, y) = sample(&mut rng, 100)?;
    let discr = LDA::new(LdaSettings::default()).fit(&x, &y[..])?;
    println!("Classes: {:?}", discr.classes());
    println!("Explained variance ratio: {}", discr.explained_variance_ratio());
    println!("Projection: {}", discr.projection());

    let (x_new, y_new) = sample(&mut rng, 20)?;
    let pred = discr.classifier().predict(&x_new)?;
    let hits = pred.iter().zip(y_new.iter()).filter(|(p, t)| p == t ).count();
    println!("Accuracy on new sample: {}/{}", hits, y_new.len());
    Ok(())
}
