use dimred::traits::Fit;
use dimred_datasets::generate;
use dimred_phate::{PhateParams, Result};
use ndarray::arr2;
use ndarray_rand::rand::SeedableRng;
use rand_xoshiro::Xoshiro256Plus;

fn main() -> Result<()> {
    let mut rng = Xoshiro256Plus::seed_from_u64(42);
    let centroids = arr2(&[
        [0.0, 0.0, 0.0, 0.0],
        [8.0, 8.0, 0.0, 0.0],
        [0.0, 8.0, 8.0, 8.0],
    ]);
    let (records, labels) = generate::labelled_blobs(40, &centroids, &mut rng);

    let fitted = PhateParams::new().n_neighbors(8).fit(&records)?;

    println!(
        "finished in state {:?} after {} iterations, loss {:.4}",
        fitted.state(),
        fitted.n_iter(),
        fitted.loss()
    );

    for (point, label) in fitted.embedding().rows().into_iter().zip(labels.iter()) {
        println!("{:.4} {:.4} {}", point[0], point[1], label);
    }

    Ok(())
}
