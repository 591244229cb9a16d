use float_eq::assert_float_eq;
use proptest::prelude::*;

use emrecon::{
    fom::{convergence, image_rmse, iteration_ends},
    geometry::parallel_beam,
    io::problem::Problem,
    phantom::{poisson_noise, scale_to_counts, Phantom},
    run_em, run_osem, EmSettings, Image, ImageLayout, OsemSettings, Silent, SinogramLayout,
    SparseMatrix, SystemMatrix,
};

/// A small but realistic problem: disk phantom, 16 angles, noiseless data
fn disk_problem() -> Problem {
    let image = ImageLayout::new(16, 16);
    let sinogram = SinogramLayout::new(16, 24);
    let matrix = parallel_beam(image, sinogram).unwrap();
    let (truth, expected) = scale_to_counts(&matrix, &Phantom::disks().render(image), 1e5);
    Problem::new(image, sinogram, matrix, expected, Some(truth)).unwrap()
}

#[test]
fn em_approaches_the_truth() {
    let problem = disk_problem();
    let truth = problem.truth.as_ref().unwrap();
    let initial = problem.initial_image();
    let settings = EmSettings::new(20, problem.total_counts());
    let em = run_em(&problem.matrix, problem.measured.view(), &initial, settings, &mut Silent).unwrap();

    let rmse: Vec<f64> = convergence(&em.images, truth).into_iter().map(Option::unwrap).collect();
    let start = image_rmse(&initial, truth).unwrap();
    assert!(rmse[0] < start);
    assert!(rmse[19] < rmse[4]);
    assert!(rmse[19] < 0.5 * start);

    // Every emitted image carries the total counts
    for image in &em.images {
        assert_float_eq!(image.sum(), problem.total_counts(), rmax <= 1e-9);
    }
}

#[test]
fn osem_accelerates_em() {
    let problem = disk_problem();
    let truth = problem.truth.as_ref().unwrap();
    let initial = problem.initial_image();
    let total = problem.total_counts();

    let em   = run_em  (&problem.matrix, problem.measured.view(), &initial, EmSettings::new(2, total), &mut Silent).unwrap();
    let osem = run_osem(&problem.matrix, problem.measured.view(), &initial, OsemSettings::new(2, 8, total), &mut Silent).unwrap();

    assert_eq!(osem.images.len(), 16);
    let em_rmse   = image_rmse(em.last().unwrap(), truth).unwrap();
    let osem_rmse = image_rmse(&osem.estimate, truth).unwrap();
    assert!(osem_rmse < em_rmse, "OSEM {osem_rmse} should beat EM {em_rmse} after the same number of passes");
    assert_float_eq!(osem.estimate.sum(), total, rmax <= 1e-9);
    assert_eq!(iteration_ends(osem.images.len(), 8), vec![8, 16]);
}

#[test]
fn noisy_problem_survives_the_disk() -> Result<(), Box<dyn std::error::Error>> {
    let mut problem = disk_problem();
    problem.measured = poisson_noise(problem.measured.view(), 7);
    let dir = tempfile::tempdir()?;
    problem.write_to_dir(dir.path())?;
    let reloaded = Problem::read_from_dir(dir.path())?;
    assert_eq!(reloaded.measured, problem.measured);
    assert_eq!(reloaded.matrix, problem.matrix);

    let initial = reloaded.initial_image();
    let settings = OsemSettings::new(1, 4, reloaded.total_counts());
    let a = run_osem(&problem .matrix, problem .measured.view(), &initial, settings, &mut Silent)?;
    let b = run_osem(&reloaded.matrix, reloaded.measured.view(), &initial, settings, &mut Silent)?;
    assert_eq!(a.images, b.images);
    Ok(())
}

#[test]
fn sparse_and_dense_matrices_reconstruct_identically() {
    let problem = disk_problem();
    let dense = problem.matrix.to_dense();
    let initial = problem.initial_image();
    let settings = EmSettings::new(3, problem.total_counts());
    let sparse = run_em(&problem.matrix, problem.measured.view(), &initial, settings, &mut Silent).unwrap();
    let dense  = run_em(&dense         , problem.measured.view(), &initial, settings, &mut Silent).unwrap();
    for (s, d) in sparse.images.iter().zip(&dense.images) {
        for (a, b) in s.data.iter().zip(d.data.iter()) {
            assert_float_eq!(*a, *b, rmax <= 1e-10);
        }
    }
}

fn small_problem() -> impl Strategy<Value = (SparseMatrix, Vec<f64>, usize)> {
    (1_usize..4, 1_usize..4, 1_usize..5).prop_flat_map(|(nx, ny, angles)| {
        let image = ImageLayout::new(nx, ny);
        let sinogram = SinogramLayout::new(angles, 6);
        let matrix = parallel_beam(image, sinogram).unwrap();
        let n_bins = matrix.n_bins();
        (Just(matrix), prop::collection::vec(0.0..100.0, n_bins), 1_usize..4)
    })
}

proptest! {
    #[test]
    fn reconstructions_stay_non_negative_and_keep_their_mass(
        (matrix, measured, iterations) in small_problem(),
    ) {
        let measured = ndarray::Array1::from(measured);
        let total = measured.sum();
        let layout = ImageLayout::new(matrix.n_pixels(), 1);
        let initial = Image::uniform(layout, total.max(1.0));
        let em = run_em(&matrix, measured.view(), &initial, EmSettings::new(iterations, total), &mut Silent).unwrap();
        for image in &em.images {
            prop_assert!(image.data.iter().all(|&x| x >= 0.0 && x.is_finite()));
            if image.sum() > 1e-11 && total > 0.0 {
                prop_assert!((image.sum() - total).abs() <= 1e-9 * total);
            }
        }
    }
}
