//! Ordered-Subsets Expectation-Maximization
//!
//! The sinogram bins are split into `subsets` interleaved subsets: subset `s`
//! contains bins `s, s + subsets, s + 2·subsets, …`. Each full iteration runs
//! one EM update per subset, in order, using only that subset's rows of the
//! system matrix, and renormalizes the image once at the end.

use std::time::Instant;

use ndarray::{Array1, ArrayView1, Axis};

use crate::{
    error::{ReconError, ReconResult},
    image::Image,
    progress::{Observer, Progress, Step},
    projector::{check_inputs, em_update, renormalize, sensitivity_image},
    system_matrix::SystemMatrix,
    types::{Index1, Intensity, Ratio, DEFAULT_EPSILON},
};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct OsemSettings {
    pub iterations: usize,
    pub subsets: usize,
    /// Sum to which the image is rescaled after every full iteration
    pub total_counts: Intensity,
    pub epsilon: Ratio,
}

impl OsemSettings {
    pub fn new(iterations: usize, subsets: usize, total_counts: Intensity) -> Self {
        Self { iterations, subsets, total_counts, epsilon: DEFAULT_EPSILON }
    }

    pub fn with_epsilon(self, epsilon: Ratio) -> Self { Self { epsilon, ..self } }
}

#[derive(Clone, Debug)]
pub struct OsemReconstruction {
    /// One image per sub-iteration, in order: `iterations * subsets` of them
    pub images: Vec<Image>,
    /// The image after the last full iteration, including its
    /// renormalization. This is what a further iteration would start from.
    pub estimate: Image,
}

impl OsemReconstruction {
    pub fn last(&self) -> Option<&Image> { self.images.last() }
}

/// The bins belonging to subset `subset`: `subset, subset + subsets, …`
pub fn subset_bins(n_bins: usize, subsets: usize, subset: usize) -> Vec<Index1> {
    (subset..n_bins).step_by(subsets).collect()
}

/// Partition `0..n_bins` into `subsets` interleaved subsets of equal size
pub fn ordered_subsets(n_bins: usize, subsets: usize) -> ReconResult<Vec<Vec<Index1>>> {
    if subsets == 0 {
        return Err(ReconError::ZeroSubsets)
    }
    if n_bins % subsets != 0 {
        return Err(ReconError::IndivisibleSubsets { n_bins, subsets })
    }
    Ok((0..subsets).map(|s| subset_bins(n_bins, subsets, s)).collect())
}

/// Run `settings.iterations` full OSEM iterations starting from `initial`.
///
/// The sensitivity of each subset is recalculated from that subset's rows
/// every time the subset is used. An image is recorded after every
/// sub-iteration; the rescaling to `settings.total_counts` happens only after
/// the last subset of each iteration, so it is first visible in the image
/// recorded after the next sub-iteration, and in `estimate`.
pub fn run_osem<M, O>(
    matrix  : &M,
    measured: ArrayView1<Intensity>,
    initial : &Image,
    settings: OsemSettings,
    observer: &mut O,
) -> ReconResult<OsemReconstruction>
where
    M: SystemMatrix,
    O: Observer,
{
    check_inputs(matrix, measured, initial)?;
    let OsemSettings { iterations, subsets, total_counts, epsilon } = settings;
    let partition = ordered_subsets(matrix.n_bins(), subsets)?;
    let layout = initial.layout;

    let total = iterations * subsets;
    let mut image = initial.data.clone();
    let mut images = Vec::with_capacity(total);
    let start = Instant::now();
    for iteration in 1..=iterations {
        for (subset, bins) in partition.iter().enumerate() {
            let sub_matrix = matrix.select_rows(bins);
            let sub_measured: Array1<Intensity> = measured.select(Axis(0), bins);
            let sensitivity = sensitivity_image(&sub_matrix, epsilon);
            em_update(&sub_matrix, sub_measured.view(), &sensitivity, &mut image, epsilon);
            images.push(Image { layout, data: image.clone() });
            observer.report(&Progress {
                step: Step::SubIteration { iteration, subset: subset + 1, subsets },
                index: images.len(),
                total,
                elapsed: start.elapsed(),
            });
        }
        // Always the caller's total, not the sum at the start of the iteration
        renormalize(&mut image, total_counts, epsilon);
    }

    Ok(OsemReconstruction { images, estimate: Image { layout, data: image } })
}
