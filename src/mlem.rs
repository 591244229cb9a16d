//! Maximum-Likelihood Expectation-Maximization

use std::time::Instant;

use ndarray::ArrayView1;

use crate::{
    error::ReconResult,
    image::Image,
    progress::{Observer, Progress, Step},
    projector::{check_inputs, em_update, renormalize, sensitivity_image},
    system_matrix::SystemMatrix,
    types::{Intensity, Ratio, DEFAULT_EPSILON},
};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EmSettings {
    pub iterations: usize,
    /// Sum to which the image is rescaled after every iteration
    pub total_counts: Intensity,
    pub epsilon: Ratio,
}

impl EmSettings {
    pub fn new(iterations: usize, total_counts: Intensity) -> Self {
        Self { iterations, total_counts, epsilon: DEFAULT_EPSILON }
    }

    pub fn with_epsilon(self, epsilon: Ratio) -> Self { Self { epsilon, ..self } }
}

#[derive(Clone, Debug)]
pub struct EmReconstruction {
    /// One image per iteration, in order
    pub images: Vec<Image>,
    /// Same column-major layout as `images`, so `to_2d()` is `(ny, nx)`
    /// rather than a plain `(nx, ny)` reshape of the flat data
    pub sensitivity: Image,
}

impl EmReconstruction {
    pub fn last(&self) -> Option<&Image> { self.images.last() }
}

/// Run `settings.iterations` ML-EM iterations starting from `initial`.
///
/// The sensitivity image is calculated once, from the whole system matrix.
/// After each update the image is rescaled to `settings.total_counts`, unless
/// its sum has collapsed to `epsilon` or below.
pub fn run_em<M, O>(
    matrix  : &M,
    measured: ArrayView1<Intensity>,
    initial : &Image,
    settings: EmSettings,
    observer: &mut O,
) -> ReconResult<EmReconstruction>
where
    M: SystemMatrix,
    O: Observer,
{
    check_inputs(matrix, measured, initial)?;
    let EmSettings { iterations, total_counts, epsilon } = settings;
    let layout = initial.layout;

    let sensitivity = sensitivity_image(matrix, epsilon);

    let mut image = initial.data.clone();
    let mut images = Vec::with_capacity(iterations);
    let start = Instant::now();
    for index in 1..=iterations {
        em_update(matrix, measured, &sensitivity, &mut image, epsilon);
        renormalize(&mut image, total_counts, epsilon);
        images.push(Image { layout, data: image.clone() });
        observer.report(&Progress { step: Step::Iteration, index, total: iterations, elapsed: start.elapsed() });
    }

    Ok(EmReconstruction { images, sensitivity: Image { layout, data: sensitivity } })
}
