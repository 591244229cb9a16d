//! Common core of the ML-EM and OSEM updates: the sensitivity image, one
//! multiplicative update, and count renormalization.
//!
//! Every divisor is floored at `epsilon`. This is a numerical-stability
//! guard, not an error path: nothing here ever fails.

/// Back projection of a vector of ones: the total weight with which each pixel
/// contributes to the bins of `matrix`. Entries at or below `epsilon` are
/// raised to `epsilon`.
pub fn sensitivity_image<M: SystemMatrix>(matrix: &M, epsilon: Ratio) -> ImageData {
    let ones = Array1::ones(matrix.n_bins());
    let mut sensitivity = matrix.back_project(ones.view());
    clamp_floor(&mut sensitivity, epsilon);
    sensitivity
}

/// Raise every element at or below `floor` to `floor`
pub fn clamp_floor(data: &mut Array1<Intensity>, floor: Ratio) {
    data.mapv_inplace(|x| if x <= floor { floor } else { x });
}

/// One multiplicative EM update of `image` against the bins of `matrix`:
///
/// `image ← (image / sensitivity) · Aᵗ(measured / max(A image, ε))`
///
/// followed by zeroing of any negative pixels.
pub fn em_update<M: SystemMatrix>(
    matrix     : &M,
    measured   : ArrayView1<Intensity>,
    sensitivity: &ImageData,
    image      : &mut ImageData,
    epsilon    : Ratio,
) {
    let mut projection = matrix.forward_project(image.view());
    clamp_floor(&mut projection, epsilon);
    let ratio = &measured / &projection;
    let backprojection = matrix.back_project(ratio.view());
    apply_sensitivity_image(image, &backprojection, sensitivity);
}

fn apply_sensitivity_image(image: &mut ImageData, backprojection: &ImageData, sensitivity: &ImageData) {
    azip!((voxel in image, &b in backprojection, &s in sensitivity) {
        *voxel = (*voxel / s) * b;
        if *voxel < 0.0 { *voxel = 0.0 }
    })
}

/// Rescale `image` so that its pixels add up to `total`. Images whose sum
/// does not exceed `epsilon` are left alone. Returns whether rescaling took
/// place.
pub fn renormalize(image: &mut ImageData, total: Intensity, epsilon: Ratio) -> bool {
    let sum = image.sum();
    if sum > epsilon {
        let factor = total / sum;
        image.mapv_inplace(|x| x * factor);
        true
    } else {
        false
    }
}

/// Check that the measured data and the initial image fit the system matrix
pub fn check_inputs<M: SystemMatrix>(matrix: &M, measured: ArrayView1<Intensity>, initial: &Image) -> ReconResult<()> {
    let (n_bins, n_pixels) = (matrix.n_bins(), matrix.n_pixels());
    if n_bins == 0 || n_pixels == 0 {
        return Err(ReconError::EmptyMatrix { n_bins, n_pixels })
    }
    if measured.len() != n_bins {
        return Err(ReconError::MeasuredLength { expected: n_bins, actual: measured.len() })
    }
    if initial.len() != n_pixels {
        return Err(ReconError::InitialImageSize { expected: n_pixels, actual: initial.len() })
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use rstest::rstest;
    use float_eq::assert_float_eq;
    use crate::image::ImageLayout;
    #[allow(unused)] use pretty_assertions::{assert_eq, assert_ne};

    const EPS: f64 = 1e-11;

    #[test]
    fn sensitivity_is_column_sums() {
        let a = array![[1.0, 0.0, 2.0],
                       [3.0, 0.0, 0.5]];
        let s = sensitivity_image(&a, EPS);
        assert_eq!(s, array![4.0, EPS, 2.5]);
    }

    #[test]
    fn sensitivity_of_row_subset() {
        let a = array![[1.0, 1.0, 0.0, 0.0],
                       [0.0, 0.0, 1.0, 1.0]];
        let s = sensitivity_image(&a.select_rows(&[1]), EPS);
        assert_eq!(s, array![EPS, EPS, 1.0, 1.0]);
    }

    #[rstest(/**/ input           , expected             ,
             case([0.0, 1.0, -2.0], [EPS, 1.0, EPS]      ),
             case([EPS, 2e-11, 5.0], [EPS, 2e-11, 5.0]   ),
             case([f64::INFINITY, 0.5e-11, 1e-12], [f64::INFINITY, EPS, EPS]),
    )]
    fn floor_clamping(input: [f64; 3], expected: [f64; 3]) {
        let mut data = Array1::from(input.to_vec());
        clamp_floor(&mut data, EPS);
        assert_eq!(data.to_vec(), expected.to_vec());
    }

    #[test]
    fn update_zeroes_negative_pixels() {
        // A negative starting pixel stays negative through the multiplicative
        // update, and must be clipped
        let a = array![[1.0, 1.0]];
        let mut image = array![-1.0, 3.0];
        let sensitivity = sensitivity_image(&a, EPS);
        em_update(&a, array![4.0].view(), &sensitivity, &mut image, EPS);
        assert_eq!(image, array![0.0, 6.0]);
    }

    #[test]
    fn update_with_zero_projection_uses_floor() {
        let a = array![[1.0, 0.0],
                       [0.0, 1.0]];
        let mut image = array![0.0, 2.0];
        let sensitivity = sensitivity_image(&a, EPS);
        em_update(&a, array![3.0, 2.0].view(), &sensitivity, &mut image, EPS);
        assert!(image.iter().all(|x| x.is_finite()));
        assert_eq!(image, array![0.0, 2.0]);
    }

    #[test]
    fn renormalization() {
        let mut image = array![1.0, 3.0];
        assert!(renormalize(&mut image, 20.0, EPS));
        assert_float_eq!(image.sum(), 20.0, rmax <= 1e-15);
        assert_float_eq!(image[1], 15.0, rmax <= 1e-15);

        let mut tiny = array![1e-12, 0.0];
        assert!(!renormalize(&mut tiny, 20.0, EPS));
        assert_eq!(tiny, array![1e-12, 0.0]);
    }

    #[test]
    fn input_checks() {
        let a = array![[1.0, 1.0, 0.0, 0.0],
                       [0.0, 0.0, 1.0, 1.0]];
        let layout = ImageLayout::new(2, 2);
        let x0 = Image::ones(layout);
        assert_eq!(check_inputs(&a, array![1.0, 2.0].view(), &x0), Ok(()));
        assert_eq!(check_inputs(&a, array![1.0].view(), &x0),
                   Err(ReconError::MeasuredLength { expected: 2, actual: 1 }));
        assert_eq!(check_inputs(&a, array![1.0, 2.0].view(), &Image::ones(ImageLayout::new(3, 1))),
                   Err(ReconError::InitialImageSize { expected: 4, actual: 3 }));
        let empty = Array2::<f64>::zeros((0, 4));
        assert_eq!(check_inputs(&empty, Array1::zeros(0).view(), &x0),
                   Err(ReconError::EmptyMatrix { n_bins: 0, n_pixels: 4 }));
    }
}

// ----- Imports ------------------------------------------------------------------------------------------
use ndarray::{azip, Array1, ArrayView1};
#[cfg(test)] use ndarray::Array2;

use crate::{
    error::{ReconError, ReconResult},
    image::{Image, ImageData},
    system_matrix::SystemMatrix,
    types::{Intensity, Ratio},
};
