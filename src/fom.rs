//! Figures of merit for comparing reconstructions with each other and with
//! the true image.

use ndarray::ArrayView2;

use crate::image::Image;

/// Root mean square of the pixel-wise difference between two images.
/// `None` when the shapes differ or the images are empty: the comparison is
/// unavailable rather than an error.
pub fn rmse(a: ArrayView2<f64>, b: ArrayView2<f64>) -> Option<f64> {
    if a.dim() != b.dim() || a.is_empty() { return None }
    let sum_sq: f64 = a.iter().zip(b.iter()).map(|(x, y)| (x - y) * (x - y)).sum();
    Some((sum_sq / a.len() as f64).sqrt())
}

/// `rmse` of two `Image`s, which must have the same layout
pub fn image_rmse(a: &Image, b: &Image) -> Option<f64> {
    if a.layout != b.layout { return None }
    rmse(a.to_2d().view(), b.to_2d().view())
}

/// RMSE of each image in a reconstruction sequence with respect to `truth`
pub fn convergence(images: &[Image], truth: &Image) -> Vec<Option<f64>> {
    images.iter().map(|image| image_rmse(image, truth)).collect()
}

/// Element-wise `|a - b| <= atol + rtol * |b|`, for comparing a reconstruction
/// with one produced independently. `false` when the shapes differ.
pub fn all_close(a: ArrayView2<f64>, b: ArrayView2<f64>, rtol: f64, atol: f64) -> bool {
    a.dim() == b.dim() &&
        a.iter().zip(b.iter()).all(|(x, y)| (x - y).abs() <= atol + rtol * y.abs())
}

/// 1-based positions, in a sequence of OSEM sub-iteration images, of the
/// images which complete a full iteration
pub fn iteration_ends(n_images: usize, subsets: usize) -> Vec<usize> {
    if subsets == 0 { return vec![] }
    (subsets..=n_images).step_by(subsets).collect()
}
