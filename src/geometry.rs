//! Parallel-beam acquisition geometry for synthetic problems.
//!
//! Pixels are unit squares, the image is centred on the origin with `x`
//! increasing along columns and `y` increasing towards row 0. The detector
//! has `ns` bins spanning the diagonal of the field of view, and is rotated
//! through `nphi` angles evenly spaced over `[0, π)`.

use std::f64::consts::PI;

use itertools::iproduct;

use crate::{
    image::{ImageLayout, SinogramLayout},
    system_matrix::{MatrixError, SparseMatrix},
    types::{Index1, Weight},
};

/// Pixel-driven parallel-beam system matrix. Elements are detection
/// probabilities: each pixel's emissions are shared equally between the
/// angles, and at each angle the pixel centre is projected onto the detector
/// axis and its share split linearly between the two nearest bins. Weight
/// falling outside the detector is lost, so columns sum to at most 1.
pub fn parallel_beam(image: ImageLayout, sinogram: SinogramLayout) -> Result<SparseMatrix, MatrixError> {
    let ImageLayout    { nx, ny } = image;
    let SinogramLayout { nphi, ns } = sinogram;
    let diagonal = ((nx * nx + ny * ny) as f64).sqrt();
    let ds = diagonal / ns as f64;
    let share = 1.0 / nphi as f64;

    let (mut rows, mut columns, mut weights) = (vec![], vec![], vec![]);
    let mut push = |row: Index1, column: Index1, weight: Weight| {
        if weight > 0.0 {
            rows.push(row);
            columns.push(column);
            weights.push(weight);
        }
    };

    for angle in 0..nphi {
        let phi = angle as f64 * PI / nphi as f64;
        let (sin, cos) = phi.sin_cos();
        for (r, c) in iproduct!(0..ny, 0..nx) {
            let [x, y] = pixel_centre(image, [r, c]);
            // Continuous bin coordinate, bin k being centred on k
            let t = (x * cos + y * sin + diagonal / 2.0) / ds - 0.5;
            let k = t.floor();
            let f = t - k;
            let column = image.index2_to_1([r, c]);
            for (bin, weight) in [(k, share * (1.0 - f)), (k + 1.0, share * f)] {
                if bin >= 0.0 && bin < ns as f64 {
                    push(sinogram.row(angle, bin as usize), column, weight);
                }
            }
        }
    }
    SparseMatrix::from_triplets(sinogram.n_bins(), image.n_pixels(), &rows, &columns, &weights)
}

/// Position of the centre of pixel `[row, col]`
pub fn pixel_centre(layout: ImageLayout, [row, col]: [usize; 2]) -> [f64; 2] {
    let x = col as f64 + 0.5 - layout.nx as f64 / 2.0;
    let y = layout.ny as f64 / 2.0 - (row as f64 + 0.5);
    [x, y]
}
