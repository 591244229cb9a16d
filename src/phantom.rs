//! Synthetic activity distributions and noisy measurements of them.
//!
//! Phantoms are described in normalized coordinates: the field of view spans
//! `[-1, 1]` along both axes, whatever the image layout it is rendered into.

use ndarray::{Array1, ArrayView1};
use rand::{rngs::StdRng, SeedableRng};
use rand_distr::{Distribution, Poisson};

use crate::{
    geometry::pixel_centre,
    image::{Image, ImageLayout},
    system_matrix::SystemMatrix,
    types::Intensity,
};

/// A uniform ellipse. Values of overlapping ellipses add up.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Ellipse {
    pub centre: [f64; 2],
    pub semi_axes: [f64; 2],
    /// Anticlockwise rotation of the first semi-axis from `x`, in degrees
    pub angle: f64,
    pub value: Intensity,
}

impl Ellipse {

    pub fn disk(centre: [f64; 2], radius: f64, value: Intensity) -> Self {
        Self { centre, semi_axes: [radius, radius], angle: 0.0, value }
    }

    pub fn contains(&self, [x, y]: [f64; 2]) -> bool {
        let [cx, cy] = self.centre;
        let [a, b] = self.semi_axes;
        let (sin, cos) = self.angle.to_radians().sin_cos();
        let (dx, dy) = (x - cx, y - cy);
        let u =  dx * cos + dy * sin;
        let v = -dx * sin + dy * cos;
        (u / a).powi(2) + (v / b).powi(2) <= 1.0
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Phantom {
    pub ellipses: Vec<Ellipse>,
}

impl Phantom {

    /// Hot and cold disks inside a uniform background disk
    pub fn disks() -> Self {
        Self { ellipses: vec![
            Ellipse::disk([ 0.0 ,  0.0 ], 0.8 ,  1.0),
            Ellipse::disk([ 0.35,  0.2 ], 0.2 ,  3.0),
            Ellipse::disk([-0.3 , -0.2 ], 0.15, -1.0),
            Ellipse::disk([ 0.0 , -0.5 ], 0.1 ,  2.0),
        ]}
    }

    /// Shepp-Logan head phantom, with the higher-contrast values commonly
    /// used for display
    pub fn shepp_logan() -> Self {
        #[rustfmt::skip]
        let table = [
            // value    a       b        x0       y0     angle
            ( 1.0 , 0.69  , 0.92  ,  0.0  ,  0.0   ,   0.0),
            (-0.8 , 0.6624, 0.8740,  0.0  , -0.0184,   0.0),
            (-0.2 , 0.1100, 0.3100,  0.22 ,  0.0   , -18.0),
            (-0.2 , 0.1600, 0.4100, -0.22 ,  0.0   ,  18.0),
            ( 0.1 , 0.2100, 0.2500,  0.0  ,  0.35  ,   0.0),
            ( 0.1 , 0.0460, 0.0460,  0.0  ,  0.1   ,   0.0),
            ( 0.1 , 0.0460, 0.0460,  0.0  , -0.1   ,   0.0),
            ( 0.1 , 0.0460, 0.0230, -0.08 , -0.605 ,   0.0),
            ( 0.1 , 0.0230, 0.0230,  0.0  , -0.606 ,   0.0),
            ( 0.1 , 0.0230, 0.0460,  0.06 , -0.605 ,   0.0),
        ];
        let ellipses = table.iter()
            .map(|&(value, a, b, x0, y0, angle)| Ellipse { centre: [x0, y0], semi_axes: [a, b], angle, value })
            .collect();
        Self { ellipses }
    }

    /// Sample the phantom at the pixel centres. Negative sums are clamped to
    /// zero.
    pub fn render(&self, layout: ImageLayout) -> Image {
        let mut image = Image::zeros(layout);
        let (half_x, half_y) = (layout.nx as f64 / 2.0, layout.ny as f64 / 2.0);
        for j in 0..layout.n_pixels() {
            let [x, y] = pixel_centre(layout, layout.index1_to_2(j));
            let point = [x / half_x, y / half_y];
            let value: Intensity = self.ellipses.iter()
                .filter(|e| e.contains(point))
                .map(|e| e.value)
                .sum();
            image[j] = value.max(0.0);
        }
        image
    }
}

/// Scale `truth` so that its noiseless projection through `matrix` holds
/// `counts` in total. Returns the scaled image and its projection. If the
/// projection is empty, nothing is scaled.
pub fn scale_to_counts<M: SystemMatrix>(matrix: &M, truth: &Image, counts: Intensity) -> (Image, Array1<Intensity>) {
    let mut scaled = truth.clone();
    let mut expected = matrix.forward_project(truth.data.view());
    let total = expected.sum();
    if total > 0.0 {
        let factor = counts / total;
        scaled.data *= factor;
        expected *= factor;
    }
    (scaled, expected)
}

/// Poisson-distributed counts with the given expectations, reproducible for
/// a given `seed`. Non-positive (or non-finite) expectations give zero counts.
pub fn poisson_noise(expected: ArrayView1<Intensity>, seed: u64) -> Array1<Intensity> {
    let mut rng = StdRng::seed_from_u64(seed);
    expected.mapv(|lambda| match Poisson::new(lambda) {
        Ok(poisson) => poisson.sample(&mut rng),
        Err(_) => 0.0,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{geometry::parallel_beam, image::SinogramLayout};
    use ndarray::array;
    use rstest::rstest;
    use float_eq::assert_float_eq;
    #[allow(unused)] use pretty_assertions::{assert_eq, assert_ne};

    #[rstest(/**/ point, inside,
             case([0.0,  0.0 ], true),
             case([0.5,  0.0 ], true),
             case([0.0,  0.25], true),
             case([0.0,  0.3 ], false),
             case([0.6,  0.0 ], false),
    )]
    fn ellipse_membership(point: [f64; 2], inside: bool) {
        let e = Ellipse { centre: [0.0, 0.0], semi_axes: [0.5, 0.25], angle: 0.0, value: 1.0 };
        assert_eq!(e.contains(point), inside);
    }

    #[test]
    fn rotated_ellipse() {
        let e = Ellipse { centre: [0.1, 0.0], semi_axes: [0.5, 0.1], angle: 90.0, value: 1.0 };
        assert!( e.contains([0.1, 0.45]));
        assert!(!e.contains([0.5, 0.0 ]));
    }

    #[test]
    fn render_adds_and_clamps() {
        let phantom = Phantom { ellipses: vec![
            Ellipse::disk([0.0, 0.0], 2.0,  1.0),
            Ellipse::disk([0.5, 0.5], 0.3,  2.0),
            Ellipse::disk([-0.5, -0.5], 0.3, -4.0),
        ]};
        let layout = ImageLayout::new(2, 2);
        let image = phantom.render(layout);
        // Pixel centres at (±0.5, ±0.5) in normalized coordinates
        assert_eq!(image[[0, 1]], 3.0); // top right
        assert_eq!(image[[1, 0]], 0.0); // bottom left, clamped
        assert_eq!(image[[0, 0]], 1.0);
        assert_eq!(image[[1, 1]], 1.0);
    }

    #[test]
    fn shepp_logan_is_non_negative_and_non_trivial() {
        let image = Phantom::shepp_logan().render(ImageLayout::new(32, 32));
        assert!(image.data.iter().all(|&v| v >= 0.0));
        assert!(image.sum() > 0.0);
        // Outside the skull
        assert_eq!(image[[0, 0]], 0.0);
    }

    #[test]
    fn scaling_to_counts() {
        let layout = ImageLayout::new(8, 8);
        let matrix = parallel_beam(layout, SinogramLayout::new(4, 12)).unwrap();
        let truth = Phantom::disks().render(layout);
        let (scaled, expected) = scale_to_counts(&matrix, &truth, 1e4);
        assert_float_eq!(expected.sum(), 1e4, rmax <= 1e-12);
        let reprojected = matrix.forward_project(scaled.data.view());
        for (a, b) in reprojected.iter().zip(expected.iter()) {
            assert_float_eq!(*a, *b, rmax <= 1e-12);
        }
    }

    #[test]
    fn noise_is_reproducible() {
        let expected = array![0.0, -1.0, 5.0, 100.0, 1000.0];
        let a = poisson_noise(expected.view(), 42);
        let b = poisson_noise(expected.view(), 42);
        assert_eq!(a, b);
        assert_eq!(a[0], 0.0);
        assert_eq!(a[1], 0.0);
        assert!(a.iter().all(|&n| n >= 0.0 && n.fract() == 0.0));
        assert!((a[4] - 1000.0).abs() < 200.0);
    }
}
