//! Images, and the layouts which relate flat pixel vectors to 2-d images and
//! flat bin vectors to sinograms.

use ndarray::{Array1, Array2, ArrayView2, ShapeBuilder, ShapeError};

use crate::types::{Index1, Index2, Intensity};

pub type ImageData = Array1<Intensity>;

// --------------------------------------------------------------------------------
//                  Image layout

/// Dimensions of the reconstructed image.
///
/// Pixels are stored column-major: the 2-d image has shape `(ny, nx)` and
/// flat pixel `j` lives at `[j % ny, j / ny]`. The columns of the system
/// matrix are indexed the same way.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ImageLayout {
    pub nx: usize,
    pub ny: usize,
}

impl ImageLayout {

    pub fn new(nx: usize, ny: usize) -> Self { Self { nx, ny } }

    pub fn n_pixels(&self) -> usize { self.nx * self.ny }

    /// Shape of the 2-d rendition of an image with this layout
    pub fn shape(&self) -> (usize, usize) { (self.ny, self.nx) }

    pub fn index1_to_2(&self, i: Index1) -> Index2 { [i % self.ny, i / self.ny] }

    pub fn index2_to_1(&self, [row, col]: Index2) -> Index1 { row + col * self.ny }
}

// --------------------------------------------------------------------------------
//                  Sinogram layout

/// Angular and radial sampling of the projection data. Bins are stored
/// column-major like images: row `angle + bin * nphi` of the system matrix
/// corresponds to radial `bin` at angle `angle`, so consecutive rows step
/// through the angles.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SinogramLayout {
    pub nphi: usize,
    pub ns: usize,
}

impl SinogramLayout {

    pub fn new(nphi: usize, ns: usize) -> Self { Self { nphi, ns } }

    pub fn n_bins(&self) -> usize { self.nphi * self.ns }

    pub fn row(&self, angle: usize, bin: usize) -> Index1 { angle + bin * self.nphi }

    pub fn angle_and_bin(&self, row: Index1) -> (usize, usize) { (row % self.nphi, row / self.nphi) }

    /// Arrange a flat vector of bin values as an `(nphi, ns)` sinogram
    pub fn to_2d(&self, bins: &[Intensity]) -> Result<Array2<Intensity>, ShapeError> {
        Array2::from_shape_vec((self.nphi, self.ns).f(), bins.to_vec())
    }
}

// --------------------------------------------------------------------------------
//                  Image

#[derive(Clone, Debug, PartialEq)]
pub struct Image {
    pub layout: ImageLayout,
    pub data: ImageData,
}

impl Image {

    pub fn new(layout: ImageLayout, data: ImageData) -> Result<Self, ShapeError> {
        if data.len() != layout.n_pixels() {
            return Err(ShapeError::from_kind(ndarray::ErrorKind::IncompatibleShape));
        }
        Ok(Self { layout, data })
    }

    pub fn ones(layout: ImageLayout) -> Self {
        Self { layout, data: Array1::ones(layout.n_pixels()) }
    }

    pub fn zeros(layout: ImageLayout) -> Self {
        Self { layout, data: Array1::zeros(layout.n_pixels()) }
    }

    /// Uniform image whose pixels add up to `total`. The conventional
    /// starting point for EM and OSEM, with `total` set to the measured
    /// counts. Falls back to all ones if the layout has no pixels to share
    /// `total` between.
    pub fn uniform(layout: ImageLayout, total: Intensity) -> Self {
        let mut image = Self::ones(layout);
        let sum = image.sum();
        if sum > 1e-9 {
            image.data.mapv_inplace(|v| v / sum * total);
        }
        image
    }

    /// Flatten a `(ny, nx)` array in column-major order
    pub fn from_2d(image: ArrayView2<Intensity>) -> Self {
        let (ny, nx) = image.dim();
        let data = image.t().iter().copied().collect();
        Self { layout: ImageLayout { nx, ny }, data }
    }

    /// Owned 2-d copy, of shape `(ny, nx)`
    pub fn to_2d(&self) -> Array2<Intensity> {
        let layout = self.layout;
        Array2::from_shape_fn(layout.shape(), |(row, col)| self.data[layout.index2_to_1([row, col])])
    }

    pub fn sum(&self) -> Intensity { self.data.sum() }

    pub fn len(&self) -> usize { self.data.len() }

    pub fn is_empty(&self) -> bool { self.data.is_empty() }
}

impl core::ops::Index<Index1> for Image {
    type Output = Intensity;
    #[inline]
    fn index(&self, i: Index1) -> &Self::Output { &self.data[i] }
}

impl core::ops::IndexMut<Index1> for Image {
    #[inline]
    fn index_mut(&mut self, i: Index1) -> &mut Self::Output { &mut self.data[i] }
}

impl core::ops::Index<Index2> for Image {
    type Output = Intensity;
    fn index(&self, i2: Index2) -> &Self::Output {
        let i1 = self.layout.index2_to_1(i2);
        &self.data[i1]
    }
}

impl core::ops::IndexMut<Index2> for Image {
    fn index_mut(&mut self, i2: Index2) -> &mut Self::Output {
        let i1 = self.layout.index2_to_1(i2);
        &mut self.data[i1]
    }
}



#[cfg(test)]
mod test_image {
    use super::*;
    use float_eq::assert_float_eq;
    use ndarray::array;
    #[allow(unused)] use pretty_assertions::{assert_eq, assert_ne};

    #[test]
    fn to_2d_places_pixels_column_major() {
        let layout = ImageLayout::new(3, 2);
        let image = Image::new(layout, array![0., 1., 2., 3., 4., 5.]).unwrap();
        let two_d = image.to_2d();
        assert_eq!(two_d, array![[0., 2., 4.],
                                 [1., 3., 5.]]);
        assert_eq!(image[[1, 2]], 5.0);
    }

    #[test]
    fn from_2d_inverts_to_2d() {
        let a = array![[0., 2., 4.],
                       [1., 3., 5.]];
        let image = Image::from_2d(a.view());
        assert_eq!(image.layout, ImageLayout::new(3, 2));
        assert_eq!(image.data, array![0., 1., 2., 3., 4., 5.]);
        assert_eq!(image.to_2d(), a);
    }

    #[test]
    fn new_rejects_wrong_length() {
        assert!(Image::new(ImageLayout::new(2, 2), array![1., 2., 3.]).is_err());
    }

    #[test]
    fn uniform_image_sums_to_total() {
        let image = Image::uniform(ImageLayout::new(5, 4), 123.0);
        assert_float_eq!(image.sum(), 123.0, rmax <= 1e-12);
        assert_float_eq!(image[0], 123.0 / 20.0, rmax <= 1e-12);
    }
}
