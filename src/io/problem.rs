//! Problem instances: everything a reconstruction needs, stored as a
//! directory of raw arrays plus a small TOML file with the dimensions.
//!
//! ```text
//! problem.toml         nx, ny, nphi, ns
//! matrix_rows.u32      system matrix triplets: bin index,
//! matrix_cols.u32        pixel index,
//! matrix_weights.f64     and weight
//! measured.f64         noisy counts, one per bin
//! truth.f64            (optional) true image, column-major
//! ```

use std::path::{Path, PathBuf};

use ndarray::Array1;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    image::{Image, ImageLayout, SinogramLayout},
    io::raw,
    system_matrix::{MatrixError, SparseMatrix, SystemMatrix},
    types::Intensity,
};

const DIMENSIONS: &str = "problem.toml";
const ROWS      : &str = "matrix_rows.u32";
const COLS      : &str = "matrix_cols.u32";
const WEIGHTS   : &str = "matrix_weights.f64";
const MEASURED  : &str = "measured.f64";
const TRUTH     : &str = "truth.f64";

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
struct Dimensions {
    nx: usize,
    ny: usize,
    nphi: usize,
    ns: usize,
}

#[derive(Clone, Debug)]
pub struct Problem {
    pub image: ImageLayout,
    pub sinogram: SinogramLayout,
    pub matrix: SparseMatrix,
    pub measured: Array1<Intensity>,
    pub truth: Option<Image>,
}

impl Problem {

    /// Assemble a problem, checking that all the parts have consistent sizes
    pub fn new(
        image   : ImageLayout,
        sinogram: SinogramLayout,
        matrix  : SparseMatrix,
        measured: Array1<Intensity>,
        truth   : Option<Image>,
    ) -> Result<Self, ProblemError> {
        use ProblemError::Size;
        let check = |what: &'static str, expected: usize, actual: usize| {
            if expected == actual { Ok(()) } else { Err(Size { what, expected, actual }) }
        };
        check("system matrix rows"   , sinogram.n_bins() , matrix.n_bins())?;
        check("system matrix columns", image.n_pixels()  , matrix.n_pixels())?;
        check("measured data"        , sinogram.n_bins() , measured.len())?;
        if let Some(truth) = &truth {
            check("true image", image.n_pixels(), truth.len())?;
        }
        Ok(Self { image, sinogram, matrix, measured, truth })
    }

    /// Total measured counts
    pub fn total_counts(&self) -> Intensity { self.measured.sum() }

    /// Uniform image carrying the total measured counts
    pub fn initial_image(&self) -> Image { Image::uniform(self.image, self.total_counts()) }

    pub fn read_from_dir(dir: &Path) -> Result<Self, ProblemError> {
        let text = std::fs::read_to_string(dir.join(DIMENSIONS)).map_err(io_error(dir.join(DIMENSIONS)))?;
        let Dimensions { nx, ny, nphi, ns } = toml::from_str(&text)?;
        let image    = ImageLayout::new(nx, ny);
        let sinogram = SinogramLayout::new(nphi, ns);

        let read_u32 = |name: &str| -> Result<Vec<usize>, ProblemError> {
            let path = dir.join(name);
            let data: Vec<u32> = raw::read_vec(&path).map_err(io_error(path))?;
            Ok(data.into_iter().map(|i| i as usize).collect())
        };
        let read_f64 = |name: &str| -> Result<Vec<f64>, ProblemError> {
            let path = dir.join(name);
            raw::read_vec(&path).map_err(io_error(path))
        };

        let rows    = read_u32(ROWS)?;
        let columns = read_u32(COLS)?;
        let weights = read_f64(WEIGHTS)?;
        let matrix = SparseMatrix::from_triplets(sinogram.n_bins(), image.n_pixels(), &rows, &columns, &weights)?;

        let measured = Array1::from(read_f64(MEASURED)?);

        let truth = if dir.join(TRUTH).exists() {
            let data = read_f64(TRUTH)?;
            let len = data.len();
            Some(Image::new(image, data.into()).map_err(|_| ProblemError::Size {
                what: "true image", expected: image.n_pixels(), actual: len
            })?)
        } else { None };

        Self::new(image, sinogram, matrix, measured, truth)
    }

    pub fn write_to_dir(&self, dir: &Path) -> Result<(), ProblemError> {
        std::fs::create_dir_all(dir).map_err(io_error(dir.to_path_buf()))?;
        for n in [self.sinogram.n_bins(), self.image.n_pixels()] {
            if u32::try_from(n).is_err() { return Err(ProblemError::TooLarge(n)) }
        }

        let Self { image, sinogram, .. } = *self;
        let dims = Dimensions { nx: image.nx, ny: image.ny, nphi: sinogram.nphi, ns: sinogram.ns };
        let path = dir.join(DIMENSIONS);
        std::fs::write(&path, toml::to_string(&dims)?).map_err(io_error(path))?;

        let (mut rows, mut columns, mut weights) = (vec![], vec![], vec![]);
        for i in 0..self.matrix.n_bins() {
            for (j, w) in self.matrix.row(i) {
                rows.push(i as u32);
                columns.push(j as u32);
                weights.push(w);
            }
        }
        write_raw(dir, ROWS    , rows)?;
        write_raw(dir, COLS    , columns)?;
        write_raw(dir, WEIGHTS , weights)?;
        write_raw(dir, MEASURED, self.measured.iter().copied())?;
        if let Some(truth) = &self.truth {
            let path = dir.join(TRUTH);
            truth.write_to_raw_file(&path).map_err(io_error(path))?;
        }
        Ok(())
    }
}

fn write_raw<T: raw::RawElement>(dir: &Path, name: &str, data: impl IntoIterator<Item = T>) -> Result<(), ProblemError> {
    let path = dir.join(name);
    raw::write(data, &path).map_err(io_error(path))
}

fn io_error(path: PathBuf) -> impl FnOnce(std::io::Error) -> ProblemError {
    move |source| ProblemError::Io { path, source }
}

#[derive(Error, Debug)]
pub enum ProblemError {
    #[error("{}: {source}", path.display())]
    Io { path: PathBuf, source: std::io::Error },

    #[error("couldn't parse problem dimensions: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("couldn't write problem dimensions: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("bad system matrix: {0}")]
    Matrix(#[from] MatrixError),

    #[error("{what} has size {actual}, expected {expected}")]
    Size { what: &'static str, expected: usize, actual: usize },

    #[error("dimension {0} does not fit in 32-bit indices")]
    TooLarge(usize),
}
