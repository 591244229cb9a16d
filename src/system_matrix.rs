//! The system matrix: the linear operator mapping images to expected counts
//! in each sinogram bin.
//!
//! The reconstruction engines only ever need three things from it: forward
//! projection (`A x`), back projection (`Aᵗ v`) and the extraction of a subset
//! of its rows. These are captured by the `SystemMatrix` trait. Whatever
//! storage format the matrix arrives in is dealt with when the implementor is
//! constructed, never inside the engines.

// ----- The trait --------------------------------------------------------------------

pub trait SystemMatrix: Sync {

    /// Number of sinogram bins (rows)
    fn n_bins(&self) -> usize;

    /// Number of image pixels (columns)
    fn n_pixels(&self) -> usize;

    /// `A · image`
    fn forward_project(&self, image: ArrayView1<Intensity>) -> Array1<Intensity>;

    /// `Aᵗ · bins`
    fn back_project(&self, bins: ArrayView1<Intensity>) -> Array1<Intensity>;

    /// New matrix made of the given rows of this one, in the given order, with
    /// the same number of columns. Panics if any row is out of range.
    fn select_rows(&self, rows: &[Index1]) -> Self where Self: Sized;
}

// ----- Storage of system matrix elements ---------------------------------------------

pub type SystemMatrixElement = (Index1, Weight);

/// Compressed sparse storage: `elements[offsets[i]..offsets[i+1]]` holds the
/// non-zero `(inner index, weight)` pairs of outer slice `i`, sorted by inner
/// index.
#[derive(Clone, Debug, PartialEq)]
struct Compressed {
    n_inner: usize,
    offsets: Vec<usize>,
    elements: Vec<SystemMatrixElement>,
}

impl Compressed {

    fn n_outer(&self) -> usize { self.offsets.len() - 1 }

    fn slice(&self, i: Index1) -> &[SystemMatrixElement] {
        &self.elements[self.offsets[i]..self.offsets[i + 1]]
    }

    /// Product with a dense vector. Each output element is accumulated
    /// sequentially over its slice, so the result does not depend on how the
    /// slices are shared between threads.
    fn product(&self, v: ArrayView1<Intensity>) -> Array1<Intensity> {
        let dot = |i: Index1| -> Intensity {
            self.slice(i).iter().map(|&(j, w)| w * v[j]).sum()
        };
        #[cfg(not(feature = "serial"))] let outer = (0..self.n_outer()).into_par_iter();
        #[cfg    (feature = "serial") ] let outer =  0..self.n_outer();
        outer.map(dot).collect::<Vec<_>>().into()
    }

    /// Same matrix, compressed along the other axis. Slices are visited in
    /// ascending order, so the output slices come out sorted.
    fn transposed(&self) -> Self {
        let mut counts = vec![0_usize; self.n_inner + 1];
        for &(j, _) in &self.elements { counts[j + 1] += 1; }
        for j in 0..self.n_inner { counts[j + 1] += counts[j]; }
        let offsets = counts.clone();
        let mut next = counts;
        let mut elements = vec![(0, 0.0); self.elements.len()];
        for i in 0..self.n_outer() {
            for &(j, w) in self.slice(i) {
                elements[next[j]] = (i, w);
                next[j] += 1;
            }
        }
        Self { n_inner: self.n_outer(), offsets, elements }
    }
}

// ----- Sparse implementation of the trait ---------------------------------------------

/// Sparse system matrix, stored row-compressed together with its transpose,
/// so that both forward and back projections are row-parallel.
#[derive(Clone, Debug, PartialEq)]
pub struct SparseMatrix {
    rows: Compressed,
    columns: Compressed,
}

impl SparseMatrix {

    /// Build from coordinate (triplet) form. Duplicate entries are summed.
    pub fn from_triplets(
        n_bins  : usize,
        n_pixels: usize,
        rows    : &[Index1],
        columns : &[Index1],
        weights : &[Weight],
    ) -> Result<Self, MatrixError> {
        if rows.len() != columns.len() || rows.len() != weights.len() {
            return Err(MatrixError::LengthMismatch {
                rows: rows.len(), columns: columns.len(), weights: weights.len()
            })
        }
        for ((&i, &j), &w) in rows.iter().zip(columns).zip(weights) {
            check_element(i, j, w, n_bins, n_pixels)?;
        }

        // Stable sort keeps duplicates in input order, so their sum is
        // reproducible
        let mut order: Vec<usize> = (0..rows.len()).collect();
        order.sort_by_key(|&k| (rows[k], columns[k]));

        let mut offsets = vec![0; n_bins + 1];
        let mut elements: Vec<SystemMatrixElement> = Vec::with_capacity(order.len());
        let mut previous: Option<(Index1, Index1)> = None;
        for k in order {
            let (i, j, w) = (rows[k], columns[k], weights[k]);
            if previous == Some((i, j)) {
                if let Some(last) = elements.last_mut() { last.1 += w; }
            } else {
                elements.push((j, w));
                offsets[i + 1] += 1;
                previous = Some((i, j));
            }
        }
        for i in 0..n_bins { offsets[i + 1] += offsets[i]; }

        Ok(Self::from_rows(Compressed { n_inner: n_pixels, offsets, elements }))
    }

    /// Build from compressed-sparse-row arrays: the entries of row `i` are
    /// `columns[offsets[i]..offsets[i+1]]` and the matching `weights`.
    pub fn from_csr_parts(
        n_pixels: usize,
        offsets : Vec<usize>,
        columns : Vec<Index1>,
        weights : Vec<Weight>,
    ) -> Result<Self, MatrixError> {
        use MatrixError::MalformedOffsets;
        if columns.len() != weights.len() {
            return Err(MatrixError::LengthMismatch {
                rows: offsets.len().saturating_sub(1), columns: columns.len(), weights: weights.len()
            })
        }
        match (offsets.first(), offsets.last()) {
            (Some(0), Some(&end)) if end == columns.len() => {},
            _ => return Err(MalformedOffsets(format!(
                "offsets must start at 0 and end at {}", columns.len()))),
        }
        if offsets.windows(2).any(|w| w[0] > w[1]) {
            return Err(MalformedOffsets("offsets must not decrease".into()))
        }
        let n_bins = offsets.len() - 1;
        let mut rows = Vec::with_capacity(columns.len());
        for i in 0..n_bins {
            rows.extend(std::iter::repeat(i).take(offsets[i + 1] - offsets[i]));
        }
        // Go through the triplet path to get validation, sorting and merging
        // of duplicates within rows.
        Self::from_triplets(n_bins, n_pixels, &rows, &columns, &weights)
    }

    /// Build from a dense matrix, dropping zeros
    pub fn from_dense(dense: ArrayView2<Weight>) -> Result<Self, MatrixError> {
        let (n_bins, n_pixels) = dense.dim();
        let (mut rows, mut columns, mut weights) = (vec![], vec![], vec![]);
        for ((i, j), &w) in dense.indexed_iter() {
            if w != 0.0 {
                rows.push(i);
                columns.push(j);
                weights.push(w);
            }
        }
        Self::from_triplets(n_bins, n_pixels, &rows, &columns, &weights)
    }

    fn from_rows(rows: Compressed) -> Self {
        let columns = rows.transposed();
        Self { rows, columns }
    }

    pub fn to_dense(&self) -> Array2<Weight> {
        let mut dense = Array2::zeros((self.n_bins(), self.n_pixels()));
        for i in 0..self.n_bins() {
            for (j, w) in self.row(i) {
                dense[[i, j]] = w;
            }
        }
        dense
    }

    /// Number of stored elements
    pub fn nnz(&self) -> usize { self.rows.elements.len() }

    /// The non-zero `(pixel, weight)` pairs of one row
    pub fn row(&self, i: Index1) -> impl Iterator<Item = SystemMatrixElement> + '_ {
        self.rows.slice(i).iter().copied()
    }
}

impl SystemMatrix for SparseMatrix {

    fn n_bins  (&self) -> usize { self.rows.n_outer() }
    fn n_pixels(&self) -> usize { self.rows.n_inner }

    fn forward_project(&self, image: ArrayView1<Intensity>) -> Array1<Intensity> {
        self.rows.product(image)
    }

    fn back_project(&self, bins: ArrayView1<Intensity>) -> Array1<Intensity> {
        self.columns.product(bins)
    }

    fn select_rows(&self, rows: &[Index1]) -> Self {
        let mut offsets = Vec::with_capacity(rows.len() + 1);
        offsets.push(0);
        let mut elements = vec![];
        for &i in rows {
            elements.extend_from_slice(self.rows.slice(i));
            offsets.push(elements.len());
        }
        Self::from_rows(Compressed { n_inner: self.n_pixels(), offsets, elements })
    }
}

fn check_element(i: Index1, j: Index1, w: Weight, n_bins: usize, n_pixels: usize) -> Result<(), MatrixError> {
    if i >= n_bins   { return Err(MatrixError::RowOutOfRange    { index: i, n_bins   }) }
    if j >= n_pixels { return Err(MatrixError::ColumnOutOfRange { index: j, n_pixels }) }
    if !w.is_finite() || w < 0.0 {
        return Err(MatrixError::InvalidWeight { row: i, column: j, weight: w })
    }
    Ok(())
}

// ----- Dense implementation of the trait ----------------------------------------------

/// Dense matrices are mostly useful as a reference against which to check the
/// sparse implementation.
impl SystemMatrix for Array2<Weight> {

    fn n_bins  (&self) -> usize { self.nrows() }
    fn n_pixels(&self) -> usize { self.ncols() }

    fn forward_project(&self, image: ArrayView1<Intensity>) -> Array1<Intensity> {
        self.dot(&image)
    }

    fn back_project(&self, bins: ArrayView1<Intensity>) -> Array1<Intensity> {
        self.t().dot(&bins)
    }

    fn select_rows(&self, rows: &[Index1]) -> Self {
        self.select(Axis(0), rows)
    }
}

// ----- Errors -------------------------------------------------------------------------

#[derive(Error, Debug, Clone, PartialEq)]
pub enum MatrixError {

    #[error("triplet arrays differ in length: {rows} rows, {columns} columns, {weights} weights")]
    LengthMismatch { rows: usize, columns: usize, weights: usize },

    #[error("row index {index} out of range for {n_bins} bins")]
    RowOutOfRange { index: Index1, n_bins: usize },

    #[error("column index {index} out of range for {n_pixels} pixels")]
    ColumnOutOfRange { index: Index1, n_pixels: usize },

    #[error("invalid weight {weight} at ({row}, {column}): weights must be finite and non-negative")]
    InvalidWeight { row: Index1, column: Index1, weight: Weight },

    #[error("malformed CSR offsets: {0}")]
    MalformedOffsets(String),
}


// ----- Imports ------------------------------------------------------------------------------------------
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};
use thiserror::Error;

#[cfg(not(feature = "serial"))]
use rayon::prelude::*;

use crate::types::{Index1, Intensity, Weight};
