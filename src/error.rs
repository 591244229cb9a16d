//! Reasons for which a reconstruction can refuse to start

use thiserror::Error;

pub type ReconResult<T> = Result<T, ReconError>;

/// Conditions detected before the first iteration. Once iterating has begun,
/// a reconstruction always runs to completion: numerically degenerate values
/// are clamped, not reported.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReconError {

    /// The system matrix has no rows or no columns
    #[error("system matrix is empty: {n_bins} bins x {n_pixels} pixels")]
    EmptyMatrix { n_bins: usize, n_pixels: usize },

    /// Measured data do not match the number of sinogram bins
    #[error("measured data has {actual} bins, system matrix has {expected}")]
    MeasuredLength { expected: usize, actual: usize },

    /// Initial image does not match the number of pixels
    #[error("initial image has {actual} pixels, system matrix has {expected}")]
    InitialImageSize { expected: usize, actual: usize },

    #[error("number of OSEM subsets must be positive")]
    ZeroSubsets,

    /// Subsets must all contain the same number of bins
    #[error("{n_bins} bins cannot be split evenly into {subsets} subsets")]
    IndivisibleSubsets { n_bins: usize, subsets: usize },
}
