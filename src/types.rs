pub type Intensity = f64;
pub type Weight    = f64;
pub type Ratio     = f64;

/// Flat (1-d) index into an image or a sinogram
pub type Index1 = usize;
/// `[row, column]` index into a 2-d image
pub type Index2 = [usize; 2];

/// Numerical floor applied to divisors (sensitivities and forward
/// projections) and to the total mass before renormalization.
pub const DEFAULT_EPSILON: Ratio = 1e-11;
