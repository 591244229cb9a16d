pub use crate::types::{Intensity, Weight, Ratio, Index1, Index2, DEFAULT_EPSILON};
pub use crate::error::{ReconError, ReconResult};
pub use crate::image::{Image, ImageData, ImageLayout, SinogramLayout};
pub use crate::system_matrix::{SystemMatrix, SparseMatrix, MatrixError};
pub use crate::mlem::{run_em, EmSettings, EmReconstruction};
pub use crate::osem::{run_osem, OsemSettings, OsemReconstruction};
pub use crate::progress::{Observer, Progress, Step, Silent};
