//! Statistical image reconstruction for emission tomography: ML-EM and OSEM
//! over a sparse system matrix, with the synthetic-problem, I/O and
//! figure-of-merit support needed to drive them.

mod exports;
pub use exports::*;

pub mod types;
pub mod error;
pub mod image;
pub mod system_matrix;
pub mod projector;
pub mod mlem;
pub mod osem;
pub mod progress;
pub mod fom;
pub mod config;
pub mod io;
pub mod geometry;
pub mod phantom;
pub mod utils;
