pub mod raw;
pub mod problem;
