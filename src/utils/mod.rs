//! contains utils used to load run inputs and parameters

pub mod files;
pub mod parameters;

pub use files::*;
pub use parameters::*;
