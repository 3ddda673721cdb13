//! Lecture des images Intel HEX du PIC18F

pub mod loader;
pub mod validation;

pub use loader::*;
pub use validation::*;
