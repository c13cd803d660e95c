//! # Pluvio Core
//!
//! Grid substrate for the pluvio surface-water flow simulator.
//!
//! This crate provides:
//! - `Raster<T>`: generic 2D grid type backing every simulation field
//! - `GridGeometry`: cell spacing and placement of the simulation grid
//! - The workspace-wide error type and `Result` alias

pub mod error;
pub mod raster;

pub use error::{Error, Result};
pub use raster::{GridGeometry, Raster, RasterElement};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::raster::{GridGeometry, Raster, RasterElement};
}
