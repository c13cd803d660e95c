//! # Pluvio Simulation
//!
//! Numerical core of the pluvio 2D surface-water flow simulator.
//!
//! The core advances a regular-grid finite-volume discretization of the
//! local-inertia shallow-water equations coupled with hydrologic sources
//! (rainfall, infiltration, user losses) and kinematic rain routing for
//! thin films.
//!
//! ## Kernel sequence of one sub-step
//!
//! 1. **hydrology**: capped losses and effective precipitation
//! 2. **infiltration**: user-fixed or Green-Ampt rate, on the `dtinf` cadence
//! 3. **routing**: per-face flow-direction labels for thin-film routing
//! 4. **flow**: unit discharges on east/south faces (Almeida 2013 scheme,
//!    Bates 2010 fallback, rain routing below the `hf_min` threshold)
//! 5. **depth**: continuity update, fixed-level boundary cells, clamp
//!    accounting, velocity and Froude derivation
//! 6. **timestep**: adaptive CFL time-step selection
//!
//! The [`Simulation`](simulation::Simulation) driver orchestrates the
//! sequence and carries the record-interval mass accounting. All kernels
//! are data-parallel over rows; disable the default `parallel` feature for
//! a single-threaded build.

pub mod config;
pub mod depth;
pub mod domain;
pub mod fields;
pub mod flow;
pub mod hydrology;
pub mod infiltration;
pub mod massbal;
mod maybe_rayon;
pub mod routing;
pub mod simulation;
pub mod timestep;

pub use config::SimConfig;
pub use domain::RasterDomain;
pub use infiltration::{GreenAmpt, Infiltration, NoInfiltration, UserFixed};
pub use simulation::{RecordSummary, Simulation, StepReport};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::config::SimConfig;
    pub use crate::domain::RasterDomain;
    pub use crate::fields::FieldKey;
    pub use crate::infiltration::{GreenAmpt, Infiltration, NoInfiltration, UserFixed};
    pub use crate::simulation::{RecordSummary, Simulation, StepReport};
    pub use pluvio_core::prelude::*;
}
