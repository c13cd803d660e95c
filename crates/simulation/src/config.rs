//! Simulation configuration
//!
//! Every option is validated before any kernel runs; out-of-range values
//! are rejected with `Error::InvalidParameter`.

use pluvio_core::{Error, Result};
use serde::{Deserialize, Serialize};

/// Numerical options of the surface-flow core.
///
/// Defaults follow the operational values of the reference urban-flooding
/// configuration.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Depth below which a cell is treated as dry by the CFL reduction (m)
    pub hmin: f64,
    /// Face flow depth below which the momentum solver is bypassed in
    /// favor of rain routing (m)
    pub hf_min: f64,
    /// Cap on the water-surface slope seen by the momentum solver (m/m)
    pub slmax: f64,
    /// Courant-Friedrichs-Lewy coefficient, in (0, 1]
    pub cfl: f64,
    /// Inertia weighting of the q-centered scheme, in [0, 1];
    /// 1 = pure local, 0 = pure neighbor-averaged
    pub theta: f64,
    /// Kinematic velocity for thin-film rain routing (m/s)
    pub vrouting: f64,
    /// Upper bound on the adaptive time step (s)
    pub dtmax: f64,
    /// Lower bound on the adaptive time step; falling below is fatal (s)
    pub dtmin: f64,
    /// Cadence of the infiltration update (s)
    pub dtinf: f64,
    /// Maximum tolerated |volume error| / |volume in|
    pub max_error: f64,
    /// Gravitational acceleration (m/s^2)
    pub g: f64,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            hmin: 0.005,
            hf_min: 0.005,
            slmax: 0.1,
            cfl: 0.7,
            theta: 0.9,
            vrouting: 0.1,
            dtmax: 5.0,
            dtmin: 1e-6,
            dtinf: 60.0,
            max_error: 0.05,
            g: 9.80665,
        }
    }
}

impl SimConfig {
    /// Check every option range.
    pub fn validate(&self) -> Result<()> {
        if !(self.cfl > 0.0 && self.cfl <= 1.0) {
            return Err(invalid("cfl", self.cfl, "must be in (0, 1]"));
        }
        if !(self.theta >= 0.0 && self.theta <= 1.0) {
            return Err(invalid("theta", self.theta, "must be in [0, 1]"));
        }
        if !(self.hmin >= 0.0 && self.hmin.is_finite()) {
            return Err(invalid("hmin", self.hmin, "must be non-negative and finite"));
        }
        if !(self.hf_min >= 0.0 && self.hf_min.is_finite()) {
            return Err(invalid("hf_min", self.hf_min, "must be non-negative and finite"));
        }
        if !(self.slmax > 0.0 && self.slmax.is_finite()) {
            return Err(invalid("slmax", self.slmax, "must be positive and finite"));
        }
        if !(self.vrouting >= 0.0 && self.vrouting.is_finite()) {
            return Err(invalid("vrouting", self.vrouting, "must be non-negative and finite"));
        }
        if !(self.dtmax > 0.0 && self.dtmax.is_finite()) {
            return Err(invalid("dtmax", self.dtmax, "must be positive and finite"));
        }
        if !(self.dtmin > 0.0 && self.dtmin < self.dtmax) {
            return Err(invalid("dtmin", self.dtmin, "must be positive and below dtmax"));
        }
        if !(self.dtinf > 0.0 && self.dtinf.is_finite()) {
            return Err(invalid("dtinf", self.dtinf, "must be positive and finite"));
        }
        if !(self.max_error > 0.0 && self.max_error.is_finite()) {
            return Err(invalid("max_error", self.max_error, "must be positive and finite"));
        }
        if !(self.g > 0.0 && self.g.is_finite()) {
            return Err(invalid("g", self.g, "must be positive and finite"));
        }
        Ok(())
    }
}

fn invalid(name: &'static str, value: f64, reason: &str) -> Error {
    Error::InvalidParameter {
        name,
        value: format!("{value}"),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(SimConfig::default().validate().is_ok());
    }

    #[test]
    fn test_rejects_out_of_range() {
        let mut cfg = SimConfig::default();
        cfg.cfl = 0.0;
        assert!(cfg.validate().is_err());

        let mut cfg = SimConfig::default();
        cfg.cfl = 1.5;
        assert!(cfg.validate().is_err());

        let mut cfg = SimConfig::default();
        cfg.theta = -0.1;
        assert!(cfg.validate().is_err());

        let mut cfg = SimConfig::default();
        cfg.theta = 1.1;
        assert!(cfg.validate().is_err());

        let mut cfg = SimConfig::default();
        cfg.dtmin = 10.0; // above dtmax
        assert!(cfg.validate().is_err());

        let mut cfg = SimConfig::default();
        cfg.g = f64::NAN;
        assert!(cfg.validate().is_err());
    }
}
