//! Mass-balance bookkeeping
//!
//! Scalar volume budget of the driver loop. Per-step volumes accumulate
//! over the current record interval and into the simulation-wide totals
//! that feed the continuity-error bound. All volumes in m^3.

/// Volumes exchanged during one sub-step.
#[derive(Debug, Clone, Copy, Default)]
pub struct StepVolumes {
    /// Rainfall over the interior
    pub rain: f64,
    /// User inflow over the interior
    pub inflow: f64,
    /// Infiltration out of the interior
    pub infiltration: f64,
    /// Capped user losses out of the interior
    pub losses: f64,
    /// Drainage-network exchange (signed)
    pub drainage: f64,
    /// Net inflow across the domain boundary (signed)
    pub boundary: f64,
    /// Water added by fixed-level cells (signed)
    pub hfix: f64,
    /// Water created by the negative-depth clamp
    pub herr: f64,
}

/// Running budget across the step loop.
#[derive(Debug, Clone, Default)]
pub struct MassBudget {
    // record-interval accumulators
    rain_vol: f64,
    inflow_vol: f64,
    inf_vol: f64,
    losses_vol: f64,
    drainage_vol: f64,
    boundary_vol: f64,
    hfix_vol: f64,
    herr_vol: f64,
    interval: f64,

    // simulation-wide totals for the error bound
    total_err_vol: f64,
    total_in_vol: f64,
    seeded: bool,
}

impl MassBudget {
    /// Seed the input total with the water volume already stored in the
    /// domain, so the relative error stays meaningful in closed basins.
    /// Only the first call takes effect; the driver seeds on its first
    /// sub-step, after the initial state has been loaded.
    pub fn seed_initial(&mut self, initial_volume: f64) {
        if !self.seeded {
            self.total_in_vol += initial_volume.max(0.0);
            self.seeded = true;
        }
    }

    /// Whether the initial domain volume has been folded in
    pub fn is_seeded(&self) -> bool {
        self.seeded
    }

    /// Fold the volumes of one sub-step of length `dt` into the budget.
    pub fn accumulate(&mut self, step: &StepVolumes, dt: f64) {
        self.rain_vol += step.rain;
        self.inflow_vol += step.inflow;
        self.inf_vol += step.infiltration;
        self.losses_vol += step.losses;
        self.drainage_vol += step.drainage;
        self.boundary_vol += step.boundary;
        self.hfix_vol += step.hfix;
        self.herr_vol += step.herr;
        self.interval += dt;

        self.total_err_vol += step.herr;
        self.total_in_vol += step.rain.max(0.0)
            + step.inflow.max(0.0)
            + step.drainage.max(0.0)
            + step.boundary.max(0.0)
            + step.hfix.max(0.0);
    }

    /// Cumulative |volume error| / |volume in| since the start of the
    /// simulation. Zero until any water has entered the domain.
    pub fn relative_error(&self) -> f64 {
        if self.total_in_vol > 0.0 {
            self.total_err_vol.abs() / self.total_in_vol
        } else if self.total_err_vol.abs() > 0.0 {
            f64::INFINITY
        } else {
            0.0
        }
    }

    /// Seconds accumulated in the current record interval
    pub fn interval(&self) -> f64 {
        self.interval
    }

    /// Interval volumes as
    /// (rain, inflow, infiltration, losses, drainage, boundary, hfix, herr)
    #[allow(clippy::type_complexity)]
    pub fn interval_volumes(&self) -> (f64, f64, f64, f64, f64, f64, f64, f64) {
        (
            self.rain_vol,
            self.inflow_vol,
            self.inf_vol,
            self.losses_vol,
            self.drainage_vol,
            self.boundary_vol,
            self.hfix_vol,
            self.herr_vol,
        )
    }

    /// Zero the record-interval accumulators; the simulation-wide error
    /// totals keep running.
    pub fn reset_interval(&mut self) {
        self.rain_vol = 0.0;
        self.inflow_vol = 0.0;
        self.inf_vol = 0.0;
        self.losses_vol = 0.0;
        self.drainage_vol = 0.0;
        self.boundary_vol = 0.0;
        self.hfix_vol = 0.0;
        self.herr_vol = 0.0;
        self.interval = 0.0;
    }
}
