//! Simulation driver
//!
//! Owns the raster domain and the configuration, orchestrates the kernel
//! sequence of every sub-step and carries the record-interval volume
//! budget. External collaborators drive it through `advance` and the
//! name-based field exchange.

use std::sync::atomic::{AtomicBool, Ordering};

use ndarray::ArrayView2;
use pluvio_core::{Error, GridGeometry, Result};
use tracing::{debug, trace};

use crate::config::SimConfig;
use crate::depth;
use crate::domain::RasterDomain;
use crate::fields::FieldKey;
use crate::flow;
use crate::hydrology;
use crate::infiltration::{Infiltration, NoInfiltration};
use crate::massbal::{MassBudget, StepVolumes};
use crate::routing;
use crate::timestep;

/// Aggregate of the sub-steps taken by one `advance` call.
#[derive(Debug, Clone, Copy)]
pub struct StepReport {
    /// Number of sub-steps taken
    pub steps: usize,
    /// Smallest sub-step length (s)
    pub dt_min: f64,
    /// Mean sub-step length (s)
    pub dt_mean: f64,
    /// Largest sub-step length (s)
    pub dt_max: f64,
    /// Cumulative |volume error| / |volume in| since the simulation start
    pub continuity_error: f64,
}

/// Interval means published at a record boundary.
#[derive(Debug, Clone, Copy)]
pub struct RecordSummary {
    /// Length of the record interval (s)
    pub interval: f64,
    /// Mean rainfall inflow (m^3/s)
    pub rain_rate: f64,
    /// Mean user inflow (m^3/s)
    pub inflow_rate: f64,
    /// Mean infiltration outflow (m^3/s)
    pub infiltration_rate: f64,
    /// Mean capped-losses outflow (m^3/s)
    pub losses_rate: f64,
    /// Mean drainage exchange (m^3/s, signed)
    pub drainage_rate: f64,
    /// Mean flow across the domain boundary (m^3/s, signed, positive in)
    pub boundary_rate: f64,
    /// Volume added by fixed-level cells over the interval (m^3, signed)
    pub hfix_vol: f64,
    /// Volume created by the negative-depth clamp over the interval (m^3)
    pub herr_vol: f64,
}

/// The surface-flow simulation core.
pub struct Simulation {
    domain: RasterDomain,
    config: SimConfig,
    infiltration: Box<dyn Infiltration>,
    time: f64,
    /// Proposed length of the next sub-step
    dt: f64,
    last_inf_time: Option<f64>,
    budget: MassBudget,
    cancelled: AtomicBool,
}

impl Simulation {
    /// Allocate a simulation over a `rows x cols` grid (halo included).
    pub fn new(rows: usize, cols: usize, geometry: GridGeometry, config: SimConfig) -> Result<Self> {
        config.validate()?;
        let domain = RasterDomain::new(rows, cols, geometry)?;
        Ok(Self {
            domain,
            dt: config.dtmax,
            config,
            infiltration: Box::new(NoInfiltration),
            time: 0.0,
            last_inf_time: None,
            budget: MassBudget::default(),
            cancelled: AtomicBool::new(false),
        })
    }

    /// Replace the configuration; rejected before any kernel runs if an
    /// option is out of range.
    pub fn configure(&mut self, config: SimConfig) -> Result<()> {
        config.validate()?;
        self.config = config;
        Ok(())
    }

    /// Current configuration
    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// Select the infiltration model.
    pub fn set_infiltration<I: Infiltration + 'static>(&mut self, model: I) {
        self.infiltration = Box::new(model);
        self.last_inf_time = None;
    }

    /// Simulation clock (s)
    pub fn time(&self) -> f64 {
        self.time
    }

    /// Length proposed for the next sub-step (s)
    pub fn proposed_dt(&self) -> f64 {
        self.dt
    }

    /// Water volume currently stored in the interior (m^3)
    pub fn water_volume(&self) -> f64 {
        self.domain.water_volume()
    }

    /// The underlying raster domain
    pub fn domain(&self) -> &RasterDomain {
        &self.domain
    }

    /// Mutable access to the raster domain, for coupling collaborators
    pub fn domain_mut(&mut self) -> &mut RasterDomain {
        &mut self.domain
    }

    /// Read-only view of a field by name.
    pub fn get_field(&self, name: &str) -> Result<ArrayView2<'_, f64>> {
        let key: FieldKey = name.parse()?;
        Ok(self.domain.field(key))
    }

    /// Overwrite a writable field by name; the array must match the grid.
    pub fn set_field(&mut self, name: &str, values: ArrayView2<'_, f64>) -> Result<()> {
        let key: FieldKey = name.parse()?;
        self.domain.set_field(key, values)
    }

    /// Request cooperative cancellation; observed between sub-steps.
    pub fn request_cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    /// Whether a cancellation request is pending
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }

    /// Run sub-steps until the simulation clock reaches `until`.
    ///
    /// The last sub-step is clipped to land exactly on `until` (record
    /// alignment). A pending cancellation stops the loop cleanly between
    /// sub-steps.
    pub fn advance(&mut self, until: f64) -> Result<StepReport> {
        // inputs may have changed through set_field since the last call
        self.dt = timestep::cfl_dt(&self.domain, &self.config)?;

        let mut steps = 0usize;
        let mut dt_min = f64::INFINITY;
        let mut dt_max = 0.0f64;
        let mut dt_sum = 0.0;

        while self.time < until {
            if self.is_cancelled() {
                debug!(t = self.time, "cancellation observed, leaving step loop");
                break;
            }
            let remaining = until - self.time;
            let clipped = remaining <= self.dt;
            let dt = if clipped { remaining } else { self.dt };

            self.step(dt)?;
            if clipped {
                // snap to the record boundary to keep the clock exact
                self.time = until;
            }

            steps += 1;
            dt_min = dt_min.min(dt);
            dt_max = dt_max.max(dt);
            dt_sum += dt;
        }

        debug!(steps, t = self.time, "advance complete");
        Ok(StepReport {
            steps,
            dt_min: if steps == 0 { 0.0 } else { dt_min },
            dt_mean: if steps == 0 { 0.0 } else { dt_sum / steps as f64 },
            dt_max,
            continuity_error: self.budget.relative_error(),
        })
    }

    /// Advance the state by exactly one sub-step of length `dt`.
    ///
    /// Kernel order: infiltration (on its cadence), hydrology, source
    /// combination, routing labels, face flows, buffer swap, depth and
    /// velocity update, budget, next-step proposal, error bound.
    pub fn step(&mut self, dt: f64) -> Result<()> {
        if !(dt > 0.0 && dt.is_finite()) {
            return Err(Error::InvalidParameter {
                name: "dt",
                value: format!("{dt}"),
                reason: "step length must be positive and finite".to_string(),
            });
        }

        if !self.budget.is_seeded() {
            // water loaded before the first step counts as input for the
            // continuity-error normalization
            self.budget.seed_initial(self.domain.water_volume());
        }

        // infiltration runs on the slower dtinf cadence; the rate field
        // is reused in between
        let inf_due = match self.last_inf_time {
            None => true,
            Some(t0) => self.time - t0 >= self.config.dtinf,
        };
        if inf_due {
            let span = match self.last_inf_time {
                None => dt,
                Some(t0) => (self.time - t0).max(dt),
            };
            self.infiltration.update(&mut self.domain, span);
            self.last_inf_time = Some(self.time);
        }

        hydrology::apply_hydrology(&mut self.domain, dt);
        hydrology::update_ext(&mut self.domain);

        if self.domain.flow_dir_dirty {
            routing::update_flow_dirs(&mut self.domain);
            self.domain.flow_dir_dirty = false;
        }

        flow::solve_face_flows(&mut self.domain, &self.config, dt);
        self.domain.swap_flows();

        let stats = depth::update_depth(&mut self.domain, dt);
        depth::update_velocity(&mut self.domain, &self.config);

        let area = self.domain.cell_surface();
        let volumes = StepVolumes {
            rain: self.domain.rain.interior_sum() * area * dt,
            inflow: self.domain.inflow.interior_sum() * area * dt,
            infiltration: self.domain.inf.interior_sum() * area * dt,
            losses: self.domain.losses_capped.interior_sum() * area * dt,
            drainage: self.domain.ndrain.interior_sum() * area * dt,
            boundary: self.domain.boundary_discharge() * dt,
            hfix: stats.hfix_depth * area,
            herr: stats.herr_depth * area,
        };
        self.budget.accumulate(&volumes, dt);

        self.time += dt;
        self.dt = timestep::cfl_dt(&self.domain, &self.config)?;

        let relative = self.budget.relative_error();
        if relative > self.config.max_error {
            return Err(Error::MassBalanceExceeded {
                relative,
                limit: self.config.max_error,
            });
        }

        trace!(t = self.time, dt, dt_next = self.dt, "sub-step complete");
        Ok(())
    }

    /// Publish the record-interval accumulators and reset them.
    pub fn record_summary(&mut self) -> RecordSummary {
        let (rain, inflow, inf, losses, drainage, boundary, hfix, herr) =
            self.budget.interval_volumes();
        let interval = self.budget.interval();
        let rate = |vol: f64| if interval > 0.0 { vol / interval } else { 0.0 };

        let summary = RecordSummary {
            interval,
            rain_rate: rate(rain),
            inflow_rate: rate(inflow),
            infiltration_rate: rate(inf),
            losses_rate: rate(losses),
            drainage_rate: rate(drainage),
            boundary_rate: rate(boundary),
            hfix_vol: hfix,
            herr_vol: herr,
        };
        self.budget.reset_interval();
        self.domain.reset_accumulators();
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    fn simulation(rows: usize, cols: usize) -> Simulation {
        Simulation::new(rows, cols, GridGeometry::new(1.0, 1.0), SimConfig::default()).unwrap()
    }

    #[test]
    fn test_new_rejects_bad_config() {
        let cfg = SimConfig {
            cfl: 2.0,
            ..SimConfig::default()
        };
        assert!(Simulation::new(5, 5, GridGeometry::new(1.0, 1.0), cfg).is_err());
    }

    #[test]
    fn test_set_field_roundtrip() {
        let mut sim = simulation(5, 5);
        let mut z = Array2::<f64>::zeros((5, 5));
        z[[2, 2]] = 3.0;
        sim.set_field("z", z.view()).unwrap();
        assert_eq!(sim.get_field("z").unwrap()[[2, 2]], 3.0);
        assert!(sim.get_field("nope").is_err());
        assert!(sim
            .set_field("hmax", Array2::<f64>::zeros((5, 5)).view())
            .is_err());
    }

    #[test]
    fn test_advance_reaches_target_time() {
        let mut sim = simulation(6, 6);
        let report = sim.advance(12.5).unwrap();
        assert_eq!(sim.time(), 12.5);
        // dry grid: every step at dtmax except the clipped last one
        assert_eq!(report.steps, 3);
        assert!((report.dt_max - 5.0).abs() < 1e-12);
        assert!((report.dt_min - 2.5).abs() < 1e-12);
    }

    #[test]
    fn test_advance_zero_span_takes_no_step() {
        let mut sim = simulation(5, 5);
        let report = sim.advance(0.0).unwrap();
        assert_eq!(report.steps, 0);
        assert_eq!(report.dt_mean, 0.0);
    }

    #[test]
    fn test_cancellation_stops_between_steps() {
        let mut sim = simulation(5, 5);
        sim.request_cancel();
        let report = sim.advance(100.0).unwrap();
        assert_eq!(report.steps, 0);
        assert!(sim.time() < 100.0);
    }

    #[test]
    fn test_step_rejects_bad_dt() {
        let mut sim = simulation(5, 5);
        assert!(sim.step(0.0).is_err());
        assert!(sim.step(-1.0).is_err());
        assert!(sim.step(f64::NAN).is_err());
    }

    #[test]
    fn test_infiltration_cadence_reuses_rate() {
        use crate::infiltration::UserFixed;

        let cfg = SimConfig {
            dtinf: 100.0,
            dtmax: 1.0,
            ..SimConfig::default()
        };
        let mut sim = Simulation::new(5, 5, GridGeometry::new(1.0, 1.0), cfg).unwrap();
        let h = Array2::<f64>::from_elem((5, 5), 0.1);
        sim.set_field("h", h.view()).unwrap();
        let rate = Array2::<f64>::from_elem((5, 5), 1e-6);
        sim.set_field("inf_user", rate.view()).unwrap();
        sim.set_infiltration(UserFixed);

        sim.step(1.0).unwrap();
        assert!((sim.get_field("inf").unwrap()[[2, 2]] - 1e-6).abs() < 1e-18);

        // a changed request is not picked up before the cadence elapses
        let rate = Array2::<f64>::from_elem((5, 5), 5e-6);
        sim.set_field("inf_user", rate.view()).unwrap();
        sim.step(1.0).unwrap();
        assert!((sim.get_field("inf").unwrap()[[2, 2]] - 1e-6).abs() < 1e-18);
    }

    #[test]
    fn test_record_summary_resets_interval() {
        let mut sim = simulation(6, 6);
        let rain = Array2::<f64>::from_elem((6, 6), 1e-5);
        sim.set_field("rain", rain.view()).unwrap();
        sim.advance(10.0).unwrap();

        let summary = sim.record_summary();
        assert!((summary.interval - 10.0).abs() < 1e-12);
        // 16 interior cells of 1 m^2 each
        assert!((summary.rain_rate - 1e-5 * 16.0).abs() < 1e-12);

        let summary = sim.record_summary();
        assert_eq!(summary.interval, 0.0);
        assert_eq!(summary.rain_rate, 0.0);
    }
}
