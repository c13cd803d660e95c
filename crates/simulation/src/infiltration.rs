//! Infiltration kernels
//!
//! Two interchangeable models produce the applied infiltration rate,
//! each capped by `h/dt` so a cell never loses more water than it holds.
//! The driver runs them on the slower `dtinf` cadence and reuses the rate
//! field in between; the effective-precipitation floor guards against the
//! rate going stale while the depth shrinks.

use crate::domain::{RasterDomain, INF_AMOUNT_INIT};
use crate::maybe_rayon::*;

/// Seam between the driver and the infiltration variants.
pub trait Infiltration: Send + Sync {
    /// Model name for diagnostics
    fn name(&self) -> &'static str;

    /// Recompute the applied infiltration rate field.
    ///
    /// `dt` is the time elapsed since the previous infiltration update,
    /// not the sub-step length.
    fn update(&self, dom: &mut RasterDomain, dt: f64);
}

/// No infiltration; the rate field stays zero.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoInfiltration;

impl Infiltration for NoInfiltration {
    fn name(&self) -> &'static str {
        "none"
    }

    fn update(&self, dom: &mut RasterDomain, _dt: f64) {
        dom.inf.fill(0.0);
    }
}

/// User-supplied rate field, capped by the available depth:
/// `inf = min(h/dt, inf_user)`.
#[derive(Debug, Clone, Copy, Default)]
pub struct UserFixed;

impl Infiltration for UserFixed {
    fn name(&self) -> &'static str {
        "user-fixed"
    }

    fn update(&self, dom: &mut RasterDomain, dt: f64) {
        let (rows, cols) = dom.shape();
        let h = dom.h.as_slice();
        let inf_user = dom.inf_user.as_slice();

        dom.inf
            .as_mut_slice()
            .par_chunks_mut(cols)
            .enumerate()
            .for_each(|(r, inf_row)| {
                if r == 0 || r >= rows - 1 {
                    return;
                }
                for c in 1..cols - 1 {
                    let i = r * cols + c;
                    inf_row[c] = inf_user[i].min(h[i] / dt);
                }
            });
    }
}

/// Green-Ampt infiltration with wetting-front capillary pressure and
/// cumulative infiltration depth.
///
/// The uncapped rate is `K * (1 + dtheta * (psi + h) / F)` with
/// `dtheta = max(eff_por - water_soil_content, 0)` and `F` the cumulative
/// infiltration depth, which grows by `inf * dt` on every update.
#[derive(Debug, Clone, Copy, Default)]
pub struct GreenAmpt;

impl Infiltration for GreenAmpt {
    fn name(&self) -> &'static str {
        "green-ampt"
    }

    fn update(&self, dom: &mut RasterDomain, dt: f64) {
        let (rows, cols) = dom.shape();
        let h = dom.h.as_slice();
        let eff_por = dom.eff_por.as_slice();
        let pressure = dom.pressure.as_slice();
        let conduct = dom.conduct.as_slice();
        let water_soil_content = dom.water_soil_content.as_slice();

        dom.inf
            .as_mut_slice()
            .par_chunks_mut(cols)
            .zip(dom.inf_amount.as_mut_slice().par_chunks_mut(cols))
            .enumerate()
            .for_each(|(r, (inf_row, amount_row))| {
                if r == 0 || r >= rows - 1 {
                    return;
                }
                for c in 1..cols - 1 {
                    let i = r * cols + c;
                    let avail_por = (eff_por[i] - water_soil_content[i]).max(0.0);
                    // the cumulative depth is initialized positive; the
                    // floor keeps the front term finite if a caller
                    // zeroed it through set_field
                    let f = amount_row[c].max(INF_AMOUNT_INIT);
                    let rate = conduct[i] * (1.0 + avail_por * (pressure[i] + h[i]) / f);
                    let capped = rate.min(h[i] / dt);
                    inf_row[c] = capped;
                    amount_row[c] = f + capped * dt;
                }
            });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pluvio_core::GridGeometry;

    fn domain() -> RasterDomain {
        RasterDomain::new(3, 3, GridGeometry::new(1.0, 1.0)).unwrap()
    }

    #[test]
    fn test_user_fixed_caps_at_available_depth() {
        let mut dom = domain();
        dom.h.set(1, 1, 0.01).unwrap();
        dom.inf_user.set(1, 1, 1.0).unwrap();
        UserFixed.update(&mut dom, 2.0);
        assert!((dom.inf.get(1, 1).unwrap() - 0.005).abs() < 1e-15);

        dom.inf_user.set(1, 1, 1e-6).unwrap();
        UserFixed.update(&mut dom, 2.0);
        assert_eq!(dom.inf.get(1, 1).unwrap(), 1e-6);
    }

    #[test]
    fn test_green_ampt_rate_decreases_as_front_advances() {
        let mut dom = domain();
        dom.h.fill(0.05);
        dom.eff_por.fill(0.4);
        dom.water_soil_content.fill(0.1);
        dom.pressure.fill(0.2);
        dom.conduct.fill(1e-6);

        let mut last_rate = f64::INFINITY;
        let mut last_amount = 0.0;
        for _ in 0..5 {
            GreenAmpt.update(&mut dom, 10.0);
            let rate = dom.inf.get(1, 1).unwrap();
            let amount = dom.inf_amount.get(1, 1).unwrap();
            assert!(rate > 0.0);
            assert!(rate < last_rate, "rate must strictly decrease");
            assert!(amount > last_amount, "cumulative depth must grow");
            assert!(rate <= 0.05 / 10.0 + 1e-15);
            last_rate = rate;
            last_amount = amount;
        }
    }

    #[test]
    fn test_green_ampt_dry_cell_infiltrates_nothing() {
        let mut dom = domain();
        dom.eff_por.fill(0.4);
        dom.pressure.fill(0.2);
        dom.conduct.fill(1e-5);
        GreenAmpt.update(&mut dom, 1.0);
        assert_eq!(dom.inf.get(1, 1).unwrap(), 0.0);
    }

    #[test]
    fn test_no_infiltration_clears_field() {
        let mut dom = domain();
        dom.inf.fill(3.0);
        NoInfiltration.update(&mut dom, 1.0);
        assert_eq!(dom.inf.get(1, 1).unwrap(), 0.0);
    }
}
