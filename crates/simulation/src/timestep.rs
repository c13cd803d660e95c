//! Adaptive time-step selection
//!
//! Proposes the next step from the grid celerity under a CFL constraint.
//! This is the only global reduction in the core; per-row minima are
//! folded in index order so the result does not depend on the thread
//! schedule.

use crate::config::SimConfig;
use crate::domain::RasterDomain;
use crate::maybe_rayon::*;
use pluvio_core::{Error, Result};

/// Propose the next time step:
/// `dt = min(dtmax, cfl * min(dx, dy) / sqrt(g * h))` over every interior
/// cell wetter than `hmin`. With no wet cell the proposal is `dtmax`.
///
/// Returns `Error::CflCollapse` when the proposal falls below the
/// configured `dtmin` floor.
pub fn cfl_dt(dom: &RasterDomain, cfg: &SimConfig) -> Result<f64> {
    let (rows, cols) = dom.shape();
    let spacing = dom.geometry().min_spacing();
    let h = dom.h.as_slice();
    let g = cfg.g;
    let hmin = cfg.hmin;

    let row_minima: Vec<f64> = (1..rows - 1)
        .into_par_iter()
        .map(|r| {
            let mut min_t = f64::INFINITY;
            for c in 1..cols - 1 {
                let depth = h[r * cols + c];
                if depth > hmin {
                    let t = spacing / (g * depth).sqrt();
                    if t < min_t {
                        min_t = t;
                    }
                }
            }
            min_t
        })
        .collect();

    let min_t = row_minima.into_iter().fold(f64::INFINITY, f64::min);
    let dt = if min_t.is_finite() {
        (cfg.cfl * min_t).min(cfg.dtmax)
    } else {
        cfg.dtmax
    };

    if dt < cfg.dtmin {
        return Err(Error::CflCollapse {
            dt,
            floor: cfg.dtmin,
        });
    }
    Ok(dt)
}
