//! Hydrologic source kernel
//!
//! Combines rainfall, infiltration and user losses into the effective
//! precipitation rate fed to the continuity update. Element-wise over
//! interior cells, parallel over rows.

use crate::domain::RasterDomain;
use crate::maybe_rayon::*;

/// Cap the user losses and derive the effective precipitation rate.
///
/// `losses_capped = min(losses, max(h/dt + rain - inf, 0))` so one step
/// can never remove more water than the cell holds and a stale
/// infiltration rate cannot push the applied losses negative, then
/// `eff_precip = max(-h/dt, rain - inf - losses_capped)`. The floor at
/// `-h/dt` exactly empties the cell.
pub fn apply_hydrology(dom: &mut RasterDomain, dt: f64) {
    let (rows, cols) = dom.shape();
    let h = dom.h.as_slice();
    let rain = dom.rain.as_slice();
    let inf = dom.inf.as_slice();
    let losses = dom.losses.as_slice();

    dom.losses_capped
        .as_mut_slice()
        .par_chunks_mut(cols)
        .zip(dom.eff_precip.as_mut_slice().par_chunks_mut(cols))
        .enumerate()
        .for_each(|(r, (capped_row, eff_row))| {
            if r == 0 || r >= rows - 1 {
                return;
            }
            for c in 1..cols - 1 {
                let i = r * cols + c;
                let available = (h[i] / dt + rain[i] - inf[i]).max(0.0);
                let capped = losses[i].min(available);
                capped_row[c] = capped;
                eff_row[c] = (rain[i] - inf[i] - capped).max(-h[i] / dt);
            }
        });
}

/// Combine effective precipitation, user inflow and the drainage exchange
/// into the total external source rate.
pub fn update_ext(dom: &mut RasterDomain) {
    let (rows, cols) = dom.shape();
    let eff_precip = dom.eff_precip.as_slice();
    let inflow = dom.inflow.as_slice();
    let ndrain = dom.ndrain.as_slice();

    dom.ext
        .as_mut_slice()
        .par_chunks_mut(cols)
        .enumerate()
        .for_each(|(r, ext_row)| {
            if r == 0 || r >= rows - 1 {
                return;
            }
            for c in 1..cols - 1 {
                let i = r * cols + c;
                ext_row[c] = eff_precip[i] + inflow[i] + ndrain[i];
            }
        });
}
