//! Flow-direction classification and thin-film rain routing
//!
//! When a face is too thin for the momentum solver, water moves by a
//! purely kinematic rule along the steepest bed descent. The classifier
//! labels each interior cell per axis; the face solver consults the labels
//! of both cells sharing a face.

use crate::domain::RasterDomain;
use crate::maybe_rayon::*;

/// Classify the routing direction along one axis.
///
/// `dz0` is the drop toward the positive index, `dz1` toward the negative
/// index, `max_dz` the steepest of the four cardinal drops. Labels:
/// `0` routes toward the positive index, `1` toward the negative index,
/// `-1` disables routing (no descent, or the descent is on the other
/// axis). A flat saddle where both candidates tie resolves to `0`.
#[inline]
pub(crate) fn classify(max_dz: f64, dz0: f64, dz1: f64) -> i8 {
    if max_dz > 0.0 {
        if max_dz == dz0 {
            0
        } else if max_dz == dz1 {
            1
        } else {
            -1
        }
    } else {
        -1
    }
}

/// Update the per-face routing labels from the bed elevation.
///
/// Runs whenever the bed changes; the halo ring keeps the disabled label.
pub fn update_flow_dirs(dom: &mut RasterDomain) {
    let (rows, cols) = dom.shape();
    let z = dom.z.as_slice();

    dom.dire
        .as_mut_slice()
        .par_chunks_mut(cols)
        .zip(dom.dirs.as_mut_slice().par_chunks_mut(cols))
        .enumerate()
        .for_each(|(r, (dire_row, dirs_row))| {
            if r == 0 || r >= rows - 1 {
                return;
            }
            for c in 1..cols - 1 {
                let i = r * cols + c;
                let z0 = z[i];
                let dz_e = z0 - z[i + 1];
                let dz_w = z0 - z[i - 1];
                let dz_s = z0 - z[i + cols];
                let dz_n = z0 - z[i - cols];
                let max_dz = dz_e.max(dz_w).max(dz_s).max(dz_n);
                dire_row[c] = classify(max_dz, dz_e, dz_w);
                dirs_row[c] = classify(max_dz, dz_s, dz_n);
            }
        });
}

/// Kinematic routing discharge across a face, in m^2/s.
///
/// Routes the surface difference `dh = clamp(wse_hi - wse_lo, 0, h_src)`
/// at the routing velocity, bounded so the source cell cannot export more
/// than `dh` within one step. Always non-negative; the caller applies the
/// sign convention.
#[inline]
pub(crate) fn rain_routing(
    h_src: f64,
    wse_hi: f64,
    wse_lo: f64,
    dt: f64,
    cell_len: f64,
    v_routing: f64,
) -> f64 {
    let dh = (wse_hi - wse_lo).clamp(0.0, h_src);
    let max_flow = cell_len * dh / dt;
    (dh * v_routing).min(max_flow)
}
