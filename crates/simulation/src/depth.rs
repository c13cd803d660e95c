//! Depth solver
//!
//! Integrates continuity on every interior cell, enforces fixed-level
//! boundary cells, clamps negative depths into the error accumulator and
//! derives the cell-centered velocity, direction and Froude fields.

use crate::config::SimConfig;
use crate::domain::{RasterDomain, BC_FIXED_DEPTH};
use crate::maybe_rayon::*;

/// Divisor floor of the branchless face-velocity computation.
const DIV_EPS: f64 = 1e-12;

/// Water volumes moved outside the continuity budget during one step,
/// in metres of depth summed over the interior (multiply by the cell
/// surface for m^3).
#[derive(Debug, Clone, Copy, Default)]
pub struct DepthStats {
    /// Depth created by the negative-depth clamp
    pub herr_depth: f64,
    /// Depth added (or removed, if negative) by fixed-level cells
    pub hfix_depth: f64,
}

/// Advance the water depth by one step of length `dt`.
///
/// For each interior cell the divergence of the face discharges combines
/// with the external source rate:
/// `h* = h + (ext + (qw - qe)/dx + (qn - qs)/dy) * dt`, then
/// 1. a negative `h*` is clamped to zero and recorded in `herr`;
/// 2. a fixed-level cell (`bct == 4`) is pinned to `bcv` and the
///    adjustment recorded in `hfix`;
/// 3. `hmax` tracks the running maximum.
pub fn update_depth(dom: &mut RasterDomain, dt: f64) -> DepthStats {
    let (rows, cols) = dom.shape();
    let dx = dom.geometry().dx;
    let dy = dom.geometry().dy;

    let qe = dom.qe.as_slice();
    let qs = dom.qs.as_slice();
    let ext = dom.ext.as_slice();
    let bct = dom.bct.as_slice();
    let bcv = dom.bcv.as_slice();

    let row_stats: Vec<(f64, f64)> = dom
        .h
        .as_mut_slice()
        .par_chunks_mut(cols)
        .zip(dom.herr.as_mut_slice().par_chunks_mut(cols))
        .zip(dom.hfix.as_mut_slice().par_chunks_mut(cols))
        .zip(dom.hmax.as_mut_slice().par_chunks_mut(cols))
        .enumerate()
        .map(|(r, (((h_row, herr_row), hfix_row), hmax_row))| {
            let mut row_herr = 0.0;
            let mut row_hfix = 0.0;
            if r >= 1 && r < rows - 1 {
                for c in 1..cols - 1 {
                    let i = r * cols + c;
                    let div = (qe[i - 1] - qe[i]) / dx + (qs[i - cols] - qs[i]) / dy;
                    let mut hn = h_row[c] + (ext[i] + div) * dt;
                    if hn < 0.0 {
                        herr_row[c] -= hn;
                        row_herr -= hn;
                        hn = 0.0;
                    }
                    if bct[i] == BC_FIXED_DEPTH {
                        let fix = bcv[i] - hn;
                        hfix_row[c] += fix;
                        row_hfix += fix;
                        hn = bcv[i];
                    }
                    if hn > hmax_row[c] {
                        hmax_row[c] = hn;
                    }
                    h_row[c] = hn;
                }
            }
            (row_herr, row_hfix)
        })
        .collect();

    let mut stats = DepthStats::default();
    for (herr, hfix) in row_stats {
        stats.herr_depth += herr;
        stats.hfix_depth += hfix;
    }
    stats
}

/// Velocity on one face from its discharge and flow depth.
///
/// Branchless: the select factor zeroes dry faces without dividing by
/// zero, so the kernel vectorizes and never produces NaN.
#[inline]
fn face_velocity(q: f64, hf: f64) -> f64 {
    let wet = (hf > 0.0) as u8 as f64;
    q / hf.max(DIV_EPS) * wet
}

/// Derive cell-centered velocity magnitude, direction, running maximum
/// and Froude number from the face discharges and flow depths.
///
/// Direction is in degrees, 0 = east, counterclockwise, in `[0, 360)`.
/// The Froude number uses the updated depth and is set to 0 on dry cells.
pub fn update_velocity(dom: &mut RasterDomain, cfg: &SimConfig) {
    let (rows, cols) = dom.shape();
    let qe = dom.qe.as_slice();
    let qs = dom.qs.as_slice();
    let hfe = dom.hfe.as_slice();
    let hfs = dom.hfs.as_slice();
    let h = dom.h.as_slice();
    let g = cfg.g;

    dom.v
        .as_mut_slice()
        .par_chunks_mut(cols)
        .zip(dom.vdir.as_mut_slice().par_chunks_mut(cols))
        .zip(dom.vmax.as_mut_slice().par_chunks_mut(cols))
        .zip(dom.fr.as_mut_slice().par_chunks_mut(cols))
        .enumerate()
        .for_each(|(r, (((v_row, vdir_row), vmax_row), fr_row))| {
            if r == 0 || r >= rows - 1 {
                return;
            }
            for c in 1..cols - 1 {
                let i = r * cols + c;
                let ve = face_velocity(qe[i], hfe[i]);
                let vw = face_velocity(qe[i - 1], hfe[i - 1]);
                let vs = face_velocity(qs[i], hfs[i]);
                let vn = face_velocity(qs[i - cols], hfs[i - cols]);

                let vx = 0.5 * (ve + vw);
                let vy = 0.5 * (vs + vn);
                let vel = vx.hypot(vy);

                let mut dir = (-vy).atan2(vx).to_degrees();
                if dir < 0.0 {
                    dir += 360.0;
                }

                v_row[c] = vel;
                vdir_row[c] = dir;
                if vel > vmax_row[c] {
                    vmax_row[c] = vel;
                }
                fr_row[c] = if h[i] > 0.0 {
                    vel / (g * h[i]).sqrt()
                } else {
                    0.0
                };
            }
        });
}

#[cfg(test)]
mod tests {
    use super::*;
    use pluvio_core::GridGeometry;

    fn domain(rows: usize, cols: usize) -> RasterDomain {
        RasterDomain::new(rows, cols, GridGeometry::new(1.0, 1.0)).unwrap()
    }

    #[test]
    fn test_divergence_moves_water() {
        let mut dom = domain(4, 4);
        dom.h.set(1, 1, 0.2).unwrap();
        // discharge leaving (1,1) eastward into (1,2)
        dom.qe.set(1, 1, 0.1).unwrap();
        let stats = update_depth(&mut dom, 0.5);
        assert!((dom.h.get(1, 1).unwrap() - 0.15).abs() < 1e-15);
        assert!((dom.h.get(1, 2).unwrap() - 0.05).abs() < 1e-15);
        assert_eq!(stats.herr_depth, 0.0);
        assert_eq!(stats.hfix_depth, 0.0);
    }

    #[test]
    fn test_source_term_adds_water() {
        let mut dom = domain(4, 4);
        dom.ext.fill(1e-5);
        update_depth(&mut dom, 10.0);
        assert!((dom.h.get(2, 2).unwrap() - 1e-4).abs() < 1e-15);
        // halo cells never gain water
        assert_eq!(dom.h.get(0, 0).unwrap(), 0.0);
    }

    #[test]
    fn test_negative_depth_clamps_into_herr() {
        let mut dom = domain(4, 4);
        dom.h.set(1, 1, 0.01).unwrap();
        // outflow stronger than the stored water
        dom.qe.set(1, 1, 0.2).unwrap();
        let stats = update_depth(&mut dom, 0.1);
        assert_eq!(dom.h.get(1, 1).unwrap(), 0.0);
        let expected_err = 0.2 * 0.1 - 0.01;
        assert!((dom.herr.get(1, 1).unwrap() - expected_err).abs() < 1e-15);
        assert!((stats.herr_depth - expected_err).abs() < 1e-15);
    }

    #[test]
    fn test_fixed_level_cell_is_pinned() {
        let mut dom = domain(5, 5);
        dom.bct.set(2, 2, BC_FIXED_DEPTH).unwrap();
        dom.bcv.set(2, 2, 0.5).unwrap();
        let stats = update_depth(&mut dom, 0.1);
        assert_eq!(dom.h.get(2, 2).unwrap(), 0.5);
        assert_eq!(dom.hfix.get(2, 2).unwrap(), 0.5);
        assert!((stats.hfix_depth - 0.5).abs() < 1e-15);
        // draining the fixed cell keeps it pinned and accumulates hfix
        dom.qe.set(2, 2, 0.25).unwrap();
        update_depth(&mut dom, 0.1);
        assert_eq!(dom.h.get(2, 2).unwrap(), 0.5);
        assert!((dom.hfix.get(2, 2).unwrap() - 0.525).abs() < 1e-15);
    }

    #[test]
    fn test_hmax_tracks_running_maximum() {
        let mut dom = domain(4, 4);
        dom.ext.fill(1e-3);
        update_depth(&mut dom, 1.0);
        assert!((dom.hmax.get(1, 1).unwrap() - 1e-3).abs() < 1e-15);
        // water drains away; hmax keeps the peak
        dom.ext.fill(-1e-3);
        update_depth(&mut dom, 0.5);
        assert!((dom.h.get(1, 1).unwrap() - 5e-4).abs() < 1e-15);
        assert!((dom.hmax.get(1, 1).unwrap() - 1e-3).abs() < 1e-15);
    }

    #[test]
    fn test_face_velocity_branchless() {
        assert_eq!(face_velocity(0.5, 0.0), 0.0);
        assert_eq!(face_velocity(0.5, -0.1), 0.0);
        assert!((face_velocity(0.5, 0.25) - 2.0).abs() < 1e-12);
        assert!(face_velocity(0.5, 0.0).is_finite());
    }

    #[test]
    fn test_velocity_direction_convention() {
        let cfg = SimConfig::default();
        let mut dom = domain(4, 4);
        dom.h.fill(1.0);
        // uniform eastward flow through cell (1,1)
        dom.qe.set(1, 1, 0.5).unwrap();
        dom.qe.set(1, 0, 0.5).unwrap();
        dom.hfe.fill(1.0);
        dom.hfs.fill(1.0);
        update_velocity(&mut dom, &cfg);
        assert!((dom.v.get(1, 1).unwrap() - 0.5).abs() < 1e-12);
        assert!((dom.vdir.get(1, 1).unwrap() - 0.0).abs() < 1e-9);

        // northward flow: south faces discharging toward negative rows
        let mut dom = domain(4, 4);
        dom.h.fill(1.0);
        dom.qs.set(1, 1, -0.5).unwrap();
        dom.qs.set(0, 1, -0.5).unwrap();
        dom.hfe.fill(1.0);
        dom.hfs.fill(1.0);
        update_velocity(&mut dom, &cfg);
        assert!((dom.vdir.get(1, 1).unwrap() - 90.0).abs() < 1e-9);
    }

    #[test]
    fn test_froude_number() {
        let cfg = SimConfig {
            g: 9.81,
            ..SimConfig::default()
        };
        let mut dom = domain(4, 4);
        dom.h.fill(1.0);
        dom.qe.set(1, 1, 1.0).unwrap();
        dom.qe.set(1, 0, 1.0).unwrap();
        dom.hfe.fill(1.0);
        dom.hfs.fill(1.0);
        update_velocity(&mut dom, &cfg);
        let fr = dom.fr.get(1, 1).unwrap();
        assert!((fr - 1.0 / 9.81_f64.sqrt()).abs() < 1e-12);
        // dry cells report zero
        dom.h.fill(0.0);
        update_velocity(&mut dom, &cfg);
        assert_eq!(dom.fr.get(1, 1).unwrap(), 0.0);
        assert!((dom.vmax.get(1, 1).unwrap() - 1.0).abs() < 1e-12);
    }
}
