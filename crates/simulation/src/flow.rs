//! Face-flow solver
//!
//! Computes the unit-width discharge on the east and south faces of every
//! interior cell with the q-centered inertial scheme of Almeida (2013),
//! falling back to Bates (2010) on flow reversal and to kinematic rain
//! routing below the `hf_min` flow-depth threshold.
//!
//! Discharges are double-buffered: the solver reads `qe`/`qs` and writes
//! `qe_new`/`qs_new`, so every stencil sees a coherent snapshot of the
//! previous step. Faces the solver does not own (the halo ring, the east
//! face of the last interior column, the south face of the last interior
//! row) carry their prior value into the new buffer; the boundary
//! preprocessor materializes domain-boundary fluxes there.

use crate::config::SimConfig;
use crate::domain::RasterDomain;
use crate::maybe_rayon::*;
use crate::routing::rain_routing;

/// Solve the q-centered inertial update for one face.
///
/// `q0` is the prior discharge on the face, `qm1`/`qp1` the prior
/// discharges of the neighboring faces on the same axis, `q_st` the mean
/// of the four adjacent perpendicular faces. When the inertial term
/// opposes the surface slope the scheme degrades to Bates (2010) by
/// dropping the neighbor average.
#[inline]
#[allow(clippy::too_many_arguments)]
fn almeida(
    q0: f64,
    qm1: f64,
    qp1: f64,
    q_st: f64,
    n_face: f64,
    wse0: f64,
    wse1: f64,
    hf: f64,
    cell_len: f64,
    dt: f64,
    cfg: &SimConfig,
) -> f64 {
    let slope = ((wse0 - wse1) / cell_len).clamp(-cfg.slmax, cfg.slmax);
    let q_norm = q0.hypot(q_st);
    let mut a = cfg.theta * q0 + (1.0 - cfg.theta) * 0.5 * (qm1 + qp1);
    let b = cfg.g * hf * dt * slope;
    if a * b < 0.0 {
        a = q0;
    }
    let d = 1.0 + cfg.g * dt * n_face * n_face * q_norm / hf.powf(7.0 / 3.0);
    (a + b) / d
}

/// Compute `qe_new`, `qs_new` and the face flow depths `hfe`, `hfs`.
///
/// East faces are solved for rows `1..R-1` and columns `1..C-2`; south
/// faces for rows `1..R-2` and columns `1..C-1`. Every other entry of the
/// new buffers is copied from the current one.
pub fn solve_face_flows(dom: &mut RasterDomain, cfg: &SimConfig, dt: f64) {
    let (rows, cols) = dom.shape();
    let dx = dom.geometry().dx;
    let dy = dom.geometry().dy;

    // east faces
    {
        let z = dom.z.as_slice();
        let n = dom.n.as_slice();
        let h = dom.h.as_slice();
        let qe = dom.qe.as_slice();
        let qs = dom.qs.as_slice();
        let dire = dom.dire.as_slice();

        dom.qe_new
            .as_mut_slice()
            .par_chunks_mut(cols)
            .zip(dom.hfe.as_mut_slice().par_chunks_mut(cols))
            .enumerate()
            .for_each(|(r, (qe_row, hfe_row))| {
                qe_row.copy_from_slice(&qe[r * cols..(r + 1) * cols]);
                if r == 0 || r >= rows - 1 {
                    return;
                }
                for c in 1..cols - 2 {
                    let i = r * cols + c;
                    let i1 = i + 1;

                    let z0 = z[i];
                    let z1 = z[i1];
                    let h0 = h[i];
                    let h1 = h[i1];
                    let wse0 = z0 + h0;
                    let wse1 = z1 + h1;
                    let hf = wse0.max(wse1) - z0.max(z1);

                    let q = if hf <= 0.0 {
                        0.0
                    } else if hf > cfg.hf_min {
                        let q_st = 0.25 * (qs[i - cols] + qs[i - cols + 1] + qs[i] + qs[i + 1]);
                        let n_face = 0.5 * (n[i] + n[i1]);
                        almeida(
                            qe[i],
                            qe[i - 1],
                            qe[i + 1],
                            q_st,
                            n_face,
                            wse0,
                            wse1,
                            hf,
                            dx,
                            dt,
                            cfg,
                        )
                    } else if dire[i] == 0 && wse0 > wse1 {
                        rain_routing(h0, wse0, wse1, dt, dx, cfg.vrouting)
                    } else if dire[i1] == 1 && wse1 > wse0 {
                        -rain_routing(h1, wse1, wse0, dt, dx, cfg.vrouting)
                    } else {
                        0.0
                    };

                    qe_row[c] = q;
                    hfe_row[c] = hf;
                }
            });
    }

    // south faces
    {
        let z = dom.z.as_slice();
        let n = dom.n.as_slice();
        let h = dom.h.as_slice();
        let qe = dom.qe.as_slice();
        let qs = dom.qs.as_slice();
        let dirs = dom.dirs.as_slice();

        dom.qs_new
            .as_mut_slice()
            .par_chunks_mut(cols)
            .zip(dom.hfs.as_mut_slice().par_chunks_mut(cols))
            .enumerate()
            .for_each(|(r, (qs_row, hfs_row))| {
                qs_row.copy_from_slice(&qs[r * cols..(r + 1) * cols]);
                if r == 0 || r >= rows - 2 {
                    return;
                }
                for c in 1..cols - 1 {
                    let i = r * cols + c;
                    let i1 = i + cols;

                    let z0 = z[i];
                    let z1 = z[i1];
                    let h0 = h[i];
                    let h1 = h[i1];
                    let wse0 = z0 + h0;
                    let wse1 = z1 + h1;
                    let hf = wse0.max(wse1) - z0.max(z1);

                    let q = if hf <= 0.0 {
                        0.0
                    } else if hf > cfg.hf_min {
                        let q_st = 0.25 * (qe[i - 1] + qe[i] + qe[i1 - 1] + qe[i1]);
                        let n_face = 0.5 * (n[i] + n[i1]);
                        almeida(
                            qs[i],
                            qs[i - cols],
                            qs[i + cols],
                            q_st,
                            n_face,
                            wse0,
                            wse1,
                            hf,
                            dy,
                            dt,
                            cfg,
                        )
                    } else if dirs[i] == 0 && wse0 > wse1 {
                        rain_routing(h0, wse0, wse1, dt, dy, cfg.vrouting)
                    } else if dirs[i1] == 1 && wse1 > wse0 {
                        -rain_routing(h1, wse1, wse0, dt, dy, cfg.vrouting)
                    } else {
                        0.0
                    };

                    qs_row[c] = q;
                    hfs_row[c] = hf;
                }
            });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::update_flow_dirs;
    use pluvio_core::GridGeometry;

    fn config() -> SimConfig {
        SimConfig {
            theta: 0.9,
            hf_min: 0.01,
            vrouting: 0.1,
            g: 9.81,
            slmax: 5.0,
            ..SimConfig::default()
        }
    }

    fn domain(rows: usize, cols: usize) -> RasterDomain {
        RasterDomain::new(rows, cols, GridGeometry::new(1.0, 1.0)).unwrap()
    }

    #[test]
    fn test_lake_at_rest_stays_still() {
        // uniform depth over a flat bed: every computed face stays dry of flow
        let mut dom = domain(6, 6);
        dom.h.fill(0.5);
        dom.n.fill(0.03);
        solve_face_flows(&mut dom, &config(), 0.1);
        for r in 0..6 {
            for c in 0..6 {
                assert_eq!(dom.qe_new.get(r, c).unwrap(), 0.0, "qe at ({r},{c})");
                assert_eq!(dom.qs_new.get(r, c).unwrap(), 0.0, "qs at ({r},{c})");
            }
        }
    }

    #[test]
    fn test_dry_face_zeroes_discharge() {
        let mut dom = domain(5, 5);
        dom.n.fill(0.03);
        // stale discharge on a face that went dry
        dom.qe.set(2, 1, 0.3).unwrap();
        solve_face_flows(&mut dom, &config(), 0.1);
        assert_eq!(dom.qe_new.get(2, 1).unwrap(), 0.0);
    }

    #[test]
    fn test_wet_face_flows_downhill() {
        let mut dom = domain(5, 5);
        dom.n.fill(0.03);
        dom.h.set(2, 1, 0.5).unwrap();
        solve_face_flows(&mut dom, &config(), 0.1);
        // east face of the mound flows east (positive), west face west
        assert!(dom.qe_new.get(2, 1).unwrap() > 0.0);
        // the face feeding the mound from the west cell: wse0 < wse1
        // hence negative discharge (westward)
        let cfg = config();
        let hf = 0.5;
        let b = cfg.g * hf * 0.1 * (-0.5_f64).max(-cfg.slmax);
        let expected = b; // A = 0, q_norm = 0 so D = 1
        assert!((dom.qe_new.get(2, 0).unwrap() - 0.0).abs() < 1e-15); // halo face untouched
        // symmetric south face
        assert!(dom.qs_new.get(2, 1).unwrap() > 0.0);
        assert!((dom.qs_new.get(1, 1).unwrap() - expected).abs() < 1e-12);
    }

    #[test]
    fn test_bates_fallback_on_reversal() {
        let mut dom = domain(3, 7);
        dom.n.fill(0.05);
        // surface sloping east, prior discharge pushing west
        dom.h.set(1, 2, 0.4).unwrap();
        dom.h.set(1, 3, 0.2).unwrap();
        let q0 = -0.05;
        dom.qe.set(1, 2, q0).unwrap();

        let cfg = config();
        let dt = 0.1;
        solve_face_flows(&mut dom, &cfg, dt);

        let wse0 = 0.4;
        let wse1 = 0.2;
        let hf = 0.4;
        let slope = (wse0 - wse1) / 1.0;
        let b = cfg.g * hf * dt * slope;
        // A = theta*q0 (neighbors are zero); it opposes B, so A collapses to q0
        let a = cfg.theta * q0;
        assert!(a * b < 0.0, "setup must trigger the reversal branch");
        let d = 1.0 + cfg.g * dt * 0.05 * 0.05 * q0.abs() / hf.powf(7.0 / 3.0);
        let expected = (q0 + b) / d;
        assert!((dom.qe_new.get(1, 2).unwrap() - expected).abs() < 1e-12);
    }

    #[test]
    fn test_thin_film_routes_downhill_only() {
        let cfg = config();
        let mut dom = domain(5, 5);
        dom.n.fill(0.03);
        // high shelf at (2,1) draining onto a low bed eastward
        for r in 0..5 {
            for c in 0..5 {
                dom.z.set(r, c, if c <= 1 { 1.0 } else { 0.0 }).unwrap();
            }
        }
        let h_thin = 0.005; // below hf_min
        dom.h.set(2, 1, h_thin).unwrap();
        update_flow_dirs(&mut dom);
        assert_eq!(dom.dire.get(2, 1).unwrap(), 0);

        let dt = 0.1;
        solve_face_flows(&mut dom, &cfg, dt);

        let expected = (h_thin * cfg.vrouting).min(1.0 * h_thin / dt);
        assert!((dom.qe_new.get(2, 1).unwrap() - expected).abs() < 1e-15);
        // the south face has no routing label on either side
        assert_eq!(dom.qs_new.get(2, 1).unwrap(), 0.0);
    }

    #[test]
    fn test_thin_film_neighbor_drains_westward() {
        let cfg = config();
        let mut dom = domain(5, 5);
        dom.n.fill(0.03);
        // bed rising eastward: cell (2,2) routes west toward (2,1)
        for r in 0..5 {
            for c in 0..5 {
                dom.z.set(r, c, c as f64 * 0.5).unwrap();
            }
        }
        let h_thin = 0.004;
        dom.h.set(2, 2, h_thin).unwrap();
        update_flow_dirs(&mut dom);
        assert_eq!(dom.dire.get(2, 2).unwrap(), 1);

        let dt = 0.1;
        solve_face_flows(&mut dom, &cfg, dt);

        // face between (2,1) and (2,2): the eastern cell drains westward,
        // so the discharge is negative
        let expected = -(h_thin * cfg.vrouting).min(1.0 * h_thin / dt);
        assert!((dom.qe_new.get(2, 1).unwrap() - expected).abs() < 1e-15);
    }

    #[test]
    fn test_uncomputed_faces_keep_prior_value() {
        let mut dom = domain(5, 5);
        dom.n.fill(0.03);
        // boundary preprocessor wrote fluxes on halo and edge faces
        dom.qe.set(2, 0, 0.7).unwrap();
        dom.qe.set(2, 3, -0.2).unwrap(); // east face of the last interior column
        dom.qs.set(0, 2, 0.4).unwrap();
        dom.qs.set(3, 2, -0.1).unwrap(); // south face of the last interior row
        solve_face_flows(&mut dom, &config(), 0.1);
        assert_eq!(dom.qe_new.get(2, 0).unwrap(), 0.7);
        assert_eq!(dom.qe_new.get(2, 3).unwrap(), -0.2);
        assert_eq!(dom.qs_new.get(0, 2).unwrap(), 0.4);
        assert_eq!(dom.qs_new.get(3, 2).unwrap(), -0.1);
    }

    #[test]
    fn test_face_depth_definition() {
        let mut dom = domain(4, 4);
        dom.n.fill(0.03);
        dom.z.set(1, 1, 2.0).unwrap();
        dom.z.set(1, 2, 1.0).unwrap();
        dom.h.set(1, 1, 0.5).unwrap();
        dom.h.set(1, 2, 1.5).unwrap();
        solve_face_flows(&mut dom, &config(), 0.1);
        // hf = max(wse0, wse1) - max(z0, z1) = max(2.5, 2.5) - 2.0
        assert!((dom.hfe.get(1, 1).unwrap() - 0.5).abs() < 1e-15);
    }
}
