//! Co-registered raster stack of the simulation domain
//!
//! Gathers every 2D field of the solver on one grid. Arrays are allocated
//! once and reused across steps; the face discharges are double-buffered
//! and swapped by handle, not by copy.
//!
//! The grid carries a one-cell halo: row 0, the last row, column 0 and the
//! last column belong to the external boundary preprocessor and are never
//! written by the kernels.

use ndarray::ArrayView2;
use pluvio_core::{Error, GridGeometry, Raster, Result};

use crate::fields::FieldKey;

/// Conversion factor from mm/h to m/s for external rate rasters.
///
/// The core works in m/s throughout; callers holding rainfall,
/// infiltration or losses rasters in mm/h multiply by this factor before
/// `set_field`.
pub const MMH_TO_MS: f64 = 1.0 / (1000.0 * 3600.0);

/// Boundary type code for a fixed water depth cell.
pub const BC_FIXED_DEPTH: f64 = 4.0;

/// Initial cumulative infiltration depth (m).
///
/// Keeps the Green-Ampt rate finite on first use; the wetting-front term
/// divides by the cumulative depth.
pub const INF_AMOUNT_INIT: f64 = 1e-6;

/// All simulation fields on a single grid.
#[derive(Debug, Clone)]
pub struct RasterDomain {
    geometry: GridGeometry,
    rows: usize,
    cols: usize,

    // static inputs
    pub(crate) z: Raster<f64>,
    pub(crate) n: Raster<f64>,

    // prognostic state
    pub(crate) h: Raster<f64>,
    pub(crate) hmax: Raster<f64>,
    pub(crate) qe: Raster<f64>,
    pub(crate) qs: Raster<f64>,
    pub(crate) qe_new: Raster<f64>,
    pub(crate) qs_new: Raster<f64>,
    pub(crate) hfe: Raster<f64>,
    pub(crate) hfs: Raster<f64>,

    // routing labels
    pub(crate) dire: Raster<i8>,
    pub(crate) dirs: Raster<i8>,

    // hydrologic sources
    pub(crate) rain: Raster<f64>,
    pub(crate) losses: Raster<f64>,
    pub(crate) losses_capped: Raster<f64>,
    pub(crate) inf_user: Raster<f64>,
    pub(crate) inf: Raster<f64>,
    pub(crate) eff_precip: Raster<f64>,
    pub(crate) inflow: Raster<f64>,
    pub(crate) ndrain: Raster<f64>,
    pub(crate) ext: Raster<f64>,

    // boundary conditions
    pub(crate) bct: Raster<f64>,
    pub(crate) bcv: Raster<f64>,

    // mass accounting
    pub(crate) hfix: Raster<f64>,
    pub(crate) herr: Raster<f64>,

    // derived velocity fields
    pub(crate) v: Raster<f64>,
    pub(crate) vdir: Raster<f64>,
    pub(crate) vmax: Raster<f64>,
    pub(crate) fr: Raster<f64>,

    // Green-Ampt soil stack
    pub(crate) eff_por: Raster<f64>,
    pub(crate) pressure: Raster<f64>,
    pub(crate) conduct: Raster<f64>,
    pub(crate) inf_amount: Raster<f64>,
    pub(crate) water_soil_content: Raster<f64>,

    /// Set when the bed elevation changes; the driver reclassifies the
    /// routing labels before the next face solve.
    pub(crate) flow_dir_dirty: bool,
}

impl RasterDomain {
    /// Allocate a domain of `rows x cols` cells, halo included.
    pub fn new(rows: usize, cols: usize, geometry: GridGeometry) -> Result<Self> {
        if rows < 3 || cols < 3 {
            return Err(Error::InvalidDimensions { rows, cols });
        }
        geometry.validate()?;

        Ok(Self {
            geometry,
            rows,
            cols,
            z: Raster::new(rows, cols),
            n: Raster::new(rows, cols),
            h: Raster::new(rows, cols),
            hmax: Raster::new(rows, cols),
            qe: Raster::new(rows, cols),
            qs: Raster::new(rows, cols),
            qe_new: Raster::new(rows, cols),
            qs_new: Raster::new(rows, cols),
            hfe: Raster::new(rows, cols),
            hfs: Raster::new(rows, cols),
            dire: Raster::filled(rows, cols, -1),
            dirs: Raster::filled(rows, cols, -1),
            rain: Raster::new(rows, cols),
            losses: Raster::new(rows, cols),
            losses_capped: Raster::new(rows, cols),
            inf_user: Raster::new(rows, cols),
            inf: Raster::new(rows, cols),
            eff_precip: Raster::new(rows, cols),
            inflow: Raster::new(rows, cols),
            ndrain: Raster::new(rows, cols),
            ext: Raster::new(rows, cols),
            bct: Raster::new(rows, cols),
            bcv: Raster::new(rows, cols),
            hfix: Raster::new(rows, cols),
            herr: Raster::new(rows, cols),
            v: Raster::new(rows, cols),
            vdir: Raster::new(rows, cols),
            vmax: Raster::new(rows, cols),
            fr: Raster::new(rows, cols),
            eff_por: Raster::new(rows, cols),
            pressure: Raster::new(rows, cols),
            conduct: Raster::new(rows, cols),
            inf_amount: Raster::filled(rows, cols, INF_AMOUNT_INIT),
            water_soil_content: Raster::new(rows, cols),
            flow_dir_dirty: true,
        })
    }

    /// Number of rows, halo included
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Number of columns, halo included
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Dimensions as (rows, cols)
    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    /// Grid geometry
    pub fn geometry(&self) -> &GridGeometry {
        &self.geometry
    }

    /// Surface of one cell (m^2)
    pub fn cell_surface(&self) -> f64 {
        self.geometry.cell_surface()
    }

    /// Swap the current and next discharge buffers.
    ///
    /// The face solver's stencils must read a coherent snapshot of the
    /// previous step, so the buffers exchange handles after each solve.
    pub fn swap_flows(&mut self) {
        std::mem::swap(&mut self.qe, &mut self.qe_new);
        std::mem::swap(&mut self.qs, &mut self.qs_new);
    }

    /// Water volume currently stored in the interior (m^3)
    pub fn water_volume(&self) -> f64 {
        self.h.interior_sum() * self.cell_surface()
    }

    /// Net discharge into the interior across the halo-adjacent faces
    /// (m^3/s), positive for inflow.
    ///
    /// Those faces are never computed by the face solver; any non-zero
    /// value was materialized there by the boundary preprocessor.
    pub fn boundary_discharge(&self) -> f64 {
        let (rows, cols) = (self.rows, self.cols);
        let qe = self.qe.as_slice();
        let qs = self.qs.as_slice();
        let (dx, dy) = (self.geometry.dx, self.geometry.dy);

        let mut total = 0.0;
        for r in 1..rows - 1 {
            // west face of the first interior column, east face of the last
            total += (qe[r * cols] - qe[r * cols + cols - 2]) * dy;
        }
        for c in 1..cols - 1 {
            // north face of the first interior row, south face of the last
            total += (qs[c] - qs[(rows - 2) * cols + c]) * dx;
        }
        total
    }

    /// Reset the per-cell mass accounting.
    ///
    /// Called at record boundaries once the accumulators have been
    /// published. The running maxima `hmax`/`vmax` span the whole
    /// simulation and are not reset.
    pub fn reset_accumulators(&mut self) {
        self.hfix.fill(0.0);
        self.herr.fill(0.0);
    }

    /// Read-only view of a field
    pub fn field(&self, key: FieldKey) -> ArrayView2<'_, f64> {
        match key {
            FieldKey::Z => self.z.view(),
            FieldKey::N => self.n.view(),
            FieldKey::H => self.h.view(),
            FieldKey::Hmax => self.hmax.view(),
            FieldKey::Qe => self.qe.view(),
            FieldKey::Qs => self.qs.view(),
            FieldKey::Hfe => self.hfe.view(),
            FieldKey::Hfs => self.hfs.view(),
            FieldKey::Rain => self.rain.view(),
            FieldKey::Losses => self.losses.view(),
            FieldKey::LossesCapped => self.losses_capped.view(),
            FieldKey::InfUser => self.inf_user.view(),
            FieldKey::Inf => self.inf.view(),
            FieldKey::EffPrecip => self.eff_precip.view(),
            FieldKey::Inflow => self.inflow.view(),
            FieldKey::Ndrain => self.ndrain.view(),
            FieldKey::Ext => self.ext.view(),
            FieldKey::Bct => self.bct.view(),
            FieldKey::Bcv => self.bcv.view(),
            FieldKey::Hfix => self.hfix.view(),
            FieldKey::Herr => self.herr.view(),
            FieldKey::V => self.v.view(),
            FieldKey::Vdir => self.vdir.view(),
            FieldKey::Vmax => self.vmax.view(),
            FieldKey::Fr => self.fr.view(),
            FieldKey::EffPor => self.eff_por.view(),
            FieldKey::Pressure => self.pressure.view(),
            FieldKey::Conduct => self.conduct.view(),
            FieldKey::InfAmount => self.inf_amount.view(),
            FieldKey::WaterSoilContent => self.water_soil_content.view(),
        }
    }

    /// Overwrite a writable field with an array of the grid shape.
    pub fn set_field(&mut self, key: FieldKey, values: ArrayView2<'_, f64>) -> Result<()> {
        if !key.is_writable() {
            return Err(Error::ReadOnlyField(key.name()));
        }
        let target = match key {
            FieldKey::Z => &mut self.z,
            FieldKey::N => &mut self.n,
            FieldKey::H => &mut self.h,
            FieldKey::Qe => &mut self.qe,
            FieldKey::Qs => &mut self.qs,
            FieldKey::Rain => &mut self.rain,
            FieldKey::Losses => &mut self.losses,
            FieldKey::InfUser => &mut self.inf_user,
            FieldKey::Inflow => &mut self.inflow,
            FieldKey::Ndrain => &mut self.ndrain,
            FieldKey::Ext => &mut self.ext,
            FieldKey::Bct => &mut self.bct,
            FieldKey::Bcv => &mut self.bcv,
            FieldKey::EffPor => &mut self.eff_por,
            FieldKey::Pressure => &mut self.pressure,
            FieldKey::Conduct => &mut self.conduct,
            FieldKey::InfAmount => &mut self.inf_amount,
            FieldKey::WaterSoilContent => &mut self.water_soil_content,
            _ => return Err(Error::ReadOnlyField(key.name())),
        };
        target.assign(values)?;
        if key == FieldKey::Z {
            self.flow_dir_dirty = true;
        }
        Ok(())
    }
}
