//! Field registry for the name-based array exchange
//!
//! External collaborators (raster I/O, boundary preprocessor, drainage
//! coupling) exchange 2D arrays with the core by name. Input fields are
//! writable; fields derived by the solver are read-only.
//!
//! The requested infiltration rate is set through `inf_user`; `inf` reads
//! back the rate actually applied after capping.

use pluvio_core::Error;
use std::fmt;
use std::str::FromStr;

/// Identifier of a 2D field exposed through `get_field`/`set_field`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKey {
    /// Bed elevation (m)
    Z,
    /// Manning friction coefficient (s·m^-1/3)
    N,
    /// Water depth (m)
    H,
    /// Running maximum of the water depth (m)
    Hmax,
    /// Unit discharge on east faces (m^2/s)
    Qe,
    /// Unit discharge on south faces (m^2/s)
    Qs,
    /// Flow depth at east faces (m)
    Hfe,
    /// Flow depth at south faces (m)
    Hfs,
    /// Rainfall rate (m/s)
    Rain,
    /// Requested user losses rate (m/s)
    Losses,
    /// Losses actually applied after capping (m/s)
    LossesCapped,
    /// Requested infiltration rate for the user-fixed model (m/s)
    InfUser,
    /// Infiltration rate applied after capping (m/s)
    Inf,
    /// Effective precipitation after losses (m/s)
    EffPrecip,
    /// User inflow rate (m/s)
    Inflow,
    /// Drainage-network exchange rate (m/s)
    Ndrain,
    /// Total external source rate (m/s)
    Ext,
    /// Boundary type code; only code 4 (fixed depth) is interpreted
    Bct,
    /// Boundary value (m or m^2/s depending on the code)
    Bcv,
    /// Accumulated volume added by fixed-level boundary cells (m)
    Hfix,
    /// Accumulated volume created by the negative-depth clamp (m)
    Herr,
    /// Cell-centered velocity magnitude (m/s)
    V,
    /// Cell-centered velocity direction (deg, 0 = east, CCW)
    Vdir,
    /// Running maximum of the velocity magnitude (m/s)
    Vmax,
    /// Froude number
    Fr,
    /// Green-Ampt effective porosity (fraction)
    EffPor,
    /// Green-Ampt wetting-front capillary pressure (m)
    Pressure,
    /// Green-Ampt hydraulic conductivity (m/s)
    Conduct,
    /// Green-Ampt cumulative infiltration depth (m)
    InfAmount,
    /// Green-Ampt initial soil water content (fraction)
    WaterSoilContent,
}

impl FieldKey {
    /// Canonical field name
    pub fn name(self) -> &'static str {
        match self {
            FieldKey::Z => "z",
            FieldKey::N => "n",
            FieldKey::H => "h",
            FieldKey::Hmax => "hmax",
            FieldKey::Qe => "qe",
            FieldKey::Qs => "qs",
            FieldKey::Hfe => "hfe",
            FieldKey::Hfs => "hfs",
            FieldKey::Rain => "rain",
            FieldKey::Losses => "losses",
            FieldKey::LossesCapped => "losses_capped",
            FieldKey::InfUser => "inf_user",
            FieldKey::Inf => "inf",
            FieldKey::EffPrecip => "eff_precip",
            FieldKey::Inflow => "inflow",
            FieldKey::Ndrain => "ndrain",
            FieldKey::Ext => "ext",
            FieldKey::Bct => "bct",
            FieldKey::Bcv => "bcv",
            FieldKey::Hfix => "hfix",
            FieldKey::Herr => "herr",
            FieldKey::V => "v",
            FieldKey::Vdir => "vdir",
            FieldKey::Vmax => "vmax",
            FieldKey::Fr => "fr",
            FieldKey::EffPor => "eff_por",
            FieldKey::Pressure => "pressure",
            FieldKey::Conduct => "conduct",
            FieldKey::InfAmount => "inf_amount",
            FieldKey::WaterSoilContent => "water_soil_content",
        }
    }

    /// Whether external collaborators may write this field.
    ///
    /// `qe`/`qs` are writable because the boundary preprocessor
    /// materializes open-boundary fluxes on halo faces before each call.
    pub fn is_writable(self) -> bool {
        matches!(
            self,
            FieldKey::Z
                | FieldKey::N
                | FieldKey::H
                | FieldKey::Qe
                | FieldKey::Qs
                | FieldKey::Rain
                | FieldKey::Losses
                | FieldKey::InfUser
                | FieldKey::Inflow
                | FieldKey::Ndrain
                | FieldKey::Ext
                | FieldKey::Bct
                | FieldKey::Bcv
                | FieldKey::EffPor
                | FieldKey::Pressure
                | FieldKey::Conduct
                | FieldKey::InfAmount
                | FieldKey::WaterSoilContent
        )
    }
}

impl fmt::Display for FieldKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for FieldKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = match s {
            "z" | "dem" => FieldKey::Z,
            "n" | "friction" => FieldKey::N,
            "h" => FieldKey::H,
            "hmax" => FieldKey::Hmax,
            "qe" => FieldKey::Qe,
            "qs" => FieldKey::Qs,
            "hfe" => FieldKey::Hfe,
            "hfs" => FieldKey::Hfs,
            "rain" => FieldKey::Rain,
            "losses" => FieldKey::Losses,
            "losses_capped" => FieldKey::LossesCapped,
            "inf_user" => FieldKey::InfUser,
            "inf" => FieldKey::Inf,
            "eff_precip" => FieldKey::EffPrecip,
            "inflow" => FieldKey::Inflow,
            "ndrain" => FieldKey::Ndrain,
            "ext" => FieldKey::Ext,
            "bct" => FieldKey::Bct,
            "bcv" => FieldKey::Bcv,
            "hfix" => FieldKey::Hfix,
            "herr" => FieldKey::Herr,
            "v" => FieldKey::V,
            "vdir" => FieldKey::Vdir,
            "vmax" => FieldKey::Vmax,
            "fr" => FieldKey::Fr,
            "eff_por" => FieldKey::EffPor,
            "pressure" => FieldKey::Pressure,
            "conduct" => FieldKey::Conduct,
            "inf_amount" => FieldKey::InfAmount,
            "water_soil_content" => FieldKey::WaterSoilContent,
            other => return Err(Error::UnknownField(other.to_string())),
        };
        Ok(key)
    }
}
