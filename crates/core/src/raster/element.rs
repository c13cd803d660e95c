//! Raster element trait for generic cell values

use num_traits::{NumCast, Zero};
use std::fmt::Debug;

/// Trait for types that can be stored in a raster cell.
///
/// Bounds the types usable as grid values so they support the numeric
/// operations of the solver: `f64` for the physical fields, `u8`/`i8` for
/// codes and routing labels.
pub trait RasterElement:
    Copy + Clone + Debug + PartialOrd + PartialEq + NumCast + Zero + Send + Sync + 'static
{
    /// Minimum value representable by this type
    fn min_value() -> Self;

    /// Maximum value representable by this type
    fn max_value() -> Self;

    /// Convert self to f64
    fn to_f64(self) -> Option<f64> {
        NumCast::from(self)
    }
}

macro_rules! impl_raster_element {
    ($t:ty) => {
        impl RasterElement for $t {
            fn min_value() -> Self {
                <$t>::MIN
            }

            fn max_value() -> Self {
                <$t>::MAX
            }
        }
    };
}

impl_raster_element!(i8);
impl_raster_element!(i16);
impl_raster_element!(i32);
impl_raster_element!(i64);
impl_raster_element!(u8);
impl_raster_element!(u16);
impl_raster_element!(u32);
impl_raster_element!(u64);
impl_raster_element!(f32);
impl_raster_element!(f64);
