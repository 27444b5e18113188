//! Co-registered raster grids.
//!
//! A [`Grid`] is a rectangular, row-major array of samples plus the
//! geometry needed to place it on the ground ([`GridSpec`]): cell
//! size, upper-left origin, and spatial reference. Every cross-grid
//! operation in this workspace requires its inputs to share that
//! geometry exactly; see [`GridSpec::ensure_coregistered`].
//!
//! # References
//!
//! 1. [ESRI ASCII raster format](https://desktop.arcgis.com/en/arcmap/latest/manage-data/raster-and-images/esri-ascii-raster-format.htm)
//! 1. [BIL, BIP, and BSQ raster files](https://desktop.arcgis.com/en/arcmap/latest/manage-data/raster-and-images/bil-bip-and-bsq-raster-files.htm)

mod error;
mod grid;
pub mod io;
mod resample;
mod spec;
mod srs;

pub use crate::{
    error::GridError,
    grid::{Grid, Sample, SampleKind},
    resample::resample,
    spec::{Direction, GridSpec},
    srs::SpatialRef,
};
pub use geo;

/// Base floating point type used for all coordinates and distances.
pub type C = f64;

/// Nodata sentinel used for floating point grids created by this
/// workspace.
pub const NODATA_F64: f64 = -9999.0;

/// Nodata sentinel used for integer grids created by this workspace.
pub const NODATA_I32: i32 = -9999;

/// Nodata sentinel used for byte masks and backlink grids.
pub const NODATA_U8: u8 = u8::MAX;
