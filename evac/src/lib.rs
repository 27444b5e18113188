//! # Pedestrian Evacuation Analysis
//!
//! `evac` derives evacuation travel-time maps from land cover and
//! elevation:
//!
//! 1. [`cost::build_cost_surface`] composites layered land cover into
//!    a per-cell traversal cost.
//! 1. [`Accumulation`] runs an anisotropic least accumulated cost
//!    search outward from the safe zone.
//! 1. [`time::travel_times`] converts accumulated cost to minutes for
//!    each walking speed.
//! 1. [`bands::time_map`] bands those minutes and fills building
//!    voids.
//! 1. [`speed::classify_speeds`] finds the slowest speed that still
//!    reaches safety before the hazard arrives.
//!
//! Every step takes a [`ProcessingContext`], which fixes the grid
//! geometry and study area for one run.
//!
//! # References
//!
//! 1. [Pedestrian Evacuation Analyst](https://www.usgs.gov/software/pedestrian-evacuation-analyst-tool)
//! 1. [Tobler's hiking function](https://en.wikipedia.org/wiki/Tobler%27s_hiking_function)

pub mod accumulate;
pub mod bands;
mod context;
pub mod cost;
mod error;
pub mod factors;
pub mod naming;
pub mod polygonize;
pub mod rasterize;
pub mod safezone;
pub mod speed;
pub mod time;
pub mod units;

pub use {
    crate::{
        accumulate::Accumulation,
        context::ProcessingContext,
        error::{ConfigError, EvacError},
        time::Speed,
    },
    grid,
};
