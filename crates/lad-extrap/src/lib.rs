#![deny(missing_docs)]
#![doc = "Grouping of labelled datasets and least-squares polynomial extrapolation of \
          observables towards zero control variable."]

pub mod engine;
/// Grouping, property intersection and series collection.
pub mod group;
/// Least-squares polynomial fits.
pub mod polyfit;

pub use engine::{
    extrapolate, extrapolate_point, limit_props, ExtrapolationOutput, PointFit, DEFAULT_FOREACH,
};
pub use group::{collect_xy, group_by, intersect_props, Group};
pub use polyfit::{fit, polyfit, r_squared, PolyFit, Polynomial};
