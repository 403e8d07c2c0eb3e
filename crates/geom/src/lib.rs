//! Path geometry used by the live path effect pipeline.
//!
//! The curve math itself comes from [`kurbo`]. This crate adds the
//! multi-subpath [`PathVector`] value that effects consume and produce, the
//! `d` and `transform` attribute grammars, and the piecewise concatenation
//! used by effects that need cross-subpath context. Region booleans are
//! delegated to [`i_overlay`].

/// Boolean operations on filled regions.
pub mod boolop;
/// Error types for geometry parsing and queries.
pub mod error;
/// Number formatting shared by every textual grammar.
pub mod number;
/// Multi-subpath path values.
pub mod path;
/// Possibly discontinuous segment runs.
pub mod piecewise;
/// The `d` attribute grammar.
pub mod svgd;
/// The `transform` attribute grammar.
pub mod transform;

pub use boolop::{BoolOp, FLATTEN_TOLERANCE, FillRule, boolean, division};
pub use error::{GeomError, Result};
pub use kurbo::{Affine, CubicBez, Line, ParamCurve, ParamCurveArclen, ParamCurveExtrema, PathSeg, Point, Rect, Vec2};
pub use number::{fmt_number, fmt_point, parse_point};
pub use path::{ARCLEN_ACCURACY, PathVector, Subpath, segment_deriv};
pub use piecewise::Piecewise;
pub use svgd::{parse_d, write_d};
pub use transform::{parse_transform, reflection, write_transform};

/// Default distance under which two points are treated as coincident.
pub const EPSILON: f64 = 1e-6;
