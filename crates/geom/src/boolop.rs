//! Boolean operations on filled regions.
//!
//! Both operands are flattened to polygons, resolved under their own fill
//! rule and then clipped with [`i_overlay`]. Results are closed polylines.

use std::mem;

use i_overlay::core::fill_rule::FillRule as OverlayFill;
use i_overlay::core::overlay_rule::OverlayRule;
use i_overlay::float::single::SingleFloatOverlay;
use kurbo::{PathEl, Point};
use tracing::trace;

use crate::{PathVector, Subpath};

/// Largest distance between a curve and its flattened polygon.
pub const FLATTEN_TOLERANCE: f64 = 0.1;

type Contour = Vec<[f64; 2]>;

/// How overlapping contours of one operand decide what is inside.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FillRule {
	#[default]
	EvenOdd,
	NonZero,
	/// Only regions with a positive winding number.
	Positive,
}

impl FillRule {
	/// Reads a CSS `fill-rule` value. Anything unknown is non-zero.
	pub fn from_css(value: Option<&str>) -> Self {
		match value.map(str::trim) {
			Some("evenodd") => FillRule::EvenOdd,
			_ => FillRule::NonZero,
		}
	}

	fn overlay(self) -> OverlayFill {
		match self {
			FillRule::EvenOdd => OverlayFill::EvenOdd,
			FillRule::NonZero => OverlayFill::NonZero,
			FillRule::Positive => OverlayFill::Positive,
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoolOp {
	Union,
	Intersection,
	/// The subject minus the clip.
	Difference,
	Xor,
}

impl BoolOp {
	fn overlay(self) -> OverlayRule {
		match self {
			BoolOp::Union => OverlayRule::Union,
			BoolOp::Intersection => OverlayRule::Intersect,
			BoolOp::Difference => OverlayRule::Difference,
			BoolOp::Xor => OverlayRule::Xor,
		}
	}
}

/// Polygon contours of every subpath. Open subpaths are treated as closed.
pub fn flatten(pv: &PathVector, tolerance: f64) -> Vec<Vec<[f64; 2]>> {
	let mut contours = Vec::new();
	let mut current: Contour = Vec::new();
	pv.to_bezpath().flatten(tolerance, |el| match el {
		PathEl::MoveTo(p) => {
			push_contour(&mut contours, mem::take(&mut current));
			current.push([p.x, p.y]);
		}
		PathEl::LineTo(p) => current.push([p.x, p.y]),
		_ => {}
	});
	push_contour(&mut contours, current);
	contours
}

fn push_contour(contours: &mut Vec<Contour>, mut contour: Contour) {
	if contour.len() > 1 && contour.first() == contour.last() {
		contour.pop();
	}
	if contour.len() > 2 {
		contours.push(contour);
	}
}

/// The area `pv` covers under `fill`, as non-overlapping contours.
fn region(pv: &PathVector, fill: FillRule, tolerance: f64) -> Vec<Contour> {
	let contours = flatten(pv, tolerance);
	let none: Vec<Contour> = Vec::new();
	contours
		.overlay(&none, OverlayRule::Subject, fill.overlay())
		.into_iter()
		.flatten()
		.collect()
}

fn to_path_vector(contours: impl IntoIterator<Item = Contour>) -> PathVector {
	contours
		.into_iter()
		.filter(|c| c.len() > 2)
		.map(|contour| {
			let mut points = contour.into_iter().map(|[x, y]| Point::new(x, y));
			let start = points.next().unwrap_or(Point::ZERO);
			let mut sp = Subpath::new(start);
			for p in points {
				sp.line_to(p);
			}
			sp.close();
			sp
		})
		.collect()
}

/// Combines two regions. Each operand is resolved under its own rule first.
pub fn boolean(
	subject: &PathVector,
	subject_fill: FillRule,
	clip: &PathVector,
	clip_fill: FillRule,
	op: BoolOp,
	tolerance: f64,
) -> PathVector {
	let subject = region(subject, subject_fill, tolerance);
	let clip = region(clip, clip_fill, tolerance);
	let shapes = subject.overlay(&clip, op.overlay(), OverlayFill::EvenOdd);
	trace!(?op, shapes = shapes.len(), "boolean operation");
	to_path_vector(shapes.into_iter().flatten())
}

/// Splits the subject along the clip outline: the pieces inside the clip
/// followed by the pieces outside it.
pub fn division(
	subject: &PathVector,
	subject_fill: FillRule,
	clip: &PathVector,
	clip_fill: FillRule,
	tolerance: f64,
) -> PathVector {
	let mut out = boolean(subject, subject_fill, clip, clip_fill, BoolOp::Intersection, tolerance);
	out.extend_from(&boolean(subject, subject_fill, clip, clip_fill, BoolOp::Difference, tolerance));
	out
}

#[cfg(test)]
mod tests {
	use kurbo::{Circle, Shape};
	use pretty_assertions::assert_eq;
	use rstest::rstest;

	use super::*;
	use crate::parse_d;

	const LEFT: &str = "M 0,0 L 10,0 L 10,10 L 0,10 Z";
	const RIGHT: &str = "M 5,0 L 15,0 L 15,10 L 5,10 Z";

	fn area(pv: &PathVector) -> f64 {
		pv.to_bezpath().area().abs()
	}

	fn run(op: BoolOp) -> PathVector {
		let a = parse_d(LEFT).unwrap();
		let b = parse_d(RIGHT).unwrap();
		boolean(&a, FillRule::NonZero, &b, FillRule::NonZero, op, FLATTEN_TOLERANCE)
	}

	#[rstest]
	#[case(BoolOp::Union, 150.0, 1)]
	#[case(BoolOp::Intersection, 50.0, 1)]
	#[case(BoolOp::Difference, 50.0, 1)]
	#[case(BoolOp::Xor, 100.0, 2)]
	fn overlapping_squares(#[case] op: BoolOp, #[case] expected: f64, #[case] pieces: usize) {
		let out = run(op);
		assert!((area(&out) - expected).abs() < 1e-3, "{op:?} gave area {}", area(&out));
		assert_eq!(out.len(), pieces);
		assert!(out.iter().all(Subpath::is_closed));
	}

	#[test]
	fn difference_keeps_the_subject_side() {
		let bbox = run(BoolOp::Difference).bounding_box().unwrap();
		assert!(bbox.x0.abs() < 1e-3 && (bbox.x1 - 5.0).abs() < 1e-3, "{bbox:?}");
	}

	#[test]
	fn fill_rule_decides_holes() {
		let ring = parse_d("M 0,0 L 10,0 L 10,10 L 0,10 Z M 2,2 L 8,2 L 8,8 L 2,8 Z").unwrap();
		let all = parse_d("M -1,-1 L 11,-1 L 11,11 L -1,11 Z").unwrap();
		let even = boolean(&ring, FillRule::EvenOdd, &all, FillRule::NonZero, BoolOp::Intersection, 0.1);
		let nonzero = boolean(&ring, FillRule::NonZero, &all, FillRule::NonZero, BoolOp::Intersection, 0.1);
		assert!((area(&even) - 64.0).abs() < 1e-3);
		assert!((area(&nonzero) - 100.0).abs() < 1e-3);
	}

	#[test]
	fn division_returns_both_sides() {
		let a = parse_d(LEFT).unwrap();
		let b = parse_d(RIGHT).unwrap();
		let out = division(&a, FillRule::NonZero, &b, FillRule::NonZero, FLATTEN_TOLERANCE);
		assert_eq!(out.len(), 2);
		let inside = out.subpaths()[0].bounding_box();
		let outside = out.subpaths()[1].bounding_box();
		assert!((inside.x0 - 5.0).abs() < 1e-3 && (inside.x1 - 10.0).abs() < 1e-3, "{inside:?}");
		assert!(outside.x0.abs() < 1e-3 && (outside.x1 - 5.0).abs() < 1e-3, "{outside:?}");
	}

	#[test]
	fn curves_are_flattened_within_tolerance() {
		let circle = PathVector::from_bezpath(&Circle::new((0.0, 0.0), 10.0).to_path(1e-3));
		let contours = flatten(&circle, 0.01);
		assert_eq!(contours.len(), 1);
		assert!(contours[0].len() > 16);
		for [x, y] in &contours[0] {
			let r = (x * x + y * y).sqrt();
			assert!((r - 10.0).abs() < 0.02, "vertex at radius {r}");
		}
	}

	#[test]
	fn open_and_degenerate_input() {
		let line = parse_d("M 0,0 L 10,0").unwrap();
		assert!(flatten(&line, 0.1).is_empty());
		let empty = PathVector::new();
		let square = parse_d(LEFT).unwrap();
		let out = boolean(&square, FillRule::NonZero, &empty, FillRule::NonZero, BoolOp::Union, 0.1);
		assert!((area(&out) - 100.0).abs() < 1e-3);
	}
}
