//! The SVG `transform` attribute grammar.

use kurbo::{Affine, Point, Vec2};
use smallvec::SmallVec;

use crate::number::fmt_number;
use crate::{EPSILON, GeomError, Result};

/// Parses a transform list such as `translate(5,0) rotate(90)`.
///
/// The list composes left to right, so the rightmost function applies to
/// the geometry first. Empty text is the identity.
pub fn parse_transform(text: &str) -> Result<Affine> {
	let mut acc = Affine::IDENTITY;
	let mut rest = text.trim();
	while !rest.is_empty() {
		let open = rest.find('(').ok_or_else(|| invalid(text, "missing '('"))?;
		let close = rest.find(')').ok_or_else(|| invalid(text, "missing ')'"))?;
		if close < open {
			return Err(invalid(text, "unbalanced parentheses"));
		}
		let name = rest[..open].trim().trim_start_matches(',').trim();
		let args = parse_args(&rest[open + 1..close]).ok_or_else(|| invalid(text, "bad number"))?;
		acc *= function(name, &args).ok_or_else(|| invalid(text, "unknown function or arity"))?;
		rest = rest[close + 1..].trim_start_matches([' ', ',', '\t', '\n', '\r']);
	}
	Ok(acc)
}

/// Serializes a transform, or `None` for the identity.
///
/// Pure translations and axis-aligned scales use their short forms; anything
/// else is written as `matrix(...)`.
pub fn write_transform(affine: Affine) -> Option<String> {
	let [a, b, c, d, e, f] = affine.as_coeffs();
	let is_linear_identity =
		(a - 1.0).abs() < EPSILON && b.abs() < EPSILON && c.abs() < EPSILON && (d - 1.0).abs() < EPSILON;
	if is_linear_identity {
		if e.abs() < EPSILON && f.abs() < EPSILON {
			return None;
		}
		return Some(format!("translate({},{})", fmt_number(e), fmt_number(f)));
	}
	if b.abs() < EPSILON && c.abs() < EPSILON && e.abs() < EPSILON && f.abs() < EPSILON {
		return Some(format!("scale({},{})", fmt_number(a), fmt_number(d)));
	}
	Some(format!(
		"matrix({},{},{},{},{},{})",
		fmt_number(a),
		fmt_number(b),
		fmt_number(c),
		fmt_number(d),
		fmt_number(e),
		fmt_number(f)
	))
}

/// Reflection across the line through `start` and `end`. Coincident points
/// give the identity.
pub fn reflection(start: Point, end: Point) -> Affine {
	let dir = end - start;
	if dir.hypot() < EPSILON {
		return Affine::IDENTITY;
	}
	let angle = dir.atan2();
	let origin = start.to_vec2();
	Affine::translate(origin)
		* Affine::rotate(angle)
		* Affine::scale_non_uniform(1.0, -1.0)
		* Affine::rotate(-angle)
		* Affine::translate(-origin)
}

fn parse_args(text: &str) -> Option<SmallVec<[f64; 6]>> {
	text.split(|c: char| c == ',' || c.is_whitespace())
		.filter(|tok| !tok.is_empty())
		.map(|tok| tok.parse::<f64>().ok().filter(|v| v.is_finite()))
		.collect()
}

fn function(name: &str, args: &[f64]) -> Option<Affine> {
	match (name, args) {
		("matrix", &[a, b, c, d, e, f]) => Some(Affine::new([a, b, c, d, e, f])),
		("translate", &[tx]) => Some(Affine::translate(Vec2::new(tx, 0.0))),
		("translate", &[tx, ty]) => Some(Affine::translate(Vec2::new(tx, ty))),
		("scale", &[s]) => Some(Affine::scale(s)),
		("scale", &[sx, sy]) => Some(Affine::scale_non_uniform(sx, sy)),
		("rotate", &[deg]) => Some(Affine::rotate(deg.to_radians())),
		("rotate", &[deg, cx, cy]) => Some(Affine::rotate_about(deg.to_radians(), Point::new(cx, cy))),
		("skewX", &[deg]) => Some(Affine::new([1.0, 0.0, deg.to_radians().tan(), 1.0, 0.0, 0.0])),
		("skewY", &[deg]) => Some(Affine::new([1.0, deg.to_radians().tan(), 0.0, 1.0, 0.0, 0.0])),
		_ => None,
	}
}

fn invalid(text: &str, reason: &str) -> GeomError {
	GeomError::InvalidTransform {
		text: text.to_string(),
		reason: reason.to_string(),
	}
}
