//! Reading and writing the `d` attribute.
//!
//! Parsing accepts the full SVG path grammar (absolute and relative
//! `M L H V C S Q T A Z`), delegating to kurbo; arcs become cubics. Writing
//! always emits absolute commands with shortest round-trip numbers, which is
//! the form persisted documents carry.

use kurbo::{BezPath, PathEl};

use crate::number::fmt_number;
use crate::{GeomError, PathVector, Result};

/// Parses `d` attribute text. Empty or whitespace-only text is an empty path.
pub fn parse_d(text: &str) -> Result<PathVector> {
	if text.trim().is_empty() {
		return Ok(PathVector::new());
	}
	let path = BezPath::from_svg(text).map_err(|e| GeomError::InvalidPathData(e.to_string()))?;
	Ok(PathVector::from_bezpath(&path))
}

/// Serializes a path vector as `d` attribute text.
pub fn write_d(path: &PathVector) -> String {
	let mut out = String::new();
	for el in path.to_bezpath().elements() {
		if !out.is_empty() {
			out.push(' ');
		}
		match *el {
			PathEl::MoveTo(p) => push_cmd(&mut out, 'M', &[p.x, p.y]),
			PathEl::LineTo(p) => push_cmd(&mut out, 'L', &[p.x, p.y]),
			PathEl::QuadTo(p1, p2) => push_cmd(&mut out, 'Q', &[p1.x, p1.y, p2.x, p2.y]),
			PathEl::CurveTo(p1, p2, p3) => {
				push_cmd(&mut out, 'C', &[p1.x, p1.y, p2.x, p2.y, p3.x, p3.y])
			}
			PathEl::ClosePath => out.push('Z'),
		}
	}
	out
}

fn push_cmd(out: &mut String, cmd: char, coords: &[f64]) {
	out.push(cmd);
	for pair in coords.chunks(2) {
		out.push(' ');
		out.push_str(&fmt_number(pair[0]));
		out.push(',');
		out.push_str(&fmt_number(pair[1]));
	}
}
