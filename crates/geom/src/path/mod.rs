use kurbo::{
	Affine, BezPath, CubicBez, Line, ParamCurve, ParamCurveArclen, ParamCurveDeriv,
	ParamCurveExtrema, PathEl, PathSeg, Point, Rect, Vec2,
};

use crate::EPSILON;


/// Accuracy passed to kurbo's arc-length queries.
pub const ARCLEN_ACCURACY: f64 = 1e-6;

/// One contiguous run of segments.
///
/// A closed subpath always ends where it starts: when the source data closes
/// with a gap, the closing line is stored as the last segment. Node counts
/// follow that convention, so a closed rectangle has four nodes and four
/// segments while an open polyline through four points has three segments.
#[derive(Debug, Clone, PartialEq)]
pub struct Subpath {
	start: Point,
	segments: Vec<PathSeg>,
	closed: bool,
}

impl Subpath {
	/// Creates an empty open subpath at `start`.
	pub fn new(start: Point) -> Self {
		Self {
			start,
			segments: Vec::new(),
			closed: false,
		}
	}

	/// Builds a subpath from consecutive segments.
	///
	/// Closing appends a straight segment back to `start` when the last
	/// segment does not already end there.
	pub fn from_segments(start: Point, segments: Vec<PathSeg>, closed: bool) -> Self {
		let mut path = Self {
			start,
			segments,
			closed: false,
		};
		if closed {
			path.close();
		}
		path
	}

	pub fn start(&self) -> Point {
		self.start
	}

	pub fn end(&self) -> Point {
		self.segments.last().map_or(self.start, |seg| seg.end())
	}

	pub fn segments(&self) -> &[PathSeg] {
		&self.segments
	}

	pub fn into_segments(self) -> Vec<PathSeg> {
		self.segments
	}

	pub fn is_closed(&self) -> bool {
		self.closed
	}

	/// Number of segments, including an explicit closing segment.
	pub fn len(&self) -> usize {
		self.segments.len()
	}

	pub fn is_empty(&self) -> bool {
		self.segments.is_empty()
	}

	/// Closes the subpath, adding a closing line if the ends are apart.
	pub fn close(&mut self) {
		if self.end().distance(self.start) > EPSILON {
			self.segments.push(PathSeg::Line(Line::new(self.end(), self.start)));
		}
		self.closed = true;
	}

	/// Marks the subpath open without removing any segment.
	pub fn set_open(&mut self) {
		self.closed = false;
	}

	/// Appends a segment. The segment should start at [`Self::end`].
	pub fn push(&mut self, seg: PathSeg) {
		self.segments.push(seg);
	}

	pub fn line_to(&mut self, p: Point) {
		let from = self.end();
		self.push(PathSeg::Line(Line::new(from, p)));
	}

	pub fn curve_to(&mut self, p1: Point, p2: Point, p3: Point) {
		let from = self.end();
		self.push(PathSeg::Cubic(CubicBez::new(from, p1, p2, p3)));
	}

	/// Number of editable nodes.
	pub fn node_count(&self) -> usize {
		if self.closed && !self.segments.is_empty() {
			self.segments.len()
		} else {
			self.segments.len() + 1
		}
	}

	/// Positions of the editable nodes in order.
	pub fn nodes(&self) -> Vec<Point> {
		let mut nodes: Vec<Point> = self.segments.iter().map(|seg| seg.start()).collect();
		if !self.closed || self.segments.is_empty() {
			nodes.push(self.end());
		}
		nodes
	}

	/// Total arc length.
	pub fn length(&self) -> f64 {
		self.segments.iter().map(|seg| seg.arclen(ARCLEN_ACCURACY)).sum()
	}

	/// Returns true when the subpath has no measurable extent.
	pub fn is_degenerate(&self) -> bool {
		self.length() <= EPSILON
	}

	/// Returns the point at path time `t`, where the integer part selects
	/// the segment and the fraction the position on it.
	pub fn point_at(&self, t: f64) -> Point {
		if self.segments.is_empty() {
			return self.start;
		}
		let (index, local) = self.split_time(t);
		self.segments[index].eval(local)
	}

	/// Returns the derivative at path time `t` with respect to the local
	/// segment parameter.
	pub fn tangent_at(&self, t: f64) -> Vec2 {
		if self.segments.is_empty() {
			return Vec2::ZERO;
		}
		let (index, local) = self.split_time(t);
		segment_deriv(self.segments[index], local)
	}

	/// Returns the path time at arc length `distance` from the start.
	pub fn time_at_length(&self, distance: f64) -> f64 {
		let mut remaining = distance.max(0.0);
		for (index, seg) in self.segments.iter().enumerate() {
			let len = seg.arclen(ARCLEN_ACCURACY);
			if remaining <= len {
				let local = if len > 0.0 {
					seg.inv_arclen(remaining, ARCLEN_ACCURACY)
				} else {
					0.0
				};
				return index as f64 + local;
			}
			remaining -= len;
		}
		self.segments.len() as f64
	}

	/// Extracts the open portion between two path times.
	pub fn portion(&self, from: f64, to: f64) -> Subpath {
		if self.segments.is_empty() || to <= from {
			return Subpath::new(self.point_at(from));
		}
		let (first, first_t) = self.split_time(from);
		let (mut last, mut last_t) = self.split_time(to);
		if last > first && last_t == 0.0 {
			last -= 1;
			last_t = 1.0;
		}
		let mut out = Subpath::new(self.segments[first].eval(first_t));
		if first == last {
			out.push(self.segments[first].subsegment(first_t..last_t));
			return out;
		}
		out.push(self.segments[first].subsegment(first_t..1.0));
		for seg in &self.segments[first + 1..last] {
			out.push(*seg);
		}
		out.push(self.segments[last].subsegment(0.0..last_t));
		out
	}

	/// Sorted path times where the subpath meets `line`. A crossing at a
	/// node shared by two segments is reported once.
	pub fn line_crossings(&self, line: Line) -> Vec<f64> {
		let mut times: Vec<f64> = self
			.segments
			.iter()
			.enumerate()
			.flat_map(|(index, seg)| {
				seg.intersect_line(line)
					.into_iter()
					.map(move |hit| index as f64 + hit.segment_t)
			})
			.collect();
		times.sort_by(f64::total_cmp);
		times.dedup_by(|a, b| (*a - *b).abs() < EPSILON);
		times
	}

	/// Returns the subpath traversed backwards.
	pub fn reversed(&self) -> Subpath {
		Subpath {
			start: self.end(),
			segments: self.segments.iter().rev().map(|seg| seg.reverse()).collect(),
			closed: self.closed,
		}
	}

	/// Returns the subpath mapped through `affine`.
	pub fn transformed(&self, affine: Affine) -> Subpath {
		Subpath {
			start: affine * self.start,
			segments: self.segments.iter().map(|seg| affine * *seg).collect(),
			closed: self.closed,
		}
	}

	/// Tight bounding box.
	pub fn bounding_box(&self) -> Rect {
		self.segments
			.iter()
			.fold(Rect::from_points(self.start, self.start), |acc, seg| {
				acc.union(seg.bounding_box())
			})
	}

	fn split_time(&self, t: f64) -> (usize, f64) {
		let n = self.segments.len();
		let t = t.clamp(0.0, n as f64);
		let index = (t.floor() as usize).min(n - 1);
		(index, t - index as f64)
	}

	fn append_to(&self, out: &mut BezPath) {
		out.move_to(self.start);
		let count = self.segments.len();
		for (i, seg) in self.segments.iter().enumerate() {
			let implicit_close = self.closed
				&& i + 1 == count
				&& matches!(seg, PathSeg::Line(line) if line.p1.distance(self.start) <= EPSILON);
			if implicit_close {
				continue;
			}
			match seg {
				PathSeg::Line(line) => out.line_to(line.p1),
				PathSeg::Quad(quad) => out.quad_to(quad.p1, quad.p2),
				PathSeg::Cubic(cubic) => out.curve_to(cubic.p1, cubic.p2, cubic.p3),
			}
		}
		if self.closed {
			out.close_path();
		}
	}
}

/// Derivative of a single segment at `t`.
pub fn segment_deriv(seg: PathSeg, t: f64) -> Vec2 {
	match seg {
		PathSeg::Line(line) => line.p1 - line.p0,
		PathSeg::Quad(quad) => quad.deriv().eval(t).to_vec2(),
		PathSeg::Cubic(cubic) => cubic.deriv().eval(t).to_vec2(),
	}
}

/// An ordered list of subpaths, the value that flows through an effect stack.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PathVector(Vec<Subpath>);

impl PathVector {
	pub fn new() -> Self {
		Self::default()
	}

	/// Splits a kurbo path into subpaths.
	pub fn from_bezpath(path: &BezPath) -> Self {
		let mut out = Vec::new();
		let mut current: Option<Subpath> = None;
		let mut last_start = Point::ZERO;
		for el in path.elements() {
			match *el {
				PathEl::MoveTo(p) => {
					out.extend(current.take());
					current = Some(Subpath::new(p));
					last_start = p;
				}
				PathEl::ClosePath => {
					if let Some(mut sp) = current.take() {
						sp.close();
						out.push(sp);
					}
				}
				ref drawing => {
					let sp = current.get_or_insert_with(|| Subpath::new(last_start));
					let from = sp.end();
					let seg = match *drawing {
						PathEl::LineTo(p) => PathSeg::Line(Line::new(from, p)),
						PathEl::QuadTo(p1, p2) => PathSeg::Quad(kurbo::QuadBez::new(from, p1, p2)),
						PathEl::CurveTo(p1, p2, p3) => PathSeg::Cubic(CubicBez::new(from, p1, p2, p3)),
						PathEl::MoveTo(_) | PathEl::ClosePath => continue,
					};
					sp.push(seg);
				}
			}
		}
		out.extend(current);
		Self(out)
	}

	pub fn to_bezpath(&self) -> BezPath {
		let mut out = BezPath::new();
		for sp in &self.0 {
			sp.append_to(&mut out);
		}
		out
	}

	pub fn subpaths(&self) -> &[Subpath] {
		&self.0
	}

	pub fn into_subpaths(self) -> Vec<Subpath> {
		self.0
	}

	pub fn iter(&self) -> std::slice::Iter<'_, Subpath> {
		self.0.iter()
	}

	pub fn len(&self) -> usize {
		self.0.len()
	}

	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}

	pub fn push(&mut self, sp: Subpath) {
		self.0.push(sp);
	}

	/// Appends every subpath of `other`.
	pub fn extend_from(&mut self, other: &PathVector) {
		self.0.extend(other.0.iter().cloned());
	}

	/// Total node count across subpaths.
	pub fn node_count(&self) -> usize {
		self.0.iter().map(Subpath::node_count).sum()
	}

	/// Total segment count across subpaths.
	pub fn curve_count(&self) -> usize {
		self.0.iter().map(Subpath::len).sum()
	}

	pub fn length(&self) -> f64 {
		self.0.iter().map(Subpath::length).sum()
	}

	/// Returns true when no subpath has measurable extent.
	pub fn is_degenerate(&self) -> bool {
		self.0.iter().all(Subpath::is_degenerate)
	}

	pub fn transformed(&self, affine: Affine) -> PathVector {
		Self(self.0.iter().map(|sp| sp.transformed(affine)).collect())
	}

	/// Reverses every subpath and their order.
	pub fn reversed(&self) -> PathVector {
		Self(self.0.iter().rev().map(Subpath::reversed).collect())
	}

	pub fn bounding_box(&self) -> Option<Rect> {
		self.0.iter().map(Subpath::bounding_box).reduce(|a, b| a.union(b))
	}
}

impl From<Vec<Subpath>> for PathVector {
	fn from(value: Vec<Subpath>) -> Self {
		Self(value)
	}
}

impl FromIterator<Subpath> for PathVector {
	fn from_iter<T: IntoIterator<Item = Subpath>>(iter: T) -> Self {
		Self(iter.into_iter().collect())
	}
}

impl IntoIterator for PathVector {
	type Item = Subpath;
	type IntoIter = std::vec::IntoIter<Subpath>;

	fn into_iter(self) -> Self::IntoIter {
		self.0.into_iter()
	}
}

impl<'a> IntoIterator for &'a PathVector {
	type Item = &'a Subpath;
	type IntoIter = std::slice::Iter<'a, Subpath>;

	fn into_iter(self) -> Self::IntoIter {
		self.0.iter()
	}
}
