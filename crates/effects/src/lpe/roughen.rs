//! Subdivides segments and jitters the resulting nodes.
//!
//! Randomness comes from seeded [`RandomParam`]s that restart on every
//! recompute, so the same parameters always give the same outline.

use livepath_geom::{CubicBez, EPSILON, Line, ParamCurve, ParamCurveArclen, PathSeg, PathVector, Subpath, Vec2};

use crate::Result;
use crate::context::EffectContext;
use crate::effect::{Effect, EffectCommon};
use crate::param::{BoolParam, EnumData, EnumParam, Parameter, RandomParam, ScalarParam};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DivisionMethod {
	/// Pieces no longer than `max_segment_size`.
	Size,
	/// A fixed number of pieces per segment.
	Segments,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleMethod {
	Along,
	Rand,
	Retract,
}

static DIVISIONS: &[EnumData<DivisionMethod>] = &[
	EnumData {
		value: DivisionMethod::Size,
		key: "size",
		label: "By max. segment size",
	},
	EnumData {
		value: DivisionMethod::Segments,
		key: "segments",
		label: "By number of segments",
	},
];

static HANDLES: &[EnumData<HandleMethod>] = &[
	EnumData {
		value: HandleMethod::Along,
		key: "along",
		label: "Along nodes",
	},
	EnumData {
		value: HandleMethod::Rand,
		key: "rand",
		label: "Random",
	},
	EnumData {
		value: HandleMethod::Retract,
		key: "retract",
		label: "Retract",
	},
];

#[derive(Debug)]
pub struct Roughen {
	common: EffectCommon,
	method: EnumParam<DivisionMethod>,
	max_segment_size: ScalarParam,
	segments: ScalarParam,
	displace_x: RandomParam,
	displace_y: RandomParam,
	global_randomize: RandomParam,
	handles: EnumParam<HandleMethod>,
	shift_nodes: BoolParam,
	fixed_displacement: BoolParam,
}

impl Default for Roughen {
	fn default() -> Self {
		Self::new()
	}
}

fn as_cubic(seg: PathSeg) -> CubicBez {
	match seg {
		PathSeg::Line(line) => {
			let step = (line.p1 - line.p0) / 3.0;
			CubicBez::new(line.p0, line.p0 + step, line.p1 - step, line.p1)
		}
		PathSeg::Quad(quad) => quad.raise(),
		PathSeg::Cubic(cubic) => cubic,
	}
}

impl Roughen {
	pub fn new() -> Self {
		Self {
			common: EffectCommon::new(),
			method: EnumParam::new("method", DIVISIONS, DivisionMethod::Size),
			max_segment_size: ScalarParam::new("max_segment_size", 10.0).with_range(0.0, f64::MAX),
			segments: ScalarParam::new("segments", 2.0).with_range(1.0, 9999.0).integer(),
			displace_x: RandomParam::new("displace_x", 10.0, 0).with_random_sign(true),
			displace_y: RandomParam::new("displace_y", 10.0, 2917).with_random_sign(true),
			global_randomize: RandomParam::new("global_randomize", 1.0, 6323).with_range(0.0, f64::MAX),
			handles: EnumParam::new("handles", HANDLES, HandleMethod::Along),
			shift_nodes: BoolParam::new("shift_nodes", true),
			fixed_displacement: BoolParam::new("fixed_displacement", false),
		}
	}

	fn pieces(&self, seg: PathSeg) -> usize {
		match self.method.get() {
			DivisionMethod::Segments => self.segments.get_usize().max(1),
			DivisionMethod::Size => {
				let size = self.max_segment_size.get();
				if size <= EPSILON {
					return 1;
				}
				(seg.arclen(livepath_geom::ARCLEN_ACCURACY) / size).ceil().max(1.0) as usize
			}
		}
	}

	fn displacement(&mut self) -> Vec2 {
		let scale = self.global_randomize.next();
		Vec2::new(self.displace_x.next(), self.displace_y.next()) * scale
	}

	/// Random handle offset for a piece whose chord is `chord` long.
	fn handle_offset(&mut self, chord: f64) -> Vec2 {
		let jitter = self.displacement();
		if !self.fixed_displacement.get() {
			return jitter;
		}
		if jitter.hypot() <= EPSILON {
			return Vec2::new(chord / 3.0, 0.0);
		}
		jitter.normalize() * (chord / 3.0)
	}

	/// Restarts every random stream and roughens the whole outline.
	pub fn roughen(&mut self, input: &PathVector) -> PathVector {
		self.displace_x.reset_randomizer();
		self.displace_y.reset_randomizer();
		self.global_randomize.reset_randomizer();
		input.iter().map(|sp| self.roughen_subpath(sp)).collect()
	}

	fn roughen_subpath(&mut self, sp: &Subpath) -> Subpath {
		if sp.is_empty() {
			return sp.clone();
		}
		let mut pieces: Vec<CubicBez> = Vec::new();
		// Whether the node ending each piece was a node of the input.
		let mut original: Vec<bool> = Vec::new();
		for seg in sp.segments() {
			let n = self.pieces(*seg);
			for i in 0..n {
				let range = i as f64 / n as f64..(i + 1) as f64 / n as f64;
				pieces.push(as_cubic(seg.subsegment(range)));
				original.push(i + 1 == n);
			}
		}

		let shift_nodes = self.shift_nodes.get();
		let closed = sp.is_closed();
		let start_shift = if shift_nodes {
			self.displacement()
		} else {
			Vec2::ZERO
		};
		let mut shifts = vec![start_shift];
		for (index, is_original) in original.iter().enumerate() {
			let last = index + 1 == original.len();
			let shift = if closed && last {
				start_shift
			} else if *is_original && !shift_nodes {
				Vec2::ZERO
			} else {
				self.displacement()
			};
			shifts.push(shift);
		}

		let handles = self.handles.get();
		let mut out = Subpath::new(sp.start() + start_shift);
		for (index, piece) in pieces.into_iter().enumerate() {
			let (d0, d1) = (shifts[index], shifts[index + 1]);
			let p0 = out.end();
			let p3 = piece.p3 + d1;
			let seg = match handles {
				HandleMethod::Retract => PathSeg::Line(Line::new(p0, p3)),
				HandleMethod::Along => PathSeg::Cubic(CubicBez::new(p0, piece.p1 + d0, piece.p2 + d1, p3)),
				HandleMethod::Rand => {
					let chord = p0.distance(p3);
					let h0 = self.handle_offset(chord);
					let h1 = self.handle_offset(chord);
					PathSeg::Cubic(CubicBez::new(p0, piece.p1 + d0 + h0, piece.p2 + d1 + h1, p3))
				}
			};
			out.push(seg);
		}
		if closed {
			out.close();
		}
		out
	}
}

impl Effect for Roughen {
	fn key(&self) -> &'static str {
		"roughen"
	}

	fn common(&self) -> &EffectCommon {
		&self.common
	}

	fn common_mut(&mut self) -> &mut EffectCommon {
		&mut self.common
	}

	fn params(&self) -> Vec<&dyn Parameter> {
		crate::params![
			&self.method,
			&self.max_segment_size,
			&self.segments,
			&self.displace_x,
			&self.displace_y,
			&self.global_randomize,
			&self.handles,
			&self.shift_nodes,
			&self.fixed_displacement,
		]
	}

	fn params_mut(&mut self) -> Vec<&mut dyn Parameter> {
		crate::params_mut![
			&mut self.method,
			&mut self.max_segment_size,
			&mut self.segments,
			&mut self.displace_x,
			&mut self.displace_y,
			&mut self.global_randomize,
			&mut self.handles,
			&mut self.shift_nodes,
			&mut self.fixed_displacement,
		]
	}

	fn do_effect(&mut self, input: &PathVector, _cx: &EffectContext<'_>) -> Result<PathVector> {
		Ok(self.roughen(input))
	}
}
