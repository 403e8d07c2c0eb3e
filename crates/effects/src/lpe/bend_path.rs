//! Bends an item along a skeleton path.
//!
//! The item's x axis is stretched over the skeleton's arc length and its y
//! axis follows the skeleton normal, measured from the middle of the item's
//! bounds.

use livepath_geom::{
	Affine, CubicBez, EPSILON, ParamCurve, ParamCurveExtrema, PathSeg, PathVector, Piecewise, Point, Rect, Subpath, Vec2, segment_deriv,
};
use tracing::trace;

use crate::context::EffectContext;
use crate::effect::{Effect, EffectCommon};
use crate::param::{BoolParam, Parameter, PathParam, ScalarParam};
use crate::{EffectError, Result};

/// Cubic pieces emitted per input segment.
const PIECES: usize = 8;
/// Step of the numeric derivative of the bend map, in segment time.
const STEP: f64 = 1e-4;

#[derive(Debug)]
pub struct BendPath {
	common: EffectCommon,
	bendpath: PathParam,
	prop_scale: ScalarParam,
	scale_y_rel: BoolParam,
	vertical: BoolParam,
	bounds: Option<Rect>,
}

impl Default for BendPath {
	fn default() -> Self {
		Self::new()
	}
}

struct Bend<'a> {
	skeleton: &'a Subpath,
	length: f64,
	x0: f64,
	y_mid: f64,
	sx: f64,
	sy: f64,
}

impl Bend<'_> {
	fn frame(&self, s: f64) -> (Point, Vec2) {
		let clamped = s.clamp(0.0, self.length);
		let t = self.skeleton.time_at_length(clamped);
		let tangent = self.skeleton.tangent_at(t);
		let tangent = if tangent.hypot() > EPSILON {
			tangent.normalize()
		} else {
			Vec2::new(1.0, 0.0)
		};
		(self.skeleton.point_at(t) + tangent * (s - clamped), tangent)
	}

	fn map(&self, p: Point) -> Point {
		let (on, tangent) = self.frame((p.x - self.x0) * self.sx);
		let normal = Vec2::new(-tangent.y, tangent.x);
		on + normal * ((p.y - self.y_mid) * self.sy)
	}

	/// Image of `seg` as Hermite-fitted cubics.
	fn map_segment(&self, seg: PathSeg, out: &mut Vec<PathSeg>) {
		let dt = 1.0 / PIECES as f64;
		let point_and_deriv = |t: f64| {
			let p = seg.eval(t);
			let d = segment_deriv(seg, t) * dt;
			let ahead = self.map(p + d * STEP);
			let behind = self.map(p - d * STEP);
			(self.map(p), (ahead - behind) / (2.0 * STEP))
		};
		let (mut p0, mut d0) = point_and_deriv(0.0);
		for i in 1..=PIECES {
			let (p3, d3) = point_and_deriv(i as f64 * dt);
			out.push(PathSeg::Cubic(CubicBez::new(p0, p0 + d0 / 3.0, p3 - d3 / 3.0, p3)));
			p0 = p3;
			d0 = d3;
		}
	}
}

impl BendPath {
	pub fn new() -> Self {
		Self {
			common: EffectCommon::new().with_concatenate(),
			bendpath: PathParam::new("bendpath", "M 0,0 L 1,0"),
			prop_scale: ScalarParam::new("prop_scale", 1.0).with_digits(3).with_increments(0.01, 0.1),
			scale_y_rel: BoolParam::new("scale_y_rel", false),
			vertical: BoolParam::new("vertical", false),
			bounds: None,
		}
	}

	pub fn bend_path(&self) -> &PathParam {
		&self.bendpath
	}

	pub fn bend_path_mut(&mut self) -> &mut PathParam {
		&mut self.bendpath
	}

	fn pattern_transform(&self) -> Affine {
		if self.vertical.get() {
			Affine::rotate(std::f64::consts::FRAC_PI_2)
		} else {
			Affine::IDENTITY
		}
	}
}

impl Effect for BendPath {
	fn key(&self) -> &'static str {
		"bend_path"
	}

	fn common(&self) -> &EffectCommon {
		&self.common
	}

	fn common_mut(&mut self) -> &mut EffectCommon {
		&mut self.common
	}

	fn params(&self) -> Vec<&dyn Parameter> {
		crate::params![&self.bendpath, &self.prop_scale, &self.scale_y_rel, &self.vertical]
	}

	fn params_mut(&mut self) -> Vec<&mut dyn Parameter> {
		crate::params_mut![
			&mut self.bendpath,
			&mut self.prop_scale,
			&mut self.scale_y_rel,
			&mut self.vertical,
		]
	}

	fn on_before_effect(&mut self, _cx: &mut EffectContext<'_>, input: &PathVector) -> Result<()> {
		self.bounds = input.transformed(self.pattern_transform()).bounding_box();
		Ok(())
	}

	fn do_effect_pwd2(&mut self, input: Piecewise, _cx: &EffectContext<'_>) -> Result<Piecewise> {
		let Some(skeleton) = self.bendpath.geometry().and_then(|pv| pv.iter().find(|sp| !sp.is_empty())) else {
			trace!("no skeleton, leaving geometry unchanged");
			return Ok(input);
		};
		let length = skeleton.length();
		if length <= EPSILON {
			return Err(EffectError::Degenerate("bend path skeleton has no length"));
		}
		let pattern = self.pattern_transform();
		let segments: Vec<PathSeg> = input.segments().iter().map(|seg| pattern * *seg).collect();
		let bounds = self.bounds.or_else(|| {
			segments
				.iter()
				.map(|seg| seg.bounding_box())
				.reduce(|a, b| a.union(b))
		});
		let Some(bounds) = bounds else {
			return Ok(input);
		};
		if bounds.width() <= EPSILON {
			return Err(EffectError::Degenerate("bent geometry has no width"));
		}
		let sx = length / bounds.width();
		let mut sy = self.prop_scale.get();
		if self.scale_y_rel.get() {
			sy *= sx;
		}
		let bend = Bend {
			skeleton,
			length,
			x0: bounds.x0,
			y_mid: bounds.center().y,
			sx,
			sy,
		};
		let mut out = Vec::with_capacity(segments.len() * PIECES);
		for seg in segments {
			bend.map_segment(seg, &mut out);
		}
		Ok(Piecewise::new(out))
	}
}

#[cfg(test)]
mod tests {
	use livepath_geom::parse_d;

	use super::*;

	fn bend(skeleton: &str, input: &str, vertical: bool) -> Piecewise {
		bend_measured(skeleton, input, vertical, true)
	}

	/// Without `measured` the effect falls back to the extent of the
	/// segments it is handed.
	fn bend_measured(skeleton: &str, input: &str, vertical: bool, measured: bool) -> Piecewise {
		let mut effect = BendPath::new();
		effect.bendpath.set_inline(parse_d(skeleton).unwrap());
		effect.vertical.set(vertical);
		let input = parse_d(input).unwrap();
		if measured {
			effect.bounds = input.transformed(effect.pattern_transform()).bounding_box();
		}
		let mut doc = livepath_document::Document::new();
		let root = doc.root();
		let geometry = rustc_hash::FxHashMap::default();
		let recompute = crate::RecomputeContext::default();
		let config = crate::EngineConfig::default();
		let cx = EffectContext {
			doc: &mut doc,
			item: root,
			lpe_node: root,
			recompute: &recompute,
			config: &config,
			is_clip_or_mask: false,
			input_bbox: None,
			geometry: &geometry,
		};
		effect.do_effect_pwd2(Piecewise::concat(&input), &cx).unwrap()
	}

	fn close(a: Point, b: Point) -> bool {
		a.distance(b) < 1e-6
	}

	#[test]
	fn line_follows_the_skeleton() {
		let out = bend("M 0,0 L 0,20", "M 0,0 L 10,0", false);
		let segs = out.segments();
		assert_eq!(segs.len(), PIECES);
		assert!(close(segs[0].start(), Point::new(0.0, 0.0)));
		assert!(close(segs[PIECES - 1].end(), Point::new(0.0, 20.0)));
		assert!(close(segs[3].end(), Point::new(0.0, 10.0)));
	}

	#[test]
	fn offsets_follow_the_normal() {
		let out = bend("M 0,0 L 20,0", "M 0,0 L 10,0 L 10,4 L 0,4 Z", false);
		let ends: Vec<Point> = out.segments().iter().map(|s| s.end()).collect();
		assert!(ends.iter().any(|p| close(*p, Point::new(20.0, 2.0))));
		assert!(ends.iter().any(|p| close(*p, Point::new(0.0, -2.0))));
	}

	#[test]
	fn vertical_pattern_uses_the_height() {
		let out = bend("M 0,0 L 20,0", "M 0,0 L 0,10", true);
		let segs = out.segments();
		let span = segs[0].start().distance(segs[segs.len() - 1].end());
		assert!((span - 20.0).abs() < 1e-6);
	}

	#[test]
	fn unmeasured_input_uses_its_own_extent() {
		let rect = "M 0,0 L 10,0 L 10,4 L 0,4 Z";
		let measured = bend("M 0,0 L 20,0", rect, false);
		let unmeasured = bend_measured("M 0,0 L 20,0", rect, false, false);
		assert_eq!(unmeasured.segments().len(), measured.segments().len());
		for (a, b) in unmeasured.segments().iter().zip(measured.segments()) {
			assert!(close(a.end(), b.end()));
		}
	}
}
