//! Rounds or cuts path corners according to per-node satellites.

use livepath_geom::{Affine, CubicBez, EPSILON, Line, ParamCurve, PathSeg, PathVector, Point, Subpath, Vec2, segment_deriv};
use tracing::debug;

use crate::Result;
use crate::context::EffectContext;
use crate::effect::{Effect, EffectCommon};
use crate::param::{
	BoolParam, EnumData, EnumParam, HiddenParam, NodeSatellite, NodeSatelliteArrayParam, NodeSatelliteType, Parameter,
	ScalarParam, time_at_arc_length,
};

/// Handle factor of a cubic approximating a quarter circle.
const K: f64 = 4.0 / 3.0 * (std::f64::consts::SQRT_2 - 1.0);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilletMethod {
	/// Arcs between two straight segments, plain cubics otherwise.
	Auto,
	Arc,
	Bezier,
}

static METHODS: &[EnumData<FilletMethod>] = &[
	EnumData {
		value: FilletMethod::Auto,
		key: "auto",
		label: "Auto",
	},
	EnumData {
		value: FilletMethod::Arc,
		key: "arc",
		label: "Force arc",
	},
	EnumData {
		value: FilletMethod::Bezier,
		key: "bezier",
		label: "Force bezier",
	},
];

static MODES: &[EnumData<NodeSatelliteType>] = &[
	EnumData {
		value: NodeSatelliteType::Fillet,
		key: "F",
		label: "Fillet",
	},
	EnumData {
		value: NodeSatelliteType::InverseFillet,
		key: "IF",
		label: "Inverse fillet",
	},
	EnumData {
		value: NodeSatelliteType::Chamfer,
		key: "C",
		label: "Chamfer",
	},
	EnumData {
		value: NodeSatelliteType::InverseChamfer,
		key: "IC",
		label: "Inverse chamfer",
	},
];

/// Values of the parameters that fan out into every satellite.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Broadcast {
	radius: f64,
	mode: NodeSatelliteType,
	steps: usize,
	flexible: bool,
	hidden: bool,
}

#[derive(Debug)]
pub struct FilletChamfer {
	common: EffectCommon,
	nodesatellites: NodeSatelliteArrayParam,
	radius: ScalarParam,
	unit: HiddenParam,
	method: EnumParam<FilletMethod>,
	mode: EnumParam<NodeSatelliteType>,
	chamfer_steps: ScalarParam,
	flexible: BoolParam,
	only_selected: BoolParam,
	use_knot_distance: BoolParam,
	hide_knots: BoolParam,
	apply_no_radius: BoolParam,
	apply_with_radius: BoolParam,
	last: Option<Broadcast>,
}

impl Default for FilletChamfer {
	fn default() -> Self {
		Self::new()
	}
}

impl FilletChamfer {
	pub fn new() -> Self {
		Self {
			common: EffectCommon::new(),
			nodesatellites: NodeSatelliteArrayParam::new("nodesatellites_param"),
			radius: ScalarParam::new("radius", 0.0).with_range(0.0, f64::MAX).with_digits(4),
			unit: HiddenParam::new("unit", "px"),
			method: EnumParam::new("method", METHODS, FilletMethod::Auto),
			mode: EnumParam::new("mode", MODES, NodeSatelliteType::Fillet),
			chamfer_steps: ScalarParam::new("chamfer_steps", 1.0).with_range(1.0, 999.0).integer(),
			flexible: BoolParam::new("flexible", false),
			only_selected: BoolParam::new("only_selected", false),
			use_knot_distance: BoolParam::new("use_knot_distance", true),
			hide_knots: BoolParam::new("hide_knots", false),
			apply_no_radius: BoolParam::new("apply_no_radius", true),
			apply_with_radius: BoolParam::new("apply_with_radius", true),
			last: None,
		}
	}

	pub fn nodesatellites(&self) -> &NodeSatelliteArrayParam {
		&self.nodesatellites
	}

	pub fn nodesatellites_mut(&mut self) -> &mut NodeSatelliteArrayParam {
		&mut self.nodesatellites
	}

	fn broadcast(&self) -> Broadcast {
		Broadcast {
			radius: self.radius.get(),
			mode: self.mode.get(),
			steps: self.chamfer_steps.get_usize().max(1),
			flexible: self.flexible.get(),
			hidden: self.hide_knots.get(),
		}
	}

	/// The satellite new nodes receive.
	fn fill_satellite(&self) -> NodeSatellite {
		let now = self.broadcast();
		NodeSatellite {
			is_time: now.flexible,
			has_mirror: true,
			hidden: now.hidden,
			steps: now.steps,
			..NodeSatellite::new(now.mode)
		}
	}

	/// Pushes changed broadcast parameters into the satellites they apply to.
	fn apply_broadcast(&mut self, pv: &PathVector, before: Broadcast, now: Broadcast, cx: &EffectContext<'_>) {
		let only_selected = self.only_selected.get();
		let no_radius = self.apply_no_radius.get();
		let with_radius = self.apply_with_radius.get();
		for (sp, sats) in pv.iter().zip(self.nodesatellites.data_mut()) {
			let nodes = sp.nodes();
			for (j, sat) in sats.iter_mut().enumerate() {
				let Some(out) = outgoing(sp, j) else {
					continue;
				};
				if now.flexible != before.flexible {
					sat.convert_units(now.flexible, out);
				}
				if now.hidden != before.hidden {
					sat.hidden = now.hidden;
				}
				let node = nodes.get(j).copied().unwrap_or(out.start());
				if only_selected && !cx.recompute.is_selected(node) {
					continue;
				}
				if (sat.amount == 0.0 && !no_radius) || (sat.amount > 0.0 && !with_radius) {
					continue;
				}
				if now.radius != before.radius {
					sat.amount = if sat.is_time {
						time_at_arc_length(now.radius, out).min(1.0)
					} else {
						now.radius
					};
				}
				if now.mode != before.mode {
					sat.satellite_type = now.mode;
				}
				if now.steps != before.steps {
					sat.steps = now.steps;
				}
			}
		}
	}

	/// Satellites of the input subpath, found by position among the fitted
	/// subpaths.
	fn satellites_for(&self, sp: &Subpath) -> Vec<NodeSatellite> {
		let fitted = self.nodesatellites.path();
		let data = self.nodesatellites.data();
		let count = sp.node_count();
		fitted
			.iter()
			.position(|f| f.node_count() == count && f.start().distance(sp.start()) < 0.001)
			.and_then(|k| data.get(k))
			.filter(|sats| sats.len() == count)
			.cloned()
			.unwrap_or_else(|| vec![self.fill_satellite(); count])
	}

	fn use_arc(&self, incoming: PathSeg, outgoing: PathSeg) -> bool {
		match self.method.get() {
			FilletMethod::Arc => true,
			FilletMethod::Bezier => false,
			FilletMethod::Auto => matches!((incoming, outgoing), (PathSeg::Line(_), PathSeg::Line(_))),
		}
	}

	fn fillet_subpath(&self, sp: &Subpath) -> Subpath {
		let segs = sp.segments();
		let n = segs.len();
		if n == 0 {
			return sp.clone();
		}
		let closed = sp.is_closed();
		let sats = self.satellites_for(sp);

		// Trim times per segment: [start, end].
		let mut trims = vec![(0.0_f64, 1.0_f64); n];
		let mut corners: Vec<Option<Corner>> = vec![None; n + 1];
		for j in 0..sp.node_count() {
			let (Some(incoming), Some(out)) = (incoming_index(sp, j), (j < n).then_some(j)) else {
				continue;
			};
			let Some(sat) = sats.get(j).copied() else {
				continue;
			};
			if sat.amount <= 0.0 || sat.satellite_type == NodeSatelliteType::Invalid {
				continue;
			}
			let distance = sat.arc_distance(segs[out]);
			let time_in = NodeSatellite::time_of(distance, true, segs[incoming]).clamp(0.0, 1.0);
			let time_out = sat.time(segs[out], false).clamp(0.0, 1.0);
			trims[incoming].1 = time_in;
			trims[out].0 = time_out;
			corners[j] = Some(Corner {
				sat,
				incoming,
				out,
			});
		}
		for trim in &mut trims {
			if trim.1 < trim.0 {
				trim.1 = trim.0;
			}
		}

		let start = segs[0].eval(trims[0].0);
		let mut out = Subpath::new(start);
		for k in 0..n {
			let (t0, t1) = trims[k];
			if t1 - t0 > EPSILON {
				out.push(segs[k].subsegment(t0..t1));
			}
			let next = if k + 1 == n { 0 } else { k + 1 };
			if k + 1 == n && !closed {
				break;
			}
			if let Some(corner) = corners[next] {
				let from = segs[corner.incoming].eval(trims[corner.incoming].1);
				let to = segs[corner.out].eval(trims[corner.out].0);
				self.push_corner(&mut out, corner, from, to, sp, &trims);
			} else if out.end().distance(segs[next].eval(trims[next].0)) > EPSILON {
				out.line_to(segs[next].eval(trims[next].0));
			}
		}
		if closed {
			out.close();
		}
		out
	}

	fn push_corner(&self, out: &mut Subpath, corner: Corner, from: Point, to: Point, sp: &Subpath, trims: &[(f64, f64)]) {
		let segs = sp.segments();
		let incoming = segs[corner.incoming];
		let outgoing = segs[corner.out];
		let node = outgoing.start();
		let dir_in = unit(segment_deriv(incoming, trims[corner.incoming].1)).unwrap_or_else(|| unit(node - from).unwrap_or(Vec2::ZERO));
		let dir_out = unit(segment_deriv(outgoing, trims[corner.out].0)).unwrap_or_else(|| unit(to - node).unwrap_or(Vec2::ZERO));

		let factor = if self.use_arc(incoming, outgoing) {
			arc_factor(dir_in, dir_out)
		} else {
			K
		};
		let k1 = from.distance(node) * factor;
		let k2 = to.distance(node) * factor;
		let inverse = matches!(
			corner.sat.satellite_type,
			NodeSatelliteType::InverseFillet | NodeSatelliteType::InverseChamfer
		);
		let sign = if inverse { -1.0 } else { 1.0 };
		let curve = CubicBez::new(from, from + dir_in * k1 * sign, to - dir_out * k2 * sign, to);

		match corner.sat.satellite_type {
			NodeSatelliteType::Fillet | NodeSatelliteType::InverseFillet => {
				out.push(PathSeg::Cubic(curve));
			}
			NodeSatelliteType::Chamfer | NodeSatelliteType::InverseChamfer => {
				let steps = corner.sat.steps.max(1);
				let mut last = from;
				for i in 1..=steps {
					let p = if i == steps {
						to
					} else {
						curve.eval(i as f64 / steps as f64)
					};
					out.push(PathSeg::Line(Line::new(last, p)));
					last = p;
				}
			}
			NodeSatelliteType::Invalid => {}
		}
	}
}

#[derive(Debug, Clone, Copy)]
struct Corner {
	sat: NodeSatellite,
	incoming: usize,
	out: usize,
}

fn unit(v: Vec2) -> Option<Vec2> {
	let len = v.hypot();
	(len > EPSILON).then(|| v / len)
}

/// Handle length per tangent length of a circular arc turning from
/// `dir_in` to `dir_out`.
fn arc_factor(dir_in: Vec2, dir_out: Vec2) -> f64 {
	let turn = dir_in.cross(dir_out).atan2(dir_in.dot(dir_out)).abs();
	let half = (turn / 2.0).tan();
	if half.abs() < EPSILON {
		return 2.0 / 3.0;
	}
	4.0 / 3.0 * (turn / 4.0).tan() / half
}

/// Index of the segment ending at node `j`.
fn incoming_index(sp: &Subpath, j: usize) -> Option<usize> {
	let n = sp.len();
	if j == 0 {
		(sp.is_closed() && n > 0).then(|| n - 1)
	} else {
		(j <= n).then(|| j - 1)
	}
}

/// The segment starting at node `j`.
fn outgoing(sp: &Subpath, j: usize) -> Option<PathSeg> {
	sp.segments().get(j).copied()
}

impl Effect for FilletChamfer {
	fn key(&self) -> &'static str {
		"fillet_chamfer"
	}

	fn common(&self) -> &EffectCommon {
		&self.common
	}

	fn common_mut(&mut self) -> &mut EffectCommon {
		&mut self.common
	}

	fn params(&self) -> Vec<&dyn Parameter> {
		crate::params![
			&self.nodesatellites,
			&self.radius,
			&self.unit,
			&self.method,
			&self.mode,
			&self.chamfer_steps,
			&self.flexible,
			&self.only_selected,
			&self.use_knot_distance,
			&self.hide_knots,
			&self.apply_no_radius,
			&self.apply_with_radius,
		]
	}

	fn params_mut(&mut self) -> Vec<&mut dyn Parameter> {
		crate::params_mut![
			&mut self.nodesatellites,
			&mut self.radius,
			&mut self.unit,
			&mut self.method,
			&mut self.mode,
			&mut self.chamfer_steps,
			&mut self.flexible,
			&mut self.only_selected,
			&mut self.use_knot_distance,
			&mut self.hide_knots,
			&mut self.apply_no_radius,
			&mut self.apply_with_radius,
		]
	}

	fn on_apply(&mut self, cx: &mut EffectContext<'_>, input: &PathVector) -> Result<()> {
		let mut fill = self.fill_satellite();
		let radius = self.radius.get();
		let mut data = Vec::with_capacity(input.len());
		for sp in input.iter() {
			let sats: Vec<NodeSatellite> = (0..sp.node_count())
				.map(|j| {
					fill.amount = match outgoing(sp, j) {
						Some(seg) if fill.is_time => time_at_arc_length(radius, seg).min(1.0),
						_ => radius,
					};
					fill
				})
				.collect();
			data.push(sats);
		}
		self.nodesatellites.set_data(data);
		self.nodesatellites.set_path(input.clone());
		self.last = Some(self.broadcast());
		cx.write_param(&self.nodesatellites)
	}

	fn on_before_effect(&mut self, cx: &mut EffectContext<'_>, input: &PathVector) -> Result<()> {
		let before_text = self.nodesatellites.write();
		let count_changed = self.nodesatellites.data().len() != input.len()
			|| input
				.iter()
				.zip(self.nodesatellites.data())
				.any(|(sp, sats)| sp.node_count() != sats.len());
		if count_changed {
			debug!(nodes = input.node_count(), "refitting node satellites");
			let fill = self.fill_satellite();
			self.nodesatellites.recalculate_for_new_path(input, fill);
		} else {
			self.nodesatellites.set_path(input.clone());
		}

		let now = self.broadcast();
		if let Some(before) = self.last.filter(|before| *before != now) {
			self.apply_broadcast(input, before, now, cx);
		}
		self.last = Some(now);

		if self.nodesatellites.write() != before_text {
			cx.write_param(&self.nodesatellites)?;
		}
		Ok(())
	}

	fn do_effect(&mut self, input: &PathVector, _cx: &EffectContext<'_>) -> Result<PathVector> {
		Ok(input.iter().map(|sp| self.fillet_subpath(sp)).collect())
	}

	fn transform_multiply(&mut self, affine: Affine) {
		self.nodesatellites.transform_multiply(affine);
		if !self.flexible.get() {
			let scale = affine.determinant().abs().sqrt();
			self.radius.set(self.radius.get() * scale);
			if let Some(last) = self.last.as_mut() {
				last.radius = self.radius.get();
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use livepath_geom::{parse_d, write_d};
	use pretty_assertions::assert_eq;
	use rstest::rstest;

	use super::*;

	fn chamfered(d: &str, amounts: &[f64], kind: NodeSatelliteType) -> Subpath {
		let pv = parse_d(d).unwrap();
		let mut effect = FilletChamfer::new();
		let sats = amounts
			.iter()
			.map(|&amount| NodeSatellite {
				amount,
				..NodeSatellite::new(kind)
			})
			.collect();
		effect.nodesatellites.set_data(vec![sats]);
		effect.nodesatellites.set_path(pv.clone());
		effect.fillet_subpath(&pv.subpaths()[0])
	}

	#[test]
	fn chamfer_cuts_one_corner() {
		let out = chamfered("M 0,0 L 10,0 L 10,10 L 0,10 Z", &[2.0, 0.0, 0.0, 0.0], NodeSatelliteType::Chamfer);
		assert!(out.is_closed());
		assert_eq!(out.len(), 5);
		assert_eq!(out.node_count(), 5);
		let pv: PathVector = vec![out].into();
		assert_eq!(write_d(&pv), "M 2,0 L 10,0 L 10,10 L 0,10 L 0,2 Z");
	}

	#[test]
	fn open_path_first_node_gets_no_corner() {
		let out = chamfered("M 0,0 L 10,0 L 10,10", &[3.0, 3.0, 3.0], NodeSatelliteType::Chamfer);
		assert_eq!(out.start(), Point::new(0.0, 0.0));
		assert_eq!(out.end(), Point::new(10.0, 10.0));
		assert_eq!(out.len(), 3);
	}

	#[rstest]
	#[case(NodeSatelliteType::Fillet, 1.0)]
	#[case(NodeSatelliteType::InverseFillet, -1.0)]
	fn fillet_bulges_the_right_way(#[case] kind: NodeSatelliteType, #[case] side: f64) {
		let out = chamfered("M 0,0 L 10,0 L 10,10 L 0,10 Z", &[2.0, 0.0, 0.0, 0.0], kind);
		let PathSeg::Cubic(corner) = out.segments()[4] else {
			panic!("expected a cubic corner, got {:?}", out.segments()[4]);
		};
		assert_eq!(corner.p0, Point::new(0.0, 2.0));
		assert_eq!(corner.p3, Point::new(2.0, 0.0));
		// The midpoint sits towards the corner for a fillet, away for an inverse one.
		let mid = corner.eval(0.5);
		assert!((mid.x + mid.y - 2.0) * side < 0.0);
	}

	#[test]
	fn chamfer_steps_split_the_cut() {
		let pv = parse_d("M 0,0 L 10,0 L 10,10 L 0,10 Z").unwrap();
		let mut effect = FilletChamfer::new();
		let sat = NodeSatellite {
			amount: 2.0,
			steps: 3,
			..NodeSatellite::new(NodeSatelliteType::Chamfer)
		};
		effect.nodesatellites.fill(&pv, sat);
		let out = effect.fillet_subpath(&pv.subpaths()[0]);
		assert_eq!(out.len(), 4 + 4 * 3);
	}

	#[test]
	fn arc_factor_matches_quarter_circle() {
		let f = arc_factor(Vec2::new(1.0, 0.0), Vec2::new(0.0, 1.0));
		assert!((f - K).abs() < 1e-9);
	}
}
