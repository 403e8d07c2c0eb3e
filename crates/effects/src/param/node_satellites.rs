//! Per-node corner data for the fillet/chamfer effect.
//!
//! One [`NodeSatellite`] per path node, grouped by subpath. The attribute text
//! holds eight comma-separated fields per node
//! (`type,is_time,selected,has_mirror,hidden,amount,angle,steps`), nodes
//! joined by ` @ ` and subpaths by ` | `.

use std::fmt;
use std::str::FromStr;

use livepath_geom::{
	ARCLEN_ACCURACY, Affine, EPSILON, ParamCurve, ParamCurveArclen, PathSeg, PathVector, fmt_number,
};

use super::{ParamType, Parameter, parse_bool, parse_f64};
use crate::ParamError;

/// Corner shape applied at a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum NodeSatelliteType {
	#[default]
	Fillet,
	InverseFillet,
	Chamfer,
	InverseChamfer,
	/// Unrecognised data kept so it can be written back.
	Invalid,
}

impl NodeSatelliteType {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Fillet => "F",
			Self::InverseFillet => "IF",
			Self::Chamfer => "C",
			Self::InverseChamfer => "IC",
			Self::Invalid => "KO",
		}
	}
}

impl FromStr for NodeSatelliteType {
	type Err = ();

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.trim() {
			"F" => Ok(Self::Fillet),
			"IF" => Ok(Self::InverseFillet),
			"C" => Ok(Self::Chamfer),
			"IC" => Ok(Self::InverseChamfer),
			"KO" => Ok(Self::Invalid),
			_ => Err(()),
		}
	}
}

impl fmt::Display for NodeSatelliteType {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Corner data for one node.
///
/// `amount` is a distance along the outgoing segment, or a segment time when
/// `is_time` is set.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NodeSatellite {
	pub satellite_type: NodeSatelliteType,
	pub is_time: bool,
	pub selected: bool,
	pub has_mirror: bool,
	pub hidden: bool,
	pub amount: f64,
	pub angle: f64,
	pub steps: usize,
}

impl Default for NodeSatellite {
	fn default() -> Self {
		Self::new(NodeSatelliteType::Fillet)
	}
}

impl NodeSatellite {
	pub fn new(satellite_type: NodeSatelliteType) -> Self {
		Self {
			satellite_type,
			is_time: false,
			selected: false,
			has_mirror: false,
			hidden: true,
			amount: 0.0,
			angle: 0.0,
			steps: 1,
		}
	}

	/// Distance along `seg` covered by the amount.
	pub fn arc_distance(&self, seg: PathSeg) -> f64 {
		if self.is_time {
			arc_length_at(self.amount, seg)
		} else {
			self.amount
		}
	}

	/// Segment time of a distance `amount`, measured from the end of `seg`
	/// when `inverse` is set.
	pub fn time_of(amount: f64, inverse: bool, seg: PathSeg) -> f64 {
		match (amount == 0.0, inverse) {
			(true, true) => 1.0,
			(true, false) => 0.0,
			(false, false) => time_at_arc_length(amount, seg),
			(false, true) => time_at_arc_length(seg.arclen(ARCLEN_ACCURACY) - amount, seg),
		}
	}

	/// Segment time of the satellite's own amount, clamped to the segment.
	pub fn time(&self, seg: PathSeg, inverse: bool) -> f64 {
		let t = if !self.is_time {
			Self::time_of(self.amount, inverse, seg)
		} else if inverse {
			1.0 - self.amount
		} else {
			self.amount
		};
		t.min(1.0)
	}

	/// Rewrites the amount so that `is_time == flexible`, measuring on the
	/// outgoing segment.
	pub fn convert_units(&mut self, flexible: bool, seg: PathSeg) {
		if self.is_time == flexible {
			return;
		}
		if flexible {
			self.amount = time_at_arc_length(self.amount, seg).min(1.0);
		} else {
			self.amount = arc_length_at(self.amount, seg);
		}
		self.is_time = flexible;
	}

	fn parse(token: &str) -> Option<Self> {
		let fields: Vec<&str> = token.split(',').map(str::trim).collect();
		let [kind, is_time, selected, has_mirror, hidden, amount, angle, steps] = fields.as_slice() else {
			return None;
		};
		Some(Self {
			satellite_type: kind.parse().ok()?,
			is_time: parse_bool(is_time)?,
			selected: parse_bool(selected)?,
			has_mirror: parse_bool(has_mirror)?,
			hidden: parse_bool(hidden)?,
			amount: parse_f64(amount)?,
			angle: parse_f64(angle)?,
			steps: steps.parse().ok()?,
		})
	}
}

impl fmt::Display for NodeSatellite {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(
			f,
			"{},{},{},{},{},{},{},{}",
			self.satellite_type,
			u8::from(self.is_time),
			u8::from(self.selected),
			u8::from(self.has_mirror),
			u8::from(self.hidden),
			fmt_number(self.amount),
			fmt_number(self.angle),
			self.steps
		)
	}
}

fn seg_is_degenerate(seg: PathSeg) -> bool {
	seg.arclen(ARCLEN_ACCURACY) <= EPSILON
}

/// Segment time at arc length `a`. Lines and lengths beyond the segment map
/// linearly, so the result can exceed 1.
pub fn time_at_arc_length(a: f64, seg: PathSeg) -> f64 {
	if a == 0.0 || seg_is_degenerate(seg) {
		return 0.0;
	}
	let len = seg.arclen(ARCLEN_ACCURACY);
	if a >= len || matches!(seg, PathSeg::Line(_)) {
		return a / len;
	}
	seg.inv_arclen(a, ARCLEN_ACCURACY)
}

/// Arc length from the start of `seg` to time `t`.
pub fn arc_length_at(t: f64, seg: PathSeg) -> f64 {
	if t == 0.0 || seg_is_degenerate(seg) {
		return 0.0;
	}
	seg.subsegment(0.0..t.min(1.0)).arclen(ARCLEN_ACCURACY)
}

/// Satellites grouped by subpath.
pub type NodeSatellites = Vec<Vec<NodeSatellite>>;

/// Node satellites for every node of the item's path.
///
/// The parameter remembers the path it was last fitted to so that
/// satellites follow their nodes when nodes are inserted or removed.
#[derive(Debug, Clone, Default)]
pub struct NodeSatelliteArrayParam {
	key: &'static str,
	data: NodeSatellites,
	path: PathVector,
}

impl NodeSatelliteArrayParam {
	pub fn new(key: &'static str) -> Self {
		Self {
			key,
			data: Vec::new(),
			path: PathVector::new(),
		}
	}

	pub fn data(&self) -> &NodeSatellites {
		&self.data
	}

	pub fn data_mut(&mut self) -> &mut NodeSatellites {
		&mut self.data
	}

	pub fn set_data(&mut self, data: NodeSatellites) {
		self.data = data;
	}

	/// The path the satellites were last fitted to.
	pub fn path(&self) -> &PathVector {
		&self.path
	}

	pub fn set_path(&mut self, path: PathVector) {
		self.path = path;
	}

	pub fn total(&self) -> usize {
		self.data.iter().map(Vec::len).sum()
	}

	pub fn is_empty(&self) -> bool {
		self.total() == 0
	}

	/// One `fill` satellite per node of `pv`.
	pub fn fill(&mut self, pv: &PathVector, fill: NodeSatellite) {
		self.data = pv.iter().map(|sp| vec![fill; sp.node_count()]).collect();
		self.path = pv.clone();
	}

	/// Refits the satellites to `pv`. A node keeps the satellite of the old
	/// node at the same position (within 0.001). Without a remembered path,
	/// satellites are matched by index. Unmatched nodes get `fill`.
	pub fn recalculate_for_new_path(&mut self, pv: &PathVector, fill: NodeSatellite) {
		let old_nodes: Vec<Vec<_>> = self.path.iter().map(|sp| sp.nodes()).collect();
		let by_index = self.path.is_empty();
		let data = pv
			.iter()
			.enumerate()
			.map(|(i, sp)| {
				sp.nodes()
					.into_iter()
					.enumerate()
					.map(|(j, node)| {
						let found = if by_index {
							self.data.get(i).and_then(|sats| sats.get(j)).copied()
						} else {
							old_nodes.iter().enumerate().find_map(|(k, nodes)| {
								let l = nodes.iter().position(|p| p.distance(node) < 0.001)?;
								self.data.get(k)?.get(l).copied()
							})
						};
						found.unwrap_or(fill)
					})
					.collect()
			})
			.collect();
		self.data = data;
		self.path = pv.clone();
	}

	fn parse(&self, text: &str) -> Result<NodeSatellites, ParamError> {
		if text.trim().is_empty() {
			return Ok(Vec::new());
		}
		let mut index = 0;
		text.split('|')
			.map(|subpath| {
				subpath
					.split('@')
					.map(|token| {
						let parsed = NodeSatellite::parse(token).ok_or_else(|| ParamError::Entry {
							key: self.key.to_string(),
							index,
							reason: format!("bad node satellite {:?}", token.trim()),
						});
						index += 1;
						parsed
					})
					.collect::<Result<Vec<_>, _>>()
			})
			.collect()
	}
}

impl Parameter for NodeSatelliteArrayParam {
	fn key(&self) -> &str {
		self.key
	}

	fn param_type(&self) -> ParamType {
		ParamType::NodeSatelliteArray
	}

	fn read(&mut self, text: &str) -> Result<(), ParamError> {
		self.data = self.parse(text)?;
		Ok(())
	}

	fn write(&self) -> String {
		self.data
			.iter()
			.map(|sats| sats.iter().map(ToString::to_string).collect::<Vec<_>>().join(" @ "))
			.collect::<Vec<_>>()
			.join(" | ")
	}

	fn set_default(&mut self) {
		self.data.clear();
	}

	fn update_default(&mut self, text: &str) -> Result<(), ParamError> {
		self.parse(text).map(drop)
	}

	fn default_text(&self) -> String {
		String::new()
	}

	fn transform_multiply(&mut self, affine: Affine) {
		let scale = affine.determinant().abs().sqrt();
		for sat in self.data.iter_mut().flatten() {
			if !sat.is_time && sat.amount > 0.0 {
				sat.amount *= scale;
			}
		}
		self.path = self.path.transformed(affine);
	}
}
