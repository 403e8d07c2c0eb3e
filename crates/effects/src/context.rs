//! State handed to effects while they compute.

use livepath_document::{Document, NodeId};
use livepath_geom::{Affine, PathVector, Point, Rect};
use rustc_hash::FxHashMap as HashMap;

use crate::config::EngineConfig;
use crate::param::Parameter;
use crate::shape;

/// Editor state an effect may consult. Passed explicitly, never global.
#[derive(Debug, Clone, PartialEq)]
pub struct RecomputeContext {
	/// Selected path nodes in item coordinates.
	pub selected_nodes: Vec<Point>,
	pub view_transform: Affine,
	pub current_zoom: f64,
}

impl Default for RecomputeContext {
	fn default() -> Self {
		Self {
			selected_nodes: Vec::new(),
			view_transform: Affine::IDENTITY,
			current_zoom: 1.0,
		}
	}
}

impl RecomputeContext {
	pub fn is_selected(&self, node: Point) -> bool {
		self.selected_nodes.iter().any(|p| p.distance(node) < 0.001)
	}
}

/// Everything one effect invocation may touch.
pub struct EffectContext<'a> {
	pub doc: &'a mut Document,
	/// The item the hook runs for: a shape, or the group for group hooks.
	pub item: NodeId,
	/// The effect object whose attributes hold the parameters.
	pub lpe_node: NodeId,
	pub recompute: &'a RecomputeContext,
	pub config: &'a EngineConfig,
	/// The shape being computed lives in a clip path or mask.
	pub is_clip_or_mask: bool,
	/// Bounds of the whole item's input geometry in item coordinates.
	pub input_bbox: Option<Rect>,
	pub(crate) geometry: &'a HashMap<NodeId, PathVector>,
}

impl EffectContext<'_> {
	/// Geometry of `node` as far as the running pass has computed it,
	/// falling back to the stored outline.
	pub fn current_geometry(&self, node: NodeId) -> Option<PathVector> {
		self.geometry
			.get(&node)
			.cloned()
			.or_else(|| shape::curve(self.doc, node))
	}

	/// Persists one parameter on the effect object.
	pub fn write_param(&mut self, param: &dyn Parameter) -> crate::Result<()> {
		self.doc.set_attr(self.lpe_node, param.key(), &param.write())?;
		Ok(())
	}
}
