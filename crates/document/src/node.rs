use indexmap::IndexMap;

/// Stable handle to a node in one [`Document`](crate::Document).
///
/// Handles stay valid after deletion so that undo can reattach the node;
/// use [`Document::is_attached`](crate::Document::is_attached) to check
/// whether a node is currently part of the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
	pub(crate) fn index(self) -> usize {
		self.0 as usize
	}
}

/// Element names used across the pipeline.
pub mod names {
	pub const SVG: &str = "svg:svg";
	pub const DEFS: &str = "svg:defs";
	pub const GROUP: &str = "svg:g";
	pub const PATH: &str = "svg:path";
	pub const CLIP_PATH: &str = "svg:clipPath";
	pub const MASK: &str = "svg:mask";
	pub const SYMBOL: &str = "svg:symbol";
	pub const USE: &str = "svg:use";
	pub const LINEAR_GRADIENT: &str = "svg:linearGradient";
	pub const RADIAL_GRADIENT: &str = "svg:radialGradient";
	pub const STOP: &str = "svg:stop";
	pub const PATH_EFFECT: &str = "inkscape:path-effect";
	pub const CLIPBOARD: &str = "inkscape:clipboard";
}

/// Attribute keys used across the pipeline.
pub mod attr {
	pub const ID: &str = "id";
	pub const D: &str = "d";
	pub const ORIGINAL_D: &str = "inkscape:original-d";
	pub const PATH_EFFECT: &str = "inkscape:path-effect";
	pub const EFFECT: &str = "effect";
	pub const TRANSFORM: &str = "transform";
	pub const STYLE: &str = "style";
	pub const CLASS: &str = "class";
	pub const CLIP_PATH: &str = "clip-path";
	pub const MASK: &str = "mask";
	pub const INSENSITIVE: &str = "sodipodi:insensitive";
}

#[derive(Debug, Clone)]
pub(crate) struct Node {
	pub(crate) name: String,
	pub(crate) attrs: IndexMap<String, String>,
	pub(crate) parent: Option<NodeId>,
	pub(crate) children: Vec<NodeId>,
}

impl Node {
	pub(crate) fn new(name: &str) -> Self {
		Self {
			name: name.to_string(),
			attrs: IndexMap::new(),
			parent: None,
			children: Vec::new(),
		}
	}
}
