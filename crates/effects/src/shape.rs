//! Reading and writing the geometry of document items.
//!
//! A shape is an `svg:path`. Its rendered outline lives in `d`; while effects
//! are applied the source outline is kept in `inkscape:original-d`. Groups
//! have no geometry of their own: their outline is the union of their
//! descendant shapes mapped into group space.

use livepath_document::{Document, NodeId, attr, names};
use livepath_geom::{Affine, PathVector, parse_d, write_d};
use tracing::warn;

/// Which outline of a linked item to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GeometrySource {
	/// The rendered `d`, after the item's own effects.
	#[default]
	Rendered,
	/// The effect input, `inkscape:original-d` when present.
	Original,
}

pub fn is_shape(doc: &Document, node: NodeId) -> bool {
	doc.name(node) == Some(names::PATH)
}

pub fn is_group(doc: &Document, node: NodeId) -> bool {
	doc.name(node) == Some(names::GROUP)
}

/// True for `svg:clipPath` and `svg:mask` containers.
pub fn is_clip_or_mask_container(doc: &Document, node: NodeId) -> bool {
	matches!(doc.name(node), Some(names::CLIP_PATH | names::MASK))
}

/// True when the node lives inside a clip path or mask.
pub fn is_in_clip_or_mask(doc: &Document, node: NodeId) -> bool {
	doc.ancestors(node).into_iter().any(|a| is_clip_or_mask_container(doc, a))
}

/// True when the node lives inside an `svg:symbol`.
pub fn is_in_symbol(doc: &Document, node: NodeId) -> bool {
	doc.ancestors(node).into_iter().any(|a| doc.name(a) == Some(names::SYMBOL))
}

fn parse_attr(doc: &Document, node: NodeId, key: &str) -> Option<PathVector> {
	let text = doc.attr(node, key)?;
	match parse_d(text) {
		Ok(pv) => Some(pv),
		Err(error) => {
			warn!(?node, key, %error, "unreadable path data");
			None
		}
	}
}

/// The rendered outline of a shape.
pub fn curve(doc: &Document, node: NodeId) -> Option<PathVector> {
	parse_attr(doc, node, attr::D)
}

/// The effect input of a shape, falling back to `d`.
pub fn original_curve(doc: &Document, node: NodeId) -> Option<PathVector> {
	if doc.attr(node, attr::ORIGINAL_D).is_some() {
		parse_attr(doc, node, attr::ORIGINAL_D)
	} else {
		curve(doc, node)
	}
}

/// Outline of a shape or group in its own coordinates.
pub fn curve_for(doc: &Document, node: NodeId, source: GeometrySource) -> Option<PathVector> {
	if is_shape(doc, node) {
		return match source {
			GeometrySource::Rendered => curve(doc, node),
			GeometrySource::Original => original_curve(doc, node),
		};
	}
	if !is_group(doc, node) {
		return None;
	}
	let mut out = PathVector::new();
	let mut found = false;
	for shape in doc.descendants(node).into_iter().filter(|n| is_shape(doc, *n)) {
		if let Some(pv) = curve_for(doc, shape, source) {
			out.extend_from(&pv.transformed(relative_transform(doc, shape, node)));
			found = true;
		}
	}
	found.then_some(out)
}

/// Maps coordinates of `node` into the coordinates of `space`.
pub fn relative_transform(doc: &Document, node: NodeId, space: NodeId) -> Affine {
	if node == space {
		return Affine::IDENTITY;
	}
	doc.i2doc(space).inverse() * doc.i2doc(node)
}

/// Page width and height in user units: the root `width` and `height`, or
/// the `viewBox` when those are missing or carry other units.
pub fn page_size(doc: &Document) -> Option<(f64, f64)> {
	let root = doc.root();
	let length = |key: &str| {
		let text = doc.attr(root, key)?.trim();
		text.strip_suffix("px").unwrap_or(text).trim().parse::<f64>().ok()
	};
	if let (Some(width), Some(height)) = (length("width"), length("height")) {
		return Some((width, height));
	}
	let view_box = doc
		.attr(root, "viewBox")?
		.split(|c: char| c == ',' || c.is_whitespace())
		.filter(|t| !t.is_empty())
		.map(str::parse::<f64>)
		.collect::<Result<Vec<_>, _>>()
		.ok()?;
	match view_box[..] {
		[_, _, width, height] => Some((width, height)),
		_ => None,
	}
}

/// Writes `pv` as the rendered outline of a shape.
pub fn set_curve(doc: &mut Document, node: NodeId, pv: &PathVector) -> livepath_document::Result<()> {
	doc.set_attr(node, attr::D, &write_d(pv))
}

/// Copies `d` into `inkscape:original-d` unless it is already present.
pub fn ensure_original(doc: &mut Document, node: NodeId) -> livepath_document::Result<()> {
	if doc.attr(node, attr::ORIGINAL_D).is_some() {
		return Ok(());
	}
	let d = doc.attr(node, attr::D).unwrap_or_default().to_string();
	doc.set_attr(node, attr::ORIGINAL_D, &d)
}

/// Restores `d` from `inkscape:original-d` and drops the latter. With
/// `keep_paths` the rendered outline stays and only the backup goes.
pub fn restore_original(doc: &mut Document, node: NodeId, keep_paths: bool) -> livepath_document::Result<()> {
	let Some(original) = doc.attr(node, attr::ORIGINAL_D).map(str::to_string) else {
		return Ok(());
	};
	if !keep_paths {
		doc.set_attr(node, attr::D, &original)?;
	}
	doc.remove_attr(node, attr::ORIGINAL_D)?;
	Ok(())
}

#[cfg(test)]
mod tests {
	use livepath_geom::Point;
	use pretty_assertions::assert_eq;

	use super::*;

	#[test]
	fn group_curve_maps_children_into_group_space() {
		let mut doc = Document::new();
		let root = doc.root();
		let g = doc.create_element(names::GROUP);
		doc.set_attr(g, attr::TRANSFORM, "translate(100,0)").unwrap();
		doc.append_child(root, g).unwrap();
		let p = doc.create_element(names::PATH);
		doc.set_attr(p, attr::D, "M 0,0 L 10,0").unwrap();
		doc.set_attr(p, attr::TRANSFORM, "translate(0,5)").unwrap();
		doc.append_child(g, p).unwrap();

		let pv = curve_for(&doc, g, GeometrySource::Rendered).unwrap();
		assert_eq!(pv.subpaths()[0].start(), Point::new(0.0, 5.0));
		assert_eq!(curve_for(&doc, root, GeometrySource::Rendered), None);
	}

	#[test]
	fn page_size_prefers_width_and_height() {
		let mut doc = Document::new();
		let root = doc.root();
		assert_eq!(page_size(&doc), None);
		doc.set_attr(root, "viewBox", "0 0 200 100").unwrap();
		assert_eq!(page_size(&doc), Some((200.0, 100.0)));
		doc.set_attr(root, "width", "80px").unwrap();
		doc.set_attr(root, "height", "60").unwrap();
		assert_eq!(page_size(&doc), Some((80.0, 60.0)));
		doc.set_attr(root, "width", "210mm").unwrap();
		assert_eq!(page_size(&doc), Some((200.0, 100.0)));
	}

	#[test]
	fn original_round_trip() {
		let mut doc = Document::new();
		let p = doc.create_element(names::PATH);
		doc.append_child(doc.root(), p).unwrap();
		doc.set_attr(p, attr::D, "M 0,0 L 10,0").unwrap();
		ensure_original(&mut doc, p).unwrap();
		doc.set_attr(p, attr::D, "M 0,0 L 20,0").unwrap();
		ensure_original(&mut doc, p).unwrap();
		assert_eq!(doc.attr(p, attr::ORIGINAL_D), Some("M 0,0 L 10,0"));

		restore_original(&mut doc, p, false).unwrap();
		assert_eq!(doc.attr(p, attr::D), Some("M 0,0 L 10,0"));
		assert_eq!(doc.attr(p, attr::ORIGINAL_D), None);
	}
}
