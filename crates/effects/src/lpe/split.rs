//! Sibling objects that split effects keep in sync with their item.

use livepath_document::{NodeId, attr};
use livepath_geom::{Affine, write_transform};

use crate::Result;
use crate::context::EffectContext;
use crate::shape;

/// Shows or hides `node` through its `display` style.
pub(crate) fn set_hidden(cx: &mut EffectContext<'_>, node: NodeId, hidden: bool) -> Result<()> {
	let mut style = cx.doc.style(node);
	if hidden {
		style.set("display", "none");
	} else if style.remove("display").is_none() {
		return Ok(());
	}
	cx.doc.set_style(node, &style)?;
	Ok(())
}

/// Duplicates the item without its effects and inserts the copy after
/// `after` under a fresh `<item id>-N` identifier.
pub(crate) fn create_copy(cx: &mut EffectContext<'_>, after: NodeId) -> Result<NodeId> {
	let copy = cx.doc.duplicate(cx.item)?;
	for node in cx.doc.descendants(copy) {
		cx.doc.remove_attr(node, attr::PATH_EFFECT)?;
		cx.doc.remove_attr(node, attr::ORIGINAL_D)?;
	}
	let base = cx.doc.id(cx.item).unwrap_or("copy").to_string();
	let id = cx.doc.unique_id(&format!("{base}-"));
	cx.doc.set_attr(copy, attr::ID, &id)?;
	cx.doc.insert_after(after, copy)?;
	Ok(copy)
}

/// Mirrors the item's current state into `copy` placed by `placement`.
/// Returns false when the structures diverged and the copy must be rebuilt.
pub(crate) fn sync_copy(cx: &mut EffectContext<'_>, copy: NodeId, placement: Affine, link_styles: bool) -> Result<bool> {
	let sources = cx.doc.descendants(cx.item);
	let copies = cx.doc.descendants(copy);
	let same_shape = sources.len() == copies.len()
		&& sources
			.iter()
			.zip(&copies)
			.all(|(s, c)| cx.doc.name(*s) == cx.doc.name(*c));
	if !same_shape {
		return Ok(false);
	}
	for (&source, &target) in sources.iter().zip(&copies).skip(1) {
		match cx.doc.attr(source, attr::TRANSFORM).map(str::to_string) {
			Some(text) => cx.doc.set_attr(target, attr::TRANSFORM, &text)?,
			None => cx.doc.remove_attr(target, attr::TRANSFORM).map(drop)?,
		}
	}
	for (&source, &target) in sources.iter().zip(&copies) {
		if !shape::is_shape(cx.doc, source) {
			continue;
		}
		if let Some(pv) = cx.current_geometry(source) {
			shape::set_curve(cx.doc, target, &pv)?;
		}
	}
	match write_transform(placement) {
		Some(text) => cx.doc.set_attr(copy, attr::TRANSFORM, &text)?,
		None => cx.doc.remove_attr(copy, attr::TRANSFORM).map(drop)?,
	}
	if link_styles {
		match cx.doc.attr(cx.item, attr::STYLE).map(str::to_string) {
			Some(text) => cx.doc.set_attr(copy, attr::STYLE, &text)?,
			None => cx.doc.remove_attr(copy, attr::STYLE).map(drop)?,
		}
	}
	set_hidden(cx, copy, false)?;
	Ok(true)
}
