use livepath_document::{Document, NodeId, attr, names};
use livepath_effects::EffectRegistry;
use rand::Rng;
use tracing::{debug, trace, warn};

use crate::refs::{RefMap, find_references, fix_reference};
use crate::unique::{random_suffix, sanitize_id};
use crate::{IdClashError, Result};

fn is_gradient(doc: &Document, node: NodeId) -> bool {
	matches!(doc.name(node), Some(names::LINEAR_GRADIENT | names::RADIAL_GRADIENT))
}

/// Attributes of `node` other than its identifier.
fn attrs_without_id(doc: &Document, node: NodeId) -> Vec<(&str, &str)> {
	doc.attrs(node).filter(|(key, _)| *key != attr::ID).collect()
}

/// Same element and attributes, and stop for stop the same children.
fn gradients_equivalent(a_doc: &Document, a: NodeId, b_doc: &Document, b: NodeId) -> bool {
	let (a_stops, b_stops) = (a_doc.children(a), b_doc.children(b));
	a_doc.name(a) == b_doc.name(b)
		&& attrs_without_id(a_doc, a) == attrs_without_id(b_doc, b)
		&& a_stops.len() == b_stops.len()
		&& a_stops
			.iter()
			.zip(b_stops)
			.all(|(x, y)| a_doc.name(*x) == b_doc.name(*y) && attrs_without_id(a_doc, *x) == attrs_without_id(b_doc, *y))
}

/// Whether the incoming object may keep an identifier it shares with
/// `existing`, to be deduplicated when the documents merge.
fn may_share_id(imported: &Document, node: NodeId, current: &Document, existing: NodeId, from_clipboard: bool) -> bool {
	if is_gradient(imported, node) && is_gradient(current, existing) {
		return gradients_equivalent(imported, node, current, existing);
	}
	let both_effects = imported.name(node) == Some(names::PATH_EFFECT) && current.name(existing) == Some(names::PATH_EFFECT);
	both_effects && imported.attr(node, attr::EFFECT) == current.attr(existing, attr::EFFECT) && !from_clipboard
}

fn fix_up(doc: &mut Document, refs: &RefMap, changes: &[(String, String)]) -> Result<usize> {
	let mut fixed = 0;
	for (old, new) in changes {
		for reference in refs.get(old).into_iter().flatten() {
			fix_reference(doc, reference, old, new)?;
			fixed += 1;
		}
	}
	Ok(fixed)
}

/// Renames every object of `imported` whose identifier `current` already
/// uses, then rewrites the references inside `imported` to match.
///
/// New identifiers are the old one plus `-` and random digits, unique in
/// both documents. An equivalent gradient, or an effect object of the same
/// type, keeps its identifier unless the copy comes from the clipboard.
/// Returns the `(old, new)` renames. The pass is committed on `imported`.
pub fn prevent_id_clashes(
	imported: &mut Document,
	current: &Document,
	from_clipboard: bool,
	rng: &mut impl Rng,
) -> Result<Vec<(String, String)>> {
	let registry = EffectRegistry::with_builtins();
	let root = imported.root();
	let refs = find_references(imported, root, &registry)?;

	let mut changes = Vec::new();
	for node in imported.descendants(root) {
		let Some(old) = imported.id(node).map(str::to_string) else {
			continue;
		};
		let Some(existing) = current.get_object_by_id(&old) else {
			continue;
		};
		if may_share_id(imported, node, current, existing, from_clipboard) {
			trace!(id = %old, "keeping equivalent object for merge");
			continue;
		}
		let new = random_suffix(
			&old,
			|c| imported.get_object_by_id(c).is_some() || current.get_object_by_id(c).is_some(),
			rng,
		);
		imported.set_attr(node, attr::ID, &new)?;
		debug!(%old, %new, "renamed clashing identifier");
		changes.push((old, new));
	}

	let fixed = fix_up(imported, &refs, &changes)?;
	if imported.done("Resolve identifier clashes", "") {
		trace!(renamed = changes.len(), fixed, "committed clash resolution");
	}
	Ok(changes)
}

/// Points every reference to `from` at `to` instead. Returns the number of
/// references rewritten.
pub fn change_def_references(doc: &mut Document, from: NodeId, to: NodeId) -> Result<usize> {
	let old = doc.id(from).ok_or(IdClashError::MissingId(from))?.to_string();
	let new = doc.id(to).ok_or(IdClashError::MissingId(to))?.to_string();
	let root = doc.root();
	let refs = find_references(doc, root, &EffectRegistry::with_builtins())?;
	let fixed = fix_up(doc, &refs, &[(old, new)])?;
	doc.done("Change references", "");
	Ok(fixed)
}

/// Gives `node` the identifier `name` and rewrites references to its old
/// identifier.
///
/// `name` is sanitized to [`VALID_ID_CHARS`](crate::unique::VALID_ID_CHARS)
/// and must then start with a letter or digit. A name already in use gets
/// `-` and random digits appended. Returns the identifier actually set.
pub fn rename_id(doc: &mut Document, node: NodeId, name: &str, rng: &mut impl Rng) -> Result<String> {
	let sanitized = sanitize_id(name);
	if !sanitized.starts_with(|c: char| c.is_ascii_alphanumeric()) {
		warn!(name, "invalid identifier, not renaming");
		return Err(IdClashError::InvalidId(name.to_string()));
	}
	let old = doc.id(node).map(str::to_string);
	if old.as_deref() == Some(sanitized.as_str()) {
		return Ok(sanitized);
	}

	let root = doc.root();
	let refs = find_references(doc, root, &EffectRegistry::with_builtins())?;
	let new = if doc.get_object_by_id(&sanitized).is_some() {
		random_suffix(&sanitized, |c| doc.get_object_by_id(c).is_some(), rng)
	} else {
		sanitized
	};
	doc.set_attr(node, attr::ID, &new)?;
	if let Some(old) = old {
		fix_up(doc, &refs, &[(old, new.clone())])?;
	}
	debug!(?node, id = %new, "renamed object");
	doc.done("Rename object", "");
	Ok(new)
}
