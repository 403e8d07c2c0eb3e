use livepath_document::{Document, NodeId, attr, extract_url_id, extract_url_ids, names, url_ref};
use livepath_effects::EffectRegistry;
use livepath_effects::effect::all_params;
use livepath_effects::param::Parameter;
use rustc_hash::FxHashMap;
use smallvec::SmallVec;
use tracing::{debug, trace};

use crate::Result;

/// Attributes holding `#id` references, possibly several joined by `;`.
pub const HREF_ATTRIBUTES: &[&str] = &[
	"inkscape:connection-end",
	"inkscape:connection-end-point",
	"inkscape:connection-start",
	"inkscape:connection-start-point",
	"inkscape:href",
	"inkscape:path-effect",
	"inkscape:perspectiveID",
	LINKED_FILL,
	"inkscape:tiled-clone-of",
	"href",
	"xlink:href",
];

/// Style properties holding a single `url(#id)` paint, filter or marker.
pub const STYLE_PROPERTIES: &[&str] = &[
	"fill",
	"stroke",
	"filter",
	"marker-start",
	"marker-mid",
	"marker-end",
	"marker",
];

/// Style properties holding a list of `url(#id)` shapes.
pub const SHAPE_PROPERTIES: &[&str] = &["shape-inside", "shape-subtract"];

/// Presentation attributes whose value is a `url(#id)`.
pub const URL_ATTRIBUTES: &[&str] = &[
	"clip-path",
	"color-profile",
	"cursor",
	"marker-end",
	"marker-mid",
	"marker-start",
	"mask",
	"fill",
	"stroke",
	"filter",
];

/// Style properties read from the clipboard node itself.
pub const CLIPBOARD_PROPERTIES: &[&str] = &["fill", "filter", "stroke", "marker-end", "marker-mid", "marker-start"];

/// Holds a bare identifier instead of `#id`.
const LINKED_FILL: &str = "inkscape:linked-fill";

/// How a reference is spelled, and so how it is rewritten.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RefKind {
	/// `#id` tokens in an href-like attribute.
	Href,
	/// A `url(#id)` style property.
	Style,
	/// One of several `url(#id)` values in a shape property.
	Shapes,
	/// A `url(#id)` presentation attribute.
	Url,
	/// A `url(#id)` style property of the clipboard node.
	Clipboard,
	/// A `#id[,flags]` token of an effect satellite parameter.
	LpeSatellite,
}

/// One place that refers to an identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdReference {
	pub kind: RefKind,
	pub node: NodeId,
	/// Attribute or style property holding the reference.
	pub attr: String,
}

/// Referenced identifier to every place referring to it.
pub type RefMap = FxHashMap<String, Vec<IdReference>>;

fn push(refs: &mut RefMap, id: &str, kind: RefKind, node: NodeId, attr: &str) {
	refs.entry(id.to_string()).or_default().push(IdReference {
		kind,
		node,
		attr: attr.to_string(),
	});
}

/// Collects every identifier reference in the subtree at `root`.
///
/// Satellite parameters of effect objects are cleaned while scanning: a
/// token whose target is missing from `doc` is dropped unless the parameter
/// allows links to stay unresolved after a copy. A same-named object in the
/// paste target never keeps a token alive.
pub fn find_references(
	doc: &mut Document,
	root: NodeId,
	registry: &EffectRegistry,
) -> Result<RefMap> {
	let mut refs = RefMap::default();
	for node in doc.descendants(root) {
		if doc.name(node) == Some(names::CLIPBOARD) {
			let style = doc.style(node);
			for prop in CLIPBOARD_PROPERTIES {
				if let Some(id) = style.get(prop).and_then(extract_url_id) {
					push(&mut refs, id, RefKind::Clipboard, node, prop);
				}
			}
		}
		if doc.name(node) == Some(names::PATH_EFFECT) {
			scan_satellites(doc, node, registry, &mut refs)?;
		}
		scan_node(doc, node, &mut refs);
	}
	trace!(ids = refs.len(), "scanned references");
	Ok(refs)
}

fn scan_node(doc: &Document, node: NodeId, refs: &mut RefMap) {
	for name in HREF_ATTRIBUTES {
		let Some(value) = doc.attr(node, name) else {
			continue;
		};
		if *name == LINKED_FILL {
			if !value.is_empty() {
				push(refs, value.trim(), RefKind::Href, node, name);
			}
			continue;
		}
		if !value.starts_with('#') {
			continue;
		}
		for token in value.split(';') {
			if let Some(id) = token.trim().strip_prefix('#').filter(|id| !id.is_empty()) {
				push(refs, id, RefKind::Href, node, name);
			}
		}
	}

	let style = doc.style(node);
	for prop in STYLE_PROPERTIES {
		if let Some(id) = style.get(prop).and_then(extract_url_id) {
			push(refs, id, RefKind::Style, node, prop);
		}
	}
	for prop in SHAPE_PROPERTIES {
		for id in style.get(prop).map(extract_url_ids).unwrap_or_default() {
			push(refs, id, RefKind::Shapes, node, prop);
		}
	}

	for name in URL_ATTRIBUTES {
		if let Some(id) = doc.attr(node, name).and_then(extract_url_id) {
			push(refs, id, RefKind::Url, node, name);
		}
	}
}

/// Identifier named by a satellite token: `#id` up to the first `,`.
fn token_id(token: &str) -> Option<&str> {
	let id = token.strip_prefix('#')?;
	let id = id.split_once(',').map_or(id, |(id, _)| id);
	(!id.is_empty()).then_some(id)
}

fn scan_satellites(
	doc: &mut Document,
	lpe: NodeId,
	registry: &EffectRegistry,
	refs: &mut RefMap,
) -> Result<()> {
	let Some(effect) = doc.attr(lpe, attr::EFFECT).and_then(|key| registry.create(key).ok()) else {
		return Ok(());
	};
	let params: Vec<(String, bool)> = all_params(effect.as_ref())
		.into_iter()
		.filter(|p| p.param_type().is_satellite())
		.map(|p| (p.key().to_string(), p.allow_unresolved_on_copy()))
		.collect();

	for (key, allow_dangling) in params {
		let Some(value) = doc.attr(lpe, &key).map(str::to_string) else {
			continue;
		};
		let tokens: Vec<&str> = value.split('|').map(str::trim).collect();
		if !tokens.iter().any(|t| t.starts_with('#')) {
			continue;
		}
		let mut kept: SmallVec<[&str; 4]> = SmallVec::new();
		let mut rewrite = false;
		for token in tokens {
			let Some(id) = token_id(token) else {
				rewrite = true;
				continue;
			};
			if doc.get_object_by_id(id).is_some() {
				push(refs, id, RefKind::LpeSatellite, lpe, &key);
				kept.push(token);
			} else if allow_dangling {
				kept.push(token);
			} else {
				debug!(param = %key, id, "dropping unresolved satellite");
				rewrite = true;
			}
		}
		if rewrite {
			doc.set_attr(lpe, &key, &kept.join(" | "))?;
		}
	}
	Ok(())
}

/// Points `reference` at `new` instead of `old`.
pub fn fix_reference(doc: &mut Document, reference: &IdReference, old: &str, new: &str) -> Result<()> {
	let (node, name) = (reference.node, reference.attr.as_str());
	match reference.kind {
		RefKind::Href => {
			let Some(value) = doc.attr(node, name) else {
				return Ok(());
			};
			let value = if name == LINKED_FILL {
				if value.trim() == old { new.to_string() } else { value.to_string() }
			} else {
				let target = format!("#{old}");
				value
					.split(';')
					.map(|token| if token.trim() == target { format!("#{new}") } else { token.to_string() })
					.collect::<Vec<_>>()
					.join(";")
			};
			doc.set_attr(node, name, &value)?;
		}
		RefKind::LpeSatellite => {
			let Some(value) = doc.attr(node, name) else {
				return Ok(());
			};
			let value = value
				.split('|')
				.map(str::trim)
				.map(|token| match token_id(token) {
					Some(id) if id == old => format!("#{new}{}", &token[1 + old.len()..]),
					_ => token.to_string(),
				})
				.collect::<Vec<_>>()
				.join(" | ");
			doc.set_attr(node, name, &value)?;
		}
		RefKind::Style | RefKind::Clipboard => {
			let mut style = doc.style(node);
			style.set(name, url_ref(new));
			doc.set_style(node, &style)?;
		}
		RefKind::Shapes => {
			let mut style = doc.style(node);
			let Some(value) = style.get(name) else {
				return Ok(());
			};
			let value = value.replace(&url_ref(old), &url_ref(new));
			style.set(name, value);
			doc.set_style(node, &style)?;
		}
		RefKind::Url => doc.set_attr(node, name, &url_ref(new))?,
	}
	Ok(())
}
