//! The `inkscape:path-effect` list on an item: `#id` references joined by `;`.

use livepath_document::{Document, NodeId, attr, names};
use smallvec::SmallVec;

pub(crate) type HrefList = SmallVec<[String; 4]>;

pub(crate) fn parse_list(text: &str) -> HrefList {
	text.split(';')
		.map(str::trim)
		.filter(|h| !h.is_empty())
		.map(str::to_string)
		.collect()
}

pub(crate) fn hrefs(doc: &Document, item: NodeId) -> HrefList {
	doc.attr(item, attr::PATH_EFFECT).map(parse_list).unwrap_or_default()
}

/// Writes the list, removing the attribute when it is empty.
pub(crate) fn write_hrefs(doc: &mut Document, item: NodeId, list: &[String]) -> livepath_document::Result<()> {
	if list.is_empty() {
		doc.remove_attr(item, attr::PATH_EFFECT).map(drop)
	} else {
		doc.set_attr(item, attr::PATH_EFFECT, &list.join(";"))
	}
}

/// Resolves a reference to an effect object.
pub(crate) fn resolve(doc: &Document, href: &str) -> Option<NodeId> {
	doc.get_object_by_href(href)
		.filter(|node| doc.name(*node) == Some(names::PATH_EFFECT))
}

pub(crate) fn href_of(doc: &Document, lpe: NodeId) -> Option<String> {
	doc.id(lpe).map(|id| format!("#{id}"))
}

pub(crate) fn has_effects(doc: &Document, item: NodeId) -> bool {
	!hrefs(doc, item).is_empty()
}

/// Every attached item whose list references `lpe`.
pub(crate) fn items_using(doc: &Document, lpe: NodeId) -> Vec<NodeId> {
	let Some(href) = href_of(doc, lpe) else {
		return Vec::new();
	};
	doc.descendants(doc.root())
		.into_iter()
		.filter(|node| hrefs(doc, *node).iter().any(|h| *h == href))
		.collect()
}

#[cfg(test)]
mod tests {
	use pretty_assertions::assert_eq;

	use super::*;

	#[test]
	fn list_grammar_skips_empty_entries() {
		assert_eq!(parse_list(" #a ;; #b;").as_slice(), ["#a", "#b"]);
		assert!(parse_list("").is_empty());
	}
}
