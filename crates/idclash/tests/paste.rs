use livepath_document::{Document, NodeId, attr, names};
use livepath_idclash::{merge_documents, prevent_id_clashes};
use pretty_assertions::assert_eq;
use rand::SeedableRng;
use rand::rngs::StdRng;

fn add(doc: &mut Document, parent: NodeId, name: &str, id: &str) -> NodeId {
	let node = doc.create_element(name);
	doc.set_attr(node, attr::ID, id).unwrap();
	doc.append_child(parent, node).unwrap();
	node
}

/// A clipboard holding `rect1` and a sibling filled with it.
fn clipboard() -> (Document, NodeId, NodeId) {
	let mut clip = Document::new_clipboard();
	let root = clip.root();
	let rect = add(&mut clip, root, names::PATH, "rect1");
	clip.set_attr(rect, attr::D, "M 0,0 L 10,0 L 10,10 Z").unwrap();
	let sibling = add(&mut clip, root, names::PATH, "path2");
	clip.set_attr(sibling, attr::STYLE, "fill:url(#rect1)").unwrap();
	(clip, rect, sibling)
}

fn drawing() -> (Document, NodeId) {
	let mut doc = Document::new();
	let root = doc.root();
	let existing = add(&mut doc, root, names::PATH, "rect1");
	doc.set_attr(existing, attr::D, "M 5,5 L 6,6").unwrap();
	doc.done("Draw", "");
	(doc, existing)
}

#[test]
fn pasted_clash_is_renamed_and_references_follow() {
	let _ = tracing_subscriber::fmt::try_init();
	let (mut clip, rect, sibling) = clipboard();
	let (doc, _) = drawing();

	let renames = prevent_id_clashes(&mut clip, &doc, true, &mut StdRng::seed_from_u64(1)).unwrap();

	assert_eq!(renames.len(), 1);
	let new = clip.id(rect).unwrap().to_string();
	let digits = new.strip_prefix("rect1-").unwrap();
	assert!(!digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit()));
	assert!(doc.get_object_by_id(&new).is_none());
	assert_eq!(clip.attr(sibling, attr::STYLE), Some(format!("fill:url(#{new})").as_str()));
}

#[test]
fn merge_keeps_every_id_unique() {
	let _ = tracing_subscriber::fmt::try_init();
	let (mut clip, _, _) = clipboard();
	let (mut doc, existing) = drawing();

	let items = merge_documents(&mut doc, &mut clip, true, &mut StdRng::seed_from_u64(9)).unwrap();

	assert_eq!(items.len(), 2);
	assert_eq!(doc.id(existing), Some("rect1"));
	assert_eq!(doc.attr(existing, attr::D), Some("M 5,5 L 6,6"));
	let pasted = doc.id(items[0]).unwrap().to_string();
	assert!(pasted.starts_with("rect1-"));
	assert_eq!(doc.attr(items[1], attr::STYLE), Some(format!("fill:url(#{pasted})").as_str()));
	assert!(doc.children(doc.root()).iter().all(|c| doc.name(*c) != Some(names::CLIPBOARD)));
	assert_eq!(doc.event_log().history(), ["Draw", "Import"]);
}

#[test]
fn shared_definitions_are_not_duplicated() {
	let _ = tracing_subscriber::fmt::try_init();
	let effect = |doc: &mut Document| {
		let defs = doc.defs();
		let lpe = add(doc, defs, names::PATH_EFFECT, "path-effect1");
		doc.set_attr(lpe, attr::EFFECT, "roughen").unwrap();
		lpe
	};
	let (mut doc, _) = drawing();
	let kept = effect(&mut doc);
	let mut source = Document::new();
	effect(&mut source);
	let root = source.root();
	let item = add(&mut source, root, names::PATH, "path9");
	source.set_attr(item, attr::PATH_EFFECT, "#path-effect1").unwrap();

	let items = merge_documents(&mut doc, &mut source, false, &mut StdRng::seed_from_u64(5)).unwrap();

	let defs = doc.defs();
	assert_eq!(doc.children(defs), [kept]);
	assert_eq!(doc.attr(items[0], attr::PATH_EFFECT), Some("#path-effect1"));
}

#[test]
fn split_copies_left_behind_are_not_relinked() {
	let _ = tracing_subscriber::fmt::try_init();
	let rotate = |doc: &mut Document| {
		let defs = doc.defs();
		let lpe = add(doc, defs, names::PATH_EFFECT, "path-effect1");
		doc.set_attr(lpe, attr::EFFECT, "copy_rotate").unwrap();
		doc.set_attr(lpe, "split_items", "true").unwrap();
		doc.set_attr(lpe, "lpesatellites", "#path1-1,1 | #path1-2,1").unwrap();
		let root = doc.root();
		let item = add(doc, root, names::PATH, "path1");
		doc.set_attr(item, attr::PATH_EFFECT, "#path-effect1").unwrap();
		lpe
	};
	let mut doc = Document::new();
	let original = rotate(&mut doc);
	let root = doc.root();
	add(&mut doc, root, names::PATH, "path1-1");
	add(&mut doc, root, names::PATH, "path1-2");
	doc.done("Draw", "");

	let mut clip = Document::new_clipboard();
	rotate(&mut clip);

	let items = merge_documents(&mut doc, &mut clip, true, &mut StdRng::seed_from_u64(3)).unwrap();

	assert_eq!(items.len(), 1);
	let href = doc.attr(items[0], attr::PATH_EFFECT).unwrap().to_string();
	assert_ne!(href, "#path-effect1");
	let pasted = doc.get_object_by_id(href.trim_start_matches('#')).unwrap();
	assert_eq!(doc.attr(pasted, "lpesatellites"), Some(""));
	assert_eq!(doc.attr(original, "lpesatellites"), Some("#path1-1,1 | #path1-2,1"));
}
