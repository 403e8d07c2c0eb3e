use livepath_document::{Document, NodeId, attr, names};
use pretty_assertions::assert_eq;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rstest::rstest;

use super::*;

fn add(doc: &mut Document, parent: NodeId, name: &str, id: &str) -> NodeId {
	let node = doc.create_element(name);
	doc.set_attr(node, attr::ID, id).unwrap();
	doc.append_child(parent, node).unwrap();
	node
}

fn rng() -> StdRng {
	StdRng::seed_from_u64(42)
}

#[test]
fn rename_rewrites_hrefs_and_urls() {
	let mut doc = Document::new();
	let root = doc.root();
	let defs = doc.defs();
	let grad = add(&mut doc, defs, names::LINEAR_GRADIENT, "grad1");
	let path = add(&mut doc, root, names::PATH, "path1");
	doc.set_attr(path, attr::STYLE, "fill:url(#grad1);stroke:none").unwrap();
	let clone = add(&mut doc, root, names::USE, "use1");
	doc.set_attr(clone, "xlink:href", "#grad1").unwrap();
	doc.set_attr(clone, "mask", "url(#grad1)").unwrap();
	doc.done("Draw", "");

	let new = rename_id(&mut doc, grad, "sunset", &mut rng()).unwrap();

	assert_eq!(new, "sunset");
	assert_eq!(doc.id(grad), Some("sunset"));
	assert_eq!(doc.attr(path, attr::STYLE), Some("fill:url(#sunset);stroke:none"));
	assert_eq!(doc.attr(clone, "xlink:href"), Some("#sunset"));
	assert_eq!(doc.attr(clone, "mask"), Some("url(#sunset)"));
	assert_eq!(doc.event_log().history(), ["Draw", "Rename object"]);
}

#[test]
fn rename_to_a_taken_name_appends_digits() {
	let mut doc = Document::new();
	let root = doc.root();
	add(&mut doc, root, names::PATH, "taken");
	let path = add(&mut doc, root, names::PATH, "path1");

	let new = rename_id(&mut doc, path, "taken", &mut rng()).unwrap();
	let digits = new.strip_prefix("taken-").unwrap();
	assert!(!digits.is_empty());
	assert!(digits.chars().all(|c| c.is_ascii_digit()));
	assert_eq!(doc.id(path), Some(new.as_str()));
}

#[rstest]
#[case("")]
#[case("-dash")]
#[case("é")]
fn rename_rejects_unusable_names(#[case] name: &str) {
	let mut doc = Document::new();
	let root = doc.root();
	let path = add(&mut doc, root, names::PATH, "path1");
	let err = rename_id(&mut doc, path, name, &mut rng()).unwrap_err();
	assert!(matches!(err, IdClashError::InvalidId(_)));
	assert_eq!(doc.id(path), Some("path1"));
}

#[test]
fn def_references_move_to_the_replacement() {
	let mut doc = Document::new();
	let root = doc.root();
	let defs = doc.defs();
	let old = add(&mut doc, defs, names::LINEAR_GRADIENT, "old");
	let new = add(&mut doc, defs, names::LINEAR_GRADIENT, "new");
	let path = add(&mut doc, root, names::PATH, "path1");
	doc.set_attr(path, attr::STYLE, "fill:url(#old);stroke:url(#old)").unwrap();
	doc.set_attr(path, "inkscape:linked-fill", "old").unwrap();

	assert_eq!(change_def_references(&mut doc, old, new).unwrap(), 3);
	assert_eq!(doc.attr(path, attr::STYLE), Some("fill:url(#new);stroke:url(#new)"));
	assert_eq!(doc.attr(path, "inkscape:linked-fill"), Some("new"));
}

#[test]
fn equivalent_gradient_keeps_its_id() {
	let gradient = |doc: &mut Document, color: &str| {
		let defs = doc.defs();
		let grad = add(doc, defs, names::LINEAR_GRADIENT, "grad1");
		let stop = doc.create_element(names::STOP);
		doc.set_attr(stop, "offset", "0").unwrap();
		doc.set_attr(stop, attr::STYLE, &format!("stop-color:{color}")).unwrap();
		doc.append_child(grad, stop).unwrap();
	};
	let mut current = Document::new();
	gradient(&mut current, "#ff0000");

	let mut same = Document::new();
	gradient(&mut same, "#ff0000");
	assert!(prevent_id_clashes(&mut same, &current, false, &mut rng()).unwrap().is_empty());

	let mut different = Document::new();
	gradient(&mut different, "#0000ff");
	let renames = prevent_id_clashes(&mut different, &current, false, &mut rng()).unwrap();
	assert_eq!(renames.len(), 1);
	assert!(renames[0].1.starts_with("grad1-"));
}

#[rstest]
#[case(false, false)]
#[case(true, true)]
fn matching_effect_objects_rename_only_from_the_clipboard(#[case] from_clipboard: bool, #[case] renamed: bool) {
	let effect = |doc: &mut Document| {
		let defs = doc.defs();
		let lpe = add(doc, defs, names::PATH_EFFECT, "path-effect1");
		doc.set_attr(lpe, attr::EFFECT, "roughen").unwrap();
	};
	let mut current = Document::new();
	effect(&mut current);
	let mut imported = Document::new();
	effect(&mut imported);
	let root = imported.root();
	let path = add(&mut imported, root, names::PATH, "unique-path");
	imported.set_attr(path, attr::PATH_EFFECT, "#path-effect1").unwrap();

	let renames = prevent_id_clashes(&mut imported, &current, from_clipboard, &mut rng()).unwrap();
	assert_eq!(!renames.is_empty(), renamed);
	let list = imported.attr(path, attr::PATH_EFFECT).unwrap();
	assert_eq!(list == "#path-effect1", !renamed);
}

#[test]
fn satellite_tokens_are_rewritten_or_dropped() {
	let mut current = Document::new();
	let root = current.root();
	add(&mut current, root, names::PATH, "path1");

	let mut imported = Document::new();
	let root = imported.root();
	let defs = imported.defs();
	add(&mut imported, root, names::PATH, "path1");
	let rotate = add(&mut imported, defs, names::PATH_EFFECT, "path-effect7");
	imported.set_attr(rotate, attr::EFFECT, "copy_rotate").unwrap();
	imported.set_attr(rotate, "lpesatellites", "#path1,1 | #gone,1").unwrap();
	let clone = add(&mut imported, defs, names::PATH_EFFECT, "path-effect8");
	imported.set_attr(clone, attr::EFFECT, "clone_original").unwrap();
	imported.set_attr(clone, "linkeditem", "#elsewhere").unwrap();

	let renames = prevent_id_clashes(&mut imported, &current, false, &mut rng()).unwrap();
	let renamed = &renames[0].1;
	assert_eq!(renames[0].0, "path1");
	assert_eq!(imported.attr(rotate, "lpesatellites"), Some(format!("#{renamed},1").as_str()));
	assert_eq!(imported.attr(clone, "linkeditem"), Some("#elsewhere"));
}
