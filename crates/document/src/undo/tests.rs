use pretty_assertions::assert_eq;

use crate::{Document, NodeId, attr, names};

fn doc_with_path() -> (Document, NodeId) {
	let mut doc = Document::new();
	let p = doc.create_element(names::PATH);
	doc.set_attr(p, attr::ID, "p").unwrap();
	doc.append_child(doc.root(), p).unwrap();
	doc.done("create", "draw-path");
	doc.mark_saved();
	(doc, p)
}

#[test]
fn commit_without_changes_is_a_noop() {
	let (mut doc, _) = doc_with_path();
	let before = doc.event_log().len();
	assert!(!doc.done("nothing", ""));
	assert_eq!(doc.event_log().len(), before);
	assert!(!doc.is_modified());
}

#[test]
fn undo_and_redo_restore_attributes_and_structure() {
	let (mut doc, p) = doc_with_path();
	doc.set_attr(p, attr::D, "M 0,0 L 1,1").unwrap();
	doc.done("edit", "");
	doc.delete(p).unwrap();
	doc.done("delete", "");
	assert_eq!(doc.get_object_by_id("p"), None);

	assert!(doc.undo());
	assert_eq!(doc.get_object_by_id("p"), Some(p));
	assert!(doc.undo());
	assert_eq!(doc.attr(p, attr::D), None);
	assert!(doc.undo());
	assert!(!doc.is_attached(p));
	assert!(!doc.undo(), "undo at the root is a no-op");

	assert!(doc.redo());
	assert!(doc.redo());
	assert_eq!(doc.attr(p, attr::D), Some("M 0,0 L 1,1"));
	assert!(doc.redo());
	assert!(!doc.redo(), "redo at a leaf is a no-op");
}

fn keys(doc: &Document, node: NodeId) -> Vec<&str> {
	doc.attrs(node).map(|(k, _)| k).collect()
}

#[test]
fn undo_puts_removed_attributes_back_in_place() {
	let (mut doc, p) = doc_with_path();
	doc.set_attr(p, attr::D, "M 0,0 L 1,1").unwrap();
	doc.set_attr(p, attr::STYLE, "fill:none").unwrap();
	doc.done("draw", "");
	doc.remove_attr(p, attr::D).unwrap();
	doc.remove_attr(p, attr::ID).unwrap();
	doc.done("strip", "");
	assert_eq!(keys(&doc, p), ["style"]);

	assert!(doc.undo());
	assert_eq!(keys(&doc, p), ["id", "d", "style"]);
	assert_eq!(doc.get_object_by_id("p"), Some(p));
	assert!(doc.redo());
	assert_eq!(keys(&doc, p), ["style"]);
	assert!(doc.undo());
	assert!(doc.undo());
	assert_eq!(keys(&doc, p), ["id"]);
}

#[test]
fn cancel_keeps_attribute_order() {
	let (mut doc, p) = doc_with_path();
	doc.set_attr(p, attr::D, "M 0,0 L 1,1").unwrap();
	doc.done("draw", "");
	doc.remove_attr(p, attr::ID).unwrap();
	doc.set_attr(p, attr::ID, "q").unwrap();
	doc.cancel();
	assert_eq!(keys(&doc, p), ["id", "d"]);
	assert_eq!(doc.id(p), Some("p"));
}

#[test]
fn new_action_after_undo_grows_a_sibling_branch() {
	let (mut doc, p) = doc_with_path();
	doc.set_attr(p, "x", "1").unwrap();
	doc.done("first", "");
	assert!(doc.undo());
	doc.set_attr(p, "x", "2").unwrap();
	doc.done("second", "");

	let log = doc.event_log();
	let parent = log.parent(log.current()).unwrap();
	let branches: Vec<_> = log
		.children(parent)
		.into_iter()
		.map(|e| log.event(e).unwrap().description.clone())
		.collect();
	assert_eq!(branches, vec!["first".to_string(), "second".to_string()]);
	assert_eq!(log.history(), vec!["create", "second"]);

	assert!(doc.undo());
	assert!(doc.redo());
	assert_eq!(doc.attr(p, "x"), Some("2"), "redo follows the most recent branch");
}

#[test]
fn maybe_done_merges_same_key() {
	let (mut doc, p) = doc_with_path();
	for v in ["1", "2", "3"] {
		doc.set_attr(p, "x", v).unwrap();
		doc.maybe_done(Some("drag"), "drag", "");
	}
	assert_eq!(doc.event_log().history(), vec!["create", "drag"]);
	assert!(doc.undo());
	assert_eq!(doc.attr(p, "x"), None);
}

#[test]
fn virginity_tracks_saved_position() {
	let (mut doc, p) = doc_with_path();
	doc.set_attr(p, "x", "1").unwrap();
	doc.done("edit", "");
	assert!(doc.is_modified());
	doc.undo();
	assert!(!doc.is_modified());
	doc.redo();
	assert!(doc.is_modified());
}

#[test]
fn cancel_rolls_back_pending_changes() {
	let (mut doc, p) = doc_with_path();
	doc.set_attr(p, "x", "1").unwrap();
	let q = doc.create_element(names::PATH);
	doc.append_child(doc.root(), q).unwrap();
	doc.cancel();
	assert_eq!(doc.attr(p, "x"), None);
	assert!(!doc.is_attached(q));
	assert!(!doc.has_pending());
}

#[test]
fn insensitive_mutations_are_not_recorded() {
	let (mut doc, p) = doc_with_path();
	let prev = doc.set_sensitive(false);
	doc.set_attr(p, "x", "1").unwrap();
	doc.set_sensitive(prev);
	assert!(!doc.done("nothing", ""));
}
