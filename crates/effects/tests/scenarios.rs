use livepath_document::{Document, NodeId, attr, names};
use livepath_effects::context::EffectContext;
use livepath_effects::param::{Parameter, PathParam};
use livepath_effects::{Effect, EffectCommon, EffectEngine, EffectError, EffectPhase, EffectRegistry, EngineConfig, Result};
use livepath_geom::{Affine, PathVector, Point, parse_d};
use pretty_assertions::assert_eq;

const RECT: &str = "M 0,0 L 10,0 L 10,10 L 0,10 Z";

fn add_path(doc: &mut Document, id: &str, d: &str) -> NodeId {
	let path = doc.create_element(names::PATH);
	doc.set_attr(path, attr::ID, id).unwrap();
	doc.set_attr(path, attr::D, d).unwrap();
	let root = doc.root();
	doc.append_child(root, path).unwrap();
	path
}

fn setup() -> (Document, NodeId, EffectEngine) {
	let _ = tracing_subscriber::fmt::try_init();
	let mut doc = Document::new();
	let path = add_path(&mut doc, "path1", RECT);
	doc.done("Draw rectangle", "");
	(doc, path, EffectEngine::default())
}

fn d(doc: &Document, node: NodeId) -> String {
	doc.attr(node, attr::D).unwrap_or_default().to_string()
}

fn close(a: Point, b: Point) -> bool {
	a.distance(b) < 1e-6
}

#[test]
fn chamfer_cuts_the_first_corner() {
	let (mut doc, path, mut engine) = setup();
	let lpe = engine.apply_effect(&mut doc, path, "fillet_chamfer").unwrap();
	engine
		.set_parameter(
			&mut doc,
			path,
			0,
			"nodesatellites_param",
			Some("C,0,0,0,1,2,0,1 @ C,0,0,0,1,0,0,1 @ C,0,0,0,1,0,0,1 @ C,0,0,0,1,0,0,1"),
		)
		.unwrap();

	assert_eq!(d(&doc, path), "M 2,0 L 10,0 L 10,10 L 0,10 L 0,2 Z");
	assert_eq!(doc.attr(path, attr::ORIGINAL_D), Some(RECT));
	assert_eq!(engine.phase(lpe, path), EffectPhase::Ready);
}

#[test]
fn split_copies_are_distributed_around_the_origin() {
	let (mut doc, path, mut engine) = setup();
	let lpe = engine.apply_effect(&mut doc, path, "copy_rotate").unwrap();
	engine.set_parameter(&mut doc, path, 0, "num_copies", Some("4")).unwrap();
	engine.set_parameter(&mut doc, path, 0, "split_items", Some("true")).unwrap();

	assert_eq!(doc.attr(lpe, "rotation_angle"), Some("90"));
	assert_eq!(doc.attr(lpe, "origin"), Some("0,5"));
	assert_eq!(parse_d(&d(&doc, path)).unwrap(), parse_d(RECT).unwrap());

	let copies: Vec<NodeId> = ["path1-1", "path1-2", "path1-3"]
		.iter()
		.map(|id| doc.get_object_by_id(id).unwrap())
		.collect();
	assert_eq!(doc.children(doc.root())[1..], [path, copies[0], copies[1], copies[2]]);
	let expected = [Point::new(0.0, 15.0), Point::new(-10.0, 5.0), Point::new(0.0, -5.0)];
	for (copy, far) in copies.iter().zip(expected) {
		let placement = doc.transform(*copy);
		assert!(close(placement * Point::new(0.0, 5.0), Point::new(0.0, 5.0)));
		assert!(close(placement * Point::new(10.0, 5.0), far));
		assert_eq!(doc.attr(*copy, attr::PATH_EFFECT), None);
		assert_eq!(doc.attr(*copy, attr::ORIGINAL_D), None);
	}

	engine.set_parameter(&mut doc, path, 0, "num_copies", Some("2")).unwrap();
	assert_eq!(doc.style(copies[0]).get("display"), None);
	assert_eq!(doc.style(copies[1]).get("display"), Some("none"));
	assert_eq!(doc.style(copies[2]).get("display"), Some("none"));
	assert!(copies.iter().all(|copy| doc.is_attached(*copy)));
}

#[test]
fn clone_follows_a_link_once_it_resolves() {
	let (mut doc, path, mut engine) = setup();
	let lpe = engine.apply_effect(&mut doc, path, "clone_original").unwrap();
	engine.set_parameter(&mut doc, path, 0, "linkeditem", Some("#source")).unwrap();

	assert_eq!(d(&doc, path), RECT);
	assert_eq!(doc.attr(lpe, "linkeditem"), Some("#source"));
	assert_eq!(engine.phase(lpe, path), EffectPhase::Ready);

	let source = add_path(&mut doc, "source", "M 0,0 L 1,1");
	doc.done("Draw source", "");
	engine.update_path_effects(&mut doc, path, true).unwrap();
	assert_eq!(d(&doc, path), "M 0,0 L 1,1");

	doc.set_attr(source, attr::D, "M 0,0 L 2,2").unwrap();
	engine.process_notifications(&mut doc).unwrap();
	assert_eq!(d(&doc, path), "M 0,0 L 2,2");
}

#[test]
fn deleting_a_skeleton_restores_the_own_outline() {
	let (mut doc, path, mut engine) = setup();
	let skeleton = add_path(&mut doc, "skeleton", "M 0,20 L 40,20");
	doc.done("Draw skeleton", "");
	let lpe = engine.apply_effect(&mut doc, path, "bend_path").unwrap();
	engine.set_parameter(&mut doc, path, 0, "bendpath", Some("#skeleton")).unwrap();
	assert_ne!(d(&doc, path), RECT);

	doc.delete(skeleton).unwrap();
	engine.process_notifications(&mut doc).unwrap();

	assert_eq!(d(&doc, path), RECT);
	assert_eq!(doc.attr(lpe, "bendpath"), Some("#skeleton"));
	assert_eq!(engine.phase(lpe, path), EffectPhase::Ready);
}

#[test]
fn failed_effect_hands_its_input_downstream() {
	let (mut doc, path, mut engine) = setup();
	let bend = engine.apply_effect(&mut doc, path, "bend_path").unwrap();
	engine.set_parameter(&mut doc, path, 0, "bendpath", Some("M 0,0 L 0,0")).unwrap();
	let rotate = engine.apply_effect(&mut doc, path, "copy_rotate").unwrap();
	engine.set_parameter(&mut doc, path, 1, "num_copies", Some("2")).unwrap();
	engine.set_parameter(&mut doc, path, 1, "rotation_angle", Some("180")).unwrap();

	let out = parse_d(&d(&doc, path)).unwrap();
	assert_eq!(out.len(), 2);
	assert_eq!(out.subpaths()[0], parse_d(RECT).unwrap().subpaths()[0]);
	assert_eq!(engine.phase(bend, path), EffectPhase::OnException);
	assert_eq!(engine.phase(rotate, path), EffectPhase::Ready);
}

#[test]
fn stack_order_changes_the_result() {
	let (mut doc, path, mut engine) = setup();
	engine.apply_effect(&mut doc, path, "copy_rotate").unwrap();
	engine.apply_effect(&mut doc, path, "bend_path").unwrap();
	let forward = d(&doc, path);

	engine.move_effect(&mut doc, path, 0, 1).unwrap();
	let swapped = d(&doc, path);
	assert_ne!(forward, swapped);

	engine.move_effect(&mut doc, path, 1, 0).unwrap();
	assert_eq!(d(&doc, path), forward);
}

#[test]
fn editing_a_shared_effect_forks_it() {
	let (mut doc, first, mut engine) = setup();
	let second = add_path(&mut doc, "path2", "M 0,20 L 10,20");
	doc.done("Draw second path", "");
	let shared = engine.apply_effect(&mut doc, first, "roughen").unwrap();
	engine.add_path_effect(&mut doc, second, "#path-effect1", false).unwrap();
	let before = d(&doc, first);

	engine.set_parameter(&mut doc, second, 0, "max_segment_size", Some("5")).unwrap();
	engine.process_notifications(&mut doc).unwrap();

	assert_eq!(doc.attr(first, attr::PATH_EFFECT), Some("#path-effect1"));
	assert_eq!(doc.attr(second, attr::PATH_EFFECT), Some("#path-effect2"));
	assert_eq!(doc.attr(shared, "max_segment_size"), Some("10"));
	let forked = doc.get_object_by_id("path-effect2").unwrap();
	assert_eq!(doc.attr(forked, "max_segment_size"), Some("5"));
	assert_eq!(d(&doc, first), before);
}

#[test]
fn recompute_without_changes_is_a_no_op() {
	let (mut doc, path, mut engine) = setup();
	engine.apply_effect(&mut doc, path, "roughen").unwrap();
	engine.process_notifications(&mut doc).unwrap();
	doc.done("Settle", "");
	let settled = d(&doc, path);

	engine.update_path_effects(&mut doc, path, true).unwrap();
	assert_eq!(d(&doc, path), settled);
	assert!(!doc.has_pending());
}

#[test]
fn undo_reverts_whole_operations() {
	let (mut doc, path, mut engine) = setup();
	let lpe = engine.apply_effect(&mut doc, path, "copy_rotate").unwrap();
	let applied = d(&doc, path);
	engine.set_parameter(&mut doc, path, 0, "num_copies", Some("4")).unwrap();
	let merged = d(&doc, path);
	let satellites = doc.attr(lpe, "lpesatellites").map(str::to_string);
	engine.set_parameter(&mut doc, path, 0, "split_items", Some("true")).unwrap();
	let copies: Vec<NodeId> = ["path1-1", "path1-2", "path1-3"]
		.iter()
		.map(|id| doc.get_object_by_id(id).unwrap())
		.collect();
	assert_eq!(doc.event_log().history(), [
		"Draw rectangle",
		"Apply path effect",
		"Change path effect parameter",
		"Change path effect parameter",
	]);

	assert!(doc.undo());
	assert!(copies.iter().all(|copy| !doc.is_attached(*copy)));
	assert_eq!(doc.attr(lpe, "lpesatellites").map(str::to_string), satellites);
	assert_eq!(d(&doc, path), merged);

	assert!(doc.undo());
	assert_eq!(d(&doc, path), applied);
	assert!(doc.undo());
	assert_eq!(d(&doc, path), RECT);
	assert_eq!(doc.attr(path, attr::PATH_EFFECT), None);
	assert!(!doc.is_attached(lpe));
	engine.process_notifications(&mut doc).unwrap();

	assert!(doc.redo());
	assert!(doc.is_attached(lpe));
	assert_eq!(d(&doc, path), applied);
}

#[test]
fn difference_cuts_the_operand_away() {
	let (mut doc, path, mut engine) = setup();
	let cutter = add_path(&mut doc, "cutter", "M 5,-5 L 15,-5 L 15,15 L 5,15 Z");
	doc.done("Draw cutter", "");
	engine.apply_effect(&mut doc, path, "bool_op").unwrap();
	engine.set_parameter(&mut doc, path, 0, "operand-path", Some("#cutter")).unwrap();
	engine.set_parameter(&mut doc, path, 0, "operation", Some("diff")).unwrap();

	let bbox = parse_d(&d(&doc, path)).unwrap().bounding_box().unwrap();
	assert!((bbox.x0, bbox.x1, bbox.y0, bbox.y1) == (0.0, 5.0, 0.0, 10.0), "{bbox:?}");
	assert_eq!(doc.style(cutter).get("display"), Some("none"));

	doc.set_attr(cutter, attr::D, "M 3,-5 L 15,-5 L 15,15 L 3,15 Z").unwrap();
	engine.process_notifications(&mut doc).unwrap();
	let bbox = parse_d(&d(&doc, path)).unwrap().bounding_box().unwrap();
	assert!((bbox.x1 - 3.0).abs() < 1e-9, "{bbox:?}");

	engine.set_visible(&mut doc, path, 0, false).unwrap();
	assert_eq!(doc.style(cutter).get("display"), None);
}

#[test]
fn split_mirror_lives_in_a_sibling() {
	let (mut doc, path, mut engine) = setup();
	let lpe = engine.apply_effect(&mut doc, path, "mirror_symmetry").unwrap();
	assert_eq!(doc.attr(lpe, "start_point"), Some("10,0"));
	assert_eq!(doc.attr(lpe, "end_point"), Some("10,10"));
	assert_eq!(parse_d(&d(&doc, path)).unwrap().len(), 2);

	engine.set_parameter(&mut doc, path, 0, "split_items", Some("true")).unwrap();
	assert_eq!(parse_d(&d(&doc, path)).unwrap(), parse_d(RECT).unwrap());
	let copy = doc.get_object_by_id("path1-1").unwrap();
	assert_eq!(doc.attr(lpe, "lpesatellites"), Some("#path1-1,1"));
	let placement = doc.transform(copy);
	assert!(close(placement * Point::new(0.0, 5.0), Point::new(20.0, 5.0)));
	assert!(close(placement * Point::new(10.0, 0.0), Point::new(10.0, 0.0)));

	engine.set_parameter(&mut doc, path, 0, "split_items", Some("false")).unwrap();
	assert!(!doc.is_attached(copy));
	assert_eq!(parse_d(&d(&doc, path)).unwrap().len(), 2);
}

/// Outputs the linked outline moved one unit to the right.
#[derive(Debug)]
struct Grow {
	common: EffectCommon,
	source: PathParam,
}

impl Effect for Grow {
	fn key(&self) -> &'static str {
		"grow"
	}

	fn common(&self) -> &EffectCommon {
		&self.common
	}

	fn common_mut(&mut self) -> &mut EffectCommon {
		&mut self.common
	}

	fn params(&self) -> Vec<&dyn Parameter> {
		livepath_effects::params![&self.source]
	}

	fn params_mut(&mut self) -> Vec<&mut dyn Parameter> {
		livepath_effects::params_mut![&mut self.source]
	}

	fn do_effect(&mut self, input: &PathVector, _cx: &EffectContext<'_>) -> Result<PathVector> {
		Ok(match self.source.geometry() {
			Some(pv) if self.source.links_to_item() => pv.transformed(Affine::translate((1.0, 0.0))),
			_ => input.clone(),
		})
	}
}

#[test]
fn reference_cycle_hits_the_recursion_limit() {
	let _ = tracing_subscriber::fmt::try_init();
	let mut registry = EffectRegistry::with_builtins();
	registry.register("grow", || {
		Box::new(Grow {
			common: EffectCommon::new(),
			source: PathParam::new("source", "M 0,0 L 1,0"),
		})
	});
	let config = EngineConfig {
		max_recursion_depth: 4,
		..EngineConfig::default()
	};
	let mut engine = EffectEngine::with_config(registry, config).unwrap();
	let mut doc = Document::new();
	let a = add_path(&mut doc, "a", "M 0,0 L 1,0");
	let b = add_path(&mut doc, "b", "M 0,5 L 1,5");
	doc.done("Draw paths", "");

	engine.apply_effect(&mut doc, a, "grow").unwrap();
	engine.apply_effect(&mut doc, b, "grow").unwrap();
	engine.set_parameter(&mut doc, a, 0, "source", Some("#b")).unwrap();
	assert_eq!(d(&doc, a), "M 1,5 L 2,5");
	engine.set_parameter(&mut doc, b, 0, "source", Some("#a")).unwrap();

	let err = engine.process_notifications(&mut doc).unwrap_err();
	assert!(matches!(err, EffectError::RecursionLimit(4)));
	assert_eq!(engine.process_notifications(&mut doc).unwrap(), 0);
}
