use livepath_document::{Document, attr, names};
use livepath_geom::{Point, parse_d};
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use rstest::rstest;

use super::*;

#[derive(Debug, Clone, Copy, PartialEq)]
enum Method {
	Size,
	Segments,
}

const METHODS: &[EnumData<Method>] = &[
	EnumData {
		value: Method::Size,
		key: "size",
		label: "By max. segment size",
	},
	EnumData {
		value: Method::Segments,
		key: "segments",
		label: "By number of segments",
	},
];

#[rstest]
#[case("abc")]
#[case("")]
#[case("inf")]
#[case("NaN")]
fn scalar_rejects_and_keeps_value(#[case] text: &str) {
	let mut p = ScalarParam::new("radius", 3.0);
	p.set(7.5);
	assert!(p.read(text).is_err());
	assert_eq!(p.get(), 7.5);
}

#[test]
fn scalar_clamps_and_rounds() {
	let mut p = ScalarParam::new("num_copies", 6.0).with_range(1.0, 100.0).integer();
	p.read("2.6").unwrap();
	assert_eq!(p.write(), "3");
	p.read("-4").unwrap();
	assert_eq!(p.get(), 1.0);
	p.read("1e9").unwrap();
	assert_eq!(p.get_usize(), 100);
}

#[rstest]
#[case("true", true)]
#[case("1", true)]
#[case(" false ", false)]
#[case("0", false)]
fn bool_grammar(#[case] text: &str, #[case] expected: bool) {
	let mut p = BoolParam::new("flexible", !expected);
	p.read(text).unwrap();
	assert_eq!(p.get(), expected);
	assert_eq!(p.write(), if expected { "true" } else { "false" });
}

#[test]
fn enum_unknown_key_keeps_value() {
	let mut p = EnumParam::new("method", METHODS, Method::Size);
	p.read("segments").unwrap();
	assert_eq!(p.get(), Method::Segments);
	assert!(matches!(p.read("bogus"), Err(ParamError::UnknownChoice { .. })));
	assert_eq!(p.get(), Method::Segments);
	assert_eq!(p.default_text(), "size");
}

#[test]
fn enum_array_reports_bad_entry_index() {
	let mut p = EnumArrayParam::new("methods", METHODS, vec![Method::Size]);
	p.read("size|segments").unwrap();
	assert_eq!(p.values(), &[Method::Size, Method::Segments]);
	let err = p.read("size|nope").unwrap_err();
	assert!(matches!(err, ParamError::Entry { index: 1, .. }));
	assert_eq!(p.write(), "size|segments");
}

#[test]
fn scalar_array_grammar() {
	let mut p = ScalarArrayParam::new("offsets", vec![1.0, 2.0]);
	assert_eq!(p.write(), "1|2");
	p.read("0.5|-3").unwrap();
	assert_eq!(p.values(), &[0.5, -3.0]);
	assert!(p.read("1|x").is_err());
	p.read("").unwrap();
	assert!(p.values().is_empty());
}

#[test]
fn update_default_keeps_current_value() {
	let mut p = ScalarParam::new("radius", 0.0);
	p.read("4").unwrap();
	p.update_default("9").unwrap();
	assert_eq!(p.get(), 4.0);
	p.set_default();
	assert_eq!(p.get(), 9.0);
	assert!(p.update_default("nine").is_err());
	assert_eq!(p.default_text(), "9");
}

#[test]
fn point_follows_transform() {
	let mut p = PointParam::new("origin", Point::new(1.0, 2.0));
	p.transform_multiply(livepath_geom::Affine::translate((10.0, 0.0)));
	assert_eq!(p.write(), "11,2");
	assert!(p.read("1 2").is_err());
	assert_eq!(p.get(), Point::new(11.0, 2.0));
}

#[test]
fn random_grammar_and_stream() {
	let mut p = RandomParam::new("displace_x", 10.0, 5);
	assert_eq!(p.write(), "10;5");
	p.read("4").unwrap();
	assert_eq!(p.write(), "4;5");
	p.read("2;-7").unwrap();
	assert_eq!(p.start_seed(), 8);

	let first: Vec<f64> = (0..4).map(|_| p.next()).collect();
	p.reset_randomizer();
	let again: Vec<f64> = (0..4).map(|_| p.next()).collect();
	assert_eq!(first, again);
	assert!(first.iter().all(|v| (0.0..2.0).contains(v)));
}

#[test]
fn random_sign_draws_both_signs() {
	let mut p = RandomParam::new("displace_y", 1.0, 1).with_random_sign(true);
	let draws: Vec<f64> = (0..64).map(|_| p.next()).collect();
	assert!(draws.iter().any(|v| *v < 0.0));
	assert!(draws.iter().any(|v| *v > 0.0));
}

#[test]
fn hidden_accepts_anything() {
	let mut p = HiddenParam::new("lpeversion", "0");
	p.read("1.2 beta").unwrap();
	assert_eq!(p.get(), "1.2 beta");
}

#[test]
fn path_inline_and_link() {
	let mut p = PathParam::new("bendpath", "M 0,0 L 10,0");
	assert!(!p.is_linked());
	assert_eq!(p.geometry().map(|pv| pv.curve_count()), Some(1));

	p.read("#skeleton").unwrap();
	assert!(p.is_linked());
	assert_eq!(p.geometry(), None);
	assert_eq!(p.write(), "#skeleton");
	assert_eq!(p.satellite_hrefs(), vec!["#skeleton".to_string()]);

	assert!(p.read("M 0,0 X 1").is_err());
	assert_eq!(p.write(), "#skeleton");
	p.set_default();
	assert_eq!(p.write(), "M 0,0 L 10,0");
}

#[test]
fn deleted_link_target_reports_unlinked() {
	let mut doc = Document::new();
	let root = doc.root();
	let skeleton = doc.create_element(names::PATH);
	doc.set_attr(skeleton, attr::ID, "skeleton").unwrap();
	doc.set_attr(skeleton, attr::D, "M 0,0 L 5,0").unwrap();
	doc.append_child(root, skeleton).unwrap();
	let owner = doc.create_element(names::PATH_EFFECT);

	let mut p = PathParam::new("bendpath", "M 0,0 L 10,0");
	p.read("#skeleton").unwrap();
	p.link(&LinkContext { doc: &doc, item: None, owner, slot: 0 });
	assert!(p.links_to_item());
	assert_eq!(p.geometry().map(|pv| pv.curve_count()), Some(1));

	doc.delete(skeleton).unwrap();
	assert!(!p.reference().is_attached(&doc));
	p.link(&LinkContext { doc: &doc, item: None, owner, slot: 0 });
	assert!(!p.links_to_item());
	assert_eq!(p.geometry(), None);
	assert_eq!(p.write(), "#skeleton");
}

#[test]
fn path_array_grammar() {
	let mut p = PathArrayParam::new("linkedpaths");
	p.read("#a,0,1|#b,1").unwrap();
	assert_eq!(p.len(), 2);
	assert!(p.entries()[1].reversed);
	assert!(p.entries()[1].visible);
	assert_eq!(p.write(), "#a,0,1|#b,1,1");
	assert!(matches!(p.read("#a,0,1|b"), Err(ParamError::Entry { index: 1, .. })));
	assert_eq!(p.len(), 2);
}

#[test]
fn satellite_array_grammar() {
	let mut p = SatelliteArrayParam::new("lpesatellites");
	p.read("#c1,1 | #c2,0").unwrap();
	assert!(!p.entries()[1].active);
	p.set_id(2, "c3");
	assert_eq!(p.write(), "#c1,1 | #c2,0 | #c3,1");
	assert!(!p.allow_unresolved_on_copy());
}

#[test]
fn node_satellite_grammar() {
	let text = "F,0,0,1,0,2.5,0,1 @ C,1,1,1,0,0.25,0,3 | IC,0,0,1,1,0,0,1";
	let mut p = NodeSatelliteArrayParam::new("nodesatellites_param");
	p.read(text).unwrap();
	assert_eq!(p.data().len(), 2);
	assert_eq!(p.data()[0][1].satellite_type, NodeSatelliteType::Chamfer);
	assert_eq!(p.data()[0][1].steps, 3);
	assert!(p.data()[0][1].is_time);
	assert_eq!(p.write(), text);

	p.read("F,false,false,true,false,1,0,1").unwrap();
	assert_eq!(p.write(), "F,0,0,1,0,1,0,1");
	assert!(p.read("F,0,0,1,0,1,0").is_err());
	assert!(p.read("X,0,0,1,0,1,0,1").is_err());
}

#[test]
fn node_satellites_follow_moved_nodes() {
	let mut p = NodeSatelliteArrayParam::new("nodesatellites_param");
	let square = parse_d("M 0,0 L 10,0 L 10,10 L 0,10 Z").unwrap();
	p.fill(&square, NodeSatellite::new(NodeSatelliteType::Fillet));
	p.data_mut()[0][2].amount = 3.0;

	// Insert a node between the first two.
	let inserted = parse_d("M 0,0 L 5,0 L 10,0 L 10,10 L 0,10 Z").unwrap();
	let mut fill = NodeSatellite::new(NodeSatelliteType::Chamfer);
	fill.amount = 1.0;
	p.recalculate_for_new_path(&inserted, fill);
	let sats = &p.data()[0];
	assert_eq!(sats.len(), 5);
	assert_eq!(sats[1].satellite_type, NodeSatelliteType::Chamfer);
	assert_eq!(sats[3].amount, 3.0);
	assert_eq!(sats[3].satellite_type, NodeSatelliteType::Fillet);
}

#[test]
fn node_satellite_time_conversion() {
	let seg = parse_d("M 0,0 L 10,0").unwrap().subpaths()[0].segments()[0];
	let mut sat = NodeSatellite::new(NodeSatelliteType::Fillet);
	sat.amount = 2.5;
	assert_eq!(sat.time(seg, false), 0.25);
	assert_eq!(sat.time(seg, true), 0.75);
	sat.convert_units(true, seg);
	assert!(sat.is_time);
	assert_eq!(sat.amount, 0.25);
	assert_eq!(sat.arc_distance(seg), 2.5);
	sat.amount = 0.0;
	assert_eq!(sat.time(seg, true), 1.0);
}

proptest! {
	#[test]
	fn prop_scalar_text_is_stable(v in -1.0e6f64..1.0e6) {
		let mut p = ScalarParam::new("k", 0.0);
		p.set(v);
		let text = p.write();
		let mut q = ScalarParam::new("k", 0.0);
		q.read(&text).unwrap();
		prop_assert_eq!(q.write(), text);
	}

	#[test]
	fn prop_node_satellites_reparse(
		amounts in proptest::collection::vec(0.0f64..100.0, 1..8),
		steps in 1usize..20,
	) {
		let mut p = NodeSatelliteArrayParam::new("nodesatellites_param");
		p.set_data(vec![amounts.iter().map(|a| NodeSatellite {
			amount: *a,
			steps,
			..NodeSatellite::new(NodeSatelliteType::InverseFillet)
		}).collect()]);
		let text = p.write();
		let mut q = NodeSatelliteArrayParam::new("nodesatellites_param");
		q.read(&text).unwrap();
		prop_assert_eq!(q.data(), p.data());
	}
}
