use livepath_document::{Document, names};
use livepath_geom::{Affine, PathVector, Piecewise, parse_d, write_d};
use pretty_assertions::assert_eq;
use rustc_hash::FxHashMap;

use super::*;
use crate::config::EngineConfig;
use crate::context::RecomputeContext;
use crate::param::ScalarParam;

#[derive(Debug)]
struct Shift {
	common: EffectCommon,
	dx: ScalarParam,
	seen: Vec<usize>,
}

impl Shift {
	fn new(concatenate: bool) -> Self {
		let common = EffectCommon::new();
		Self {
			common: if concatenate { common.with_concatenate() } else { common },
			dx: ScalarParam::new("dx", 5.0),
			seen: Vec::new(),
		}
	}
}

impl Effect for Shift {
	fn key(&self) -> &'static str {
		"shift"
	}

	fn common(&self) -> &EffectCommon {
		&self.common
	}

	fn common_mut(&mut self) -> &mut EffectCommon {
		&mut self.common
	}

	fn params(&self) -> Vec<&dyn Parameter> {
		crate::params![&self.dx]
	}

	fn params_mut(&mut self) -> Vec<&mut dyn Parameter> {
		crate::params_mut![&mut self.dx]
	}

	fn do_effect_pwd2(&mut self, input: Piecewise, _cx: &EffectContext<'_>) -> Result<Piecewise> {
		self.seen.push(input.segments().len());
		let shift = Affine::translate((self.dx.get(), 0.0));
		Ok(Piecewise::new(input.segments().iter().map(|seg| shift * *seg).collect()))
	}
}

fn run(effect: &mut dyn Effect, input: &PathVector) -> PathVector {
	let mut doc = Document::new();
	let item = doc.create_element(names::PATH);
	let lpe = doc.create_element(names::PATH_EFFECT);
	let recompute = RecomputeContext::default();
	let config = EngineConfig::default();
	let geometry = FxHashMap::default();
	let cx = EffectContext {
		doc: &mut doc,
		item,
		lpe_node: lpe,
		recompute: &recompute,
		config: &config,
		is_clip_or_mask: false,
		input_bbox: input.bounding_box(),
		geometry: &geometry,
	};
	effect.do_effect(input, &cx).unwrap()
}

#[test]
fn default_pipeline_runs_per_subpath() {
	let input = parse_d("M 0,0 L 10,0 L 10,10 Z M 20,0 L 30,0").unwrap();
	let mut effect = Shift::new(false);
	let out = run(&mut effect, &input);
	assert_eq!(effect.seen, vec![3, 1]);
	assert_eq!(write_d(&out), "M 5,0 L 15,0 L 15,10 Z M 25,0 L 35,0");
}

#[test]
fn concatenate_policy_sees_whole_item() {
	let input = parse_d("M 0,0 L 10,0 M 20,0 L 30,0").unwrap();
	let mut effect = Shift::new(true);
	let out = run(&mut effect, &input);
	assert_eq!(effect.seen, vec![2]);
	assert_eq!(out.len(), 2);
}

#[test]
fn parameter_lookup_includes_common_parameters() {
	let mut effect = Shift::new(false);
	let keys: Vec<String> = all_params(&effect).iter().map(|p| p.key().to_string()).collect();
	assert_eq!(keys, vec!["is_visible", "lpeversion", "dx"]);

	find_param_mut(&mut effect, "is_visible").unwrap().read("false").unwrap();
	assert!(!effect.common.is_visible.get());
	find_param_mut(&mut effect, "dx").unwrap().read("2").unwrap();
	assert_eq!(effect.dx.get(), 2.0);
	assert!(find_param_mut(&mut effect, "nope").is_none());

	let mut seen = Vec::new();
	for_each_param_mut(&mut effect, |index, param| seen.push((index, param.write())));
	assert_eq!(seen[2], (2, "2".to_string()));
}

#[test]
fn transform_follows_params() {
	#[derive(Debug)]
	struct Anchor {
		common: EffectCommon,
		at: crate::param::PointParam,
	}
	impl Effect for Anchor {
		fn key(&self) -> &'static str {
			"anchor"
		}
		fn common(&self) -> &EffectCommon {
			&self.common
		}
		fn common_mut(&mut self) -> &mut EffectCommon {
			&mut self.common
		}
		fn params(&self) -> Vec<&dyn Parameter> {
			crate::params![&self.at]
		}
		fn params_mut(&mut self) -> Vec<&mut dyn Parameter> {
			crate::params_mut![&mut self.at]
		}
	}
	let mut effect = Anchor {
		common: EffectCommon::new(),
		at: crate::param::PointParam::new("at", livepath_geom::Point::new(1.0, 1.0)),
	};
	effect.transform_multiply(Affine::scale(2.0));
	assert_eq!(effect.at.write(), "2,2");
}
