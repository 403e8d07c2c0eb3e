//! Boolean combination of an item with a linked operand item.
//!
//! The operand is hidden while the effect is visible. Unless the operands
//! are swapped the item is the subject: a difference removes the operand
//! from it and a division cuts it along the operand's outline.

use livepath_document::{Document, NodeId};
use livepath_geom::{BoolOp, FLATTEN_TOLERANCE, FillRule, PathVector, boolean, division};
use tracing::warn;

use super::split;
use crate::Result;
use crate::context::EffectContext;
use crate::effect::{Effect, EffectCommon};
use crate::param::{BoolParam, EnumData, EnumParam, ItemParam, Parameter};
use crate::shape;

/// The operation applied to the two regions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoolOperation {
	Union,
	Intersection,
	Difference,
	SymmetricDifference,
	/// Pieces of the subject inside and outside the other operand.
	Division,
}

static OPERATIONS: &[EnumData<BoolOperation>] = &[
	EnumData {
		value: BoolOperation::Union,
		key: "union",
		label: "union",
	},
	EnumData {
		value: BoolOperation::Intersection,
		key: "inters",
		label: "intersection",
	},
	EnumData {
		value: BoolOperation::Difference,
		key: "diff",
		label: "difference",
	},
	EnumData {
		value: BoolOperation::SymmetricDifference,
		key: "symdiff",
		label: "symmetric difference",
	},
	EnumData {
		value: BoolOperation::Division,
		key: "cut",
		label: "division",
	},
];

/// Winding rule for one operand; `FromCurve` reads the item's style.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FillType {
	EvenOdd,
	NonZero,
	Positive,
	FromCurve,
}

impl FillType {
	fn resolve(self, doc: &Document, node: NodeId) -> FillRule {
		match self {
			FillType::EvenOdd => FillRule::EvenOdd,
			FillType::NonZero => FillRule::NonZero,
			FillType::Positive => FillRule::Positive,
			FillType::FromCurve => FillRule::from_css(doc.style(node).get("fill-rule")),
		}
	}
}

static FILL_TYPES: &[EnumData<FillType>] = &[
	EnumData {
		value: FillType::EvenOdd,
		key: "oddeven",
		label: "even-odd",
	},
	EnumData {
		value: FillType::NonZero,
		key: "nonzero",
		label: "non-zero",
	},
	EnumData {
		value: FillType::Positive,
		key: "positive",
		label: "positive",
	},
	EnumData {
		value: FillType::FromCurve,
		key: "from-curve",
		label: "take from object",
	},
];

/// The region a shape or group covers, in its own coordinates. Group
/// members are unioned under their own fill rules.
fn operand_outline(doc: &Document, operand: NodeId) -> Option<PathVector> {
	if shape::is_shape(doc, operand) {
		return shape::curve(doc, operand);
	}
	if !shape::is_group(doc, operand) {
		return None;
	}
	let mut acc: Option<PathVector> = None;
	for node in doc.descendants(operand).into_iter().filter(|n| shape::is_shape(doc, *n)) {
		let Some(pv) = shape::curve(doc, node) else {
			continue;
		};
		let pv = pv.transformed(shape::relative_transform(doc, node, operand));
		let fill = FillType::FromCurve.resolve(doc, node);
		let prev = acc.unwrap_or_default();
		acc = Some(boolean(&prev, FillRule::EvenOdd, &pv, fill, BoolOp::Union, FLATTEN_TOLERANCE));
	}
	acc
}

#[derive(Debug)]
pub struct BoolOperationEffect {
	common: EffectCommon,
	operand_path: ItemParam,
	operation: EnumParam<BoolOperation>,
	swap_operands: BoolParam,
	rmv_inner: BoolParam,
	filltype_this: EnumParam<FillType>,
	filltype_operand: EnumParam<FillType>,
	/// The operand this effect last hid.
	hidden_operand: Option<NodeId>,
}

impl Default for BoolOperationEffect {
	fn default() -> Self {
		Self::new()
	}
}

impl BoolOperationEffect {
	pub fn new() -> Self {
		Self {
			common: EffectCommon::new(),
			operand_path: ItemParam::new("operand-path"),
			operation: EnumParam::new("operation", OPERATIONS, BoolOperation::Union),
			swap_operands: BoolParam::new("swap-operands", false),
			rmv_inner: BoolParam::new("rmv-inner", false),
			filltype_this: EnumParam::new("filltype-this", FILL_TYPES, FillType::FromCurve),
			filltype_operand: EnumParam::new("filltype-operand", FILL_TYPES, FillType::FromCurve),
			hidden_operand: None,
		}
	}

	pub fn operand(&self) -> &ItemParam {
		&self.operand_path
	}

	pub fn operation(&self) -> BoolOperation {
		self.operation.get()
	}

	fn reveal(&mut self, cx: &mut EffectContext<'_>) -> Result<()> {
		if let Some(operand) = self.hidden_operand.take().filter(|n| cx.doc.is_attached(*n)) {
			split::set_hidden(cx, operand, false)?;
		}
		Ok(())
	}
}

impl Effect for BoolOperationEffect {
	fn key(&self) -> &'static str {
		"bool_op"
	}

	fn common(&self) -> &EffectCommon {
		&self.common
	}

	fn common_mut(&mut self) -> &mut EffectCommon {
		&mut self.common
	}

	fn params(&self) -> Vec<&dyn Parameter> {
		crate::params![
			&self.operand_path,
			&self.operation,
			&self.swap_operands,
			&self.rmv_inner,
			&self.filltype_this,
			&self.filltype_operand,
		]
	}

	fn params_mut(&mut self) -> Vec<&mut dyn Parameter> {
		crate::params_mut![
			&mut self.operand_path,
			&mut self.operation,
			&mut self.swap_operands,
			&mut self.rmv_inner,
			&mut self.filltype_this,
			&mut self.filltype_operand,
		]
	}

	fn on_before_effect(&mut self, cx: &mut EffectContext<'_>, _input: &PathVector) -> Result<()> {
		let operand = self.operand_path.linked_item().filter(|n| *n != cx.item);
		if self.hidden_operand != operand || !self.common.is_visible.get() {
			self.reveal(cx)?;
		}
		if let Some(operand) = operand.filter(|_| self.common.is_visible.get()) {
			split::set_hidden(cx, operand, true)?;
			self.hidden_operand = Some(operand);
		}
		Ok(())
	}

	fn do_effect(&mut self, input: &PathVector, cx: &EffectContext<'_>) -> Result<PathVector> {
		let Some(operand) = self.operand_path.linked_item() else {
			return Ok(input.clone());
		};
		if operand == cx.item {
			warn!(?operand, "operand and current shape are the same");
			return Ok(input.clone());
		}
		let Some(operand_pv) = operand_outline(cx.doc, operand).filter(|pv| !pv.is_empty()) else {
			return Ok(input.clone());
		};
		let operand_pv = operand_pv.transformed(shape::relative_transform(cx.doc, operand, cx.item));
		let fill_this = self.filltype_this.get().resolve(cx.doc, cx.item);
		let fill_operand = self.filltype_operand.get().resolve(cx.doc, operand);

		// `subject` keeps what a difference leaves, `clip` is taken away.
		let (subject, subject_fill, clip, clip_fill) = if self.swap_operands.get() {
			(&operand_pv, fill_operand, input, fill_this)
		} else {
			(input, fill_this, &operand_pv, fill_operand)
		};
		let cleaned;
		let (clip, clip_fill) = if self.rmv_inner.get() {
			let none = PathVector::new();
			cleaned = boolean(clip, clip_fill, &none, FillRule::NonZero, BoolOp::Union, FLATTEN_TOLERANCE);
			(&cleaned, FillRule::EvenOdd)
		} else {
			(clip, clip_fill)
		};

		let op = match self.operation.get() {
			BoolOperation::Division => {
				return Ok(division(subject, subject_fill, clip, clip_fill, FLATTEN_TOLERANCE));
			}
			BoolOperation::Union => BoolOp::Union,
			BoolOperation::Intersection => BoolOp::Intersection,
			BoolOperation::Difference => BoolOp::Difference,
			BoolOperation::SymmetricDifference => BoolOp::Xor,
		};
		Ok(boolean(subject, subject_fill, clip, clip_fill, op, FLATTEN_TOLERANCE))
	}

	fn on_remove(&mut self, cx: &mut EffectContext<'_>) -> Result<()> {
		let Some(operand) = self.operand_path.linked_item().filter(|n| cx.doc.is_attached(*n)) else {
			return Ok(());
		};
		if self.common.keep_paths && self.common.is_visible.get() {
			self.hidden_operand = None;
			cx.doc.delete(operand)?;
			return Ok(());
		}
		self.reveal(cx)
	}

	fn on_visibility_toggled(&mut self, cx: &mut EffectContext<'_>) -> Result<()> {
		if !self.common.is_visible.get() {
			self.reveal(cx)?;
		}
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use livepath_document::{attr, names};
	use livepath_geom::{ParamCurve, parse_d};
	use pretty_assertions::assert_eq;
	use rstest::rstest;

	use super::*;

	/// Enclosed area of polyline output; holes wind the other way.
	fn area(pv: &PathVector) -> f64 {
		let twice: f64 = pv
			.iter()
			.flat_map(|sp| sp.segments())
			.map(|seg| {
				let (a, b) = (seg.start(), seg.end());
				a.x * b.y - b.x * a.y
			})
			.sum();
		(twice / 2.0).abs()
	}

	fn add(doc: &mut Document, d: &str) -> NodeId {
		let path = doc.create_element(names::PATH);
		doc.set_attr(path, attr::D, d).unwrap();
		let root = doc.root();
		doc.append_child(root, path).unwrap();
		path
	}

	fn run(effect: &mut BoolOperationEffect, doc: &mut Document, item: NodeId) -> PathVector {
		let geometry = rustc_hash::FxHashMap::default();
		let recompute = crate::RecomputeContext::default();
		let config = crate::EngineConfig::default();
		let input = shape::curve(doc, item).unwrap();
		let cx = EffectContext {
			doc,
			item,
			lpe_node: item,
			recompute: &recompute,
			config: &config,
			is_clip_or_mask: false,
			input_bbox: None,
			geometry: &geometry,
		};
		effect.do_effect(&input, &cx).unwrap()
	}

	fn linked(doc: &mut Document, operand: NodeId) -> BoolOperationEffect {
		let mut effect = BoolOperationEffect::new();
		doc.set_attr(operand, attr::ID, "operand").unwrap();
		effect.operand_path.read("#operand").unwrap();
		let cx = crate::param::LinkContext {
			doc: &*doc,
			item: None,
			owner: operand,
			slot: 0,
		};
		effect.operand_path.link(&cx);
		effect
	}

	#[rstest]
	#[case("union", false, 150.0, 15.0)]
	#[case("inters", false, 50.0, 10.0)]
	#[case("diff", false, 50.0, 5.0)]
	#[case("diff", true, 50.0, 15.0)]
	#[case("symdiff", false, 100.0, 15.0)]
	fn operations_combine_item_and_operand(
		#[case] operation: &str,
		#[case] swap: bool,
		#[case] expected_area: f64,
		#[case] right_edge: f64,
	) {
		let mut doc = Document::new();
		let item = add(&mut doc, "M 0,0 L 10,0 L 10,10 L 0,10 Z");
		let operand = add(&mut doc, "M 5,0 L 15,0 L 15,10 L 5,10 Z");
		let mut effect = linked(&mut doc, operand);
		effect.operation.read(operation).unwrap();
		effect.swap_operands.set(swap);

		let out = run(&mut effect, &mut doc, item);

		assert!((area(&out) - expected_area).abs() < 1e-3, "area {}", area(&out));
		let bbox = out.bounding_box().unwrap();
		assert!((bbox.x1 - right_edge).abs() < 1e-3, "{bbox:?}");
	}

	#[test]
	fn division_keeps_both_pieces_of_the_item() {
		let mut doc = Document::new();
		let item = add(&mut doc, "M 0,0 L 10,0 L 10,10 L 0,10 Z");
		let operand = add(&mut doc, "M 5,-5 L 15,-5 L 15,15 L 5,15 Z");
		let mut effect = linked(&mut doc, operand);
		effect.operation.set(BoolOperation::Division);

		let out = run(&mut effect, &mut doc, item);

		assert_eq!(out.len(), 2);
		assert!((area(&out) - 100.0).abs() < 1e-3);
	}

	#[test]
	fn operand_transform_is_honoured() {
		let mut doc = Document::new();
		let item = add(&mut doc, "M 0,0 L 10,0 L 10,10 L 0,10 Z");
		let operand = add(&mut doc, "M 0,0 L 10,0 L 10,10 L 0,10 Z");
		doc.set_attr(operand, attr::TRANSFORM, "translate(5,0)").unwrap();
		let mut effect = linked(&mut doc, operand);
		effect.operation.set(BoolOperation::Intersection);

		let out = run(&mut effect, &mut doc, item);

		assert!((area(&out) - 50.0).abs() < 1e-3, "area {}", area(&out));
	}

	#[test]
	fn fill_rule_comes_from_the_style() {
		let mut doc = Document::new();
		let item = add(&mut doc, "M -5,-5 L 15,-5 L 15,15 L -5,15 Z");
		let operand = add(&mut doc, "M 0,0 L 10,0 L 10,10 L 0,10 Z M 2,2 L 8,2 L 8,8 L 2,8 Z");
		doc.set_attr(operand, attr::STYLE, "fill-rule:evenodd").unwrap();
		let mut effect = linked(&mut doc, operand);
		effect.operation.set(BoolOperation::Intersection);
		assert!((area(&run(&mut effect, &mut doc, item)) - 64.0).abs() < 1e-3);

		effect.filltype_operand.set(FillType::NonZero);
		assert!((area(&run(&mut effect, &mut doc, item)) - 100.0).abs() < 1e-3);
	}

	#[test]
	fn unlinked_operand_passes_the_input_through() {
		let mut doc = Document::new();
		let item = add(&mut doc, "M 0,0 L 10,0 L 10,10 Z");
		let mut effect = BoolOperationEffect::new();
		assert_eq!(run(&mut effect, &mut doc, item), parse_d("M 0,0 L 10,0 L 10,10 Z").unwrap());
	}
}
