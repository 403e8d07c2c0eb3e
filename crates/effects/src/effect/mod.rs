//! The effect trait and the state every effect carries.
//!
//! An effect owns its parameters and overrides a handful of hooks. The stack
//! driver calls them in a fixed order for every recompute:
//! [`Effect::on_before_effect`] once per item, [`Effect::do_effect`] once per
//! shape, then [`Effect::on_after_effect`] once per item. Only `do_effect` is
//! mandatory in spirit; its default splits the input into subpaths and runs
//! [`Effect::do_effect_pwd2`] on each.

use std::fmt;

use livepath_geom::{Affine, PathVector, Piecewise};

use crate::Result;
use crate::context::EffectContext;
use crate::param::{BoolParam, HiddenParam, Parameter};

#[cfg(test)]
mod tests;

/// Builds a `Vec<&dyn Parameter>` from parameter fields.
#[macro_export]
macro_rules! params {
	($($p:expr),* $(,)?) => {
		vec![$($p as &dyn $crate::param::Parameter),*]
	};
}

/// Builds a `Vec<&mut dyn Parameter>` from parameter fields.
#[macro_export]
macro_rules! params_mut {
	($($p:expr),* $(,)?) => {
		vec![$($p as &mut dyn $crate::param::Parameter),*]
	};
}

/// Parameters and runtime flags shared by every effect.
#[derive(Debug)]
pub struct EffectCommon {
	pub is_visible: BoolParam,
	/// Version tag written on apply so later releases can migrate data.
	pub lpeversion: HiddenParam,
	/// Set while the effect is being read from a loaded document.
	pub is_load: bool,
	pub is_applied: bool,
	pub has_exception: bool,
	/// Keep generated objects as plain objects when the effect is removed.
	pub keep_paths: bool,
	/// Run on shapes inside clip paths and masks too.
	pub apply_to_clippath_and_mask: bool,
	/// Feed the whole item to [`Effect::do_effect_pwd2`] as one piece.
	pub concatenate_before_pwd2: bool,
	pub pathvector_before: PathVector,
	pub pathvector_after: PathVector,
}

impl Default for EffectCommon {
	fn default() -> Self {
		Self::new()
	}
}

impl EffectCommon {
	pub fn new() -> Self {
		Self {
			is_visible: BoolParam::new("is_visible", true),
			lpeversion: HiddenParam::new("lpeversion", "0"),
			is_load: true,
			is_applied: false,
			has_exception: false,
			keep_paths: false,
			apply_to_clippath_and_mask: false,
			concatenate_before_pwd2: false,
			pathvector_before: PathVector::new(),
			pathvector_after: PathVector::new(),
		}
	}

	pub fn with_clip_and_mask(mut self) -> Self {
		self.apply_to_clippath_and_mask = true;
		self
	}

	pub fn with_concatenate(mut self) -> Self {
		self.concatenate_before_pwd2 = true;
		self
	}
}

/// A live path effect.
pub trait Effect: fmt::Debug {
	/// Type key stored in the effect object's `effect` attribute.
	fn key(&self) -> &'static str;

	fn common(&self) -> &EffectCommon;

	fn common_mut(&mut self) -> &mut EffectCommon;

	/// Effect-specific parameters in declaration order.
	fn params(&self) -> Vec<&dyn Parameter>;

	fn params_mut(&mut self) -> Vec<&mut dyn Parameter>;

	/// False while the effect lacks the input it needs. Such an effect is
	/// skipped and its input passes through.
	fn accepts_input(&self) -> bool {
		true
	}

	/// Runs once when the effect is first applied to `cx.item`. `input` is
	/// the item's whole geometry.
	fn on_apply(&mut self, _cx: &mut EffectContext<'_>, _input: &PathVector) -> Result<()> {
		Ok(())
	}

	/// Runs once per item per recompute, before any geometry is computed.
	fn on_before_effect(&mut self, _cx: &mut EffectContext<'_>, _input: &PathVector) -> Result<()> {
		Ok(())
	}

	/// Computes the output for one shape.
	fn do_effect(&mut self, input: &PathVector, cx: &EffectContext<'_>) -> Result<PathVector> {
		let tolerance = cx.config.piecewise_join_tolerance;
		if self.common().concatenate_before_pwd2 {
			let out = self.do_effect_pwd2(Piecewise::concat(input), cx)?;
			return Ok(out.into_path_vector(tolerance, true));
		}
		let mut out = PathVector::new();
		for sp in input.iter() {
			let piece = self.do_effect_pwd2(Piecewise::from_subpath(sp), cx)?;
			out.extend_from(&piece.into_path_vector(tolerance, true));
		}
		Ok(out)
	}

	/// Transforms one piecewise run. The default is the identity.
	fn do_effect_pwd2(&mut self, input: Piecewise, _cx: &EffectContext<'_>) -> Result<Piecewise> {
		Ok(input)
	}

	/// Runs once per item per recompute with the final output of this effect.
	fn on_after_effect(&mut self, _cx: &mut EffectContext<'_>, _output: &PathVector) -> Result<()> {
		Ok(())
	}

	/// Runs when the effect is removed from `cx.item`.
	fn on_remove(&mut self, _cx: &mut EffectContext<'_>) -> Result<()> {
		Ok(())
	}

	fn on_visibility_toggled(&mut self, _cx: &mut EffectContext<'_>) -> Result<()> {
		Ok(())
	}

	/// Follows an item transform with position-valued parameters.
	fn transform_multiply(&mut self, affine: Affine) {
		for param in self.params_mut() {
			param.transform_multiply(affine);
		}
	}
}

/// Every parameter, common ones first. Positions are stable and name the
/// listener slot of each parameter.
pub fn all_params(effect: &dyn Effect) -> Vec<&dyn Parameter> {
	let common = effect.common();
	let mut out = crate::params![&common.is_visible, &common.lpeversion];
	out.extend(effect.params());
	out
}

/// Calls `f` with every parameter and its position in [`all_params`].
pub fn for_each_param_mut(effect: &mut dyn Effect, mut f: impl FnMut(usize, &mut dyn Parameter)) {
	let common = effect.common_mut();
	f(0, &mut common.is_visible);
	f(1, &mut common.lpeversion);
	for (index, param) in effect.params_mut().into_iter().enumerate() {
		f(index + 2, param);
	}
}

/// Looks a parameter up by attribute key.
pub fn find_param_mut<'a>(effect: &'a mut dyn Effect, key: &str) -> Option<&'a mut dyn Parameter> {
	if effect.common().is_visible.key() == key {
		let param: &mut dyn Parameter = &mut effect.common_mut().is_visible;
		return Some(param);
	}
	if effect.common().lpeversion.key() == key {
		let param: &mut dyn Parameter = &mut effect.common_mut().lpeversion;
		return Some(param);
	}
	effect.params_mut().into_iter().find(|p| p.key() == key)
}
