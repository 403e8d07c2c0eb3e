//! Replaces an item's outline with the outline of another item.

use livepath_geom::{Affine, PathVector};

use crate::Result;
use crate::context::EffectContext;
use crate::effect::{Effect, EffectCommon};
use crate::param::{BoolParam, EnumData, EnumParam, GeometrySource, ItemParam, Parameter};
use crate::shape;

static METHODS: &[EnumData<GeometrySource>] = &[
	EnumData {
		value: GeometrySource::Rendered,
		key: "d",
		label: "With LPE's",
	},
	EnumData {
		value: GeometrySource::Original,
		key: "originald",
		label: "Without LPE's",
	},
];

#[derive(Debug)]
pub struct CloneOriginal {
	common: EffectCommon,
	linkeditem: ItemParam,
	method: EnumParam<GeometrySource>,
	allow_transforms: BoolParam,
}

impl Default for CloneOriginal {
	fn default() -> Self {
		Self::new()
	}
}

impl CloneOriginal {
	pub fn new() -> Self {
		Self {
			common: EffectCommon::new(),
			linkeditem: ItemParam::new("linkeditem"),
			method: EnumParam::new("method", METHODS, GeometrySource::Rendered),
			allow_transforms: BoolParam::new("allow_transforms", true),
		}
	}

	pub fn linked_item(&self) -> &ItemParam {
		&self.linkeditem
	}

	pub fn set_linked(&mut self, href: Option<String>) {
		self.linkeditem.set_href(href);
	}
}

impl Effect for CloneOriginal {
	fn key(&self) -> &'static str {
		"clone_original"
	}

	fn common(&self) -> &EffectCommon {
		&self.common
	}

	fn common_mut(&mut self) -> &mut EffectCommon {
		&mut self.common
	}

	fn params(&self) -> Vec<&dyn Parameter> {
		crate::params![&self.linkeditem, &self.method, &self.allow_transforms]
	}

	fn params_mut(&mut self) -> Vec<&mut dyn Parameter> {
		crate::params_mut![&mut self.linkeditem, &mut self.method, &mut self.allow_transforms]
	}

	fn do_effect(&mut self, input: &PathVector, cx: &EffectContext<'_>) -> Result<PathVector> {
		let Some(linked) = self.linkeditem.linked_item() else {
			return Ok(input.clone());
		};
		if linked == cx.item {
			return Ok(input.clone());
		}
		let Some(pv) = shape::curve_for(cx.doc, linked, self.method.get()) else {
			return Ok(input.clone());
		};
		let placement = if self.allow_transforms.get() {
			shape::relative_transform(cx.doc, linked, cx.item)
		} else {
			Affine::IDENTITY
		};
		Ok(pv.transformed(placement))
	}
}
