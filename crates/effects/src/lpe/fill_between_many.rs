//! Builds an outline from several linked paths.

use livepath_geom::{EPSILON, PathVector, Subpath};

use crate::Result;
use crate::context::EffectContext;
use crate::effect::{Effect, EffectCommon};
use crate::param::{BoolParam, EnumData, EnumParam, GeometrySource, Parameter, PathArrayParam};
use crate::shape;

static METHODS: &[EnumData<GeometrySource>] = &[
	EnumData {
		value: GeometrySource::Original,
		key: "originald",
		label: "Without LPEs",
	},
	EnumData {
		value: GeometrySource::Rendered,
		key: "d",
		label: "With LPEs",
	},
];

#[derive(Debug)]
pub struct FillBetweenMany {
	common: EffectCommon,
	linkedpaths: PathArrayParam,
	method: EnumParam<GeometrySource>,
	join: BoolParam,
	close: BoolParam,
	autoreverse: BoolParam,
}

impl Default for FillBetweenMany {
	fn default() -> Self {
		Self::new()
	}
}

impl FillBetweenMany {
	pub fn new() -> Self {
		Self {
			common: EffectCommon::new(),
			linkedpaths: PathArrayParam::new("linkedpaths"),
			method: EnumParam::new("method", METHODS, GeometrySource::Original),
			join: BoolParam::new("join", true),
			close: BoolParam::new("close", true),
			autoreverse: BoolParam::new("autoreverse", true),
		}
	}

	pub fn linked_paths(&self) -> &PathArrayParam {
		&self.linkedpaths
	}

	pub fn linked_paths_mut(&mut self) -> &mut PathArrayParam {
		&mut self.linkedpaths
	}

	/// Visible linked subpaths in item coordinates, each with its stored
	/// reversal flag.
	fn sources(&self, cx: &EffectContext<'_>) -> Vec<(Subpath, bool)> {
		let method = self.method.get();
		let mut out = Vec::new();
		for entry in self.linkedpaths.entries().iter().filter(|e| e.visible) {
			let Some(target) = entry.reference().target() else {
				continue;
			};
			let Some(pv) = shape::curve_for(cx.doc, target, method) else {
				continue;
			};
			let pv = pv.transformed(shape::relative_transform(cx.doc, target, cx.item));
			out.extend(pv.into_subpaths().into_iter().map(|sp| (sp, entry.reversed)));
		}
		out
	}

	fn fill(&self, sources: Vec<(Subpath, bool)>) -> PathVector {
		let join = self.join.get();
		let autoreverse = self.autoreverse.get();
		let mut out: Vec<Subpath> = Vec::new();
		for (sp, reversed) in sources {
			if sp.is_empty() {
				continue;
			}
			let mut sp = sp;
			sp.set_open();
			let previous_end = out.last().map(Subpath::end);
			let flip = match previous_end {
				Some(end) if autoreverse => end.distance(sp.end()) < end.distance(sp.start()),
				_ => reversed,
			};
			if flip {
				sp = sp.reversed();
			}
			match out.last_mut() {
				Some(current) if join => {
					if current.end().distance(sp.start()) > EPSILON {
						current.line_to(sp.start());
					}
					for seg in sp.segments() {
						current.push(*seg);
					}
				}
				_ => out.push(sp),
			}
		}
		if self.close.get() {
			for sp in &mut out {
				sp.close();
			}
		}
		out.into()
	}
}

impl Effect for FillBetweenMany {
	fn key(&self) -> &'static str {
		"fill_between_many"
	}

	fn common(&self) -> &EffectCommon {
		&self.common
	}

	fn common_mut(&mut self) -> &mut EffectCommon {
		&mut self.common
	}

	fn params(&self) -> Vec<&dyn Parameter> {
		crate::params![&self.linkedpaths, &self.method, &self.join, &self.close, &self.autoreverse]
	}

	fn params_mut(&mut self) -> Vec<&mut dyn Parameter> {
		crate::params_mut![
			&mut self.linkedpaths,
			&mut self.method,
			&mut self.join,
			&mut self.close,
			&mut self.autoreverse,
		]
	}

	fn accepts_input(&self) -> bool {
		!self.linkedpaths.is_empty()
	}

	fn on_before_effect(&mut self, _cx: &mut EffectContext<'_>, _input: &PathVector) -> Result<()> {
		self.linkedpaths.set_source(self.method.get());
		Ok(())
	}

	fn do_effect(&mut self, input: &PathVector, cx: &EffectContext<'_>) -> Result<PathVector> {
		let sources = self.sources(cx);
		if sources.is_empty() {
			return Ok(input.clone());
		}
		Ok(self.fill(sources))
	}
}
