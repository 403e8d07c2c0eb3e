use livepath_geom::{Affine, PathVector, parse_d, write_d};
use tracing::warn;

use super::{GeometrySource, LinkContext, ParamType, Parameter};
use crate::ParamError;
use crate::satellite::{SatelliteReference, parse_href};
use crate::shape;

enum PathValue {
	Inline(PathVector),
	Link(String),
}

/// A path held either inline as `d` text or as a `#id` link to another
/// item's outline.
///
/// Linked geometry is cached in the coordinates of the item the effect is
/// computing for and refreshed on every [`Parameter::link`]. A broken link
/// yields no geometry.
#[derive(Debug)]
pub struct PathParam {
	key: &'static str,
	inline: PathVector,
	default: String,
	reference: SatelliteReference,
	linked: Option<PathVector>,
	source: GeometrySource,
	reported: bool,
}

impl PathParam {
	pub fn new(key: &'static str, default: &str) -> Self {
		let inline = parse_d(default).unwrap_or_default();
		Self {
			key,
			inline,
			default: default.to_string(),
			reference: SatelliteReference::new(),
			linked: None,
			source: GeometrySource::Rendered,
			reported: false,
		}
	}

	pub fn with_source(mut self, source: GeometrySource) -> Self {
		self.source = source;
		self
	}

	pub fn is_linked(&self) -> bool {
		self.reference.href().is_some()
	}

	/// True when a link resolved on the last [`Parameter::link`].
	pub fn links_to_item(&self) -> bool {
		self.reference.target().is_some()
	}

	pub fn reference(&self) -> &SatelliteReference {
		&self.reference
	}

	/// The current geometry: the inline path, or the linked outline. `None`
	/// while a link is unresolved.
	pub fn geometry(&self) -> Option<&PathVector> {
		if self.is_linked() {
			self.linked.as_ref()
		} else {
			Some(&self.inline)
		}
	}

	/// Replaces the value with an inline path, dropping any link.
	pub fn set_inline(&mut self, pv: PathVector) {
		self.reference.set_href(None);
		self.linked = None;
		self.inline = pv;
	}

	pub fn set_href(&mut self, href: &str) {
		self.reported = false;
		self.linked = None;
		self.reference.set_href(Some(href.trim().to_string()));
	}

	fn parse(&self, text: &str) -> Result<PathValue, ParamError> {
		let trimmed = text.trim();
		if trimmed.starts_with('#') || trimmed.starts_with("url(") {
			parse_href(trimmed).map_err(|_| ParamError::invalid(self.key, "path reference", text))?;
			return Ok(PathValue::Link(trimmed.to_string()));
		}
		parse_d(trimmed)
			.map(PathValue::Inline)
			.map_err(|_| ParamError::invalid(self.key, "path", text))
	}
}

impl Parameter for PathParam {
	fn key(&self) -> &str {
		self.key
	}

	fn param_type(&self) -> ParamType {
		ParamType::Path
	}

	fn read(&mut self, text: &str) -> Result<(), ParamError> {
		match self.parse(text)? {
			PathValue::Inline(pv) => self.set_inline(pv),
			PathValue::Link(href) => self.set_href(&href),
		}
		Ok(())
	}

	fn write(&self) -> String {
		match self.reference.href() {
			Some(href) => href.to_string(),
			None => write_d(&self.inline),
		}
	}

	fn set_default(&mut self) {
		let default = self.default.clone();
		if self.read(&default).is_err() {
			self.set_inline(PathVector::new());
		}
	}

	fn update_default(&mut self, text: &str) -> Result<(), ParamError> {
		self.parse(text)?;
		self.default = text.trim().to_string();
		Ok(())
	}

	fn default_text(&self) -> String {
		self.default.clone()
	}

	fn satellite_hrefs(&self) -> Vec<String> {
		self.reference.href().map(str::to_string).into_iter().collect()
	}

	fn allow_unresolved_on_copy(&self) -> bool {
		true
	}

	fn transform_multiply(&mut self, affine: Affine) {
		if !self.is_linked() {
			self.inline = self.inline.transformed(affine);
		}
	}

	fn link(&mut self, cx: &LinkContext<'_>) {
		if !self.is_linked() {
			return;
		}
		match self.reference.attach(cx, 0) {
			Ok(target) => {
				self.reported = false;
				self.linked = shape::curve_for(cx.doc, target, self.source).map(|pv| match cx.item {
					Some(item) => pv.transformed(shape::relative_transform(cx.doc, target, item)),
					None => pv,
				});
			}
			Err(error) => {
				self.linked = None;
				if !self.reported {
					warn!(key = self.key, %error, "linked path unavailable");
					self.reported = true;
				}
			}
		}
	}

	fn unlink(&mut self) {
		self.reference.detach();
		self.linked = None;
	}
}
