use livepath_geom::PathVector;
use tracing::warn;

use super::{GeometrySource, LinkContext, ParamType, Parameter, parse_bool};
use crate::ParamError;
use crate::satellite::{SatelliteReference, parse_href};
use crate::shape;

/// One linked path of a [`PathArrayParam`].
#[derive(Debug)]
pub struct PathEntry {
	reference: SatelliteReference,
	pub reversed: bool,
	pub visible: bool,
	geometry: Option<PathVector>,
}

impl PathEntry {
	pub fn new(href: impl Into<String>) -> Self {
		Self {
			reference: SatelliteReference::with_href(href),
			reversed: false,
			visible: true,
			geometry: None,
		}
	}

	pub fn href(&self) -> Option<&str> {
		self.reference.href()
	}

	pub fn reference(&self) -> &SatelliteReference {
		&self.reference
	}

	/// Linked outline in the computing item's coordinates, `None` while the
	/// link is unresolved.
	pub fn geometry(&self) -> Option<&PathVector> {
		self.geometry.as_ref()
	}

	fn write(&self) -> String {
		format!(
			"{},{},{}",
			self.reference.href().unwrap_or_default(),
			u8::from(self.reversed),
			u8::from(self.visible)
		)
	}
}

/// Entries `#id,reversed,visible` joined by `|`. A missing visibility flag
/// reads as visible.
#[derive(Debug)]
pub struct PathArrayParam {
	key: &'static str,
	entries: Vec<PathEntry>,
	default: String,
	source: GeometrySource,
}

impl PathArrayParam {
	pub fn new(key: &'static str) -> Self {
		Self {
			key,
			entries: Vec::new(),
			default: String::new(),
			source: GeometrySource::Original,
		}
	}

	pub fn with_source(mut self, source: GeometrySource) -> Self {
		self.source = source;
		self
	}

	pub fn source(&self) -> GeometrySource {
		self.source
	}

	/// Switches between rendered and original outlines. Takes effect on the
	/// next link.
	pub fn set_source(&mut self, source: GeometrySource) {
		self.source = source;
	}

	pub fn entries(&self) -> &[PathEntry] {
		&self.entries
	}

	pub fn entries_mut(&mut self) -> &mut [PathEntry] {
		&mut self.entries
	}

	pub fn push(&mut self, entry: PathEntry) {
		self.entries.push(entry);
	}

	pub fn remove(&mut self, index: usize) -> Option<PathEntry> {
		(index < self.entries.len()).then(|| self.entries.remove(index))
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	fn parse(&self, text: &str) -> Result<Vec<PathEntry>, ParamError> {
		if text.trim().is_empty() {
			return Ok(Vec::new());
		}
		text.split('|')
			.enumerate()
			.map(|(index, token)| {
				let entry_error = |reason: &str| ParamError::Entry {
					key: self.key.to_string(),
					index,
					reason: reason.to_string(),
				};
				let mut fields = token.split(',').map(str::trim);
				let href = fields.next().unwrap_or_default();
				parse_href(href).map_err(|e| entry_error(&e.to_string()))?;
				let mut entry = PathEntry::new(href);
				if let Some(reversed) = fields.next() {
					entry.reversed = parse_bool(reversed).ok_or_else(|| entry_error("bad reversed flag"))?;
				}
				if let Some(visible) = fields.next() {
					entry.visible = parse_bool(visible).ok_or_else(|| entry_error("bad visibility flag"))?;
				}
				Ok(entry)
			})
			.collect()
	}
}

impl Parameter for PathArrayParam {
	fn key(&self) -> &str {
		self.key
	}

	fn param_type(&self) -> ParamType {
		ParamType::PathArray
	}

	fn read(&mut self, text: &str) -> Result<(), ParamError> {
		let entries = self.parse(text)?;
		let unchanged = entries.len() == self.entries.len()
			&& entries.iter().zip(&self.entries).all(|(a, b)| {
				a.href() == b.href() && a.reversed == b.reversed && a.visible == b.visible
			});
		if !unchanged {
			self.entries = entries;
		}
		Ok(())
	}

	fn write(&self) -> String {
		self.entries.iter().map(PathEntry::write).collect::<Vec<_>>().join("|")
	}

	fn set_default(&mut self) {
		let default = self.default.clone();
		if self.read(&default).is_err() {
			self.entries.clear();
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
		self.entries.iter().filter_map(|e| e.href().map(str::to_string)).collect()
	}

	fn allow_unresolved_on_copy(&self) -> bool {
		true
	}

	fn link(&mut self, cx: &LinkContext<'_>) {
		let source = self.source;
		for (index, entry) in self.entries.iter_mut().enumerate() {
			match entry.reference.attach(cx, index as u32) {
				Ok(target) => {
					entry.geometry = shape::curve_for(cx.doc, target, source).map(|pv| match cx.item {
						Some(item) => pv.transformed(shape::relative_transform(cx.doc, target, item)),
						None => pv,
					});
				}
				Err(error) => {
					if entry.geometry.take().is_some() {
						warn!(key = self.key, index, %error, "linked path lost");
					}
				}
			}
		}
	}

	fn unlink(&mut self) {
		for entry in &mut self.entries {
			entry.reference.detach();
			entry.geometry = None;
		}
	}
}
