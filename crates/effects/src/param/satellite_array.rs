use livepath_document::NodeId;
use tracing::debug;

use super::{LinkContext, ParamType, Parameter, parse_bool};
use crate::ParamError;
use crate::satellite::{SatelliteReference, parse_href};

/// One generated object tracked by a [`SatelliteArrayParam`].
#[derive(Debug)]
pub struct SatelliteEntry {
	reference: SatelliteReference,
	pub active: bool,
}

impl SatelliteEntry {
	pub fn new(href: impl Into<String>) -> Self {
		Self {
			reference: SatelliteReference::with_href(href),
			active: true,
		}
	}

	pub fn href(&self) -> Option<&str> {
		self.reference.href()
	}

	/// The object as of the last link, `None` when it is gone.
	pub fn target(&self) -> Option<NodeId> {
		self.reference.target()
	}

	fn write(&self) -> String {
		format!("{},{}", self.reference.href().unwrap_or_default(), u8::from(self.active))
	}
}

/// Objects an effect generated and keeps in sync, written as `#id,active`
/// entries joined by ` | `.
#[derive(Debug)]
pub struct SatelliteArrayParam {
	key: &'static str,
	entries: Vec<SatelliteEntry>,
}

impl SatelliteArrayParam {
	pub fn new(key: &'static str) -> Self {
		Self {
			key,
			entries: Vec::new(),
		}
	}

	pub fn entries(&self) -> &[SatelliteEntry] {
		&self.entries
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	/// Resolved object at `index`.
	pub fn target(&self, index: usize) -> Option<NodeId> {
		self.entries.get(index)?.target()
	}

	/// Stores `id` at `index`, growing the list with the new entry when
	/// `index` is past the end.
	pub fn set_id(&mut self, index: usize, id: &str) {
		let entry = SatelliteEntry::new(format!("#{id}"));
		if index < self.entries.len() {
			self.entries[index] = entry;
		} else {
			self.entries.push(entry);
		}
	}

	pub fn clear(&mut self) {
		self.entries.clear();
	}

	fn parse(&self, text: &str) -> Result<Vec<SatelliteEntry>, ParamError> {
		if text.trim().is_empty() {
			return Ok(Vec::new());
		}
		text.split('|')
			.enumerate()
			.map(|(index, token)| {
				let entry_error = |reason: String| ParamError::Entry {
					key: self.key.to_string(),
					index,
					reason,
				};
				let mut fields = token.split(',').map(str::trim);
				let href = fields.next().unwrap_or_default();
				parse_href(href).map_err(|e| entry_error(e.to_string()))?;
				let mut entry = SatelliteEntry::new(href);
				if let Some(active) = fields.next() {
					entry.active = parse_bool(active).ok_or_else(|| entry_error(format!("bad flag {active:?}")))?;
				}
				Ok(entry)
			})
			.collect()
	}
}

impl Parameter for SatelliteArrayParam {
	fn key(&self) -> &str {
		self.key
	}

	fn param_type(&self) -> ParamType {
		ParamType::SatelliteArray
	}

	fn read(&mut self, text: &str) -> Result<(), ParamError> {
		let entries = self.parse(text)?;
		let unchanged = entries.len() == self.entries.len()
			&& entries
				.iter()
				.zip(&self.entries)
				.all(|(a, b)| a.href() == b.href() && a.active == b.active);
		if !unchanged {
			self.entries = entries;
		}
		Ok(())
	}

	fn write(&self) -> String {
		self.entries.iter().map(SatelliteEntry::write).collect::<Vec<_>>().join(" | ")
	}

	fn set_default(&mut self) {
		self.entries.clear();
	}

	fn update_default(&mut self, text: &str) -> Result<(), ParamError> {
		self.parse(text).map(drop)
	}

	fn default_text(&self) -> String {
		String::new()
	}

	fn satellite_hrefs(&self) -> Vec<String> {
		self.entries.iter().filter_map(|e| e.href().map(str::to_string)).collect()
	}

	fn link(&mut self, cx: &LinkContext<'_>) {
		for (index, entry) in self.entries.iter_mut().enumerate() {
			if let Err(error) = entry.reference.attach(cx, index as u32) {
				debug!(key = self.key, index, %error, "satellite object missing");
			}
		}
	}

	fn unlink(&mut self) {
		for entry in &mut self.entries {
			entry.reference.detach();
		}
	}
}
