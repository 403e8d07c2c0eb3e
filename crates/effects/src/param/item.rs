use livepath_document::NodeId;
use tracing::warn;

use super::{LinkContext, ParamType, Parameter};
use crate::ParamError;
use crate::satellite::{SatelliteReference, parse_href};

/// A single `#id` link to another item. Empty text means unlinked.
///
/// The link may dangle: an unresolved reference keeps its text and the owning
/// effect falls back to its own input.
#[derive(Debug)]
pub struct ItemParam {
	key: &'static str,
	reference: SatelliteReference,
	default: String,
	reported: bool,
}

impl ItemParam {
	pub fn new(key: &'static str) -> Self {
		Self {
			key,
			reference: SatelliteReference::new(),
			default: String::new(),
			reported: false,
		}
	}

	pub fn href(&self) -> Option<&str> {
		self.reference.href()
	}

	/// Points the link at `href`, or clears it.
	pub fn set_href(&mut self, href: Option<String>) {
		let href = href.filter(|h| !h.trim().is_empty());
		if href.as_deref() != self.reference.href() {
			self.reported = false;
		}
		self.reference.set_href(href);
	}

	/// The linked item as of the last [`Parameter::link`].
	pub fn linked_item(&self) -> Option<NodeId> {
		self.reference.target()
	}

	pub fn reference(&self) -> &SatelliteReference {
		&self.reference
	}

	fn parse(&self, text: &str) -> Result<Option<String>, ParamError> {
		let text = text.trim();
		if text.is_empty() {
			return Ok(None);
		}
		parse_href(text).map_err(|_| ParamError::invalid(self.key, "item reference", text))?;
		Ok(Some(text.to_string()))
	}
}

impl Parameter for ItemParam {
	fn key(&self) -> &str {
		self.key
	}

	fn param_type(&self) -> ParamType {
		ParamType::Item
	}

	fn read(&mut self, text: &str) -> Result<(), ParamError> {
		let href = self.parse(text)?;
		self.set_href(href);
		Ok(())
	}

	fn write(&self) -> String {
		self.reference.href().unwrap_or_default().to_string()
	}

	fn set_default(&mut self) {
		let href = Some(self.default.clone());
		self.set_href(href);
	}

	fn update_default(&mut self, text: &str) -> Result<(), ParamError> {
		self.default = self.parse(text)?.unwrap_or_default();
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

	fn link(&mut self, cx: &LinkContext<'_>) {
		if self.reference.href().is_none() {
			return;
		}
		match self.reference.attach(cx, 0) {
			Ok(_) => self.reported = false,
			Err(error) => {
				if !self.reported {
					warn!(key = self.key, %error, "linked item unavailable");
					self.reported = true;
				}
			}
		}
	}

	fn unlink(&mut self) {
		self.reference.detach();
	}
}
