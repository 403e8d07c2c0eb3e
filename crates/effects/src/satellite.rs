//! Weak `#id` references from parameters to other document objects.
//!
//! A [`SatelliteReference`] keeps the reference text and, while attached, the
//! resolved node plus a [`Subscription`] on it. It never owns the target:
//! deleting the target leaves the reference detached with its text intact so
//! the link can be reported as broken.

use livepath_document::{Document, Listener, NodeId, Subscription};

use crate::LinkError;
use crate::param::LinkContext;

/// Extracts the identifier from `#id` or `url(#id)`.
pub fn parse_href(text: &str) -> Result<&str, LinkError> {
	let trimmed = text.trim();
	let inner = trimmed
		.strip_prefix("url(")
		.and_then(|rest| rest.strip_suffix(')'))
		.map_or(trimmed, str::trim);
	let id = inner
		.strip_prefix('#')
		.ok_or_else(|| LinkError::MalformedUri(text.to_string()))?;
	if id.is_empty() || id.chars().any(char::is_whitespace) {
		return Err(LinkError::MalformedUri(text.to_string()));
	}
	Ok(id)
}

#[derive(Debug, Default)]
pub struct SatelliteReference {
	href: Option<String>,
	target: Option<NodeId>,
	subscription: Option<Subscription>,
}

impl SatelliteReference {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with_href(href: impl Into<String>) -> Self {
		Self {
			href: Some(href.into()),
			..Self::default()
		}
	}

	pub fn href(&self) -> Option<&str> {
		self.href.as_deref()
	}

	/// The referenced identifier when the text is well formed.
	pub fn id(&self) -> Option<&str> {
		parse_href(self.href.as_deref()?).ok()
	}

	/// Replaces the reference text, detaching when it changes.
	pub fn set_href(&mut self, href: Option<String>) {
		if self.href != href {
			self.detach();
			self.href = href;
		}
	}

	/// Node resolved by the last successful attach.
	pub fn target(&self) -> Option<NodeId> {
		self.target
	}

	pub fn is_listening(&self) -> bool {
		self.subscription.is_some()
	}

	/// Resolves the reference text and subscribes to the target.
	///
	/// Malformed text, a missing target or a target that would feed back into
	/// `cx.item` leave the reference detached.
	pub fn attach(&mut self, cx: &LinkContext<'_>, index: u32) -> Result<NodeId, LinkError> {
		let result = self.resolve_target(cx);
		match result {
			Ok(target) => {
				if self.target != Some(target) || self.subscription.is_none() {
					self.subscription = Some(cx.doc.subscribe(target, Listener::new(cx.owner, cx.slot | index)));
					self.target = Some(target);
				}
				Ok(target)
			}
			Err(e) => {
				self.detach();
				Err(e)
			}
		}
	}

	fn resolve_target(&self, cx: &LinkContext<'_>) -> Result<NodeId, LinkError> {
		let href = self.href.as_deref().unwrap_or_default();
		let id = parse_href(href)?;
		let target = cx
			.doc
			.get_object_by_id(id)
			.ok_or_else(|| LinkError::NotFound(href.to_string()))?;
		if let Some(item) = cx.item {
			let cyclic = target == item || cx.doc.is_ancestor_of(target, item) || cx.doc.is_ancestor_of(item, target);
			if cyclic {
				return Err(LinkError::SelfReference {
					href: href.to_string(),
					item,
				});
			}
		}
		Ok(target)
	}

	/// Re-resolves against the live document; `None` once the target is gone
	/// or no longer carries the referenced identifier.
	pub fn resolve(&self, doc: &Document) -> Option<NodeId> {
		let target = self.target?;
		(doc.is_attached(target) && doc.id(target) == self.id()).then_some(target)
	}

	pub fn is_attached(&self, doc: &Document) -> bool {
		self.resolve(doc).is_some()
	}

	/// Drops the target and its subscription, keeping the text.
	pub fn detach(&mut self) {
		self.target = None;
		self.subscription = None;
	}
}
