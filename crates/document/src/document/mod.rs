use std::cell::RefCell;
use std::rc::Rc;

use livepath_geom::{Affine, parse_transform};
use rustc_hash::FxHashMap;
use tracing::{debug, trace, warn};

use crate::node::{Node, attr, names};
use crate::notify::{ChangeKind, Listener, Notification, SignalHub, Subscription};
use crate::undo::{CommittedEvent, EventLog, XmlEvent};
use crate::{DocumentError, NodeId, Result, Style};


/// A tree of element nodes with an identifier index, change notification
/// and a branching undo log.
///
/// Node storage is an append-only arena: deleting a node detaches it from
/// the tree and drops its identifier from the index, but the node itself
/// survives so that undo can reattach it.
#[derive(Debug)]
pub struct Document {
	nodes: Vec<Node>,
	root: NodeId,
	ids: FxHashMap<String, NodeId>,
	hub: Rc<RefCell<SignalHub>>,
	pending: Vec<XmlEvent>,
	log: EventLog,
	sensitive: bool,
	modified: bool,
}

impl Default for Document {
	fn default() -> Self {
		Self::new()
	}
}

impl Document {
	/// Creates a document holding only an `svg:svg` root.
	pub fn new() -> Self {
		Self {
			nodes: vec![Node::new(names::SVG)],
			root: NodeId(0),
			ids: FxHashMap::default(),
			hub: Rc::new(RefCell::new(SignalHub::default())),
			pending: Vec::new(),
			log: EventLog::new(),
			sensitive: true,
			modified: false,
		}
	}

	/// Creates an empty clipboard document.
	pub fn new_clipboard() -> Self {
		let mut doc = Self::new();
		let marker = doc.create_element(names::CLIPBOARD);
		doc.apply_attach(doc.root, marker, 0);
		doc
	}

	pub fn root(&self) -> NodeId {
		self.root
	}

	fn node(&self, id: NodeId) -> Result<&Node> {
		self.nodes.get(id.index()).ok_or(DocumentError::NodeNotFound(id))
	}

	fn node_mut(&mut self, id: NodeId) -> Result<&mut Node> {
		self.nodes.get_mut(id.index()).ok_or(DocumentError::NodeNotFound(id))
	}

	pub fn contains(&self, id: NodeId) -> bool {
		id.index() < self.nodes.len()
	}

	/// Element name such as `svg:path`.
	pub fn name(&self, id: NodeId) -> Option<&str> {
		self.nodes.get(id.index()).map(|n| n.name.as_str())
	}

	pub fn attr(&self, id: NodeId, key: &str) -> Option<&str> {
		self.nodes.get(id.index())?.attrs.get(key).map(String::as_str)
	}

	/// Attributes of a node in insertion order.
	pub fn attrs(&self, id: NodeId) -> impl Iterator<Item = (&str, &str)> + '_ {
		self.nodes
			.get(id.index())
			.into_iter()
			.flat_map(|n| n.attrs.iter().map(|(k, v)| (k.as_str(), v.as_str())))
	}

	/// The node's `id` attribute.
	pub fn id(&self, id: NodeId) -> Option<&str> {
		self.attr(id, attr::ID)
	}

	pub fn parent(&self, id: NodeId) -> Option<NodeId> {
		self.nodes.get(id.index())?.parent
	}

	pub fn children(&self, id: NodeId) -> &[NodeId] {
		self.nodes.get(id.index()).map_or(&[], |n| n.children.as_slice())
	}

	/// True when the node is reachable from the root.
	pub fn is_attached(&self, id: NodeId) -> bool {
		let mut cursor = Some(id);
		while let Some(node) = cursor {
			if node == self.root {
				return true;
			}
			cursor = self.parent(node);
		}
		false
	}

	/// The node and every node below it, in document order.
	pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
		let mut out = Vec::new();
		let mut stack = vec![id];
		while let Some(node) = stack.pop() {
			if !self.contains(node) {
				continue;
			}
			out.push(node);
			stack.extend(self.children(node).iter().rev().copied());
		}
		out
	}

	/// Ancestors from the parent up to the root.
	pub fn ancestors(&self, id: NodeId) -> Vec<NodeId> {
		let mut out = Vec::new();
		let mut cursor = self.parent(id);
		while let Some(node) = cursor {
			out.push(node);
			cursor = self.parent(node);
		}
		out
	}

	/// True when `ancestor` is a strict ancestor of `node`.
	pub fn is_ancestor_of(&self, ancestor: NodeId, node: NodeId) -> bool {
		self.ancestors(node).contains(&ancestor)
	}

	/// Looks up an attached node by identifier.
	pub fn get_object_by_id(&self, id: &str) -> Option<NodeId> {
		self.ids.get(id).copied()
	}

	/// Looks up an attached node by a `#id` reference.
	pub fn get_object_by_href(&self, href: &str) -> Option<NodeId> {
		self.get_object_by_id(href.trim().strip_prefix('#')?)
	}

	/// Identifiers of all attached nodes.
	pub fn ids(&self) -> impl Iterator<Item = &str> {
		self.ids.keys().map(String::as_str)
	}

	/// Returns an identifier `prefix<N>` not yet in use.
	pub fn unique_id(&self, prefix: &str) -> String {
		(1u64..)
			.map(|n| format!("{prefix}{n}"))
			.find(|candidate| !self.ids.contains_key(candidate))
			.unwrap_or_else(|| prefix.to_string())
	}

	/// The `svg:defs` child of the root, created on first use.
	pub fn defs(&mut self) -> NodeId {
		let existing = self
			.children(self.root)
			.iter()
			.copied()
			.find(|c| self.name(*c) == Some(names::DEFS));
		if let Some(defs) = existing {
			return defs;
		}
		let defs = self.create_element(names::DEFS);
		self.apply_attach(self.root, defs, 0);
		self.record(XmlEvent::Attach {
			parent: self.root,
			child: defs,
			index: 0,
		});
		defs
	}

	/// A clipboard document carries an `inkscape:clipboard` node below its root.
	pub fn is_clipboard(&self) -> bool {
		self.children(self.root)
			.iter()
			.any(|c| self.name(*c) == Some(names::CLIPBOARD))
	}

	/// The node's own `transform` attribute. Unparseable text is the identity.
	pub fn transform(&self, id: NodeId) -> Affine {
		let Some(text) = self.attr(id, attr::TRANSFORM) else {
			return Affine::IDENTITY;
		};
		parse_transform(text).unwrap_or_else(|e| {
			warn!(node = ?id, error = %e, "ignoring invalid transform");
			Affine::IDENTITY
		})
	}

	/// Item-to-document transform: every ancestor's transform composed with
	/// the node's own.
	pub fn i2doc(&self, id: NodeId) -> Affine {
		let mut acc = self.transform(id);
		for ancestor in self.ancestors(id) {
			acc = self.transform(ancestor) * acc;
		}
		acc
	}

	pub fn style(&self, id: NodeId) -> Style {
		Style::parse(self.attr(id, attr::STYLE).unwrap_or_default())
	}

	/// Writes `style`, removing the attribute when it is empty.
	pub fn set_style(&mut self, id: NodeId, style: &Style) -> Result<()> {
		if style.is_empty() {
			self.remove_attr(id, attr::STYLE).map(drop)
		} else {
			self.set_attr(id, attr::STYLE, &style.to_string())
		}
	}

	/// Creates a detached element.
	pub fn create_element(&mut self, name: &str) -> NodeId {
		let id = NodeId(self.nodes.len() as u32);
		self.nodes.push(Node::new(name));
		id
	}

	pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<()> {
		let index = self.node(parent)?.children.len();
		self.insert_child(parent, child, index)
	}

	/// Inserts `child` directly after `sibling`.
	pub fn insert_after(&mut self, sibling: NodeId, child: NodeId) -> Result<()> {
		let parent = self.parent(sibling).ok_or(DocumentError::Detached(sibling))?;
		let index = self
			.children(parent)
			.iter()
			.position(|c| *c == sibling)
			.map_or(0, |i| i + 1);
		self.insert_child(parent, child, index)
	}

	/// Inserts `child` under `parent` at `index`, moving it if it already has
	/// a parent. Identifiers in the inserted subtree that collide with
	/// attached nodes are replaced with fresh ones.
	pub fn insert_child(&mut self, parent: NodeId, child: NodeId, index: usize) -> Result<()> {
		self.node(parent)?;
		self.node(child)?;
		if child == self.root {
			return Err(DocumentError::RootImmutable);
		}
		if child == parent || self.is_ancestor_of(child, parent) {
			return Err(DocumentError::Cycle { parent, child });
		}
		if self.parent(child).is_some() {
			self.delete(child)?;
		}
		let index = index.min(self.children(parent).len());
		self.apply_attach(parent, child, index);
		self.record(XmlEvent::Attach { parent, child, index });
		if self.is_attached(parent) {
			self.resolve_id_conflicts(child)?;
		}
		Ok(())
	}

	fn resolve_id_conflicts(&mut self, subtree: NodeId) -> Result<()> {
		for node in self.descendants(subtree) {
			let Some(id) = self.id(node) else {
				continue;
			};
			if self.ids.get(id) == Some(&node) {
				continue;
			}
			let base = id.trim_end_matches(|c: char| c.is_ascii_digit()).to_string();
			let fresh = self.unique_id(if base.is_empty() { "id" } else { &base });
			debug!(old = %id, new = %fresh, "identifier conflict on insert");
			self.set_attr(node, attr::ID, &fresh)?;
		}
		Ok(())
	}

	/// Detaches a node and its subtree. Handles stay valid for undo.
	pub fn delete(&mut self, id: NodeId) -> Result<()> {
		if id == self.root {
			return Err(DocumentError::RootImmutable);
		}
		let Some(parent) = self.node(id)?.parent else {
			return Ok(());
		};
		let index = self.apply_detach(parent, id);
		self.record(XmlEvent::Detach { parent, child: id, index });
		Ok(())
	}

	/// Sets an attribute. Setting `id` to a value held by another attached
	/// node fails with [`DocumentError::DuplicateId`].
	pub fn set_attr(&mut self, id: NodeId, key: &str, value: &str) -> Result<()> {
		let node = self.node(id)?;
		if node.attrs.get(key).is_some_and(|v| v == value) {
			return Ok(());
		}
		if key == attr::ID && self.is_attached(id) {
			if let Some(owner) = self.ids.get(value) {
				if *owner != id {
					return Err(DocumentError::DuplicateId(value.to_string()));
				}
			}
		}
		let (old, index) = self.apply_attr(id, key, Some(value.to_string()), None);
		self.record(XmlEvent::Attr {
			node: id,
			key: key.to_string(),
			old,
			new: Some(value.to_string()),
			index,
		});
		Ok(())
	}

	/// Removes an attribute, returning its previous value.
	pub fn remove_attr(&mut self, id: NodeId, key: &str) -> Result<Option<String>> {
		if !self.node(id)?.attrs.contains_key(key) {
			return Ok(None);
		}
		let (old, index) = self.apply_attr(id, key, None, None);
		self.record(XmlEvent::Attr {
			node: id,
			key: key.to_string(),
			old: old.clone(),
			new: None,
			index,
		});
		Ok(old)
	}

	/// Deep-copies a subtree into a new detached subtree of this document.
	pub fn duplicate(&mut self, id: NodeId) -> Result<NodeId> {
		self.node(id)?;
		let name = self.nodes[id.index()].name.clone();
		let attrs = self.nodes[id.index()].attrs.clone();
		let copy = self.create_element(&name);
		self.nodes[copy.index()].attrs = attrs;
		for child in self.children(id).to_vec() {
			let child_copy = self.duplicate(child)?;
			self.apply_attach(copy, child_copy, self.nodes[copy.index()].children.len());
		}
		Ok(copy)
	}

	/// Copies a subtree of `src` under `parent` in this document.
	pub fn import_subtree(&mut self, src: &Document, node: NodeId, parent: NodeId) -> Result<NodeId> {
		let copy = self.copy_from(src, node)?;
		self.append_child(parent, copy)?;
		Ok(copy)
	}

	fn copy_from(&mut self, src: &Document, node: NodeId) -> Result<NodeId> {
		let source = src.node(node)?;
		let copy = self.create_element(&source.name);
		self.nodes[copy.index()].attrs = source.attrs.clone();
		for child in &source.children {
			let child_copy = self.copy_from(src, *child)?;
			self.apply_attach(copy, child_copy, self.nodes[copy.index()].children.len());
		}
		Ok(copy)
	}

	/// Registers interest in changes to `node`.
	pub fn subscribe(&self, node: NodeId, listener: Listener) -> Subscription {
		SignalHub::subscribe(&self.hub, node, listener)
	}

	/// Drains queued notifications.
	pub fn take_notifications(&self) -> Vec<Notification> {
		self.hub.borrow_mut().take()
	}

	/// Number of live subscriptions.
	pub fn subscriber_count(&self) -> usize {
		self.hub.borrow().len()
	}

	pub fn is_sensitive(&self) -> bool {
		self.sensitive
	}

	/// Enables or suspends undo recording, returning the previous state.
	pub fn set_sensitive(&mut self, sensitive: bool) -> bool {
		std::mem::replace(&mut self.sensitive, sensitive)
	}

	/// True when mutations are waiting for a commit.
	pub fn has_pending(&self) -> bool {
		!self.pending.is_empty()
	}

	/// Commits the pending transaction. Returns false when nothing was pending.
	pub fn done(&mut self, description: &str, icon: &str) -> bool {
		self.maybe_done(None, description, icon)
	}

	/// Commits the pending transaction, merging it into the previous undo
	/// step when both carry the same `key`.
	pub fn maybe_done(&mut self, key: Option<&str>, description: &str, icon: &str) -> bool {
		if self.pending.is_empty() {
			return false;
		}
		let events = std::mem::take(&mut self.pending);
		let mergeable = key.is_some() && self.log.current_key() == key;
		if !(mergeable && self.log.merge_into_current(events.clone(), description)) {
			self.log.commit(CommittedEvent {
				events,
				description: description.to_string(),
				icon: icon.to_string(),
				key: key.map(str::to_string),
			});
		}
		self.modified = !self.log.is_virgin();
		true
	}

	/// Reverts and discards the pending transaction.
	pub fn cancel(&mut self) {
		let events = std::mem::take(&mut self.pending);
		for event in events.iter().rev() {
			self.apply_event(&event.inverse());
		}
	}

	/// Undoes the current undo step. Returns false at the start of history.
	pub fn undo(&mut self) -> bool {
		self.finish_incomplete_transaction();
		let Some(events) = self.log.step_back() else {
			return false;
		};
		for event in events.iter().rev() {
			self.apply_event(&event.inverse());
		}
		self.modified = !self.log.is_virgin();
		true
	}

	/// Redoes along the most recently visited branch. Returns false at a leaf.
	pub fn redo(&mut self) -> bool {
		self.finish_incomplete_transaction();
		let Some(events) = self.log.step_forward() else {
			return false;
		};
		for event in &events {
			self.apply_event(event);
		}
		self.modified = !self.log.is_virgin();
		true
	}

	fn finish_incomplete_transaction(&mut self) {
		if !self.pending.is_empty() {
			warn!(events = self.pending.len(), "incomplete undo transaction committed");
			self.done("", "");
		}
	}

	/// Marks the current state as saved.
	pub fn mark_saved(&mut self) {
		self.log.mark_saved();
		self.modified = false;
	}

	pub fn is_modified(&self) -> bool {
		self.modified
	}

	pub fn event_log(&self) -> &EventLog {
		&self.log
	}

	fn record(&mut self, event: XmlEvent) {
		if self.sensitive {
			trace!(?event, "xml event recorded");
			self.pending.push(event);
		}
	}

	fn apply_event(&mut self, event: &XmlEvent) {
		match event {
			XmlEvent::Attr { node, key, new, index, .. } => {
				self.apply_attr(*node, key, new.clone(), Some(*index));
			}
			XmlEvent::Attach { parent, child, index } => self.apply_attach(*parent, *child, *index),
			XmlEvent::Detach { parent, child, .. } => {
				self.apply_detach(*parent, *child);
			}
		}
	}

	/// Sets or removes one attribute. A new attribute goes to `index` when
	/// given, else to the end. Returns the previous value and the position
	/// the attribute holds, or held before removal.
	fn apply_attr(&mut self, id: NodeId, key: &str, value: Option<String>, index: Option<usize>) -> (Option<String>, usize) {
		let attached = self.is_attached(id);
		let attrs = &mut self.nodes[id.index()].attrs;
		let (old, position) = match value.clone() {
			Some(v) => match (attrs.get_index_of(key), index) {
				(None, Some(at)) => {
					let at = at.min(attrs.len());
					attrs.shift_insert(at, key.to_string(), v);
					(None, at)
				}
				_ => {
					let (at, old) = attrs.insert_full(key.to_string(), v);
					(old, at)
				}
			},
			None => match attrs.shift_remove_full(key) {
				Some((at, _, old)) => (Some(old), at),
				None => (None, attrs.len()),
			},
		};
		if key == attr::ID && attached {
			if let Some(old_id) = &old {
				self.unindex(old_id, id);
			}
			if let Some(new_id) = value {
				self.ids.entry(new_id).or_insert(id);
			}
		}
		let mut hub = self.hub.borrow_mut();
		hub.emit(
			id,
			ChangeKind::Modified {
				key: key.to_string(),
			},
		);
		if key == attr::TRANSFORM {
			hub.emit(id, ChangeKind::Transformed);
		}
		drop(hub);
		self.emit_child_modified(id);
		(old, position)
	}

	fn apply_attach(&mut self, parent: NodeId, child: NodeId, index: usize) {
		let children = &mut self.nodes[parent.index()].children;
		let index = index.min(children.len());
		children.insert(index, child);
		self.nodes[child.index()].parent = Some(parent);
		if self.is_attached(parent) {
			for node in self.descendants(child) {
				if let Some(id) = self.nodes[node.index()].attrs.get(attr::ID) {
					self.ids.entry(id.clone()).or_insert(node);
				}
			}
			self.emit_child_modified(child);
		}
	}

	fn apply_detach(&mut self, parent: NodeId, child: NodeId) -> usize {
		let was_attached = self.is_attached(child);
		let children = &mut self.nodes[parent.index()].children;
		let index = children.iter().position(|c| *c == child).unwrap_or(children.len());
		if index < children.len() {
			children.remove(index);
		}
		self.nodes[child.index()].parent = None;
		if was_attached {
			let subtree = self.descendants(child);
			for node in &subtree {
				if let Some(id) = self.nodes[node.index()].attrs.get(attr::ID).cloned() {
					self.unindex(&id, *node);
				}
			}
			let mut hub = self.hub.borrow_mut();
			for node in subtree {
				hub.emit(node, ChangeKind::Deleted);
			}
			hub.emit(parent, ChangeKind::ChildModified);
			drop(hub);
			self.emit_child_modified(parent);
		}
		index
	}

	/// Drops `id` from the index if `node` owns it, handing it to another
	/// attached node that carries the same identifier.
	fn unindex(&mut self, id: &str, node: NodeId) {
		if self.ids.get(id) != Some(&node) {
			return;
		}
		self.ids.remove(id);
		let heir = self
			.descendants(self.root)
			.into_iter()
			.find(|n| *n != node && self.nodes[n.index()].attrs.get(attr::ID).is_some_and(|v| v == id));
		if let Some(heir) = heir {
			self.ids.insert(id.to_string(), heir);
		}
	}

	fn emit_child_modified(&self, id: NodeId) {
		let ancestors = self.ancestors(id);
		let mut hub = self.hub.borrow_mut();
		for ancestor in ancestors {
			if hub.has_subscribers(ancestor) {
				hub.emit(ancestor, ChangeKind::ChildModified);
			}
		}
	}
}
