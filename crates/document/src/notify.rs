//! Change notification with scoped subscriptions.
//!
//! A [`Subscription`] registers interest in one node. Every mutation of that
//! node (or of its subtree, reported as [`ChangeKind::ChildModified`])
//! queues a [`Notification`] tagged with the subscriber's [`Listener`].
//! Dropping the subscription unregisters it; there is no manual disconnect.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use rustc_hash::FxHashMap;
use slab::Slab;
use smallvec::SmallVec;

use crate::NodeId;

/// Opaque tag identifying who is listening.
///
/// `owner` is usually the node of the listening object and `slot` selects
/// one of its reference holders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Listener {
	pub owner: NodeId,
	pub slot: u32,
}

impl Listener {
	pub fn new(owner: NodeId, slot: u32) -> Self {
		Self { owner, slot }
	}
}

/// What happened to a watched node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeKind {
	/// An attribute of the node changed.
	Modified { key: String },
	/// Something inside the node's subtree changed.
	ChildModified,
	/// The node's `transform` attribute changed.
	Transformed,
	/// The node was removed from the tree.
	Deleted,
}

/// A queued change for one listener.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
	pub listener: Listener,
	pub node: NodeId,
	pub kind: ChangeKind,
}

#[derive(Debug, Default)]
pub(crate) struct SignalHub {
	subscribers: Slab<(NodeId, Listener)>,
	by_node: FxHashMap<NodeId, SmallVec<[usize; 2]>>,
	queue: Vec<Notification>,
}

impl SignalHub {
	pub(crate) fn subscribe(hub: &Rc<RefCell<Self>>, node: NodeId, listener: Listener) -> Subscription {
		let mut this = hub.borrow_mut();
		let key = this.subscribers.insert((node, listener));
		this.by_node.entry(node).or_default().push(key);
		Subscription {
			hub: Rc::downgrade(hub),
			key,
			node,
			listener,
		}
	}

	fn unsubscribe(&mut self, key: usize) {
		let Some((node, _)) = self.subscribers.try_remove(key) else {
			return;
		};
		if let Some(keys) = self.by_node.get_mut(&node) {
			keys.retain(|k| *k != key);
			if keys.is_empty() {
				self.by_node.remove(&node);
			}
		}
	}

	pub(crate) fn emit(&mut self, node: NodeId, kind: ChangeKind) {
		let Some(keys) = self.by_node.get(&node) else {
			return;
		};
		for key in keys {
			let (_, listener) = self.subscribers[*key];
			self.queue.push(Notification {
				listener,
				node,
				kind: kind.clone(),
			});
		}
	}

	pub(crate) fn has_subscribers(&self, node: NodeId) -> bool {
		self.by_node.contains_key(&node)
	}

	pub(crate) fn take(&mut self) -> Vec<Notification> {
		std::mem::take(&mut self.queue)
	}

	pub(crate) fn len(&self) -> usize {
		self.subscribers.len()
	}
}

/// Scoped interest in one node's changes. Dropping it unsubscribes.
#[derive(Debug)]
pub struct Subscription {
	hub: Weak<RefCell<SignalHub>>,
	key: usize,
	node: NodeId,
	listener: Listener,
}

impl Subscription {
	/// The watched node.
	pub fn node(&self) -> NodeId {
		self.node
	}

	pub fn listener(&self) -> Listener {
		self.listener
	}
}

impl Drop for Subscription {
	fn drop(&mut self) {
		if let Some(hub) = self.hub.upgrade() {
			hub.borrow_mut().unsubscribe(self.key);
		}
	}
}
