//! Transactions and the branching undo log.
//!
//! Every recorded mutation becomes an [`XmlEvent`]. Committing closes the
//! pending events into a [`CommittedEvent`] that the [`EventLog`] stores as a
//! node of its undo tree.

use crate::NodeId;

mod event_log;
#[cfg(test)]
mod tests;

pub use event_log::{EntryId, EventLog};

/// One primitive change to the tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum XmlEvent {
	/// An attribute changed from `old` to `new`; `None` means absent.
	/// `index` is the attribute's position in the node's list while present.
	Attr {
		node: NodeId,
		key: String,
		old: Option<String>,
		new: Option<String>,
		index: usize,
	},
	/// `child` was inserted under `parent` at `index`.
	Attach { parent: NodeId, child: NodeId, index: usize },
	/// `child` was removed from `parent`, where it sat at `index`.
	Detach { parent: NodeId, child: NodeId, index: usize },
}

impl XmlEvent {
	/// Returns the event that undoes this one.
	pub fn inverse(&self) -> XmlEvent {
		match self {
			XmlEvent::Attr {
				node,
				key,
				old,
				new,
				index,
			} => XmlEvent::Attr {
				node: *node,
				key: key.clone(),
				old: new.clone(),
				new: old.clone(),
				index: *index,
			},
			XmlEvent::Attach { parent, child, index } => XmlEvent::Detach {
				parent: *parent,
				child: *child,
				index: *index,
			},
			XmlEvent::Detach { parent, child, index } => XmlEvent::Attach {
				parent: *parent,
				child: *child,
				index: *index,
			},
		}
	}
}

/// A closed transaction: the unit of undo and redo.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommittedEvent {
	pub events: Vec<XmlEvent>,
	pub description: String,
	pub icon: String,
	/// Merge key; consecutive commits with the same key collapse into one.
	pub key: Option<String>,
}
