use tracing::trace;

use super::{CommittedEvent, XmlEvent};

/// Handle to one entry of an [`EventLog`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntryId(usize);

#[derive(Debug)]
struct LogEntry {
	parent: Option<usize>,
	children: Vec<usize>,
	/// Child that redo follows; the most recently visited branch.
	redo_child: Option<usize>,
	event: Option<CommittedEvent>,
}

/// Undo history kept as a tree.
///
/// The root entry carries no event. Undo moves the current position to the
/// parent and redo to the most recently visited child, so committing after an
/// undo grows a sibling branch instead of discarding the undone one.
#[derive(Debug)]
pub struct EventLog {
	entries: Vec<LogEntry>,
	current: usize,
	saved: usize,
}

impl Default for EventLog {
	fn default() -> Self {
		Self::new()
	}
}

impl EventLog {
	pub fn new() -> Self {
		Self {
			entries: vec![LogEntry {
				parent: None,
				children: Vec::new(),
				redo_child: None,
				event: None,
			}],
			current: 0,
			saved: 0,
		}
	}

	pub fn root(&self) -> EntryId {
		EntryId(0)
	}

	pub fn current(&self) -> EntryId {
		EntryId(self.current)
	}

	/// Appends `event` as a new child of the current entry and moves there.
	pub fn commit(&mut self, event: CommittedEvent) -> EntryId {
		let id = self.entries.len();
		trace!(
			description = %event.description,
			events = event.events.len(),
			parent = self.current,
			"undo event committed"
		);
		self.entries.push(LogEntry {
			parent: Some(self.current),
			children: Vec::new(),
			redo_child: None,
			event: Some(event),
		});
		let parent = &mut self.entries[self.current];
		parent.children.push(id);
		parent.redo_child = Some(id);
		self.current = id;
		EntryId(id)
	}

	/// Merge key of the current entry.
	pub fn current_key(&self) -> Option<&str> {
		self.entries[self.current].event.as_ref()?.key.as_deref()
	}

	/// Folds `events` into the current entry. Returns false at the root.
	pub(crate) fn merge_into_current(&mut self, events: Vec<XmlEvent>, description: &str) -> bool {
		let Some(current) = self.entries[self.current].event.as_mut() else {
			return false;
		};
		current.events.extend(events);
		current.description = description.to_string();
		true
	}

	/// Moves to the parent, returning the events to revert.
	pub(crate) fn step_back(&mut self) -> Option<Vec<XmlEvent>> {
		let entry = &self.entries[self.current];
		let parent = entry.parent?;
		let events = entry.event.as_ref()?.events.clone();
		let from = self.current;
		self.entries[parent].redo_child = Some(from);
		self.current = parent;
		Some(events)
	}

	/// Moves to the redo child, returning the events to replay.
	pub(crate) fn step_forward(&mut self) -> Option<Vec<XmlEvent>> {
		let child = self.entries[self.current].redo_child?;
		let events = self.entries[child].event.as_ref()?.events.clone();
		self.current = child;
		Some(events)
	}

	pub fn can_undo(&self) -> bool {
		self.current != 0
	}

	pub fn can_redo(&self) -> bool {
		self.entries[self.current].redo_child.is_some()
	}

	/// Records the current position as the saved state.
	pub fn mark_saved(&mut self) {
		self.saved = self.current;
	}

	/// True when the current position equals the last saved position.
	pub fn is_virgin(&self) -> bool {
		self.current == self.saved
	}

	/// The committed event at `entry`, `None` for the root.
	pub fn event(&self, entry: EntryId) -> Option<&CommittedEvent> {
		self.entries.get(entry.0)?.event.as_ref()
	}

	pub fn parent(&self, entry: EntryId) -> Option<EntryId> {
		self.entries.get(entry.0)?.parent.map(EntryId)
	}

	/// Branches below `entry`, oldest first.
	pub fn children(&self, entry: EntryId) -> Vec<EntryId> {
		self.entries
			.get(entry.0)
			.map(|e| e.children.iter().copied().map(EntryId).collect())
			.unwrap_or_default()
	}

	/// Descriptions from the oldest entry to the current one.
	pub fn history(&self) -> Vec<&str> {
		let mut out = Vec::new();
		let mut cursor = Some(self.current);
		while let Some(idx) = cursor {
			let entry = &self.entries[idx];
			if let Some(event) = &entry.event {
				out.push(event.description.as_str());
			}
			cursor = entry.parent;
		}
		out.reverse();
		out
	}

	/// Number of committed entries across all branches.
	pub fn len(&self) -> usize {
		self.entries.len() - 1
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}
}
