use livepath_document::{Document, NodeId, names};
use rand::Rng;
use tracing::{debug, trace};

use crate::Result;
use crate::resolve::prevent_id_clashes;

/// Copies the content of `source` into `target` and returns the new
/// top-level items.
///
/// Clashes are resolved on `source` first. Definitions land in the target's
/// `defs`, except those whose identifier the target still holds: those were
/// kept as equivalent and the existing object wins. Other children of the
/// source root are appended to the target root. The clipboard node is never
/// copied.
pub fn merge_documents(
	target: &mut Document,
	source: &mut Document,
	from_clipboard: bool,
	rng: &mut impl Rng,
) -> Result<Vec<NodeId>> {
	prevent_id_clashes(source, target, from_clipboard, rng)?;

	let source_root = source.root();
	let target_root = target.root();
	let mut items = Vec::new();
	for child in source.children(source_root).to_vec() {
		match source.name(child) {
			Some(names::CLIPBOARD) => {}
			Some(names::DEFS) => {
				for def in source.children(child).to_vec() {
					if let Some(id) = source.id(def).filter(|id| target.get_object_by_id(id).is_some()) {
						trace!(id, "definition already present");
						continue;
					}
					let defs = target.defs();
					target.import_subtree(source, def, defs)?;
				}
			}
			_ => items.push(target.import_subtree(source, child, target_root)?),
		}
	}
	debug!(items = items.len(), "merged documents");
	target.done("Import", "");
	Ok(items)
}
