//! Stack operations. Each public operation is one undoable transaction:
//! it commits once on success and rolls the document back on failure.

use std::ops::Range;

use livepath_document::{Document, Listener, NodeId, attr, names};
use livepath_geom::{Affine, PathVector, write_d, write_transform};
use rustc_hash::FxHashMap as HashMap;
use tracing::{debug, trace, warn};

use super::driver::{Pass, effect_targets, seed_geometry, whole_input};
use super::{EFFECT_WATCH, EffectEngine, EffectPhase, EffectSlot, UNDO_ICON, refs};
use crate::context::EffectContext;
use crate::effect::{Effect, find_param_mut, for_each_param_mut};
use crate::param::ParamType;
use crate::shape;
use crate::{EffectError, LinkError, ParamError, Result};

impl EffectEngine {
	/// Creates an effect object of type `key` and appends it to the item's
	/// list.
	pub fn apply_effect(&mut self, doc: &mut Document, item: NodeId, key: &str) -> Result<NodeId> {
		let result = self.apply_effect_inner(doc, item, key);
		self.finish(doc, result, "Apply path effect")
	}

	/// Appends an existing effect object to the item's list. With `reset`
	/// its parameters return to their defaults first.
	pub fn add_path_effect(&mut self, doc: &mut Document, item: NodeId, href: &str, reset: bool) -> Result<NodeId> {
		let result = self.add_path_effect_inner(doc, item, href, reset);
		self.finish(doc, result, "Add path effect")
	}

	/// Removes the effect at `index` of the item's list. With `keep_paths`
	/// the current output stays as plain geometry.
	pub fn remove_effect(&mut self, doc: &mut Document, item: NodeId, index: usize, keep_paths: bool) -> Result<()> {
		let result = self.remove_range(doc, item, index..index + 1, keep_paths);
		self.finish(doc, result, "Remove path effect")
	}

	/// Removes the current effect of the item.
	pub fn remove_current(&mut self, doc: &mut Document, item: NodeId, keep_paths: bool) -> Result<()> {
		let result = self.current_index(doc, item).and_then(|index| {
			self.remove_range(doc, item, index..index + 1, keep_paths)
		});
		self.finish(doc, result, "Remove path effect")
	}

	/// Removes every effect of the item, and with `recursive` of every item
	/// below it.
	pub fn remove_all(&mut self, doc: &mut Document, item: NodeId, keep_paths: bool, recursive: bool) -> Result<()> {
		let result = self.remove_all_inner(doc, item, keep_paths, recursive);
		self.finish(doc, result, "Remove all path effects")
	}

	pub fn move_up(&mut self, doc: &mut Document, item: NodeId, index: usize) -> Result<()> {
		let result = self.move_inner(doc, item, index, index.saturating_sub(1));
		self.finish(doc, result, "Move path effect up")
	}

	pub fn move_down(&mut self, doc: &mut Document, item: NodeId, index: usize) -> Result<()> {
		let result = self.move_inner(doc, item, index, index + 1);
		self.finish(doc, result, "Move path effect down")
	}

	/// Moves the effect at `from` to position `to`, clamped to the list.
	pub fn move_effect(&mut self, doc: &mut Document, item: NodeId, from: usize, to: usize) -> Result<()> {
		let result = self.move_inner(doc, item, from, to);
		self.finish(doc, result, "Reorder path effects")
	}

	/// Inserts a private copy of the effect at `index` right after it.
	pub fn duplicate_effect(&mut self, doc: &mut Document, item: NodeId, index: usize) -> Result<NodeId> {
		let result = self.duplicate_inner(doc, item, index);
		self.finish(doc, result, "Duplicate path effect")
	}

	/// Bakes the stack up to and including `index` into the item's original
	/// outline and removes those effects. Later effects keep running on the
	/// baked outline.
	pub fn flatten_effect(&mut self, doc: &mut Document, item: NodeId, index: usize) -> Result<()> {
		let result = self.flatten_inner(doc, item, index);
		self.finish(doc, result, "Flatten path effect")
	}

	/// Gives the item private copies of effect objects shared by more than
	/// `allowed_users` items, or of every effect with `force`. Returns
	/// whether anything was forked.
	pub fn fork_if_necessary(
		&mut self,
		doc: &mut Document,
		item: NodeId,
		allowed_users: usize,
		recursive: bool,
		force: bool,
	) -> Result<bool> {
		let result = self.fork_item(doc, item, allowed_users, recursive, force).and_then(|forked| {
			if forked {
				self.update_path_effects(doc, item, true)?;
			}
			Ok(forked)
		});
		self.finish(doc, result, "Fork path effect")
	}

	/// Sets one parameter of the effect at `index`; `None` resets it to its
	/// default. A shared effect object is forked first so other items keep
	/// their values. Consecutive edits of the same parameter merge into one
	/// undo step.
	pub fn set_parameter(
		&mut self,
		doc: &mut Document,
		item: NodeId,
		index: usize,
		key: &str,
		value: Option<&str>,
	) -> Result<()> {
		let result = self.set_parameter_inner(doc, item, index, key, value);
		match result {
			Ok(lpe) => {
				let merge_key = format!("lpe-param:{}:{key}", doc.id(lpe).unwrap_or_default());
				doc.maybe_done(Some(&merge_key), "Change path effect parameter", UNDO_ICON);
				trace!(?lpe, key, "committed parameter change");
				Ok(())
			}
			Err(error) => {
				warn!(?item, key, %error, "parameter change rolled back");
				self.rollback(doc);
				Err(error)
			}
		}
	}

	/// Shows or hides the effect at `index`. Like [`Self::set_parameter`],
	/// a shared effect object is forked first.
	pub fn set_visible(&mut self, doc: &mut Document, item: NodeId, index: usize, visible: bool) -> Result<()> {
		let result = self.set_visible_inner(doc, item, index, visible);
		self.finish(doc, result, if visible { "Show path effect" } else { "Hide path effect" })
	}

	/// Applies `affine` to the item. Shapes bake it into their original
	/// outline and position-valued parameters follow; groups compose it into
	/// their `transform`.
	pub fn transform_item(&mut self, doc: &mut Document, item: NodeId, affine: Affine) -> Result<()> {
		let result = self.transform_inner(doc, item, affine);
		self.finish(doc, result, "Transform")
	}

	fn finish<T>(&mut self, doc: &mut Document, result: Result<T>, description: &str) -> Result<T> {
		match result {
			Ok(value) => {
				if doc.done(description, UNDO_ICON) {
					trace!(description, "committed");
				}
				Ok(value)
			}
			Err(error) => {
				warn!(description, %error, "operation rolled back");
				self.rollback(doc);
				Err(error)
			}
		}
	}

	fn lpe_at(&self, doc: &Document, item: NodeId, index: usize) -> Result<NodeId> {
		refs::hrefs(doc, item)
			.get(index)
			.and_then(|href| refs::resolve(doc, href))
			.ok_or(EffectError::NoSuchEffect { item, index })
	}

	fn current_index(&self, doc: &Document, item: NodeId) -> Result<usize> {
		let current = self.current_effect(doc, item);
		let list = refs::hrefs(doc, item);
		current
			.and_then(|lpe| refs::href_of(doc, lpe))
			.and_then(|href| list.iter().position(|h| *h == href))
			.ok_or(EffectError::NoSuchEffect { item, index: 0 })
	}

	/// Takes the effect out of its slot for the duration of `f`.
	pub(super) fn with_effect<R>(
		&mut self,
		doc: &mut Document,
		lpe: NodeId,
		f: impl FnOnce(&mut Self, &mut Document, &mut dyn Effect) -> R,
	) -> Result<R> {
		self.ensure_loaded(doc, lpe);
		let slot = self.instances.get_mut(&lpe).ok_or(EffectError::NotAnEffect(lpe))?;
		let mut effect = slot
			.effect
			.take()
			.ok_or_else(|| EffectError::UnknownEffect(slot.type_key.clone()))?;
		let out = f(self, doc, effect.as_mut());
		if let Some(slot) = self.instances.get_mut(&lpe) {
			slot.effect = Some(effect);
		}
		Ok(out)
	}

	/// Runs a lifecycle hook of `lpe` for `item` with the item's original
	/// geometry as input.
	fn run_hook(
		&mut self,
		doc: &mut Document,
		item: NodeId,
		lpe: NodeId,
		hook: impl FnOnce(&mut dyn Effect, &mut EffectContext<'_>, &PathVector) -> Result<()>,
	) -> Result<()> {
		self.with_effect(doc, lpe, |engine, doc, effect| {
			Self::link_params(doc, item, lpe, effect);
			let targets = effect_targets(doc, item, effect.common().apply_to_clippath_and_mask);
			let mut geometry = HashMap::default();
			seed_geometry(doc, &targets, &mut geometry);
			let whole = whole_input(&targets, &geometry);
			let mut cx = EffectContext {
				doc,
				item,
				lpe_node: lpe,
				recompute: &engine.recompute,
				config: &engine.config,
				is_clip_or_mask: false,
				input_bbox: whole.bounding_box(),
				geometry: &geometry,
			};
			hook(effect, &mut cx, &whole)
		})?
	}

	fn apply_effect_inner(&mut self, doc: &mut Document, item: NodeId, key: &str) -> Result<NodeId> {
		if !doc.is_attached(item) {
			return Err(livepath_document::DocumentError::Detached(item).into());
		}
		let mut effect = self.registry.create(key)?;
		let lpe = doc.create_element(names::PATH_EFFECT);
		doc.set_attr(lpe, attr::EFFECT, key)?;
		let id = doc.unique_id("path-effect");
		doc.set_attr(lpe, attr::ID, &id)?;
		let defs = doc.defs();
		doc.append_child(defs, lpe)?;

		self.read_params(doc, lpe, effect.as_mut());
		effect.common_mut().is_load = false;
		let watch = doc.subscribe(lpe, Listener::new(lpe, EFFECT_WATCH));
		self.instances.insert(
			lpe,
			EffectSlot {
				effect: Some(effect),
				type_key: key.to_string(),
				_watch: watch,
			},
		);
		self.write_params(doc, lpe)?;
		self.attach_to_item(doc, item, lpe)?;
		debug!(?item, ?lpe, effect = key, "applied path effect");
		Ok(lpe)
	}

	fn add_path_effect_inner(&mut self, doc: &mut Document, item: NodeId, href: &str, reset: bool) -> Result<NodeId> {
		let node = doc
			.get_object_by_href(href)
			.ok_or_else(|| LinkError::NotFound(href.to_string()))?;
		let lpe = refs::resolve(doc, href).ok_or(EffectError::NotAnEffect(node))?;
		self.ensure_loaded(doc, lpe);
		self.loaded(lpe)?;
		if reset {
			self.with_effect(doc, lpe, |_, _, effect| {
				for_each_param_mut(effect, |_, param| param.set_default());
				effect.common_mut().is_applied = false;
			})?;
			self.write_params(doc, lpe)?;
		}
		self.attach_to_item(doc, item, lpe)?;
		Ok(lpe)
	}

	/// Appends `lpe` to the item's list and runs its apply hook.
	fn attach_to_item(&mut self, doc: &mut Document, item: NodeId, lpe: NodeId) -> Result<()> {
		let with_clip = self.loaded(lpe)?.common().apply_to_clippath_and_mask;
		for target in effect_targets(doc, item, with_clip) {
			shape::ensure_original(doc, target.node)?;
		}
		let href = refs::href_of(doc, lpe).ok_or(EffectError::NotAnEffect(lpe))?;
		let mut list = refs::hrefs(doc, item);
		list.push(href);
		refs::write_hrefs(doc, item, &list)?;
		self.current.insert(item, lpe);
		self.phases.insert((lpe, item), EffectPhase::Applying);

		self.run_hook(doc, item, lpe, |effect, cx, input| {
			let result = effect.on_apply(cx, input);
			let common = effect.common_mut();
			common.lpeversion.set("1");
			common.is_applied = true;
			result
		})?;
		self.phases.insert((lpe, item), EffectPhase::Ready);
		self.write_params(doc, lpe)?;
		self.watch_item(doc, item);
		self.update_path_effects(doc, item, true)
	}

	fn remove_all_inner(&mut self, doc: &mut Document, item: NodeId, keep_paths: bool, recursive: bool) -> Result<()> {
		if recursive {
			for child in doc.children(item).to_vec() {
				self.remove_all_inner(doc, child, keep_paths, true)?;
			}
		}
		let len = refs::hrefs(doc, item).len();
		if len > 0 {
			self.remove_range(doc, item, 0..len, keep_paths)?;
		}
		Ok(())
	}

	/// Removes a run of the item's list. Each removed effect sees its remove
	/// hook before its reference goes.
	fn remove_range(&mut self, doc: &mut Document, item: NodeId, range: Range<usize>, keep_paths: bool) -> Result<()> {
		let mut list = refs::hrefs(doc, item);
		if range.is_empty() || range.end > list.len() {
			return Err(EffectError::NoSuchEffect {
				item,
				index: range.end.saturating_sub(1),
			});
		}
		let removed: Vec<NodeId> = list
			.drain(range)
			.filter_map(|href| refs::resolve(doc, &href))
			.collect();
		for &lpe in &removed {
			let hook = self.run_hook(doc, item, lpe, |effect, cx, _| {
				effect.common_mut().keep_paths = keep_paths;
				effect.on_remove(cx)
			});
			match hook {
				Ok(()) | Err(EffectError::UnknownEffect(_)) => {}
				Err(error) => warn!(?item, ?lpe, %error, "remove hook failed"),
			}
			self.phases.insert((lpe, item), EffectPhase::Removed);
		}
		refs::write_hrefs(doc, item, &list)?;
		if list.is_empty() {
			self.release_item(doc, item, keep_paths)?;
		} else {
			self.update_path_effects(doc, item, true)?;
		}
		for lpe in removed {
			self.phases.remove(&(lpe, item));
			self.delete_if_unused(doc, lpe)?;
		}
		Ok(())
	}

	/// Returns an item whose list became empty to plain geometry.
	fn release_item(&mut self, doc: &mut Document, item: NodeId, keep_paths: bool) -> Result<()> {
		self.forget_item(item);
		if doc.ancestors(item).into_iter().any(|a| refs::has_effects(doc, a)) {
			return self.update_path_effects(doc, item, true);
		}
		let mut inner = Vec::new();
		for target in effect_targets(doc, item, true) {
			let owned_below = std::iter::once(target.node)
				.chain(doc.ancestors(target.node).into_iter().take_while(|a| *a != item))
				.find(|n| refs::has_effects(doc, *n));
			match owned_below {
				Some(owner) if !inner.contains(&owner) => inner.push(owner),
				Some(_) => {}
				None => shape::restore_original(doc, target.node, keep_paths)?,
			}
		}
		for owner in inner {
			self.update_path_effects(doc, owner, true)?;
		}
		Ok(())
	}

	fn delete_if_unused(&mut self, doc: &mut Document, lpe: NodeId) -> Result<()> {
		if !doc.is_attached(lpe) || !refs::items_using(doc, lpe).is_empty() || doc.is_clipboard() {
			return Ok(());
		}
		doc.delete(lpe)?;
		self.instances.remove(&lpe);
		debug!(?lpe, "deleted unused effect object");
		Ok(())
	}

	fn move_inner(&mut self, doc: &mut Document, item: NodeId, from: usize, to: usize) -> Result<()> {
		let mut list = refs::hrefs(doc, item);
		if from >= list.len() {
			return Err(EffectError::NoSuchEffect { item, index: from });
		}
		let to = to.min(list.len() - 1);
		if from == to {
			return Ok(());
		}
		let href = list.remove(from);
		list.insert(to, href.clone());
		refs::write_hrefs(doc, item, &list)?;
		if let Some(lpe) = refs::resolve(doc, &href) {
			self.current.insert(item, lpe);
		}
		self.update_path_effects(doc, item, true)
	}

	fn duplicate_inner(&mut self, doc: &mut Document, item: NodeId, index: usize) -> Result<NodeId> {
		let lpe = self.lpe_at(doc, item, index)?;
		let copy = self.fork_lpe(doc, lpe)?;
		let href = refs::href_of(doc, copy).ok_or(EffectError::NotAnEffect(copy))?;
		let mut list = refs::hrefs(doc, item);
		list.insert(index + 1, href);
		refs::write_hrefs(doc, item, &list)?;
		self.current.insert(item, copy);
		self.update_path_effects(doc, item, true)?;
		Ok(copy)
	}

	/// Copies an effect object into defs under a fresh id. Generated-object
	/// lists are not carried over; the copy creates its own.
	fn fork_lpe(&mut self, doc: &mut Document, lpe: NodeId) -> Result<NodeId> {
		let copy = doc.duplicate(lpe)?;
		let id = doc.unique_id("path-effect");
		doc.set_attr(copy, attr::ID, &id)?;
		let defs = doc.defs();
		doc.append_child(defs, copy)?;
		self.with_effect(doc, copy, |_, _, effect| {
			for_each_param_mut(effect, |_, param| {
				if param.param_type() == ParamType::SatelliteArray {
					param.set_default();
				}
			});
		})?;
		self.write_params(doc, copy)?;
		debug!(source = ?lpe, ?copy, "forked effect object");
		Ok(copy)
	}

	/// Forks the effect at `index` of the item's list when needed and returns
	/// the object the item now uses.
	fn fork_at(&mut self, doc: &mut Document, item: NodeId, index: usize, allowed_users: usize, force: bool) -> Result<NodeId> {
		let lpe = self.lpe_at(doc, item, index)?;
		if !force && refs::items_using(doc, lpe).len() <= allowed_users {
			return Ok(lpe);
		}
		let copy = self.fork_lpe(doc, lpe)?;
		let href = refs::href_of(doc, copy).ok_or(EffectError::NotAnEffect(copy))?;
		let mut list = refs::hrefs(doc, item);
		list[index] = href;
		refs::write_hrefs(doc, item, &list)?;
		if self.current.get(&item) == Some(&lpe) {
			self.current.insert(item, copy);
		}
		self.phases.remove(&(lpe, item));
		Ok(copy)
	}

	fn fork_item(&mut self, doc: &mut Document, item: NodeId, allowed_users: usize, recursive: bool, force: bool) -> Result<bool> {
		let mut forked = false;
		if recursive {
			for child in doc.children(item).to_vec() {
				forked |= self.fork_item(doc, child, allowed_users, true, force)?;
			}
		}
		for index in 0..refs::hrefs(doc, item).len() {
			let before = self.lpe_at(doc, item, index).ok();
			if before.is_none() {
				continue;
			}
			let after = self.fork_at(doc, item, index, allowed_users, force)?;
			forked |= before != Some(after);
		}
		Ok(forked)
	}

	fn flatten_inner(&mut self, doc: &mut Document, item: NodeId, index: usize) -> Result<()> {
		if index >= refs::hrefs(doc, item).len() {
			return Err(EffectError::NoSuchEffect { item, index });
		}
		let mut pass = Pass::default();
		self.compute(doc, item, &mut pass, Some(index + 1))?;
		for target in effect_targets(doc, item, false) {
			if doc.attr(target.node, attr::ORIGINAL_D).is_none() {
				continue;
			}
			if let Some(pv) = pass.geometry.get(&target.node) {
				let d = write_d(pv);
				doc.set_attr(target.node, attr::ORIGINAL_D, &d)?;
				doc.set_attr(target.node, attr::D, &d)?;
			}
		}
		self.remove_range(doc, item, 0..index + 1, true)
	}

	fn set_parameter_inner(
		&mut self,
		doc: &mut Document,
		item: NodeId,
		index: usize,
		key: &str,
		value: Option<&str>,
	) -> Result<NodeId> {
		let lpe = self.fork_at(doc, item, index, 1, false)?;
		self.with_effect(doc, lpe, |_, doc, effect| -> Result<()> {
			let param = find_param_mut(effect, key).ok_or_else(|| ParamError::UnknownKey(key.to_string()))?;
			match value {
				Some(text) => param.read(text)?,
				None => param.set_default(),
			}
			doc.set_attr(lpe, key, &param.write())?;
			Ok(())
		})??;
		self.update_path_effects(doc, item, true)?;
		Ok(lpe)
	}

	fn set_visible_inner(&mut self, doc: &mut Document, item: NodeId, index: usize, visible: bool) -> Result<()> {
		let lpe = self.fork_at(doc, item, index, 1, false)?;
		self.with_effect(doc, lpe, |_, _, effect| effect.common_mut().is_visible.set(visible))?;
		self.write_params(doc, lpe)?;
		self.run_hook(doc, item, lpe, |effect, cx, _| effect.on_visibility_toggled(cx))?;
		self.update_path_effects(doc, item, true)
	}

	fn transform_inner(&mut self, doc: &mut Document, item: NodeId, affine: Affine) -> Result<()> {
		if shape::is_group(doc, item) {
			let composed = doc.transform(item) * affine;
			match write_transform(composed) {
				Some(text) => doc.set_attr(item, attr::TRANSFORM, &text)?,
				None => {
					doc.remove_attr(item, attr::TRANSFORM)?;
				}
			}
			return self.update_path_effects(doc, item, true);
		}
		if !shape::is_shape(doc, item) {
			return Ok(());
		}
		let key = if doc.attr(item, attr::ORIGINAL_D).is_some() {
			attr::ORIGINAL_D
		} else {
			attr::D
		};
		if let Some(pv) = shape::original_curve(doc, item) {
			doc.set_attr(item, key, &write_d(&pv.transformed(affine)))?;
		}
		for lpe in self.path_effect_list(doc, item) {
			if refs::items_using(doc, lpe).len() > 1 {
				debug!(?lpe, "shared effect keeps its parameters on transform");
				continue;
			}
			self.with_effect(doc, lpe, |_, _, effect| effect.transform_multiply(affine))?;
			self.write_params(doc, lpe)?;
		}
		self.update_path_effects(doc, item, true)
	}
}
