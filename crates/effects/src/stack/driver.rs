//! Recomputation: feeding an item's geometry through its effect list.

use livepath_document::{ChangeKind, Document, NodeId, Notification, attr, extract_url_id};
use livepath_geom::{Affine, EPSILON, PathVector};
use rustc_hash::{FxHashMap as HashMap, FxHashSet as HashSet};
use tracing::{debug, trace, warn};

use super::{EFFECT_WATCH, EffectEngine, EffectPhase, ITEM_WATCH, param_slot, refs};
use crate::context::EffectContext;
use crate::effect::{Effect, for_each_param_mut};
use crate::param::LinkContext;
use crate::shape;
use crate::{EffectError, Result};

/// A shape an effect computes for, with the map from its coordinates into
/// the coordinates of the item carrying the effect.
#[derive(Debug, Clone, Copy)]
pub(super) struct Target {
	pub(super) node: NodeId,
	pub(super) to_item: Affine,
	pub(super) in_clip: bool,
}

/// Bookkeeping of one recompute pass.
#[derive(Debug, Default)]
pub(super) struct Pass {
	/// Geometry computed so far, in each shape's own coordinates.
	pub(super) geometry: HashMap<NodeId, PathVector>,
	/// Items whose stack ran.
	items: HashSet<NodeId>,
	/// Effect objects that ran.
	effects: HashSet<NodeId>,
}

fn invert(affine: Affine) -> Option<Affine> {
	(affine.determinant().abs() > EPSILON).then(|| affine.inverse())
}

/// True when a clip path or mask container sits between `node` and `item`.
fn inside_container_below(doc: &Document, node: NodeId, item: NodeId) -> bool {
	doc.ancestors(node)
		.into_iter()
		.take_while(|a| *a != item)
		.any(|a| shape::is_clip_or_mask_container(doc, a))
}

/// The shapes an effect on `item` computes for: the item itself, or every
/// shape of a group outside clip paths and masks. With `with_clip` the
/// shapes of clip paths and masks referenced from the item's subtree follow.
pub(super) fn effect_targets(doc: &Document, item: NodeId, with_clip: bool) -> Vec<Target> {
	let scope = doc.descendants(item);
	let mut out: Vec<Target> = scope
		.iter()
		.copied()
		.filter(|node| shape::is_shape(doc, *node) && !inside_container_below(doc, *node, item))
		.map(|node| Target {
			node,
			to_item: shape::relative_transform(doc, node, item),
			in_clip: false,
		})
		.collect();
	if !with_clip {
		return out;
	}
	for referrer in &scope {
		for key in [attr::CLIP_PATH, attr::MASK] {
			let Some(container) = doc
				.attr(*referrer, key)
				.and_then(extract_url_id)
				.and_then(|id| doc.get_object_by_id(id))
			else {
				continue;
			};
			if !shape::is_clip_or_mask_container(doc, container) {
				continue;
			}
			// Clip content lives in the user space of the referencing element.
			let base = shape::relative_transform(doc, *referrer, item);
			let space = doc.parent(container).unwrap_or(container);
			for node in doc.descendants(container) {
				if !shape::is_shape(doc, node) || out.iter().any(|t| t.node == node) {
					continue;
				}
				out.push(Target {
					node,
					to_item: base * shape::relative_transform(doc, node, space),
					in_clip: true,
				});
			}
		}
	}
	out
}

/// Union of the non-clip targets' geometry in item coordinates.
pub(super) fn whole_input(targets: &[Target], geometry: &HashMap<NodeId, PathVector>) -> PathVector {
	let mut out = PathVector::new();
	for target in targets.iter().filter(|t| !t.in_clip) {
		if let Some(pv) = geometry.get(&target.node) {
			out.extend_from(&pv.transformed(target.to_item));
		}
	}
	out
}

/// Start geometry of every target not yet computed in the pass.
pub(super) fn seed_geometry(doc: &Document, targets: &[Target], geometry: &mut HashMap<NodeId, PathVector>) {
	for target in targets {
		geometry
			.entry(target.node)
			.or_insert_with(|| shape::original_curve(doc, target.node).unwrap_or_default());
	}
}

impl EffectEngine {
	/// Recomputes the effect stack that `item` takes part in.
	///
	/// The whole stack runs from the top-most ancestor carrying effects, so a
	/// shape inside an affected group sees the group's effects too. With
	/// `write` the results become the `d` of every shape that keeps an
	/// original outline and the preview cache entries are dropped; without it
	/// they only land in the preview cache.
	pub fn update_path_effects(&mut self, doc: &mut Document, item: NodeId, write: bool) -> Result<()> {
		if !self.is_enabled() || !doc.is_attached(item) || shape::is_in_symbol(doc, item) {
			return Ok(());
		}
		let Some(top) = self.top_effect_item(doc, item) else {
			return Ok(());
		};
		self.pending.extend(doc.take_notifications());

		let mut pass = Pass::default();
		self.compute(doc, top, &mut pass, None)?;

		let mut results: Vec<(NodeId, PathVector)> = pass.geometry.drain().collect();
		results.sort_by_key(|(node, _)| *node);
		for (node, pv) in results {
			if write {
				self.previews.remove(&node);
				if shape::is_shape(doc, node) && doc.attr(node, attr::ORIGINAL_D).is_some() {
					shape::set_curve(doc, node, &pv)?;
				}
			} else {
				self.previews.insert(node, pv);
			}
		}
		trace!(?top, write, effects = pass.effects.len(), "recomputed effect stack");
		self.absorb(doc, &pass);
		Ok(())
	}

	/// The top-most item whose stack covers `item`.
	fn top_effect_item(&self, doc: &Document, item: NodeId) -> Option<NodeId> {
		let mut top = None;
		if refs::has_effects(doc, item) {
			top = Some(item);
		}
		for ancestor in doc.ancestors(item) {
			if refs::has_effects(doc, ancestor) {
				top = Some(ancestor);
			}
		}
		top.or_else(|| shape::is_group(doc, item).then_some(item))
	}

	/// Runs `item`'s subtree and then its own effects. `limit` caps how many
	/// of the item's own effects run.
	pub(super) fn compute(&mut self, doc: &mut Document, item: NodeId, pass: &mut Pass, limit: Option<usize>) -> Result<()> {
		if !self.active.insert(item) {
			warn!(?item, "recompute re-entered, ignoring");
			return Err(EffectError::Reentrant(item));
		}
		let result = self.compute_guarded(doc, item, pass, limit);
		self.active.remove(&item);
		result
	}

	fn compute_guarded(&mut self, doc: &mut Document, item: NodeId, pass: &mut Pass, limit: Option<usize>) -> Result<()> {
		if shape::is_group(doc, item) {
			for child in doc.children(item).to_vec() {
				if shape::is_group(doc, child) || shape::is_shape(doc, child) {
					self.compute(doc, child, pass, None)?;
				}
			}
		} else if shape::is_shape(doc, item) {
			let pv = shape::original_curve(doc, item).unwrap_or_default();
			pass.geometry.insert(item, pv);
		}
		pass.items.insert(item);

		let mut list = self.path_effect_list(doc, item);
		if let Some(limit) = limit {
			list.truncate(limit);
		}
		for lpe in list {
			self.run_effect_on(doc, item, lpe, pass)?;
		}
		Ok(())
	}

	/// Runs one effect on `item`. A failing effect leaves its input in place
	/// and the rest of the stack continues.
	fn run_effect_on(&mut self, doc: &mut Document, item: NodeId, lpe: NodeId, pass: &mut Pass) -> Result<()> {
		self.ensure_loaded(doc, lpe);
		let Some(mut effect) = self.instances.get_mut(&lpe).and_then(|slot| slot.effect.take()) else {
			debug!(?item, ?lpe, "skipping broken effect");
			return Ok(());
		};
		pass.effects.insert(lpe);
		let result = self.run_loaded(doc, item, lpe, effect.as_mut(), pass);
		if let Some(slot) = self.instances.get_mut(&lpe) {
			slot.effect = Some(effect);
		}
		result
	}

	pub(super) fn link_params(doc: &Document, item: NodeId, lpe: NodeId, effect: &mut dyn Effect) {
		for_each_param_mut(effect, |index, param| {
			param.link(&LinkContext {
				doc,
				item: Some(item),
				owner: lpe,
				slot: param_slot(index),
			});
		});
	}

	fn run_loaded(
		&mut self,
		doc: &mut Document,
		item: NodeId,
		lpe: NodeId,
		effect: &mut dyn Effect,
		pass: &mut Pass,
	) -> Result<()> {
		Self::link_params(doc, item, lpe, effect);
		if !effect.common().is_visible.get() || !effect.accepts_input() {
			trace!(?item, effect = effect.key(), "effect passes input through");
			return Ok(());
		}
		let with_clip = effect.common().apply_to_clippath_and_mask;
		let targets = effect_targets(doc, item, with_clip);
		seed_geometry(doc, &targets, &mut pass.geometry);
		let whole = whole_input(&targets, &pass.geometry);

		self.phases.insert((lpe, item), EffectPhase::Recomputing);
		let common = effect.common_mut();
		common.pathvector_before = whole.clone();
		common.has_exception = false;

		let mut failed = false;
		let mut outputs = Vec::with_capacity(targets.len());
		{
			let mut cx = EffectContext {
				doc: &mut *doc,
				item,
				lpe_node: lpe,
				recompute: &self.recompute,
				config: &self.config,
				is_clip_or_mask: false,
				input_bbox: whole.bounding_box(),
				geometry: &pass.geometry,
			};
			match effect.on_before_effect(&mut cx, &whole) {
				Err(error) => {
					warn!(effect = effect.key(), ?item, %error, "effect failed to prepare, passing input through");
					failed = true;
				}
				Ok(()) => {
					for target in &targets {
						cx.is_clip_or_mask = target.in_clip;
						let (forward, back) = match invert(target.to_item) {
							Some(inverse) => (target.to_item, inverse),
							None => (Affine::IDENTITY, Affine::IDENTITY),
						};
						let input = cx
							.geometry
							.get(&target.node)
							.map(|pv| pv.transformed(forward))
							.unwrap_or_default();
						match effect.do_effect(&input, &cx) {
							Ok(out) => outputs.push((target.node, out.transformed(back))),
							Err(error) => {
								warn!(
									effect = effect.key(),
									?item,
									shape = ?target.node,
									%error,
									"effect failed, keeping its input"
								);
								failed = true;
							}
						}
					}
				}
			}
		}
		pass.geometry.extend(outputs);

		let after = whole_input(&targets, &pass.geometry);
		if !failed {
			let mut cx = EffectContext {
				doc: &mut *doc,
				item,
				lpe_node: lpe,
				recompute: &self.recompute,
				config: &self.config,
				is_clip_or_mask: false,
				input_bbox: whole.bounding_box(),
				geometry: &pass.geometry,
			};
			if let Err(error) = effect.on_after_effect(&mut cx, &after) {
				warn!(effect = effect.key(), ?item, %error, "effect side effects failed");
				failed = true;
			}
		}

		let common = effect.common_mut();
		common.pathvector_after = after;
		common.has_exception = failed;
		common.is_load = false;
		let phase = if failed {
			EffectPhase::OnException
		} else {
			EffectPhase::Ready
		};
		self.phases.insert((lpe, item), phase);
		Ok(())
	}

	/// Queues notifications left by a pass, dropping the ones the pass caused
	/// on its own items and effects.
	fn absorb(&mut self, doc: &Document, pass: &Pass) {
		let fresh = doc.take_notifications();
		let before = fresh.len();
		self.pending.extend(fresh.into_iter().filter(|n| {
			!pass.items.contains(&n.listener.owner) && !pass.effects.contains(&n.listener.owner)
		}));
		trace!(dropped = before.saturating_sub(self.pending.len()), "absorbed notifications");
	}

	/// Dispatches queued change notifications and recomputes every affected
	/// item, repeating until nothing changes. Returns the number of rounds.
	///
	/// A cascade that keeps producing changes after
	/// [`EngineConfig::max_recursion_depth`](crate::EngineConfig) rounds is
	/// treated as a reference cycle: the queue is dropped and
	/// [`EffectError::RecursionLimit`] returned. Nothing is committed.
	pub fn process_notifications(&mut self, doc: &mut Document) -> Result<usize> {
		let limit = self.config.max_recursion_depth;
		let mut rounds = 0;
		loop {
			self.pending.extend(doc.take_notifications());
			if self.pending.is_empty() {
				return Ok(rounds);
			}
			rounds += 1;
			if rounds > limit {
				let dropped = self.pending.len();
				self.pending.clear();
				warn!(rounds, dropped, "notification cascade did not settle");
				return Err(EffectError::RecursionLimit(limit));
			}
			let mut dirty: Vec<NodeId> = Vec::new();
			while let Some(notification) = self.pending.pop_front() {
				self.dispatch(doc, notification, &mut dirty);
			}
			for item in dirty {
				if !doc.is_attached(item) {
					continue;
				}
				match self.update_path_effects(doc, item, true) {
					Err(EffectError::Reentrant(node)) => warn!(?node, "skipped re-entrant recompute"),
					other => other?,
				}
			}
		}
	}

	fn dispatch(&mut self, doc: &Document, notification: Notification, dirty: &mut Vec<NodeId>) {
		let Notification { listener, node, kind } = notification;
		let owner = listener.owner;
		let mut mark = |items: Vec<NodeId>| {
			for item in items {
				if !dirty.contains(&item) {
					dirty.push(item);
				}
			}
		};
		match listener.slot {
			ITEM_WATCH => match kind {
				ChangeKind::Deleted if node == owner => self.forget_item(owner),
				ChangeKind::Modified { key } if key == attr::ORIGINAL_D || key == attr::PATH_EFFECT => {
					mark(vec![owner]);
				}
				ChangeKind::ChildModified => mark(vec![owner]),
				_ => {}
			},
			EFFECT_WATCH => match kind {
				ChangeKind::Deleted => {
					debug!(lpe = ?owner, "effect object deleted");
					self.instances.remove(&owner);
					self.phases.retain(|(lpe, _), _| *lpe != owner);
				}
				ChangeKind::Modified { key } => {
					if key == attr::EFFECT {
						self.instances.remove(&owner);
					} else {
						self.reread_param(doc, owner, &key);
					}
					mark(refs::items_using(doc, owner));
				}
				_ => {}
			},
			_ => {
				trace!(lpe = ?owner, satellite = ?node, ?kind, "satellite changed");
				mark(refs::items_using(doc, owner));
			}
		}
	}
}
