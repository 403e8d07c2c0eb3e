//! The effect stack driver.
//!
//! [`EffectEngine`] owns the live effect instances of a document, keyed by
//! their effect object, and runs each item's effect list in order. It also
//! implements the stack operations (apply, remove, reorder, fork, ...) as
//! single undoable transactions.
//!
//! The engine never holds the document. Every call receives it explicitly,
//! and change notifications are pulled with
//! [`EffectEngine::process_notifications`].

use std::collections::VecDeque;

use livepath_document::{Document, Listener, NodeId, Notification, Subscription, attr};
use livepath_geom::PathVector;
use rustc_hash::{FxHashMap as HashMap, FxHashSet as HashSet};
use tracing::{debug, warn};

use crate::config::{DefaultStore, EngineConfig};
use crate::context::RecomputeContext;
use crate::effect::{Effect, all_params, for_each_param_mut};
use crate::registry::EffectRegistry;
use crate::{EffectError, Result};

mod driver;
mod ops;
pub(crate) mod refs;

/// Listener slot of item watches.
pub(crate) const ITEM_WATCH: u32 = u32::MAX;
/// Listener slot of effect object watches.
pub(crate) const EFFECT_WATCH: u32 = u32::MAX - 1;

/// Icon attached to every commit made by the engine.
pub const UNDO_ICON: &str = "dialog-path-effects";

/// Listener slot base for the parameter at `index` of [`all_params`].
pub(crate) fn param_slot(index: usize) -> u32 {
	(index as u32) << 16
}

/// Where an effect stands with respect to one item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EffectPhase {
	#[default]
	Unapplied,
	Applying,
	Ready,
	Recomputing,
	Removed,
	/// The last computation failed; the item shows the effect's input.
	OnException,
}

#[derive(Debug)]
struct EffectSlot {
	/// `None` when the type key is unknown.
	effect: Option<Box<dyn Effect>>,
	type_key: String,
	_watch: Subscription,
}

/// Runs effect stacks and applies stack operations.
#[derive(Debug)]
pub struct EffectEngine {
	registry: EffectRegistry,
	config: EngineConfig,
	defaults: DefaultStore,
	recompute: RecomputeContext,
	instances: HashMap<NodeId, EffectSlot>,
	watches: HashMap<NodeId, Subscription>,
	phases: HashMap<(NodeId, NodeId), EffectPhase>,
	current: HashMap<NodeId, NodeId>,
	/// Items with a computation in progress.
	active: HashSet<NodeId>,
	suspended: usize,
	previews: HashMap<NodeId, PathVector>,
	pending: VecDeque<Notification>,
}

impl Default for EffectEngine {
	fn default() -> Self {
		Self::new(EffectRegistry::with_builtins())
	}
}

impl EffectEngine {
	pub fn new(registry: EffectRegistry) -> Self {
		Self {
			registry,
			config: EngineConfig::default(),
			defaults: DefaultStore::default(),
			recompute: RecomputeContext::default(),
			instances: HashMap::default(),
			watches: HashMap::default(),
			phases: HashMap::default(),
			current: HashMap::default(),
			active: HashSet::default(),
			suspended: 0,
			previews: HashMap::default(),
			pending: VecDeque::new(),
		}
	}

	/// Uses `config`, seeding the default store from its `[defaults]` table.
	pub fn with_config(registry: EffectRegistry, config: EngineConfig) -> std::result::Result<Self, crate::ConfigError> {
		let defaults = config.default_store()?;
		Ok(Self {
			config,
			defaults,
			..Self::new(registry)
		})
	}

	pub fn config(&self) -> &EngineConfig {
		&self.config
	}

	pub fn registry(&self) -> &EffectRegistry {
		&self.registry
	}

	pub fn registry_mut(&mut self) -> &mut EffectRegistry {
		&mut self.registry
	}

	pub fn defaults(&self) -> &DefaultStore {
		&self.defaults
	}

	pub fn recompute_context(&self) -> &RecomputeContext {
		&self.recompute
	}

	pub fn set_recompute_context(&mut self, recompute: RecomputeContext) {
		self.recompute = recompute;
	}

	/// Suspends recomputation until a matching [`Self::enable`].
	pub fn disable(&mut self) {
		self.suspended += 1;
	}

	pub fn enable(&mut self) {
		self.suspended = self.suspended.saturating_sub(1);
	}

	pub fn is_enabled(&self) -> bool {
		self.suspended == 0
	}

	pub fn phase(&self, lpe: NodeId, item: NodeId) -> EffectPhase {
		self.phases.get(&(lpe, item)).copied().unwrap_or_default()
	}

	/// Result of the last non-writing recompute of a shape.
	pub fn preview(&self, shape: NodeId) -> Option<&PathVector> {
		self.previews.get(&shape)
	}

	/// The loaded instance for an effect object, loading it on first use.
	pub fn effect(&mut self, doc: &Document, lpe: NodeId) -> Option<&dyn Effect> {
		self.ensure_loaded(doc, lpe);
		self.instances.get(&lpe)?.effect.as_deref()
	}

	/// The effect objects in the item's list, in order. Broken references
	/// are skipped.
	pub fn path_effect_list(&self, doc: &Document, item: NodeId) -> Vec<NodeId> {
		refs::hrefs(doc, item)
			.iter()
			.filter_map(|href| refs::resolve(doc, href))
			.collect()
	}

	/// The effect the next "current" operation acts on: the one last
	/// applied, added or moved, else the last in the list.
	pub fn current_effect(&self, doc: &Document, item: NodeId) -> Option<NodeId> {
		let list = self.path_effect_list(doc, item);
		self.current
			.get(&item)
			.copied()
			.filter(|lpe| list.contains(lpe))
			.or_else(|| list.last().copied())
	}

	pub fn set_current_effect(&mut self, item: NodeId, lpe: NodeId) {
		self.current.insert(item, lpe);
	}

	/// True when a reference does not resolve or names an unknown effect type.
	pub fn has_broken_path_effect(&mut self, doc: &Document, item: NodeId) -> bool {
		refs::hrefs(doc, item).iter().any(|href| match refs::resolve(doc, href) {
			None => true,
			Some(lpe) => {
				self.ensure_loaded(doc, lpe);
				self.instances.get(&lpe).is_none_or(|slot| slot.effect.is_none())
			}
		})
	}

	pub fn has_effect_of_type(&self, doc: &Document, item: NodeId, key: &str) -> bool {
		!self.effects_of_type(doc, item, key).is_empty()
	}

	pub fn effects_of_type(&self, doc: &Document, item: NodeId, key: &str) -> Vec<NodeId> {
		self.path_effect_list(doc, item)
			.into_iter()
			.filter(|lpe| doc.attr(*lpe, attr::EFFECT) == Some(key))
			.collect()
	}

	/// Stores the effect's current parameter values as defaults for its type.
	pub fn save_defaults(&mut self, doc: &Document, lpe: NodeId) -> Result<()> {
		self.ensure_loaded(doc, lpe);
		let effect = self.loaded(lpe)?;
		let key = effect.key();
		let values: Vec<(String, String)> = all_params(effect)
			.into_iter()
			.map(|p| (p.key().to_string(), p.write()))
			.collect();
		for (param, value) in values {
			self.defaults.set(key, &param, value);
		}
		debug!(effect = key, "saved parameter defaults");
		Ok(())
	}

	/// Drops stored defaults so new effects of the type use construction
	/// defaults again.
	pub fn clear_defaults(&mut self, effect_key: &str) {
		self.defaults.clear(effect_key);
	}

	fn loaded(&self, lpe: NodeId) -> Result<&dyn Effect> {
		let slot = self.instances.get(&lpe).ok_or(EffectError::NotAnEffect(lpe))?;
		slot.effect
			.as_deref()
			.ok_or_else(|| EffectError::UnknownEffect(slot.type_key.clone()))
	}

	/// Creates the instance for an effect object from its attributes.
	fn ensure_loaded(&mut self, doc: &Document, lpe: NodeId) {
		if self.instances.contains_key(&lpe) || !doc.is_attached(lpe) {
			return;
		}
		if doc.name(lpe) != Some(livepath_document::names::PATH_EFFECT) {
			return;
		}
		let type_key = doc.attr(lpe, attr::EFFECT).unwrap_or_default().to_string();
		let effect = match self.registry.create(&type_key) {
			Ok(mut effect) => {
				self.read_params(doc, lpe, effect.as_mut());
				Some(effect)
			}
			Err(error) => {
				warn!(?lpe, %error, "effect object cannot be loaded");
				None
			}
		};
		let watch = doc.subscribe(lpe, Listener::new(lpe, EFFECT_WATCH));
		self.instances.insert(
			lpe,
			EffectSlot {
				effect,
				type_key,
				_watch: watch,
			},
		);
	}

	/// Reads every parameter: the attribute when present, else a stored
	/// default, else the construction default.
	fn read_params(&self, doc: &Document, lpe: NodeId, effect: &mut dyn Effect) {
		let type_key = effect.key();
		let defaults = &self.defaults;
		for_each_param_mut(effect, |_, param| match doc.attr(lpe, param.key()) {
			Some(text) => {
				if let Err(error) = param.read(text) {
					warn!(?lpe, %error, "keeping previous parameter value");
				}
			}
			None => {
				if let Some(text) = defaults.get(type_key, param.key()) {
					if let Err(error) = param.update_default(text) {
						warn!(?lpe, %error, "ignoring stored default");
					}
				}
				param.set_default();
			}
		});
	}

	/// Re-reads one parameter after its attribute changed outside the engine.
	fn reread_param(&mut self, doc: &Document, lpe: NodeId, key: &str) {
		let Some(effect) = self.instances.get_mut(&lpe).and_then(|s| s.effect.as_mut()) else {
			return;
		};
		let Some(param) = crate::effect::find_param_mut(effect.as_mut(), key) else {
			return;
		};
		match doc.attr(lpe, key) {
			Some(text) => {
				if let Err(error) = param.read(text) {
					warn!(?lpe, %error, "keeping previous parameter value");
				}
			}
			None => param.set_default(),
		}
	}

	/// Writes every parameter of a loaded effect to its object.
	fn write_params(&self, doc: &mut Document, lpe: NodeId) -> Result<()> {
		let effect = self.loaded(lpe)?;
		for param in all_params(effect) {
			doc.set_attr(lpe, param.key(), &param.write())?;
		}
		Ok(())
	}

	fn watch_item(&mut self, doc: &Document, item: NodeId) {
		self.watches
			.entry(item)
			.or_insert_with(|| doc.subscribe(item, Listener::new(item, ITEM_WATCH)));
	}

	/// Forgets everything tied to `item`.
	fn forget_item(&mut self, item: NodeId) {
		self.watches.remove(&item);
		self.current.remove(&item);
		self.previews.remove(&item);
		self.phases.retain(|(_, i), _| *i != item);
	}

	/// Throws away in-memory state after a rolled back transaction. Effects
	/// reload from their attributes on next use.
	fn rollback(&mut self, doc: &mut Document) {
		doc.cancel();
		self.instances.clear();
		self.pending.clear();
		doc.take_notifications();
	}
}
