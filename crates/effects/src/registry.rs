//! Maps effect type keys to constructors.

use rustc_hash::FxHashMap as HashMap;

use crate::effect::Effect;
use crate::lpe;
use crate::{EffectError, Result};

/// Constructor for a fresh effect with default parameters.
pub type EffectFactory = fn() -> Box<dyn Effect>;

/// The built-in effect types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EffectType {
	FilletChamfer,
	CopyRotate,
	CloneOriginal,
	FillBetweenMany,
	BendPath,
	Roughen,
	MirrorSymmetry,
	BoolOp,
}

impl EffectType {
	pub const ALL: [EffectType; 8] = [
		EffectType::FilletChamfer,
		EffectType::CopyRotate,
		EffectType::CloneOriginal,
		EffectType::FillBetweenMany,
		EffectType::BendPath,
		EffectType::Roughen,
		EffectType::MirrorSymmetry,
		EffectType::BoolOp,
	];

	pub fn key(self) -> &'static str {
		match self {
			EffectType::FilletChamfer => "fillet_chamfer",
			EffectType::CopyRotate => "copy_rotate",
			EffectType::CloneOriginal => "clone_original",
			EffectType::FillBetweenMany => "fill_between_many",
			EffectType::BendPath => "bend_path",
			EffectType::Roughen => "roughen",
			EffectType::MirrorSymmetry => "mirror_symmetry",
			EffectType::BoolOp => "bool_op",
		}
	}

	pub fn from_key(key: &str) -> Option<Self> {
		Self::ALL.into_iter().find(|t| t.key() == key)
	}

	fn factory(self) -> EffectFactory {
		match self {
			EffectType::FilletChamfer => || Box::new(lpe::FilletChamfer::new()),
			EffectType::CopyRotate => || Box::new(lpe::CopyRotate::new()),
			EffectType::CloneOriginal => || Box::new(lpe::CloneOriginal::new()),
			EffectType::FillBetweenMany => || Box::new(lpe::FillBetweenMany::new()),
			EffectType::BendPath => || Box::new(lpe::BendPath::new()),
			EffectType::Roughen => || Box::new(lpe::Roughen::new()),
			EffectType::MirrorSymmetry => || Box::new(lpe::MirrorSymmetry::new()),
			EffectType::BoolOp => || Box::new(lpe::BoolOperationEffect::new()),
		}
	}
}

/// Effect constructors by type key.
#[derive(Debug, Clone)]
pub struct EffectRegistry {
	factories: HashMap<&'static str, EffectFactory>,
}

impl Default for EffectRegistry {
	fn default() -> Self {
		Self::with_builtins()
	}
}

impl EffectRegistry {
	/// A registry with no effect types.
	pub fn empty() -> Self {
		Self {
			factories: HashMap::default(),
		}
	}

	pub fn with_builtins() -> Self {
		let mut registry = Self::empty();
		for ty in EffectType::ALL {
			registry.register(ty.key(), ty.factory());
		}
		registry
	}

	/// Adds or replaces the constructor for `key`.
	pub fn register(&mut self, key: &'static str, factory: EffectFactory) {
		self.factories.insert(key, factory);
	}

	pub fn contains(&self, key: &str) -> bool {
		self.factories.contains_key(key)
	}

	pub fn create(&self, key: &str) -> Result<Box<dyn Effect>> {
		let factory = self
			.factories
			.get(key)
			.ok_or_else(|| EffectError::UnknownEffect(key.to_string()))?;
		Ok(factory())
	}

	/// Registered type keys in no particular order.
	pub fn keys(&self) -> impl Iterator<Item = &'static str> + '_ {
		self.factories.keys().copied()
	}
}
