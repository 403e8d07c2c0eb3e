//! Engine configuration and the per-effect-type default store.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use livepath_geom::fmt_number;
use rustc_hash::FxHashMap;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

/// Errors raised while loading an [`EngineConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
	#[error("TOML parse error: {0}")]
	Toml(#[from] toml::de::Error),

	#[error("I/O error reading {path}: {error}")]
	Io {
		/// Path to the file that failed to read.
		path: PathBuf,
		/// The underlying I/O error.
		error: std::io::Error,
	},

	/// A default in `[defaults.<effect>]` is not a scalar.
	#[error("default {effect}.{key} must be a string, number or boolean")]
	UnsupportedDefault { effect: String, key: String },
}

/// Tunables for the effect engine.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
	/// Rounds of notification processing before a cascade is treated as a
	/// reference cycle.
	pub max_recursion_depth: usize,
	/// Accuracy for arc-length queries made by effects.
	pub arc_length_tolerance: f64,
	/// Largest gap between pieces that still joins them into one subpath.
	pub piecewise_join_tolerance: f64,
	/// Parameter defaults keyed by effect type, then parameter key.
	pub defaults: BTreeMap<String, BTreeMap<String, toml::Value>>,
}

impl Default for EngineConfig {
	fn default() -> Self {
		Self {
			max_recursion_depth: 16,
			arc_length_tolerance: 1e-6,
			piecewise_join_tolerance: 1e-6,
			defaults: BTreeMap::new(),
		}
	}
}

impl EngineConfig {
	pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
		let config: Self = toml::from_str(text)?;
		config.default_store()?;
		Ok(config)
	}

	pub fn load(path: &Path) -> Result<Self, ConfigError> {
		let text = std::fs::read_to_string(path).map_err(|error| ConfigError::Io {
			path: path.to_path_buf(),
			error,
		})?;
		debug!(path = %path.display(), "loading engine config");
		Self::from_toml_str(&text)
	}

	/// Builds the runtime default store seeded from `[defaults]`.
	pub fn default_store(&self) -> Result<DefaultStore, ConfigError> {
		let mut store = DefaultStore::default();
		for (effect, table) in &self.defaults {
			for (key, value) in table {
				let text = match value {
					toml::Value::String(s) => s.clone(),
					toml::Value::Integer(i) => i.to_string(),
					toml::Value::Float(f) => fmt_number(*f),
					toml::Value::Boolean(b) => b.to_string(),
					_ => {
						return Err(ConfigError::UnsupportedDefault {
							effect: effect.clone(),
							key: key.clone(),
						});
					}
				};
				store.set(effect, key, text);
			}
		}
		Ok(store)
	}
}

/// Parameter defaults overriding construction-time values, keyed by effect
/// type and parameter key.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DefaultStore {
	entries: FxHashMap<String, IndexMap<String, String>>,
}

impl DefaultStore {
	pub fn get(&self, effect: &str, key: &str) -> Option<&str> {
		self.entries.get(effect)?.get(key).map(String::as_str)
	}

	pub fn set(&mut self, effect: &str, key: &str, value: String) {
		self.entries
			.entry(effect.to_string())
			.or_default()
			.insert(key.to_string(), value);
	}

	/// Drops every stored default of `effect`.
	pub fn clear(&mut self, effect: &str) -> bool {
		self.entries.remove(effect).is_some()
	}

	pub fn contains(&self, effect: &str) -> bool {
		self.entries.get(effect).is_some_and(|t| !t.is_empty())
	}
}
