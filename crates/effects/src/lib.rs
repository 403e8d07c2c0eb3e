//! Live path effects: parameters, satellite links, effects and the stack
//! driver that runs them against a [`livepath_document::Document`].
//!
//! An item carries an ordered list of effect references. Each effect object
//! in `defs` stores its type and parameters as attributes. The
//! [`EffectEngine`] loads those objects into [`Effect`] instances, feeds the
//! item's original outline through the list and writes the result back as
//! the rendered outline.
//!
//! ```no_run
//! use livepath_document::{Document, attr, names};
//! use livepath_effects::EffectEngine;
//!
//! let mut doc = Document::new();
//! let path = doc.create_element(names::PATH);
//! doc.set_attr(path, attr::D, "M 0,0 L 10,0 L 10,10 L 0,10 Z")?;
//! doc.append_child(doc.root(), path)?;
//!
//! let mut engine = EffectEngine::default();
//! engine.apply_effect(&mut doc, path, "fillet_chamfer")?;
//! # Ok::<(), livepath_effects::EffectError>(())
//! ```

/// Engine configuration and stored parameter defaults.
pub mod config;
/// State handed to effects while they compute.
pub mod context;
/// The effect trait.
pub mod effect;
/// Error types.
pub mod error;
/// Built-in effects.
pub mod lpe;
/// Typed effect parameters.
pub mod param;
/// Effect type keys and constructors.
pub mod registry;
/// Resolution of `#id` links from parameters to document objects.
pub mod satellite;
/// Reading and writing item geometry.
pub mod shape;
/// The stack driver.
pub mod stack;

pub use config::{ConfigError, DefaultStore, EngineConfig};
pub use context::{EffectContext, RecomputeContext};
pub use effect::{Effect, EffectCommon};
pub use error::{EffectError, LinkError, ParamError, Result};
pub use registry::{EffectFactory, EffectRegistry, EffectType};
pub use shape::GeometrySource;
pub use stack::{EffectEngine, EffectPhase, UNDO_ICON};
