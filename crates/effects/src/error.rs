//! Error types for parameters, references and effect computation.

use livepath_document::{DocumentError, NodeId};
use livepath_geom::GeomError;
use thiserror::Error;

/// A parameter rejected its textual value.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParamError {
	#[error("invalid {kind} value for '{key}': {text:?}")]
	Invalid {
		key: String,
		kind: &'static str,
		text: String,
	},

	#[error("unknown choice {text:?} for '{key}'")]
	UnknownChoice { key: String, text: String },

	#[error("malformed entry {index} of '{key}': {reason}")]
	Entry {
		key: String,
		index: usize,
		reason: String,
	},

	#[error("no parameter named '{0}'")]
	UnknownKey(String),
}

impl ParamError {
	pub(crate) fn invalid(key: &str, kind: &'static str, text: &str) -> Self {
		Self::Invalid {
			key: key.to_string(),
			kind,
			text: text.to_string(),
		}
	}
}

/// A satellite reference could not be attached.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LinkError {
	#[error("malformed reference {0:?}")]
	MalformedUri(String),

	#[error("reference {0:?} does not resolve")]
	NotFound(String),

	#[error("reference {href:?} would link item {item:?} to itself")]
	SelfReference { href: String, item: NodeId },
}

/// An effect could not produce output.
#[derive(Debug, Error)]
pub enum EffectError {
	#[error("geometry error: {0}")]
	Geometry(#[from] GeomError),

	#[error("degenerate input: {0}")]
	Degenerate(&'static str),

	#[error("effect '{effect}' does not support {what}")]
	Unsupported { effect: &'static str, what: &'static str },

	#[error("recompute of {0:?} is already in progress")]
	Reentrant(NodeId),

	#[error("notification cascade exceeded {0} rounds")]
	RecursionLimit(usize),

	#[error("unknown effect type '{0}'")]
	UnknownEffect(String),

	#[error("{0:?} is not an effect object")]
	NotAnEffect(NodeId),

	#[error("item {item:?} has no effect at position {index}")]
	NoSuchEffect { item: NodeId, index: usize },

	#[error(transparent)]
	Document(#[from] DocumentError),

	#[error(transparent)]
	Param(#[from] ParamError),

	#[error(transparent)]
	Link(#[from] LinkError),
}

/// Result type for effect operations.
pub type Result<T, E = EffectError> = std::result::Result<T, E>;
