use livepath_document::{DocumentError, NodeId};
use thiserror::Error;

/// Errors raised while renaming identifiers or rewriting references.
#[derive(Debug, Error)]
pub enum IdClashError {
	#[error("'{0}' is not a usable identifier")]
	InvalidId(String),

	#[error("{0:?} has no identifier")]
	MissingId(NodeId),

	#[error(transparent)]
	Document(#[from] DocumentError),
}

pub type Result<T, E = IdClashError> = std::result::Result<T, E>;
