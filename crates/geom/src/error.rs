use thiserror::Error;

/// Errors raised while parsing or querying path geometry.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum GeomError {
	/// The `d` attribute text is not valid path data.
	#[error("invalid path data: {0}")]
	InvalidPathData(String),
	/// The `transform` attribute text could not be parsed.
	#[error("invalid transform '{text}': {reason}")]
	InvalidTransform { text: String, reason: String },
	/// A point token was not of the form `x,y`.
	#[error("invalid point '{0}'")]
	InvalidPoint(String),
	/// A query needed at least one segment.
	#[error("path is empty")]
	EmptyPath,
	/// The geometry has zero length where a length was required.
	#[error("path is degenerate")]
	Degenerate,
}

/// Result alias for geometry operations.
pub type Result<T, E = GeomError> = std::result::Result<T, E>;
