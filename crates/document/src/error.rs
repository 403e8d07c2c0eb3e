use thiserror::Error;

use crate::NodeId;

/// Errors raised by document mutations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DocumentError {
	/// The handle does not name a node of this document.
	#[error("node {0:?} does not exist")]
	NodeNotFound(NodeId),
	/// The operation needs a node that is part of the tree.
	#[error("node {0:?} is not attached to the document")]
	Detached(NodeId),
	/// Attaching would make a node its own ancestor.
	#[error("cannot attach {child:?} below its own descendant {parent:?}")]
	Cycle { parent: NodeId, child: NodeId },
	/// Another attached node already carries the identifier.
	#[error("identifier '{0}' is already in use")]
	DuplicateId(String),
	/// The root node cannot be removed or re-parented.
	#[error("the root node cannot be moved or deleted")]
	RootImmutable,
}

/// Result alias for document operations.
pub type Result<T, E = DocumentError> = std::result::Result<T, E>;
