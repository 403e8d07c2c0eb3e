//! Identifier clash resolution for documents merged by import, paste or
//! duplication.
//!
//! Before a subtree from one document lands in another, every identifier it
//! shares with the target is renamed to `old-<digits>` and every reference
//! to a renamed object inside the subtree is rewritten. References are found
//! in href-like attributes, `url(#id)` style properties and presentation
//! attributes, and in the satellite parameters of effect objects.

/// Error types.
pub mod error;
/// Merging one document into another.
pub mod merge;
/// Finding and rewriting identifier references.
pub mod refs;
/// Clash resolution and single-object renames.
pub mod resolve;
/// Identifier sanitizing and generation.
pub mod unique;

#[cfg(test)]
mod tests;

pub use error::{IdClashError, Result};
pub use merge::merge_documents;
pub use refs::{IdReference, RefKind, RefMap, find_references};
pub use resolve::{change_def_references, prevent_id_clashes, rename_id};
pub use unique::{generate_similar_unique_id, sanitize_id};
