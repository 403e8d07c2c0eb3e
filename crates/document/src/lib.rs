//! In-process document collaborator for the live path effect pipeline.
//!
//! A [`Document`] owns a tree of element nodes with ordered attributes and an
//! identifier index. Mutations are recorded into the pending transaction and
//! committed as one undo step with [`Document::done`]. Interested parties
//! subscribe to nodes and drain [`Notification`]s after each mutation.

/// Error types for document operations.
pub mod error;
/// Node handles, element and attribute names.
pub mod node;
/// Change notification and scoped subscriptions.
pub mod notify;
/// `style` attribute and `url(#id)` helpers.
pub mod style;
/// Transactions and the undo tree.
pub mod undo;

mod document;

pub use document::Document;
pub use error::{DocumentError, Result};
pub use node::{NodeId, attr, names};
pub use notify::{ChangeKind, Listener, Notification, Subscription};
pub use style::{Style, extract_url_id, extract_url_ids, url_ref};
pub use undo::{CommittedEvent, EventLog, XmlEvent};
