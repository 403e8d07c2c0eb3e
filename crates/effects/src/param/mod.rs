//! Typed, serializable effect parameters.
//!
//! Each parameter owns one attribute of the effect object. [`Parameter::read`]
//! parses the attribute text and [`Parameter::write`] produces text in the same
//! grammar, so `read(write())` reproduces the value. Rejected text leaves the
//! previous value in place.

use std::fmt;

use livepath_document::{Document, NodeId};
use livepath_geom::Affine;

use crate::ParamError;

mod array;
mod boolean;
mod enumeration;
mod hidden;
mod item;
mod node_satellites;
mod path;
mod path_array;
mod point;
mod random;
mod satellite_array;
mod scalar;
#[cfg(test)]
mod tests;

pub use array::ScalarArrayParam;
pub use boolean::BoolParam;
pub use enumeration::{EnumArrayParam, EnumData, EnumParam};
pub use hidden::HiddenParam;
pub use item::ItemParam;
pub use node_satellites::{
	NodeSatellite, NodeSatelliteArrayParam, NodeSatelliteType, NodeSatellites, arc_length_at, time_at_arc_length,
};
pub use path::PathParam;
pub use path_array::{PathArrayParam, PathEntry};
pub use point::PointParam;
pub use random::RandomParam;
pub use satellite_array::{SatelliteArrayParam, SatelliteEntry};
pub use scalar::ScalarParam;

pub use crate::shape::GeometrySource;

/// Discriminates parameter variants without downcasting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamType {
	Bool,
	Scalar,
	ScalarArray,
	Enum,
	EnumArray,
	Hidden,
	Point,
	Random,
	Path,
	PathArray,
	Item,
	SatelliteArray,
	NodeSatelliteArray,
}

impl ParamType {
	/// Parameters whose text holds `#id` references to other objects.
	pub fn is_satellite(self) -> bool {
		matches!(
			self,
			ParamType::Path | ParamType::PathArray | ParamType::Item | ParamType::SatelliteArray
		)
	}
}

/// What a linking parameter needs to attach its references.
#[derive(Debug, Clone, Copy)]
pub struct LinkContext<'a> {
	pub doc: &'a Document,
	/// Item the effect is computing for; references into it are cycles.
	pub item: Option<NodeId>,
	/// Effect object that receives change notifications.
	pub owner: NodeId,
	/// Listener slot base; reference `i` listens on `slot | i`.
	pub slot: u32,
}

/// A named, typed value slot owned by an effect.
pub trait Parameter: fmt::Debug {
	/// Attribute name on the effect object.
	fn key(&self) -> &str;

	fn param_type(&self) -> ParamType;

	/// Parses `text` into the value. On error the previous value is kept.
	fn read(&mut self, text: &str) -> Result<(), ParamError>;

	/// Serializes the current value.
	fn write(&self) -> String;

	/// Resets the value to the default.
	fn set_default(&mut self);

	/// Replaces the default with one parsed from `text`, keeping the current
	/// value.
	fn update_default(&mut self, text: &str) -> Result<(), ParamError>;

	/// The default in the attribute grammar.
	fn default_text(&self) -> String;

	/// `#id` references held by the value.
	fn satellite_hrefs(&self) -> Vec<String> {
		Vec::new()
	}

	/// Whether references may point outside a copied subtree and stay
	/// unresolved after a paste.
	fn allow_unresolved_on_copy(&self) -> bool {
		false
	}

	/// Applies an item transform to position-valued data.
	fn transform_multiply(&mut self, _affine: Affine) {}

	/// Resolves references and refreshes cached geometry.
	fn link(&mut self, _cx: &LinkContext<'_>) {}

	/// Drops every reference subscription.
	fn unlink(&mut self) {}
}

/// Parses the boolean grammar. `1` and `0` are accepted for legacy files.
pub(crate) fn parse_bool(text: &str) -> Option<bool> {
	match text.trim() {
		"true" | "1" => Some(true),
		"false" | "0" => Some(false),
		_ => None,
	}
}

/// Parses a finite decimal.
pub(crate) fn parse_f64(text: &str) -> Option<f64> {
	text.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

pub(crate) fn bool_text(value: bool) -> &'static str {
	if value { "true" } else { "false" }
}
