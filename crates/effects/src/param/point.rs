use livepath_geom::{Affine, Point, fmt_point, parse_point};

use super::{ParamType, Parameter};
use crate::ParamError;

/// A position `x,y` in item coordinates that follows item transforms.
#[derive(Debug, Clone)]
pub struct PointParam {
	key: &'static str,
	value: Point,
	default: Point,
}

impl PointParam {
	pub fn new(key: &'static str, default: Point) -> Self {
		Self {
			key,
			value: default,
			default,
		}
	}

	pub fn get(&self) -> Point {
		self.value
	}

	pub fn set(&mut self, value: Point) {
		self.value = value;
	}

	fn parse(&self, text: &str) -> Result<Point, ParamError> {
		parse_point(text).map_err(|_| ParamError::invalid(self.key, "point", text))
	}
}

impl Parameter for PointParam {
	fn key(&self) -> &str {
		self.key
	}

	fn param_type(&self) -> ParamType {
		ParamType::Point
	}

	fn read(&mut self, text: &str) -> Result<(), ParamError> {
		self.value = self.parse(text)?;
		Ok(())
	}

	fn write(&self) -> String {
		fmt_point(self.value)
	}

	fn set_default(&mut self) {
		self.value = self.default;
	}

	fn update_default(&mut self, text: &str) -> Result<(), ParamError> {
		self.default = self.parse(text)?;
		Ok(())
	}

	fn default_text(&self) -> String {
		fmt_point(self.default)
	}

	fn transform_multiply(&mut self, affine: Affine) {
		self.value = affine * self.value;
	}
}
