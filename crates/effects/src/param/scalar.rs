use livepath_geom::fmt_number;

use super::{ParamType, Parameter, parse_f64};
use crate::ParamError;

/// A ranged floating point value.
///
/// `digits`, `increments` and `add_slider` are presentation hints carried for
/// editors; they never affect the stored value.
#[derive(Debug, Clone)]
pub struct ScalarParam {
	key: &'static str,
	value: f64,
	default: f64,
	min: f64,
	max: f64,
	integer: bool,
	digits: u32,
	step: f64,
	page: f64,
	add_slider: bool,
}

impl ScalarParam {
	pub fn new(key: &'static str, default: f64) -> Self {
		Self {
			key,
			value: default,
			default,
			min: f64::MIN,
			max: f64::MAX,
			integer: false,
			digits: 2,
			step: 0.1,
			page: 1.0,
			add_slider: false,
		}
	}

	pub fn with_range(mut self, min: f64, max: f64) -> Self {
		self.set_range(min, max);
		self
	}

	pub fn integer(mut self) -> Self {
		self.make_integer();
		self
	}

	pub fn with_digits(mut self, digits: u32) -> Self {
		self.digits = digits;
		self
	}

	pub fn with_increments(mut self, step: f64, page: f64) -> Self {
		self.step = step;
		self.page = page;
		self
	}

	pub fn with_slider(mut self) -> Self {
		self.add_slider = true;
		self
	}

	pub fn get(&self) -> f64 {
		self.value
	}

	/// Integer view; only meaningful after [`Self::make_integer`].
	pub fn get_usize(&self) -> usize {
		self.value.max(0.0) as usize
	}

	/// Rounds when integer-only, then clamps to the range.
	pub fn set(&mut self, value: f64) {
		self.value = self.constrain(value);
	}

	pub fn set_range(&mut self, min: f64, max: f64) {
		self.min = min;
		self.max = max;
		self.value = self.constrain(self.value);
	}

	pub fn make_integer(&mut self) {
		self.integer = true;
		self.digits = 0;
		self.step = 1.0;
		self.page = 10.0;
		self.value = self.constrain(self.value);
	}

	pub fn range(&self) -> (f64, f64) {
		(self.min, self.max)
	}

	pub fn is_integer(&self) -> bool {
		self.integer
	}

	pub fn digits(&self) -> u32 {
		self.digits
	}

	pub fn increments(&self) -> (f64, f64) {
		(self.step, self.page)
	}

	pub fn has_slider(&self) -> bool {
		self.add_slider
	}

	fn constrain(&self, value: f64) -> f64 {
		let value = if self.integer { value.round() } else { value };
		value.clamp(self.min, self.max)
	}

	fn parse(&self, text: &str) -> Result<f64, ParamError> {
		parse_f64(text).ok_or_else(|| ParamError::invalid(self.key, "number", text))
	}
}

impl Parameter for ScalarParam {
	fn key(&self) -> &str {
		self.key
	}

	fn param_type(&self) -> ParamType {
		ParamType::Scalar
	}

	fn read(&mut self, text: &str) -> Result<(), ParamError> {
		let value = self.parse(text)?;
		self.set(value);
		Ok(())
	}

	fn write(&self) -> String {
		fmt_number(self.value)
	}

	fn set_default(&mut self) {
		self.value = self.constrain(self.default);
	}

	fn update_default(&mut self, text: &str) -> Result<(), ParamError> {
		self.default = self.parse(text)?;
		Ok(())
	}

	fn default_text(&self) -> String {
		fmt_number(self.default)
	}
}
