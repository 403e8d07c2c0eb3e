use livepath_geom::fmt_number;

use super::{ParamType, Parameter, parse_f64};
use crate::ParamError;

const A: i64 = 16807;
const M: i64 = 2147483647;
const Q: i64 = M / A;
const R: i64 = M % A;

/// A scaling value paired with a seed, written `value;seed`.
///
/// Reading from the parameter draws from a Park-Miller minimal standard
/// stream scaled by the value. [`Self::reset_randomizer`] restarts the stream
/// so every recompute sees the same sequence.
#[derive(Debug, Clone)]
pub struct RandomParam {
	key: &'static str,
	value: f64,
	start_seed: i64,
	seed: i64,
	default_value: f64,
	default_seed: i64,
	min: f64,
	max: f64,
	integer: bool,
	random_sign: bool,
}

impl RandomParam {
	pub fn new(key: &'static str, default_value: f64, default_seed: i64) -> Self {
		let seed = setup_seed(default_seed);
		Self {
			key,
			value: default_value,
			start_seed: seed,
			seed,
			default_value,
			default_seed,
			min: f64::MIN,
			max: f64::MAX,
			integer: false,
			random_sign: false,
		}
	}

	pub fn with_range(mut self, min: f64, max: f64) -> Self {
		self.min = min;
		self.max = max;
		self.value = self.constrain(self.value);
		self
	}

	/// Draws are negated with probability one half.
	pub fn with_random_sign(mut self, random_sign: bool) -> Self {
		self.random_sign = random_sign;
		self
	}

	pub fn set_random_sign(&mut self, random_sign: bool) {
		self.random_sign = random_sign;
	}

	pub fn make_integer(&mut self) {
		self.integer = true;
		self.value = self.constrain(self.value);
	}

	pub fn value(&self) -> f64 {
		self.value
	}

	pub fn start_seed(&self) -> i64 {
		self.start_seed
	}

	/// Sets value and seed, restarting the stream.
	pub fn set(&mut self, value: f64, seed: i64) {
		self.value = self.constrain(value);
		self.start_seed = setup_seed(seed);
		self.seed = self.start_seed;
	}

	pub fn reset_randomizer(&mut self) {
		self.seed = self.start_seed;
	}

	/// Next draw in `[0, value)`, negated at random when configured.
	pub fn next(&mut self) -> f64 {
		let draw = self.rand() * self.value;
		if self.random_sign && self.rand() < 0.5 {
			-draw
		} else {
			draw
		}
	}

	/// Next raw draw in `(0, 1)`.
	pub fn rand(&mut self) -> f64 {
		let hi = self.seed / Q;
		let lo = self.seed % Q;
		self.seed = A * lo - R * hi;
		if self.seed <= 0 {
			self.seed += M;
		}
		self.seed as f64 / M as f64
	}

	fn constrain(&self, value: f64) -> f64 {
		let value = if self.integer { value.round() } else { value };
		value.clamp(self.min, self.max)
	}

	fn parse(&self, text: &str) -> Result<(f64, Option<i64>), ParamError> {
		let (value, seed) = match text.split_once(';') {
			Some((v, s)) => (v, Some(s)),
			None => (text, None),
		};
		let value = parse_f64(value).ok_or_else(|| ParamError::invalid(self.key, "random", text))?;
		let seed = match seed {
			Some(s) => Some(
				s.trim()
					.parse::<i64>()
					.map_err(|_| ParamError::invalid(self.key, "random", text))?,
			),
			None => None,
		};
		Ok((value, seed))
	}
}

/// Maps any seed into the valid `1..M` range of the generator.
fn setup_seed(seed: i64) -> i64 {
	let mut seed = seed;
	if seed <= 0 {
		seed = -(seed % (M - 1)) + 1;
	}
	seed.min(M - 1)
}

impl Parameter for RandomParam {
	fn key(&self) -> &str {
		self.key
	}

	fn param_type(&self) -> ParamType {
		ParamType::Random
	}

	fn read(&mut self, text: &str) -> Result<(), ParamError> {
		let (value, seed) = self.parse(text)?;
		self.set(value, seed.unwrap_or(self.default_seed));
		Ok(())
	}

	fn write(&self) -> String {
		format!("{};{}", fmt_number(self.value), self.start_seed)
	}

	fn set_default(&mut self) {
		self.set(self.default_value, self.default_seed);
	}

	fn update_default(&mut self, text: &str) -> Result<(), ParamError> {
		let (value, seed) = self.parse(text)?;
		self.default_value = value;
		if let Some(seed) = seed {
			self.default_seed = seed;
		}
		Ok(())
	}

	fn default_text(&self) -> String {
		format!("{};{}", fmt_number(self.default_value), setup_seed(self.default_seed))
	}
}
