use livepath_geom::fmt_number;

use super::{ParamType, Parameter, parse_f64};
use crate::ParamError;

/// A `|`-joined list of numbers.
#[derive(Debug, Clone)]
pub struct ScalarArrayParam {
	key: &'static str,
	values: Vec<f64>,
	default: Vec<f64>,
}

impl ScalarArrayParam {
	pub fn new(key: &'static str, default: Vec<f64>) -> Self {
		Self {
			key,
			values: default.clone(),
			default,
		}
	}

	pub fn values(&self) -> &[f64] {
		&self.values
	}

	pub fn set_values(&mut self, values: Vec<f64>) {
		self.values = values;
	}

	fn parse(&self, text: &str) -> Result<Vec<f64>, ParamError> {
		if text.trim().is_empty() {
			return Ok(Vec::new());
		}
		text.split('|')
			.enumerate()
			.map(|(index, token)| {
				parse_f64(token).ok_or_else(|| ParamError::Entry {
					key: self.key.to_string(),
					index,
					reason: format!("{token:?} is not a number"),
				})
			})
			.collect()
	}
}

fn join(values: &[f64]) -> String {
	values.iter().map(|v| fmt_number(*v)).collect::<Vec<_>>().join("|")
}

impl Parameter for ScalarArrayParam {
	fn key(&self) -> &str {
		self.key
	}

	fn param_type(&self) -> ParamType {
		ParamType::ScalarArray
	}

	fn read(&mut self, text: &str) -> Result<(), ParamError> {
		self.values = self.parse(text)?;
		Ok(())
	}

	fn write(&self) -> String {
		join(&self.values)
	}

	fn set_default(&mut self) {
		self.values = self.default.clone();
	}

	fn update_default(&mut self, text: &str) -> Result<(), ParamError> {
		self.default = self.parse(text)?;
		Ok(())
	}

	fn default_text(&self) -> String {
		join(&self.default)
	}
}
