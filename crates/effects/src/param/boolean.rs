use super::{ParamType, Parameter, bool_text, parse_bool};
use crate::ParamError;

/// `true` / `false`.
#[derive(Debug, Clone)]
pub struct BoolParam {
	key: &'static str,
	value: bool,
	default: bool,
}

impl BoolParam {
	pub fn new(key: &'static str, default: bool) -> Self {
		Self {
			key,
			value: default,
			default,
		}
	}

	pub fn get(&self) -> bool {
		self.value
	}

	pub fn set(&mut self, value: bool) {
		self.value = value;
	}
}

impl Parameter for BoolParam {
	fn key(&self) -> &str {
		self.key
	}

	fn param_type(&self) -> ParamType {
		ParamType::Bool
	}

	fn read(&mut self, text: &str) -> Result<(), ParamError> {
		self.value = parse_bool(text).ok_or_else(|| ParamError::invalid(self.key, "boolean", text))?;
		Ok(())
	}

	fn write(&self) -> String {
		bool_text(self.value).to_string()
	}

	fn set_default(&mut self) {
		self.value = self.default;
	}

	fn update_default(&mut self, text: &str) -> Result<(), ParamError> {
		self.default = parse_bool(text).ok_or_else(|| ParamError::invalid(self.key, "boolean", text))?;
		Ok(())
	}

	fn default_text(&self) -> String {
		bool_text(self.default).to_string()
	}
}
