use super::{ParamType, Parameter};
use crate::ParamError;

/// Raw text not exposed to editors, such as `lpeversion`.
#[derive(Debug, Clone)]
pub struct HiddenParam {
	key: &'static str,
	value: String,
	default: String,
}

impl HiddenParam {
	pub fn new(key: &'static str, default: &str) -> Self {
		Self {
			key,
			value: default.to_string(),
			default: default.to_string(),
		}
	}

	pub fn get(&self) -> &str {
		&self.value
	}

	pub fn set(&mut self, value: &str) {
		self.value = value.to_string();
	}
}

impl Parameter for HiddenParam {
	fn key(&self) -> &str {
		self.key
	}

	fn param_type(&self) -> ParamType {
		ParamType::Hidden
	}

	fn read(&mut self, text: &str) -> Result<(), ParamError> {
		self.value = text.to_string();
		Ok(())
	}

	fn write(&self) -> String {
		self.value.clone()
	}

	fn set_default(&mut self) {
		self.value = self.default.clone();
	}

	fn update_default(&mut self, text: &str) -> Result<(), ParamError> {
		self.default = text.to_string();
		Ok(())
	}

	fn default_text(&self) -> String {
		self.default.clone()
	}
}
