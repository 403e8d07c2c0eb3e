use std::fmt;

use super::{ParamType, Parameter};
use crate::ParamError;

/// One choice of an enumerated parameter: the value and its attribute key.
#[derive(Debug, Clone, Copy)]
pub struct EnumData<E: 'static> {
	pub value: E,
	pub key: &'static str,
	pub label: &'static str,
}

fn lookup<E: Copy>(table: &'static [EnumData<E>], text: &str) -> Option<E> {
	let text = text.trim();
	table.iter().find(|d| d.key == text).map(|d| d.value)
}

fn key_of<E: Copy + PartialEq>(table: &'static [EnumData<E>], value: E) -> &'static str {
	table.iter().find(|d| d.value == value).map_or("", |d| d.key)
}

/// One value out of a static table. Keys not in the table are rejected.
#[derive(Clone)]
pub struct EnumParam<E: 'static> {
	key: &'static str,
	value: E,
	default: E,
	table: &'static [EnumData<E>],
}

impl<E: fmt::Debug> fmt::Debug for EnumParam<E> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("EnumParam")
			.field("key", &self.key)
			.field("value", &self.value)
			.field("default", &self.default)
			.finish()
	}
}

impl<E: Copy + PartialEq> EnumParam<E> {
	pub fn new(key: &'static str, table: &'static [EnumData<E>], default: E) -> Self {
		Self {
			key,
			value: default,
			default,
			table,
		}
	}

	pub fn get(&self) -> E {
		self.value
	}

	pub fn set(&mut self, value: E) {
		self.value = value;
	}

	pub fn table(&self) -> &'static [EnumData<E>] {
		self.table
	}

	fn parse(&self, text: &str) -> Result<E, ParamError> {
		lookup(self.table, text).ok_or_else(|| ParamError::UnknownChoice {
			key: self.key.to_string(),
			text: text.to_string(),
		})
	}
}

impl<E: Copy + PartialEq + fmt::Debug> Parameter for EnumParam<E> {
	fn key(&self) -> &str {
		self.key
	}

	fn param_type(&self) -> ParamType {
		ParamType::Enum
	}

	fn read(&mut self, text: &str) -> Result<(), ParamError> {
		self.value = self.parse(text)?;
		Ok(())
	}

	fn write(&self) -> String {
		key_of(self.table, self.value).to_string()
	}

	fn set_default(&mut self) {
		self.value = self.default;
	}

	fn update_default(&mut self, text: &str) -> Result<(), ParamError> {
		self.default = self.parse(text)?;
		Ok(())
	}

	fn default_text(&self) -> String {
		key_of(self.table, self.default).to_string()
	}
}

/// A `|`-joined list of enumerated values.
#[derive(Clone)]
pub struct EnumArrayParam<E: 'static> {
	key: &'static str,
	values: Vec<E>,
	default: Vec<E>,
	table: &'static [EnumData<E>],
}

impl<E: fmt::Debug> fmt::Debug for EnumArrayParam<E> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("EnumArrayParam")
			.field("key", &self.key)
			.field("values", &self.values)
			.finish()
	}
}

impl<E: Copy + PartialEq> EnumArrayParam<E> {
	pub fn new(key: &'static str, table: &'static [EnumData<E>], default: Vec<E>) -> Self {
		Self {
			key,
			values: default.clone(),
			default,
			table,
		}
	}

	pub fn values(&self) -> &[E] {
		&self.values
	}

	pub fn set_values(&mut self, values: Vec<E>) {
		self.values = values;
	}

	fn parse(&self, text: &str) -> Result<Vec<E>, ParamError> {
		if text.trim().is_empty() {
			return Ok(Vec::new());
		}
		text.split('|')
			.enumerate()
			.map(|(index, token)| {
				lookup(self.table, token).ok_or_else(|| ParamError::Entry {
					key: self.key.to_string(),
					index,
					reason: format!("unknown choice {:?}", token.trim()),
				})
			})
			.collect()
	}

	fn join(&self, values: &[E]) -> String {
		values
			.iter()
			.map(|v| key_of(self.table, *v))
			.collect::<Vec<_>>()
			.join("|")
	}
}

impl<E: Copy + PartialEq + fmt::Debug> Parameter for EnumArrayParam<E> {
	fn key(&self) -> &str {
		self.key
	}

	fn param_type(&self) -> ParamType {
		ParamType::EnumArray
	}

	fn read(&mut self, text: &str) -> Result<(), ParamError> {
		self.values = self.parse(text)?;
		Ok(())
	}

	fn write(&self) -> String {
		self.join(&self.values)
	}

	fn set_default(&mut self) {
		self.values = self.default.clone();
	}

	fn update_default(&mut self, text: &str) -> Result<(), ParamError> {
		self.default = self.parse(text)?;
		Ok(())
	}

	fn default_text(&self) -> String {
		self.join(&self.default)
	}
}
