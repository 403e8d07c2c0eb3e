use std::fmt;

use indexmap::IndexMap;

/// Ordered CSS declarations from a `style` attribute.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Style(IndexMap<String, String>);

impl Style {
	/// Parses `prop:value;prop:value`. Malformed declarations are skipped.
	pub fn parse(text: &str) -> Self {
		let decls = text
			.split(';')
			.filter_map(|decl| {
				let (k, v) = decl.split_once(':')?;
				let (k, v) = (k.trim(), v.trim());
				(!k.is_empty()).then(|| (k.to_string(), v.to_string()))
			})
			.collect();
		Self(decls)
	}

	pub fn get(&self, key: &str) -> Option<&str> {
		self.0.get(key).map(String::as_str)
	}

	pub fn set(&mut self, key: &str, value: impl Into<String>) {
		self.0.insert(key.to_string(), value.into());
	}

	pub fn remove(&mut self, key: &str) -> Option<String> {
		self.0.shift_remove(key)
	}

	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}

	pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
		self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
	}
}

impl fmt::Display for Style {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		for (i, (k, v)) in self.0.iter().enumerate() {
			if i > 0 {
				f.write_str(";")?;
			}
			write!(f, "{k}:{v}")?;
		}
		Ok(())
	}
}

/// Extracts the id from the first `url(#id)` in `value`.
pub fn extract_url_id(value: &str) -> Option<&str> {
	extract_url_ids(value).into_iter().next()
}

/// Extracts the ids of every `url(#id)` in `value`, in order.
///
/// Quoted forms such as `url('#id')` are accepted.
pub fn extract_url_ids(value: &str) -> Vec<&str> {
	let mut out = Vec::new();
	let mut rest = value;
	while let Some(start) = rest.find("url(") {
		let after = &rest[start + 4..];
		let Some(end) = after.find(')') else {
			break;
		};
		let inner = after[..end].trim().trim_matches(['\'', '"']);
		if let Some(id) = inner.strip_prefix('#') {
			if !id.is_empty() {
				out.push(id);
			}
		}
		rest = &after[end + 1..];
	}
	out
}

/// Formats a `url(#id)` reference.
pub fn url_ref(id: &str) -> String {
	format!("url(#{id})")
}
