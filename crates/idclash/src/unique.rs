use std::sync::LazyLock;

use livepath_document::Document;
use rand::Rng;
use regex::Regex;

/// Characters allowed in generated identifiers.
pub const VALID_ID_CHARS: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789-_.:";

/// Trailing `-<counter>` of up to nine digits.
static COUNTER_SUFFIX: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"^(.*)-(\d{1,9})$").ok());

/// Replaces every character outside [`VALID_ID_CHARS`] with `_`.
pub fn sanitize_id(name: &str) -> String {
	name.chars()
		.map(|c| if VALID_ID_CHARS.contains(c) { c } else { '_' })
		.collect()
}

/// Derives an identifier from `base` that `doc` does not use yet.
///
/// `base` is sanitized and prefixed with `x` unless it starts with a letter
/// or digit. On conflict a trailing `-N` counter is incremented, or `-1`
/// appended when there is none.
pub fn generate_similar_unique_id(doc: &Document, base: &str) -> String {
	let mut id = if base.is_empty() {
		"id-0".to_string()
	} else {
		sanitize_id(base)
	};
	if !id.starts_with(|c: char| c.is_ascii_alphanumeric()) {
		id.insert(0, 'x');
	}
	if doc.get_object_by_id(&id).is_none() {
		return id;
	}

	let (stem, mut counter) = COUNTER_SUFFIX
		.as_ref()
		.and_then(|re| re.captures(&id))
		.and_then(|caps| Some((caps.get(1)?.as_str().to_string(), caps.get(2)?.as_str().parse::<u64>().ok()?)))
		.unwrap_or_else(|| (id.clone(), 0));
	loop {
		counter += 1;
		let candidate = format!("{stem}-{counter}");
		if doc.get_object_by_id(&candidate).is_none() {
			return candidate;
		}
	}
}

/// Appends `-` and then random digits to `base` until `taken` rejects the
/// candidate.
pub(crate) fn random_suffix(base: &str, taken: impl Fn(&str) -> bool, rng: &mut impl Rng) -> String {
	let mut candidate = format!("{base}-");
	loop {
		candidate.push(char::from(b'0' + rng.gen_range(0..10u8)));
		if !taken(&candidate) {
			return candidate;
		}
	}
}
