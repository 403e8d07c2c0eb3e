use kurbo::Point;

use crate::{GeomError, Result};

/// Formats a number as the shortest decimal that parses back to the same value.
///
/// Negative zero is written as `0` so that serialized documents stay stable.
pub fn fmt_number(value: f64) -> String {
	if value == 0.0 {
		return "0".to_string();
	}
	format!("{value}")
}

/// Formats a point as `x,y`.
pub fn fmt_point(point: Point) -> String {
	format!("{},{}", fmt_number(point.x), fmt_number(point.y))
}

/// Parses an `x,y` point. Whitespace around either coordinate is ignored.
pub fn parse_point(text: &str) -> Result<Point> {
	let (x, y) = text
		.split_once(',')
		.ok_or_else(|| GeomError::InvalidPoint(text.to_string()))?;
	let x = x.trim().parse::<f64>().map_err(|_| GeomError::InvalidPoint(text.to_string()))?;
	let y = y.trim().parse::<f64>().map_err(|_| GeomError::InvalidPoint(text.to_string()))?;
	if !x.is_finite() || !y.is_finite() {
		return Err(GeomError::InvalidPoint(text.to_string()));
	}
	Ok(Point::new(x, y))
}
